use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use log::info;
use paxos::{discover_self, Configuration, Handler, HttpTransport, Node, VecStateMachine};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Runs one node of a Multi-Paxos cluster.
#[derive(Parser)]
#[command(name = "paxos-server")]
struct Opt {
    /// Peer list file: one host[:port] per line.
    #[arg(short, long)]
    config: PathBuf,

    /// Port this node listens on, used both for binding and for matching
    /// this node's own entry in the peer list.
    #[arg(short, long, default_value_t = Configuration::default_port())]
    port: u16,

    /// Write logs here instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let opt = Opt::parse();
    init_logging(opt.log_file.as_deref());

    let nodes = Configuration::parse_peer_file(&opt.config, Configuration::default_port())
        .unwrap_or_else(|e| {
            eprintln!("failed to read {}: {}", opt.config.display(), e);
            std::process::exit(1);
        });

    let self_token: Arc<str> = Arc::from(format!("{:x}", rand::random::<u64>()));

    let config = discover_self(nodes, &self_token, |node| async move { probe_server_id(node).await })
        .await
        .unwrap_or_else(|e| {
            eprintln!("self-discovery failed: {}", e);
            std::process::exit(1);
        });

    info!("node {} joining cluster of {}", config.current(), config.node_count());

    let transport: paxos::SharedTransport = Arc::new(HttpTransport::new(tokio::runtime::Handle::current()));
    let node = Arc::new(Node::spawn(config, transport, VecStateMachine::default()));
    let handler = Handler::new(node, self_token);

    let addr = SocketAddr::from(([0, 0, 0, 0], opt.port));
    let make_svc = make_service_fn(move |_conn| {
        let handler = handler.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| {
            let handler = handler.clone();
            async move { handler.handle(req).await }
        })) }
    });

    info!("listening on {}", addr);
    if let Err(e) = Server::bind(&addr).serve(make_svc).await {
        eprintln!("server error: {}", e);
        std::process::exit(1);
    }
}

/// GET a candidate peer's `/server_id`. `discover_self` matches the result
/// against our own token; `None` on any connection failure or non-2xx (the
/// peer may simply not have started yet).
async fn probe_server_id(node: String) -> Option<String> {
    let uri: hyper::Uri = format!("http://{}/server_id", node).parse().ok()?;
    let client = hyper::Client::new();
    let resp = tokio::time::timeout(std::time::Duration::from_millis(500), client.get(uri))
        .await
        .ok()?
        .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let body = hyper::body::to_bytes(resp.into_body()).await.ok()?;
    String::from_utf8(body.to_vec()).ok()
}

fn init_logging(log_file: Option<&std::path::Path>) {
    match log_file {
        None => env_logger::init(),
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .expect("failed to open log file");
            env_logger::Builder::from_default_env()
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
    }
}
