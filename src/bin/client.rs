use clap::Parser;
use hyper::{Body, Method, Request};
use paxos::{Command, Configuration, Value};
use std::path::PathBuf;

/// Submits one value to a running Paxos cluster and prints the resulting
/// replicated state.
#[derive(Parser)]
#[command(name = "paxos-client")]
struct Opt {
    /// Peer list file: one host[:port] per line.
    config: PathBuf,

    /// Which node in the peer list to send the request to (0-based).
    #[arg(short, long, default_value_t = 0)]
    server: usize,

    /// Port to use for every node, overriding the peer list's own ports.
    #[arg(short, long)]
    port: Option<u16>,

    /// Integer payload to append to the replicated log.
    payload: i64,
}

#[tokio::main]
async fn main() {
    let opt = Opt::parse();

    let mut nodes = Configuration::parse_peer_file(&opt.config, Configuration::default_port())
        .unwrap_or_else(|e| {
            eprintln!("failed to read {}: {}", opt.config.display(), e);
            std::process::exit(1);
        });

    if let Some(port) = opt.port {
        nodes = nodes
            .into_iter()
            .map(|node| {
                let host = node.split(':').next().unwrap_or(&node).to_string();
                format!("{}:{}", host, port)
            })
            .collect();
    }

    let target = nodes.get(opt.server).unwrap_or_else(|| {
        eprintln!("no node at index {} in {}", opt.server, opt.config.display());
        std::process::exit(1);
    });

    let value = Value { client_id: rand::random(), command_id: rand::random(), payload: opt.payload };
    let command = Command::ClientRequest { value };

    let body = serde_json::to_vec(&command).expect("Command always serializes");
    let uri = format!("http://{}/proposer/client-request", target);
    let request = Request::builder()
        .method(Method::POST)
        .uri(&uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("request is well-formed");

    let client = hyper::Client::new();
    let response = match tokio::time::timeout(std::time::Duration::from_secs(30), client.request(request)).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            eprintln!("request to {} failed: {}", uri, e);
            std::process::exit(1);
        }
        Err(_) => {
            eprintln!("request to {} timed out", uri);
            std::process::exit(1);
        }
    };

    if !response.status().is_success() {
        eprintln!("{} returned status {}", uri, response.status());
        std::process::exit(1);
    }

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap_or_else(|e| {
        eprintln!("failed to read response body: {}", e);
        std::process::exit(1);
    });

    match serde_json::from_slice::<Command>(&bytes) {
        Ok(Command::ClientReply { state }) => println!("{:?}", state),
        Ok(other) => {
            eprintln!("unexpected reply: {:?}", other);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("failed to decode reply: {}", e);
            std::process::exit(1);
        }
    }
}
