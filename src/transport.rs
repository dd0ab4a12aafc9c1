use crate::{Command, NodeId};
use hyper::{Body, Client, Method, Request};
use log::warn;
use std::sync::Arc;

/// Delivers messages to other nodes' role inboxes, best-effort, with no
/// retry of its own: a transport failure is logged and dropped.
///
/// Grounded on the original Python's `network.py` (`send`/`send_to_all`):
/// a per-send timeout, failures logged at `warn!`, no retry. `send_to`/
/// `broadcast` are fire-and-forget (spawn onto the runtime) so a role
/// agent's serial event loop never blocks on them.
pub trait Transport: Send + Sync {
    fn send_to(&self, node: NodeId, path: &'static str, command: Command);

    fn broadcast(&self, nodes: Vec<NodeId>, path: &'static str, command: Command) {
        for node in nodes {
            self.send_to(node, path, command.clone());
        }
    }
}

/// HTTP JSON transport. Grounded on `examples/http-paxos/service.rs`
/// (hyper `Client`/`Service`, JSON body) for the shape of the POST, and
/// `network.py`'s timeout/warn-and-drop semantics for the failure policy.
pub struct HttpTransport {
    client: Client<hyper::client::HttpConnector>,
    runtime: tokio::runtime::Handle,
    send_timeout: std::time::Duration,
}

impl HttpTransport {
    pub fn new(runtime: tokio::runtime::Handle) -> HttpTransport {
        HttpTransport {
            client: Client::new(),
            runtime,
            send_timeout: std::time::Duration::from_secs(5),
        }
    }

    async fn post(
        client: Client<hyper::client::HttpConnector>,
        node: NodeId,
        path: &'static str,
        command: Command,
        timeout: std::time::Duration,
    ) {
        let body = match serde_json::to_vec(&command) {
            Ok(b) => b,
            Err(e) => {
                warn!("failed to encode {:?} for {}: {}", command, node, e);
                return;
            }
        };

        let uri = format!("http://{}{}", node, path);
        let request = match Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
        {
            Ok(r) => r,
            Err(e) => {
                warn!("failed to build request for {}: {}", uri, e);
                return;
            }
        };

        match tokio::time::timeout(timeout, client.request(request)).await {
            Ok(Ok(resp)) if resp.status().is_success() => {}
            Ok(Ok(resp)) => warn!("send to {} got status {}", uri, resp.status()),
            Ok(Err(e)) => warn!("send to {} failed: {}", uri, e),
            Err(_) => warn!("send to {} timed out", uri),
        }
    }
}

impl Transport for HttpTransport {
    fn send_to(&self, node: NodeId, path: &'static str, command: Command) {
        let client = self.client.clone();
        let timeout = self.send_timeout;
        self.runtime.spawn(Self::post(client, node, path, command, timeout));
    }
}

/// Shared handle to a `Transport`, cheap to clone across role agents.
pub type SharedTransport = Arc<dyn Transport>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(NodeId, &'static str)>>,
    }

    impl Transport for RecordingTransport {
        fn send_to(&self, node: NodeId, path: &'static str, _command: Command) {
            self.sent.lock().unwrap().push((node, path));
        }
    }

    #[test]
    fn broadcast_default_impl_sends_to_every_node() {
        let transport = RecordingTransport::default();
        transport.broadcast(
            vec!["a".into(), "b".into(), "c".into()],
            "/acceptor/prepare",
            Command::Ok,
        );
        assert_eq!(transport.sent.lock().unwrap().len(), 3);
    }
}
