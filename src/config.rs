use crate::{NodeId, PaxosError};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
/// Bound on the self-discovery attempt window: failure is fatal after a
/// bounded attempt window (~20s x N peers).
const DISCOVERY_SECS_PER_PEER: u64 = 20;

/// The resolved cluster view a running node operates against: every peer's
/// URI plus which one of them is "me". Grounded on `core.py`'s `Config`
/// dataclass, minus the `Future`-based self-discovery (that lives in
/// `Bootstrap`, which produces one of these once resolved).
#[derive(Clone, Debug)]
pub struct Configuration {
    nodes: Vec<NodeId>,
    current_index: usize,
}

impl Configuration {
    pub fn new(nodes: Vec<NodeId>, current_index: usize) -> Configuration {
        assert!(current_index < nodes.len(), "current_index out of range");
        Configuration { nodes, current_index }
    }

    /// Parse a peer-list file: one `host[:port]` per line, blank lines
    /// skipped, lines without `:` get `default_port` appended. Matches
    /// `core.py`'s `Config.from_file`.
    pub fn parse_peer_file(path: &Path, default_port: u16) -> Result<Vec<NodeId>, PaxosError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| PaxosError::Config(format!("reading {}: {}", path.display(), e)))?;

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                if line.contains(':') {
                    line.to_string()
                } else {
                    format!("{}:{}", line, default_port)
                }
            })
            .collect())
    }

    pub fn default_port() -> u16 {
        DEFAULT_PORT
    }

    /// This node's own URI.
    pub fn current(&self) -> &NodeId {
        &self.nodes[self.current_index]
    }

    /// Every node in the cluster, including self — broadcasts target this
    /// set directly rather than excluding self, relying on the transport
    /// to deliver a node's own messages back to itself.
    pub fn all_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A strict majority requires more than this many responses.
    pub fn quorum_threshold(&self) -> usize {
        self.nodes.len() / 2
    }
}

/// Self-discovery: GETting `/server_id` on each configured peer until one
/// replies with `self_token`, i.e. is us. Grounded on `core.py`'s
/// `Config.set_self`/`get_self`, backed by a `Future` there; here the
/// discovery loop itself resolves the index directly rather than blocking
/// a separate accessor.
pub async fn discover_self<F, Fut>(
    nodes: Vec<NodeId>,
    self_token: &str,
    mut probe: F,
) -> Result<Configuration, PaxosError>
where
    F: FnMut(NodeId) -> Fut,
    Fut: std::future::Future<Output = Option<String>>,
{
    let deadline_per_round = Duration::from_secs(DISCOVERY_SECS_PER_PEER * nodes.len() as u64);
    let start = tokio::time::Instant::now();

    loop {
        for (i, node) in nodes.iter().enumerate() {
            if let Some(id) = probe(node.clone()).await {
                if id == self_token {
                    info!("self-discovery resolved: {} is {}", node, self_token);
                    return Ok(Configuration::new(nodes, i));
                }
            }
        }

        if start.elapsed() >= deadline_per_round {
            warn!("self-discovery failed after {:?}", start.elapsed());
            return Err(PaxosError::SelfDiscoveryFailed);
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
