use crate::{Ballot, NodeId, SlotValue, Value, VotedSet};
use serde::{Deserialize, Serialize};

/// Wire messages exchanged between role agents, and between a client and a
/// Proposer. One variant per Paxos message kind; every intra-cluster
/// message carries `from_uri` for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", deny_unknown_fields)]
pub enum Command {
    /// External input to a Proposer.
    ClientRequest { value: Value },

    /// Phase 1a.
    Prepare { from_uri: NodeId, ballot: Ballot },

    /// Phase 1b.
    Promise { from_uri: NodeId, ballot: Ballot, voted: VotedSet },

    /// Phase 2a.
    Accept { from_uri: NodeId, ballot: Ballot, voted: Vec<SlotValue> },

    /// Phase 2b.
    Accepted { from_uri: NodeId, ballot: Ballot, voted: Vec<SlotValue> },

    /// Success reply to a `ClientRequest`, carrying the RSM snapshot.
    ClientReply { state: Vec<i64> },

    /// Neutral ack for intra-cluster messages whose response is meaningless.
    Ok,
}

/// Receiver of Paxos commands, broken out per variant for convenience.
///
/// `Commander`/`Receiver` split: implementers only write the per-message
/// handlers, and the blanket `Receiver` impl below does the dispatch.
pub trait Commander {
    fn client_request(&mut self, value: Value);
    fn prepare(&mut self, from_uri: NodeId, ballot: Ballot);
    fn promise(&mut self, from_uri: NodeId, ballot: Ballot, voted: VotedSet);
    fn accept(&mut self, from_uri: NodeId, ballot: Ballot, voted: Vec<SlotValue>);
    fn accepted(&mut self, from_uri: NodeId, ballot: Ballot, voted: Vec<SlotValue>);
}

/// Receiver of a raw `Command`, dispatching to a `Commander`.
pub trait Receiver {
    fn receive(&mut self, command: Command);
}

impl<T: Commander> Receiver for T {
    fn receive(&mut self, command: Command) {
        match command {
            Command::ClientRequest { value } => self.client_request(value),
            Command::Prepare { from_uri, ballot } => self.prepare(from_uri, ballot),
            Command::Promise { from_uri, ballot, voted } => self.promise(from_uri, ballot, voted),
            Command::Accept { from_uri, ballot, voted } => self.accept(from_uri, ballot, voted),
            Command::Accepted { from_uri, ballot, voted } => self.accepted(from_uri, ballot, voted),
            Command::ClientReply { .. } | Command::Ok => {
                // Replies, not inbound requests; a well-behaved transport
                // never routes these back into a role agent's inbox.
            }
        }
    }
}
