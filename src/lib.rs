//! A Multi-Paxos replicated state machine: Acceptor and Proposer/Learner
//! role agents talking JSON-over-HTTP, replicating a sequence of `i64`
//! values in slot order across a fixed cluster.

mod acceptor;
mod agent;
mod ballot;
mod config;
mod error;
mod http;
mod messages;
mod node;
mod proposer;
mod statemachine;
mod transport;
mod value;

pub use acceptor::{Acceptor, AcceptOutcome, PrepareOutcome};
pub use agent::{AcceptorHandle, ProposerHandle};
pub use ballot::{Ballot, TsGenerator};
pub use config::{discover_self, Configuration};
pub use error::PaxosError;
pub use http::Handler;
pub use messages::{Command, Commander, Receiver};
pub use node::Node;
pub use proposer::Proposer;
pub use statemachine::{ReplicatedState, VecStateMachine};
pub use transport::{HttpTransport, SharedTransport, Transport};
pub use value::{max_sv, NodeId, PValue, Slot, SlotValue, Value, VotedSet};
