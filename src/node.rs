use crate::{
    AcceptorHandle, Acceptor, Configuration, ProposerHandle, Proposer, ReplicatedState,
    SharedTransport, Value,
};

/// A fully wired cluster member: one Acceptor agent, one Proposer/Learner
/// agent, sharing a `Configuration` and `Transport`. This is the object the
/// HTTP layer holds and dispatches inbound requests to.
///
/// Grounded on `core.py`'s top-level `main()`, which constructs one
/// `Acceptor` and one `Proposer` per process and wires them to the same
/// `Config`/`Network`.
pub struct Node {
    acceptor: AcceptorHandle,
    proposer: ProposerHandle,
}

impl Node {
    pub fn spawn<S: ReplicatedState + Send + 'static>(
        config: Configuration,
        transport: SharedTransport,
        state_machine: S,
    ) -> Node {
        let current = config.current().clone();
        let broadcast_targets = config.all_nodes().to_vec();

        let acceptor =
            AcceptorHandle::spawn(Acceptor::new(), current, broadcast_targets, transport.clone());
        let proposer = ProposerHandle::spawn(Proposer::new(config, transport, state_machine));

        Node { acceptor, proposer }
    }

    pub fn acceptor(&self) -> &AcceptorHandle {
        &self.acceptor
    }

    pub fn proposer(&self) -> &ProposerHandle {
        &self.proposer
    }

    /// Convenience used by the client binary's in-process tests and by
    /// `/proposer/client-request`'s handler.
    pub async fn client_request(&self, value: Value) -> Result<Vec<i64>, crate::PaxosError> {
        self.proposer.client_request(value).await
    }

    pub async fn snapshot(&self) -> Result<Vec<i64>, crate::PaxosError> {
        self.proposer.snapshot().await
    }
}
