use crate::{
    Acceptor, AcceptOutcome, Ballot, Command, NodeId, PrepareOutcome, Proposer, ReplicatedState,
    SharedTransport, SlotValue, Value, VotedSet,
};
use log::info;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// How long the Proposer's inbox may sit empty before re-issuing Prepare
/// for any still-unserviced request.
const WAKE_INTERVAL: Duration = Duration::from_secs(1);

const PROMISE_PATH: &str = "/proposer/promise";
const ACCEPTED_PATH: &str = "/proposer/accepted";

/// Each role agent owns exactly one serial event-loop task; this is the
/// inbox message shape plus the one-shot ack/reply that the HTTP layer
/// awaits. Grounded on `core.py`'s `Agent` class (a `queue.Queue` feeding
/// a single worker, `Future` per entry for the reply) translated onto
/// `tokio`'s `mpsc`/`oneshot`.
enum ProposerInbox {
    ClientRequest { value: Value, reply: oneshot::Sender<Vec<i64>> },
    Promise { from_uri: NodeId, ballot: Ballot, voted: VotedSet, ack: oneshot::Sender<()> },
    Accepted { from_uri: NodeId, ballot: Ballot, voted: Vec<SlotValue>, ack: oneshot::Sender<()> },
    Snapshot { reply: oneshot::Sender<Vec<i64>> },
}

/// Handle used by the transport layer to enqueue work onto a running
/// Proposer's event loop and await its ack/reply.
#[derive(Clone)]
pub struct ProposerHandle {
    tx: mpsc::UnboundedSender<ProposerInbox>,
}

impl ProposerHandle {
    /// Spawn the Proposer's event loop on the current runtime and return a
    /// handle to it. The loop never blocks on I/O: the only suspension
    /// point besides the inbox recv is the bounded wake timer.
    pub fn spawn<S: ReplicatedState + Send + 'static>(mut proposer: Proposer<S>) -> ProposerHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProposerInbox>();

        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(WAKE_INTERVAL, rx.recv()).await {
                    Ok(Some(ProposerInbox::ClientRequest { value, reply })) => {
                        proposer.client_request(value, reply);
                    }
                    Ok(Some(ProposerInbox::Promise { from_uri, ballot, voted, ack })) => {
                        proposer.promise(from_uri, ballot, voted);
                        let _ = ack.send(());
                    }
                    Ok(Some(ProposerInbox::Accepted { from_uri, ballot, voted, ack })) => {
                        proposer.accepted(from_uri, ballot, voted);
                        let _ = ack.send(());
                    }
                    Ok(Some(ProposerInbox::Snapshot { reply })) => {
                        let _ = reply.send(proposer.snapshot());
                    }
                    Ok(None) => {
                        info!("proposer inbox closed, stopping event loop");
                        break;
                    }
                    Err(_timeout) => {
                        proposer.tick();
                    }
                }
            }
        });

        ProposerHandle { tx }
    }

    /// Enqueue a client's value; resolves once that value is applied to
    /// the RSM somewhere in the cluster.
    pub async fn client_request(&self, value: Value) -> Result<Vec<i64>, crate::PaxosError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ProposerInbox::ClientRequest { value, reply })
            .map_err(|_| crate::PaxosError::UnknownMessage("proposer inbox closed".into()))?;
        rx.await.map_err(|_| crate::PaxosError::UnknownMessage("proposer dropped reply".into()))
    }

    pub async fn promise(
        &self,
        from_uri: NodeId,
        ballot: Ballot,
        voted: VotedSet,
    ) -> Result<(), crate::PaxosError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(ProposerInbox::Promise { from_uri, ballot, voted, ack })
            .map_err(|_| crate::PaxosError::UnknownMessage("proposer inbox closed".into()))?;
        rx.await.map_err(|_| crate::PaxosError::UnknownMessage("proposer dropped ack".into()))
    }

    pub async fn accepted(
        &self,
        from_uri: NodeId,
        ballot: Ballot,
        voted: Vec<SlotValue>,
    ) -> Result<(), crate::PaxosError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(ProposerInbox::Accepted { from_uri, ballot, voted, ack })
            .map_err(|_| crate::PaxosError::UnknownMessage("proposer inbox closed".into()))?;
        rx.await.map_err(|_| crate::PaxosError::UnknownMessage("proposer dropped ack".into()))
    }

    /// Read the RSM's current state without submitting a new value.
    pub async fn snapshot(&self) -> Result<Vec<i64>, crate::PaxosError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ProposerInbox::Snapshot { reply })
            .map_err(|_| crate::PaxosError::UnknownMessage("proposer inbox closed".into()))?;
        rx.await.map_err(|_| crate::PaxosError::UnknownMessage("proposer dropped reply".into()))
    }
}

enum AcceptorInbox {
    Prepare { ballot: Ballot, ack: oneshot::Sender<()> },
    Accept { ballot: Ballot, voted: Vec<SlotValue>, ack: oneshot::Sender<()> },
}

/// Handle to a running Acceptor's event loop. Unlike the Proposer, the
/// Acceptor has no periodic wake: no internal retries, no timeouts.
#[derive(Clone)]
pub struct AcceptorHandle {
    tx: mpsc::UnboundedSender<AcceptorInbox>,
}

impl AcceptorHandle {
    pub fn spawn(
        mut acceptor: Acceptor,
        current: NodeId,
        broadcast_targets: Vec<NodeId>,
        transport: SharedTransport,
    ) -> AcceptorHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<AcceptorInbox>();

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                match entry {
                    AcceptorInbox::Prepare { ballot, ack } => {
                        if let PrepareOutcome::Promise { ballot, voted } =
                            acceptor.receive_prepare(ballot)
                        {
                            transport.broadcast(
                                broadcast_targets.clone(),
                                PROMISE_PATH,
                                Command::Promise { from_uri: current.clone(), ballot, voted },
                            );
                        }
                        let _ = ack.send(());
                    }
                    AcceptorInbox::Accept { ballot, voted, ack } => {
                        if let AcceptOutcome::Accepted { ballot, voted } =
                            acceptor.receive_accept(ballot, voted)
                        {
                            transport.broadcast(
                                broadcast_targets.clone(),
                                ACCEPTED_PATH,
                                Command::Accepted { from_uri: current.clone(), ballot, voted },
                            );
                        }
                        let _ = ack.send(());
                    }
                }
            }
            info!("acceptor inbox closed, stopping event loop");
        });

        AcceptorHandle { tx }
    }

    pub async fn prepare(&self, ballot: Ballot) -> Result<(), crate::PaxosError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(AcceptorInbox::Prepare { ballot, ack })
            .map_err(|_| crate::PaxosError::UnknownMessage("acceptor inbox closed".into()))?;
        rx.await.map_err(|_| crate::PaxosError::UnknownMessage("acceptor dropped ack".into()))
    }

    pub async fn accept(&self, ballot: Ballot, voted: Vec<SlotValue>) -> Result<(), crate::PaxosError> {
        let (ack, rx) = oneshot::channel();
        self.tx
            .send(AcceptorInbox::Accept { ballot, voted, ack })
            .map_err(|_| crate::PaxosError::UnknownMessage("acceptor inbox closed".into()))?;
        rx.await.map_err(|_| crate::PaxosError::UnknownMessage("acceptor dropped ack".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Configuration, Transport, VecStateMachine};
    use std::sync::Arc;

    struct NullTransport;
    impl Transport for NullTransport {
        fn send_to(&self, _node: NodeId, _path: &'static str, _command: Command) {}
    }

    #[tokio::test]
    async fn acceptor_handle_acks_prepare() {
        let transport: SharedTransport = Arc::new(NullTransport);
        let handle = AcceptorHandle::spawn(
            Acceptor::new(),
            "n0".into(),
            vec!["n1".into(), "n2".into()],
            transport,
        );
        let ballot = Ballot { ts: 1, server_id: "n1".into() };
        handle.prepare(ballot).await.unwrap();
    }

    #[tokio::test]
    async fn proposer_handle_resolves_client_request_after_single_node_quorum() {
        let transport: SharedTransport = Arc::new(NullTransport);
        let config = Configuration::new(vec!["n0".into()], 0);
        let proposer = Proposer::new(config, transport, VecStateMachine::default());
        let handle = ProposerHandle::spawn(proposer);

        // With N=1 a single node is its own majority: a real transport
        // would broadcast Promise/Accepted back to this same node. Here
        // we feed them in directly to check the handle plumbing without
        // standing up a self-looping transport.
        let ballot = Ballot { ts: 1, server_id: "n0".into() };
        let value = Value { client_id: 1, command_id: 1, payload: 42 };
        let fut = handle.client_request(value.clone());
        // Feed back a Promise/Accepted as if from the lone Acceptor.
        handle.promise("n0".into(), ballot.clone(), VotedSet::new()).await.unwrap();
        handle
            .accepted("n0".into(), ballot, vec![SlotValue { slot: 1, value }])
            .await
            .unwrap();
        let state = fut.await.unwrap();
        assert_eq!(state, vec![42]);
    }
}
