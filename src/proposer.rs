use crate::{
    max_sv, Ballot, Command, Configuration, NodeId, ReplicatedState, SharedTransport, Slot,
    SlotValue, TsGenerator, Value, VotedSet,
};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::oneshot;

const PREPARE_PATH: &str = "/acceptor/prepare";
const ACCEPT_PATH: &str = "/acceptor/accept";

/// A decided slot: the agreed value, and whether the local RSM has
/// applied it yet.
struct Decision {
    value: Value,
    applied: bool,
}

/// Proposer, also fulfilling the Learner role.
///
/// Grounded directly on `core.py`'s `Proposer` class. Ballot selection
/// (`_get_ballot`/`_next_ts`), quorum accumulation/eviction
/// (`_handle_promise`/`_handle_accepted`), and the apply sweep are direct
/// ports of `core.py`'s logic, adapted to the `Commander` dispatch idiom
/// and to a `Transport` that fires broadcasts without blocking.
pub struct Proposer<S: ReplicatedState> {
    config: Configuration,
    transport: SharedTransport,
    state_machine: S,

    ts_gen: TsGenerator,
    ballot: Option<Ballot>,

    requests_unserviced: VecDeque<Value>,
    promises: HashMap<Ballot, HashMap<NodeId, VotedSet>>,
    accepteds: HashMap<Ballot, HashMap<NodeId, Vec<SlotValue>>>,

    decisions: BTreeMap<Slot, Decision>,
    proposals: HashMap<Slot, Value>,
    next_apply_slot: Slot,

    waiting: HashMap<Value, oneshot::Sender<Vec<i64>>>,
}

impl<S: ReplicatedState> Proposer<S> {
    pub fn new(config: Configuration, transport: SharedTransport, state_machine: S) -> Proposer<S> {
        Proposer {
            config,
            transport,
            state_machine,
            ts_gen: TsGenerator::new(),
            ballot: None,
            requests_unserviced: VecDeque::new(),
            promises: HashMap::new(),
            accepteds: HashMap::new(),
            decisions: BTreeMap::new(),
            proposals: HashMap::new(),
            next_apply_slot: 1,
            waiting: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.state_machine.snapshot()
    }

    /// Mint a ballot strictly higher than any we've issued or observed.
    /// Always advances `self.ballot` — every Phase-1 attempt gets a fresh
    /// one.
    fn fresh_ballot(&mut self) -> Ballot {
        let ts = self.ts_gen.next();
        let ballot = Ballot { ts, server_id: self.config.current().clone() };
        self.ballot = Some(ballot.clone());
        ballot
    }

    fn broadcast_prepare(&mut self) {
        let ballot = self.fresh_ballot();
        let targets = self.config.all_nodes().to_vec();
        info!("broadcasting Prepare({:?})", ballot);
        self.transport.broadcast(
            targets,
            PREPARE_PATH,
            Command::Prepare { from_uri: self.config.current().clone(), ballot },
        );
    }

    /// A `ClientRequest` enqueues the value, records the waiting-reply
    /// handle, and kicks off Phase 1.
    pub fn client_request(&mut self, value: Value, reply: oneshot::Sender<Vec<i64>>) {
        self.requests_unserviced.push_front(value.clone());
        self.waiting.insert(value, reply);
        self.broadcast_prepare();
    }

    /// Accumulate Promises per ballot; on first majority, compute
    /// `maxSV`, assign slots to unserviced requests, and broadcast Accept.
    pub fn promise(&mut self, from_uri: NodeId, ballot: Ballot, voted: VotedSet) {
        self.ts_gen.record(ballot.ts);

        let bucket = self.promises.entry(ballot.clone()).or_default();
        bucket.insert(from_uri, voted);

        if bucket.len() <= self.config.quorum_threshold() {
            return; // no majority yet
        }

        let gathered = self.promises.remove(&ballot).expect("bucket just checked");
        let mut chosen = max_sv(gathered.values());

        let mut next_slot = chosen.iter().map(|sv| sv.slot).max().unwrap_or(0) + 1;
        while let Some(value) = self.requests_unserviced.pop_back() {
            chosen.push(SlotValue { slot: next_slot, value: value.clone() });
            debug!("proposing {:?} for slot {}", value, next_slot);
            self.proposals.insert(next_slot, value);
            next_slot += 1;
        }

        info!("Phase 1 quorum for {:?}, broadcasting Accept", ballot);
        let targets = self.config.all_nodes().to_vec();
        self.transport.broadcast(
            targets,
            ACCEPT_PATH,
            Command::Accept { from_uri: self.config.current().clone(), ballot, voted: chosen },
        );
    }

    /// Accumulate Accepteds per ballot; on first majority, record
    /// decisions (first value wins at a slot), then run the apply sweep.
    pub fn accepted(&mut self, from_uri: NodeId, ballot: Ballot, voted: Vec<SlotValue>) {
        self.ts_gen.record(ballot.ts);

        let bucket = self.accepteds.entry(ballot.clone()).or_default();
        bucket.insert(from_uri, voted);

        if bucket.len() <= self.config.quorum_threshold() {
            return; // no majority yet
        }

        let gathered = self.accepteds.remove(&ballot).expect("bucket just checked");
        for svs in gathered.into_values() {
            for sv in svs {
                self.decisions.entry(sv.slot).or_insert(Decision { value: sv.value, applied: false });
            }
        }

        self.apply_sweep();
    }

    /// Detect proposals preempted by a conflicting decision, re-enqueueing
    /// them, then apply contiguous decided slots in ascending order,
    /// stopping at the first gap (see DESIGN.md's Open Question decision
    /// on why a gap stalls rather than getting no-op filled).
    fn apply_sweep(&mut self) {
        let proposed_slots: Vec<Slot> = self.proposals.keys().copied().collect();
        for slot in proposed_slots {
            if let Some(decision) = self.decisions.get(&slot) {
                let proposed = self.proposals.remove(&slot).expect("slot just checked");
                if decision.value != proposed {
                    info!("slot {} preempted our proposal, re-enqueuing", slot);
                    self.requests_unserviced.push_front(proposed);
                }
            }
        }

        loop {
            match self.decisions.get_mut(&self.next_apply_slot) {
                None => break, // gap: cannot skip ahead
                Some(decision) => {
                    if !decision.applied {
                        self.state_machine.execute(self.next_apply_slot, decision.value.payload);
                        decision.applied = true;
                        if let Some(sender) = self.waiting.remove(&decision.value) {
                            let _ = sender.send(self.state_machine.snapshot());
                        }
                    }
                    self.next_apply_slot += 1;
                }
            }
        }
    }

    /// If there's outstanding unserviced work, re-issue Phase 1 with a
    /// fresh ballot. Called by the agent loop's periodic wake when the
    /// inbox goes quiet for ~1s.
    pub fn tick(&mut self) {
        if !self.requests_unserviced.is_empty() {
            warn!(
                "{} unserviced requests, re-issuing Prepare",
                self.requests_unserviced.len()
            );
            self.broadcast_prepare();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VecStateMachine;
    use std::sync::{Arc, Mutex};

    fn config(n: usize, me: usize) -> Configuration {
        let nodes = (0..n).map(|i| format!("n{}", i)).collect();
        Configuration::new(nodes, me)
    }

    fn value(payload: i64) -> Value {
        Value { client_id: 1, command_id: payload as u64, payload }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(NodeId, &'static str, Command)>>,
    }

    impl crate::Transport for RecordingTransport {
        fn send_to(&self, node: NodeId, path: &'static str, command: Command) {
            self.sent.lock().unwrap().push((node, path, command));
        }
    }

    fn new_proposer(n: usize, me: usize) -> (Proposer<VecStateMachine>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let proposer =
            Proposer::new(config(n, me), transport.clone(), VecStateMachine::default());
        (proposer, transport)
    }

    #[test]
    fn client_request_broadcasts_prepare_to_every_node_including_self() {
        let (mut proposer, transport) = new_proposer(3, 0);
        let (tx, _rx) = oneshot::channel();
        proposer.client_request(value(7), tx);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3); // all 3 nodes, self included
        for (_, path, cmd) in sent.iter() {
            assert_eq!(*path, PREPARE_PATH);
            assert!(matches!(cmd, Command::Prepare { .. }));
        }
    }

    #[test]
    fn promise_majority_triggers_accept_with_fresh_slot() {
        let (mut proposer, transport) = new_proposer(3, 0);
        let (tx, _rx) = oneshot::channel();
        proposer.client_request(value(7), tx);
        let ballot = proposer.ballot.clone().unwrap();
        transport.sent.lock().unwrap().clear();

        proposer.promise("n1".into(), ballot.clone(), VotedSet::new());
        assert!(transport.sent.lock().unwrap().is_empty()); // 1 promise, no majority of 3

        proposer.promise("n2".into(), ballot, VotedSet::new());
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3); // all 3 nodes, self included
        match &sent[0].2 {
            Command::Accept { voted, .. } => {
                assert_eq!(voted.len(), 1);
                assert_eq!(voted[0].slot, 1);
                assert_eq!(voted[0].value.payload, 7);
            }
            _ => panic!("expected Accept"),
        }
    }

    #[test]
    fn duplicate_promise_from_same_node_does_not_inflate_quorum() {
        let (mut proposer, transport) = new_proposer(3, 0);
        let (tx, _rx) = oneshot::channel();
        proposer.client_request(value(7), tx);
        let ballot = proposer.ballot.clone().unwrap();
        transport.sent.lock().unwrap().clear();

        proposer.promise("n1".into(), ballot.clone(), VotedSet::new());
        proposer.promise("n1".into(), ballot, VotedSet::new());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn accepted_majority_applies_and_resolves_waiting_client() {
        let (mut proposer, transport) = new_proposer(3, 0);
        let (tx, rx) = oneshot::channel();
        proposer.client_request(value(7), tx);
        let ballot = proposer.ballot.clone().unwrap();
        proposer.promise("n1".into(), ballot.clone(), VotedSet::new());
        proposer.promise("n2".into(), ballot.clone(), VotedSet::new());
        transport.sent.lock().unwrap().clear();

        let svs = vec![SlotValue { slot: 1, value: value(7) }];
        proposer.accepted("n1".into(), ballot.clone(), svs.clone());
        assert_eq!(proposer.snapshot(), Vec::<i64>::new()); // no majority yet

        proposer.accepted("n2".into(), ballot, svs);
        assert_eq!(proposer.snapshot(), vec![7]);
        assert_eq!(rx.try_recv().unwrap(), vec![7]);
    }

    #[test]
    fn apply_sweep_stalls_behind_a_gap() {
        let (mut proposer, _transport) = new_proposer(3, 0);
        // Decide slot 2 before slot 1 is known.
        proposer.decisions.insert(2, Decision { value: value(9), applied: false });
        proposer.apply_sweep();
        assert_eq!(proposer.snapshot(), Vec::<i64>::new());

        proposer.decisions.insert(1, Decision { value: value(5), applied: false });
        proposer.apply_sweep();
        assert_eq!(proposer.snapshot(), vec![5, 9]);
    }

    #[test]
    fn preempted_proposal_is_re_enqueued() {
        let (mut proposer, _transport) = new_proposer(3, 0);
        proposer.proposals.insert(1, value(7));
        proposer.decisions.insert(1, Decision { value: value(9), applied: false });
        proposer.apply_sweep();

        assert_eq!(proposer.requests_unserviced.len(), 1);
        assert_eq!(proposer.requests_unserviced.back().unwrap().payload, 7);
        assert_eq!(proposer.snapshot(), vec![9]);
    }
}
