use crate::{Ballot, PValue, SlotValue, VotedSet};

/// Per-node vote storage. Answers Prepare with Promise, Accept with
/// Accepted, enforcing ballot monotonicity.
///
/// Grounded on `fangying-paxos-rs/src/replica.rs`'s `prepare`/`accept`
/// handling, generalized from per-slot acceptors (that crate's
/// `SlotWindow`) to one acceptor tracking every slot it has ever voted on;
/// `voted` is never garbage-collected.
pub struct Acceptor {
    highest_ballot: Ballot,
    voted: VotedSet,
}

/// What happened to a Prepare: either a stale ballot was silently dropped,
/// or the ballot was high enough and a Promise should be broadcast.
pub enum PrepareOutcome {
    Stale,
    Promise { ballot: Ballot, voted: VotedSet },
}

/// What happened to an Accept: either a stale ballot was silently dropped,
/// or the ballot was high enough and an Accepted should be broadcast.
pub enum AcceptOutcome {
    Stale,
    Accepted { ballot: Ballot, voted: Vec<SlotValue> },
}

impl Default for Acceptor {
    fn default() -> Acceptor {
        Acceptor { highest_ballot: Ballot::min(), voted: VotedSet::new() }
    }
}

impl Acceptor {
    pub fn new() -> Acceptor {
        Acceptor::default()
    }

    pub fn highest_ballot(&self) -> &Ballot {
        &self.highest_ballot
    }

    pub fn voted(&self) -> &VotedSet {
        &self.voted
    }

    /// Phase 1b. Strict `>`: a Prepare at the currently-promised ballot is
    /// stale, same as a lower one.
    pub fn receive_prepare(&mut self, ballot: Ballot) -> PrepareOutcome {
        if ballot <= self.highest_ballot {
            return PrepareOutcome::Stale;
        }
        self.highest_ballot = ballot.clone();
        PrepareOutcome::Promise { ballot, voted: self.voted.clone() }
    }

    /// Phase 2b. Non-strict `>=`: an Accept at the currently-promised
    /// ballot is honored, unlike a Prepare at that same ballot.
    pub fn receive_accept(&mut self, ballot: Ballot, voted: Vec<SlotValue>) -> AcceptOutcome {
        if ballot < self.highest_ballot {
            return AcceptOutcome::Stale;
        }
        self.highest_ballot = ballot.clone();
        for sv in &voted {
            self.voted.insert(
                sv.slot,
                PValue { ballot: ballot.clone(), slot: sv.slot, value: sv.value.clone() },
            );
        }
        AcceptOutcome::Accepted { ballot, voted }
    }
}
