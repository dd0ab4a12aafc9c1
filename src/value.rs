use crate::Ballot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Slot = u64;
pub type NodeId = String;

/// The client-supplied payload plus the `(client_id, command_id)` identity
/// used for dedup of replies and for matching proposal outcomes.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Value {
    pub client_id: u64,
    pub command_id: u64,
    pub payload: i64,
}

/// Pair `(slot, value)`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SlotValue {
    pub slot: Slot,
    pub value: Value,
}

/// Triple `(ballot, slot, value)` — an Acceptor's record of the
/// highest-ballot vote at a slot.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PValue {
    pub ballot: Ballot,
    pub slot: Slot,
    pub value: Value,
}

/// Per-Acceptor mapping slot -> highest-ballot PValue. Grows unbounded by
/// design: applied slots are never garbage-collected. `BTreeMap` keeps the
/// apply sweep's ascending-slot iteration free and serializes to a JSON
/// object keyed by stringified slot numbers.
pub type VotedSet = BTreeMap<Slot, PValue>;

/// The Paxos safety hinge: for every slot appearing in any input
/// `VotedSet`, pick the `PValue` with the maximum ballot and emit
/// `SlotValue(slot, that.value)`. Ballots are globally unique, so ties on
/// ballot cannot occur.
pub fn max_sv<'a, I>(voted_sets: I) -> Vec<SlotValue>
where
    I: IntoIterator<Item = &'a VotedSet>,
{
    let mut best: BTreeMap<Slot, &'a PValue> = BTreeMap::new();
    for voted in voted_sets {
        for (slot, pvalue) in voted {
            debug_assert_eq!(*slot, pvalue.slot);
            match best.get(slot) {
                Some(existing) if existing.ballot >= pvalue.ballot => {}
                _ => {
                    best.insert(*slot, pvalue);
                }
            }
        }
    }
    best.into_iter()
        .map(|(slot, pvalue)| SlotValue { slot, value: pvalue.value.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(payload: i64) -> Value {
        Value { client_id: 1, command_id: payload as u64, payload }
    }

    fn pv(ts: u64, server: &str, slot: Slot, payload: i64) -> PValue {
        PValue { ballot: Ballot { ts, server_id: server.into() }, slot, value: v(payload) }
    }

    #[test]
    fn max_sv_empty_input_is_empty() {
        assert_eq!(max_sv(std::iter::empty()), Vec::new());
    }

    #[test]
    fn max_sv_picks_highest_ballot_per_slot() {
        // Three acceptors cast votes on overlapping slots at different
        // ballots; the winner per slot is always the highest ballot.
        let mut a = VotedSet::new();
        a.insert(1, pv(1, "s", 1, 65)); // A
        a.insert(2, pv(4, "s", 2, 66)); // B

        let mut b = VotedSet::new();
        b.insert(1, pv(2, "s", 1, 67)); // C

        let mut c = VotedSet::new();
        c.insert(2, pv(3, "s", 2, 68)); // D

        let mut result = max_sv([&a, &b, &c]);
        result.sort_by_key(|sv| sv.slot);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].slot, 1);
        assert_eq!(result[0].value.payload, 67); // C, ballot 2 beats A's ballot 1
        assert_eq!(result[1].slot, 2);
        assert_eq!(result[1].value.payload, 66); // B, ballot 4 beats D's ballot 3
    }

    #[test]
    fn values_compare_structurally() {
        assert_eq!(v(7), v(7));
        assert_ne!(v(7), v(8));
    }
}
