use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A totally ordered proposal identifier.
///
/// Ordering is lexicographic on `(ts, server_id)`, which `derive(Ord)`
/// gives for free as long as the fields stay in this order. `Ballot::MIN`
/// sorts below any ballot a `TsGenerator` can produce.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Serialize, Deserialize)]
pub struct Ballot {
    pub ts: u64,
    pub server_id: String,
}

impl Ballot {
    /// The minimum ballot; no real ballot ever sorts below it.
    pub fn min() -> Ballot {
        Ballot { ts: 0, server_id: String::new() }
    }
}

/// Produces strictly increasing timestamps for minting new ballots.
///
/// Mirrors `core.py`'s `_next_ts`/`_record_ts`: the wall clock is the
/// primary source, but a bumped high-water mark (`max_ts`, updated
/// whenever we observe a higher `ts` on an incoming Promise/Accepted)
/// ensures our next ballot is always strictly greater than any ballot
/// we've seen, not just than our own last one.
#[derive(Default)]
pub struct TsGenerator {
    max_ts: u64,
}

impl TsGenerator {
    pub fn new() -> TsGenerator {
        TsGenerator { max_ts: 0 }
    }

    /// Bump the high-water mark after observing `ts` on an incoming message.
    pub fn record(&mut self, ts: u64) {
        if ts > self.max_ts {
            self.max_ts = ts;
        }
    }

    /// Mint a timestamp strictly greater than anything recorded so far.
    pub fn next(&mut self) -> u64 {
        let now = now_nanos();
        let ts = if now > self.max_ts { now } else { self.max_ts + 1 };
        self.max_ts = ts;
        ts
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_ts_then_server_id() {
        let a = Ballot { ts: 1, server_id: "a".into() };
        let b = Ballot { ts: 1, server_id: "b".into() };
        let c = Ballot { ts: 2, server_id: "a".into() };
        assert!(a < b);
        assert!(b < c);
        assert!(Ballot::min() < a);
    }

    #[test]
    fn generator_is_strictly_increasing() {
        let mut gen = TsGenerator::new();
        let mut last = gen.next();
        for _ in 0..100 {
            let next = gen.next();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn generator_respects_recorded_high_water_mark() {
        let mut gen = TsGenerator::new();
        gen.record(1_000_000_000_000);
        let next = gen.next();
        assert!(next > 1_000_000_000_000);
    }
}
