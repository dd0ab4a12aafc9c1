use crate::Slot;

/// A state machine that executes sequentially applied commands.
///
/// Narrowed from a `ReplicatedState` trait handling opaque `Bytes` commands
/// down to `i64` payloads. Values are applied in increasing slot order with
/// no gaps — the Proposer, not a separate `Replica` wrapper, owns
/// enforcing that order via its apply sweep.
pub trait ReplicatedState {
    /// Apply a value to the state machine at `slot`.
    fn execute(&mut self, slot: Slot, payload: i64);

    /// Current state, in slot order.
    fn snapshot(&self) -> Vec<i64>;
}

/// The replicated log: an append-only sequence of integers.
#[derive(Default, Clone, Debug)]
pub struct VecStateMachine {
    state: Vec<i64>,
}

impl ReplicatedState for VecStateMachine {
    fn execute(&mut self, _slot: Slot, payload: i64) {
        self.state.push(payload);
    }

    fn snapshot(&self) -> Vec<i64> {
        self.state.clone()
    }
}
