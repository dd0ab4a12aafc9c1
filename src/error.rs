use std::fmt;

/// Error taxonomy for this crate. Role agents never propagate these to
/// peers — they express disagreement only by withholding a Promise or
/// Accepted. These surface only at the transport/CLI boundary. No
/// `thiserror`/`anyhow` appears anywhere in the closest sibling crates in
/// this lineage, so this is a hand-written enum rather than a new
/// dependency.
#[derive(Debug)]
pub enum PaxosError {
    /// Self-discovery exhausted its bounded attempt window.
    SelfDiscoveryFailed,

    /// An inbound call carried a message kind a role agent doesn't
    /// accept, or the agent's inbox/reply channel was already gone — a
    /// programming error, not a protocol one.
    UnknownMessage(String),

    /// Bad CLI input or config file.
    Config(String),
}

impl fmt::Display for PaxosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaxosError::SelfDiscoveryFailed => write!(f, "self-discovery timed out"),
            PaxosError::UnknownMessage(kind) => write!(f, "unexpected message: {}", kind),
            PaxosError::Config(reason) => write!(f, "configuration error: {}", reason),
        }
    }
}

impl std::error::Error for PaxosError {}
