//! Error and outcome types for connection handling.
//!
//! Peer disconnects are deliberately not errors: a session that ends because
//! the peer went away finishes with a [`SessionOutcome`], and only protocol
//! violations and transport faults surface as [`SessionError`]. Every error
//! here is fatal to its own connection only.

use thiserror::Error;

/// Why a connection's session could not continue.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid role {0:?}, expected PUBLISHER or SUBSCRIBER")]
    InvalidRole(String),

    #[error("empty topic name")]
    EmptyTopic,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether this error is the peer's fault (handshake violation) rather
    /// than a transport fault.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::InvalidRole(_) | Self::EmptyTopic)
    }
}

/// How a session ended when it ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The peer closed the connection (empty read).
    Disconnected,
    /// A publisher sent the `terminate` control message.
    Terminated,
}
