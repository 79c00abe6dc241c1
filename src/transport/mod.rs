//! The `transport` module is responsible for handling network communication
//! with clients over plain TCP.
//!
//! It implements the line-oriented handshake that establishes each
//! connection's role and topic, and the server itself: the acceptor loop,
//! the per-connection lifecycle, and the forwarding of published messages
//! to subscribers.

pub mod handshake;
pub mod tcp;


#[cfg(test)]
mod tcp_tests;
