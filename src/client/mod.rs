//! The `client` module defines the server-side representation of a peer.
//!
//! It provides the `Client` struct, which encapsulates the state of a single
//! connected subscriber: its unique identifier, peer address, and the channel
//! for sending delivery lines to it.

pub mod pubsub_client;
pub use pubsub_client::{Client, fresh_id};
