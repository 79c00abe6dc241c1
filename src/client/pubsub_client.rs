use std::net::SocketAddr;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::broker::topic::ClientId;

/// Represents a connected subscriber in the Pub/Sub system.
///
/// Each client is uniquely identified by an `id`, remembers the peer address
/// it connected from, and has a channel (`sender`) feeding the writer task
/// that owns its half of the socket. Delivering a line means pushing it into
/// `sender`; once the writer task is gone the sends start failing and the
/// broker prunes the client.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for the client (UUID-derived connection id).
    pub id: ClientId,

    /// Address the peer connected from.
    pub addr: SocketAddr,

    /// Channel to send delivery lines to the client's writer task.
    pub sender: UnboundedSender<String>,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, sender: UnboundedSender<String>) -> Self {
        Self { id, addr, sender }
    }
}

/// Generates a connection id for a freshly accepted peer.
pub fn fresh_id() -> ClientId {
    format!("client-{}", Uuid::new_v4())
}
