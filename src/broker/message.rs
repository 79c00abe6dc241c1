use std::net::SocketAddr;

use crate::broker::topic::TopicName;

/// Represents a published message travelling through the broker.
///
/// An envelope carries the topic it was published to, the publisher's peer
/// address, the payload text and a timestamp taken when the server read the
/// message off the wire.
///
/// The timestamp is for logging only; the wire representation produced by
/// [`Envelope::to_wire`] carries topic, sender address and payload.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: TopicName,
    pub sender: SocketAddr,
    pub payload: String,
    pub timestamp: i64,
}

impl Envelope {
    pub fn new(topic: TopicName, sender: SocketAddr, payload: impl Into<String>) -> Self {
        Self {
            topic,
            sender,
            payload: payload.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Formats the envelope as a single delivery line.
    ///
    /// The trailing space before the newline is part of the protocol's
    /// historical format and is kept for client compatibility.
    pub fn to_wire(&self) -> String {
        format!("[{} | FROM {}] : {} \n", self.topic, self.sender, self.payload)
    }
}
