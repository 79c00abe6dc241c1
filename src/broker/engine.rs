use std::collections::HashMap;

use crate::broker::message::Envelope;
use crate::broker::topic::{ClientId, Topic, TopicName};
use crate::client::Client;

/// The broker's connection registry and fan-out engine.
///
/// Holds the two relations the protocol needs: which subscribers belong to
/// which topic, and which topic each publisher declared. A connection is in
/// at most one of the two, and in at most one topic, for its whole lifetime.
///
/// The whole struct is meant to live behind a single `Arc<Mutex<_>>`; every
/// method runs inside that one critical section. Fan-out only pushes lines
/// into per-subscriber channels and never touches a socket, so no lock is
/// ever held across I/O.
#[derive(Debug, Default)]
pub struct Broker {
    topics: HashMap<TopicName, Topic>,
    clients: HashMap<ClientId, Client>,
    publishers: HashMap<ClientId, TopicName>,
}

impl Broker {
    /// Creates a new instance of the Broker
    /// Initializes an empty set of topics, clients and publishers
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection as a subscriber of `topic`.
    ///
    /// Creates the topic entry on first reference. The client's sender is
    /// kept so that later broadcasts can reach its writer task. Callers
    /// invoke this at most once per connection, after a successful
    /// handshake.
    pub fn register_subscriber(&mut self, topic: TopicName, client: Client) {
        let entry = self
            .topics
            .entry(topic.clone())
            .or_insert_with(|| Topic::new(topic));
        entry.subscribe(client.id.clone());
        tracing::info!(client = %client.id, topic = %entry.name, "subscriber registered");
        self.clients.insert(client.id.clone(), client);
    }

    /// Registers a connection as a publisher on `topic`.
    ///
    /// Publishers are bookkeeping only: they never appear in a subscriber
    /// set and are never fan-out targets, not even for their own topic.
    pub fn register_publisher(&mut self, id: ClientId, topic: TopicName) {
        tracing::info!(client = %id, %topic, "publisher registered");
        self.publishers.insert(id, topic);
    }

    /// Removes a connection from whichever relation it belongs to.
    ///
    /// An id that is not registered anywhere is a silent no-op, so the
    /// lifecycle can run this unconditionally on every exit path.
    pub fn unregister(&mut self, id: &ClientId) {
        if let Some(topic) = self.publishers.remove(id) {
            tracing::info!(client = %id, %topic, "publisher removed");
            return;
        }
        if self.clients.remove(id).is_some() {
            for topic in self.topics.values_mut() {
                topic.unsubscribe(id);
            }
            self.topics.retain(|_, topic| !topic.is_empty());
            tracing::info!(client = %id, "subscriber removed");
        }
    }

    /// Delivers an envelope to every current subscriber of its topic.
    ///
    /// A failed send means that subscriber's writer task is gone; those ids
    /// are collected during the pass and removed in one batch afterwards,
    /// so the set is never mutated mid-iteration and one dead peer never
    /// aborts delivery to the rest. Returns the number of deliveries that
    /// went through.
    pub fn publish(&mut self, envelope: &Envelope) -> usize {
        let Some(topic) = self.topics.get(&envelope.topic) else {
            tracing::debug!(topic = %envelope.topic, "no subscribers for topic");
            return 0;
        };

        let line = envelope.to_wire();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for id in &topic.subscribers {
            match self.clients.get(id) {
                Some(client) => {
                    if client.sender.send(line.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        dead.push(id.clone());
                    }
                }
                // a set entry without a matching client is stale
                None => dead.push(id.clone()),
            }
        }

        tracing::debug!(
            topic = %envelope.topic,
            sender = %envelope.sender,
            timestamp = envelope.timestamp,
            delivered,
            "broadcast"
        );

        for id in dead {
            tracing::warn!(client = %id, topic = %envelope.topic, "removed disconnected subscriber");
            self.unregister(&id);
        }

        delivered
    }

    /// Returns the number of subscribers currently registered for `topic`.
    pub fn subscriber_count(&self, topic: &TopicName) -> usize {
        self.topics.get(topic).map_or(0, |t| t.subscribers.len())
    }

    /// Returns the number of live (non-empty) topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Returns whether `id` holds a subscriber registration.
    pub fn has_client(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// Returns the topic `id` publishes to, if it is a registered publisher.
    pub fn publisher_topic(&self, id: &ClientId) -> Option<&TopicName> {
        self.publishers.get(id)
    }

    /// Returns the number of registered publishers.
    pub fn publisher_count(&self) -> usize {
        self.publishers.len()
    }
}
