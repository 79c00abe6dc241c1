use std::collections::HashSet;
use std::fmt;

pub type ClientId = String;

/// A case-normalized topic identifier.
///
/// Topics are matched by exact equality only, so every name goes through one
/// normal form: surrounding whitespace is trimmed and the remainder is
/// uppercased. A name that is empty after trimming is not a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicName(String);

impl TopicName {
    /// Normalizes `raw` and returns the topic name, or `None` if nothing is
    /// left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a topic in the broker system
/// Contains a name and the set of subscriber ids currently registered to it
/// Topics are created implicitly the first time a connection references them
/// and dropped again once their subscriber set runs empty
#[derive(Debug)]
pub struct Topic {
    pub name: TopicName,
    pub subscribers: HashSet<ClientId>,
}

impl Topic {
    /// Creates a new instance of the Topic with the given name
    /// Initializes an empty set of subscribers
    pub fn new(name: TopicName) -> Self {
        Self {
            name,
            subscribers: HashSet::new(),
        }
    }

    /// Subscribes a new subscriber to the topic
    /// If the subscriber is already subscribed, it has no effect
    pub fn subscribe(&mut self, id: ClientId) {
        self.subscribers.insert(id);
    }

    /// Unsubscribes a subscriber from the topic
    /// If the subscriber is not subscribed, it has no effect
    pub fn unsubscribe(&mut self, id: &ClientId) {
        self.subscribers.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
