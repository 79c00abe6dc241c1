use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::broker::topic::TopicName;
use crate::utils::error::SessionError;

pub const ROLE_PROMPT: &str = "Enter your role (PUBLISHER/SUBSCRIBER) : ";
pub const PUBLISH_TOPIC_PROMPT: &str = "Enter topic to publish to (ex: topic1): ";
pub const SUBSCRIBE_TOPIC_PROMPT: &str = "Enter topic to subscribe to : ";
pub const INVALID_ROLE_REPLY: &str = "Invalid role! Disconnecting.\n";
pub const INVALID_TOPIC_REPLY: &str = "Invalid topic! Disconnecting.\n";

/// The role a connection declares during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Publisher,
    Subscriber,
}

impl Role {
    /// Parses a role token, case-insensitively, ignoring surrounding
    /// whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "PUBLISHER" => Some(Self::Publisher),
            "SUBSCRIBER" => Some(Self::Subscriber),
            _ => None,
        }
    }

    fn topic_prompt(&self) -> &'static str {
        match self {
            Self::Publisher => PUBLISH_TOPIC_PROMPT,
            Self::Subscriber => SUBSCRIBE_TOPIC_PROMPT,
        }
    }
}

/// The confirmation line sent to a subscriber once it is registered.
pub fn confirmation(topic: &TopicName) -> String {
    format!("Subscribed to '{topic}' Waiting for messages...\n")
}

/// Runs the role/topic negotiation on a freshly accepted connection.
///
/// Returns the established `(role, topic)` pair, or `None` if the peer
/// closed the connection mid-handshake (a clean abort, not an error).
/// Invalid input gets a rejection line before the error is returned; both
/// rejection cases are fatal to this connection only.
pub async fn run<R, W>(
    reader: &mut R,
    writer: &mut W,
) -> Result<Option<(Role, TopicName)>, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(ROLE_PROMPT.as_bytes()).await?;

    let Some(raw_role) = read_line(reader).await? else {
        return Ok(None);
    };
    let Some(role) = Role::parse(&raw_role) else {
        writer.write_all(INVALID_ROLE_REPLY.as_bytes()).await?;
        return Err(SessionError::InvalidRole(raw_role.trim().to_string()));
    };

    writer.write_all(role.topic_prompt().as_bytes()).await?;

    let Some(raw_topic) = read_line(reader).await? else {
        return Ok(None);
    };
    let Some(topic) = TopicName::parse(&raw_topic) else {
        writer.write_all(INVALID_TOPIC_REPLY.as_bytes()).await?;
        return Err(SessionError::EmptyTopic);
    };

    Ok(Some((role, topic)))
}

/// Reads one `\n`-terminated line, buffering partial reads, so one call
/// yields exactly one logical message. `None` means the peer closed.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 { Ok(None) } else { Ok(Some(line)) }
}
