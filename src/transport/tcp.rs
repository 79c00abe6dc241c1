use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::broker::Broker;
use crate::broker::message::Envelope;
use crate::broker::topic::{ClientId, TopicName};
use crate::client::{Client, fresh_id};
use crate::transport::handshake::{self, Role};
use crate::utils::error::{SessionError, SessionOutcome};

/// The control message that ends a publisher's session. Matched
/// case-sensitively against the trimmed publish content, after the message
/// itself has been broadcast.
pub const TERMINATE: &str = "terminate";

/// Accepts incoming connections and spawns one session task per connection.
///
/// This loop only ever blocks on `accept`; every accepted socket is handed
/// to its own task immediately. An accept error propagates to the caller:
/// without a listener there is no way to keep serving.
pub async fn run_tcp_server(addr: &str, broker: Arc<Mutex<Broker>>) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening, waiting for client connections");

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::info!(%peer, "client connected");

        let broker = broker.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, broker).await;
        });
    }
}

/// Runs one connection end-to-end: handshake, role loop, cleanup.
///
/// Deregistration is the finalizer of every session: it runs here exactly
/// once after `run_session` returns, whatever path led out of it, and is a
/// no-op for connections that never got registered. The socket halves close
/// on drop.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, broker: Arc<Mutex<Broker>>) {
    let client_id = fresh_id();

    let result = run_session(stream, peer, &client_id, &broker).await;

    broker.lock().unwrap().unregister(&client_id);

    match result {
        Ok(SessionOutcome::Disconnected) => {
            tracing::info!(%peer, client = %client_id, "peer disconnected");
        }
        Ok(SessionOutcome::Terminated) => {
            tracing::info!(%peer, client = %client_id, "publisher sent terminate");
        }
        Err(err) if err.is_protocol_violation() => {
            tracing::warn!(%peer, client = %client_id, %err, "connection rejected");
        }
        Err(err) => {
            tracing::warn!(%peer, client = %client_id, %err, "connection error");
        }
    }
    tracing::info!(%peer, client = %client_id, "connection closed");
}

async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    client_id: &ClientId,
    broker: &Arc<Mutex<Broker>>,
) -> Result<SessionOutcome, SessionError> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = write_half;

    let Some((role, topic)) = handshake::run(&mut reader, &mut writer).await? else {
        return Ok(SessionOutcome::Disconnected);
    };
    tracing::info!(%peer, client = %client_id, ?role, %topic, "handshake complete");

    match role {
        Role::Publisher => publish_loop(reader, peer, client_id, topic, broker).await,
        Role::Subscriber => subscribe_loop(reader, writer, peer, client_id, topic, broker).await,
    }
}

/// PUBLISHING state: read one line per message and fan it out.
///
/// Messages from this publisher are broadcast strictly in the order they
/// arrive here; nothing is buffered or reordered.
async fn publish_loop(
    mut reader: BufReader<OwnedReadHalf>,
    peer: SocketAddr,
    client_id: &ClientId,
    topic: TopicName,
    broker: &Arc<Mutex<Broker>>,
) -> Result<SessionOutcome, SessionError> {
    broker
        .lock()
        .unwrap()
        .register_publisher(client_id.clone(), topic.clone());

    loop {
        let Some(line) = handshake::read_line(&mut reader).await? else {
            return Ok(SessionOutcome::Disconnected);
        };
        let message = line.trim().to_string();
        tracing::info!(%peer, %topic, %message, "publish");

        let envelope = Envelope::new(topic.clone(), peer, message.clone());
        broker.lock().unwrap().publish(&envelope);

        if message == TERMINATE {
            return Ok(SessionOutcome::Terminated);
        }
    }
}

/// SUBSCRIBED state: register, confirm, then block on reads as a liveness
/// signal only.
///
/// Deliveries flow broker → channel → forwarder task → socket, so a slow or
/// dead subscriber never stalls a broadcast. Subscribers send no further
/// application data; whatever arrives on the read half is ignored.
async fn subscribe_loop(
    mut reader: BufReader<OwnedReadHalf>,
    mut writer: OwnedWriteHalf,
    peer: SocketAddr,
    client_id: &ClientId,
    topic: TopicName,
    broker: &Arc<Mutex<Broker>>,
) -> Result<SessionOutcome, SessionError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    broker
        .lock()
        .unwrap()
        .register_subscriber(topic.clone(), Client::new(client_id.clone(), peer, tx));

    // Deliveries queue in the channel until the forwarder below starts, so
    // the confirmation is always the first line the subscriber sees even
    // though registration has already happened.
    writer
        .write_all(handshake::confirmation(&topic).as_bytes())
        .await?;

    // Forward deliveries from the broker to the peer. The task ends when the
    // registry entry (and with it the sender) is dropped, or when a write
    // fails; after a failed write the broker's next publish prunes us.
    tokio::spawn(async move {
        while let Some(delivery) = rx.recv().await {
            if let Err(err) = writer.write_all(delivery.as_bytes()).await {
                tracing::warn!(%peer, %err, "failed to send to subscriber");
                break;
            }
        }
        tracing::debug!(%peer, "send loop closed");
    });

    loop {
        if handshake::read_line(&mut reader).await?.is_none() {
            return Ok(SessionOutcome::Disconnected);
        }
    }
}
