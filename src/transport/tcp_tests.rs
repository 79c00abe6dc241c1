use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{sleep, timeout};

use crate::broker::Broker;
use crate::broker::topic::TopicName;
use crate::transport::tcp::run_tcp_server;

fn topic(name: &str) -> TopicName {
    TopicName::parse(name).unwrap()
}

async fn setup_server() -> (String, Arc<Mutex<Broker>>) {
    let addr = format!(
        "127.0.0.1:{}",
        portpicker::pick_unused_port().expect("No free ports")
    );
    let broker = Arc::new(Mutex::new(Broker::new()));

    let server_addr = addr.clone();
    let server_broker = broker.clone();
    tokio::spawn(async move {
        let _ = run_tcp_server(&server_addr, server_broker).await;
    });

    // Give the server a moment to start up
    sleep(Duration::from_millis(100)).await;
    (addr, broker)
}

/// Connects a subscriber and waits for the confirmation line, so the caller
/// knows the registration is visible in the broker before publishing.
async fn connect_subscriber(addr: &str, topic: &str) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
    let stream = TcpStream::connect(addr).await.expect("Failed to connect");
    let (read, mut write) = stream.into_split();
    write
        .write_all(format!("SUBSCRIBER\n{topic}\n").as_bytes())
        .await
        .unwrap();

    let mut reader = BufReader::new(read);
    timeout(Duration::from_secs(5), async {
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await.expect("read");
            assert!(n > 0, "server closed before confirming subscription");
            if line.contains("Subscribed to") {
                return;
            }
        }
    })
    .await
    .expect("timed out waiting for subscription confirmation");

    (reader, write)
}

async fn connect_publisher(addr: &str, topic: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
    stream
        .write_all(format!("PUBLISHER\n{topic}\n").as_bytes())
        .await
        .unwrap();
    stream
}

/// Reads lines until a delivery envelope (a line starting with `[`) arrives;
/// prompt text never starts with a bracket.
async fn read_envelope(reader: &mut BufReader<OwnedReadHalf>) -> String {
    timeout(Duration::from_secs(5), async {
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await.expect("read");
            assert!(n > 0, "connection closed before envelope arrived");
            if line.starts_with('[') {
                return line;
            }
        }
    })
    .await
    .expect("timed out waiting for envelope")
}

#[tokio::test]
async fn test_subscriber_receives_published_message() {
    let (addr, _broker) = setup_server().await;

    let (mut sub_reader, _sub_write) = connect_subscriber(&addr, "news").await;

    let mut publisher = connect_publisher(&addr, "news").await;
    let publisher_addr = publisher.local_addr().unwrap();
    publisher.write_all(b"hello\n").await.unwrap();

    let envelope = read_envelope(&mut sub_reader).await;
    assert_eq!(envelope, format!("[NEWS | FROM {publisher_addr}] : hello \n"));
}

#[tokio::test]
async fn test_terminate_broadcasts_then_closes_publisher() {
    let (addr, broker) = setup_server().await;

    let (mut sub_reader, _sub_write) = connect_subscriber(&addr, "news").await;
    let mut publisher = connect_publisher(&addr, "news").await;

    publisher.write_all(b"hello\n").await.unwrap();
    read_envelope(&mut sub_reader).await;
    assert_eq!(broker.lock().unwrap().publisher_count(), 1);

    publisher.write_all(b"terminate\n").await.unwrap();
    let envelope = read_envelope(&mut sub_reader).await;
    assert!(envelope.contains(": terminate "));

    // The publisher's session ends and its registration is cleaned up; the
    // subscriber stays.
    sleep(Duration::from_millis(200)).await;
    let guard = broker.lock().unwrap();
    assert_eq!(guard.publisher_count(), 0);
    assert_eq!(guard.subscriber_count(&topic("news")), 1);
}

#[tokio::test]
async fn test_invalid_role_is_rejected_without_registration() {
    let (addr, broker) = setup_server().await;

    let mut stream = TcpStream::connect(&addr).await.expect("Failed to connect");
    stream.write_all(b"ADMIN\n").await.unwrap();

    let mut transcript = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut transcript))
        .await
        .expect("timed out waiting for rejection")
        .expect("read");
    assert!(transcript.contains("Invalid role! Disconnecting."));

    let guard = broker.lock().unwrap();
    assert_eq!(guard.topic_count(), 0);
    assert_eq!(guard.publisher_count(), 0);
}

#[tokio::test]
async fn test_empty_topic_is_rejected_like_invalid_role() {
    let (addr, broker) = setup_server().await;

    let mut stream = TcpStream::connect(&addr).await.expect("Failed to connect");
    stream.write_all(b"PUBLISHER\n   \n").await.unwrap();

    let mut transcript = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut transcript))
        .await
        .expect("timed out waiting for rejection")
        .expect("read");
    assert!(transcript.contains("Invalid topic! Disconnecting."));

    let guard = broker.lock().unwrap();
    assert_eq!(guard.topic_count(), 0);
    assert_eq!(guard.publisher_count(), 0);
}

#[tokio::test]
async fn test_topics_are_isolated() {
    let (addr, _broker) = setup_server().await;

    let (mut sub_a, _keep_a) = connect_subscriber(&addr, "alpha").await;
    let (mut sub_b, _keep_b) = connect_subscriber(&addr, "beta").await;

    let mut pub_a = connect_publisher(&addr, "alpha").await;
    let mut pub_b = connect_publisher(&addr, "beta").await;

    pub_a.write_all(b"for alpha\n").await.unwrap();
    pub_b.write_all(b"for beta\n").await.unwrap();

    let envelope_a = read_envelope(&mut sub_a).await;
    assert!(envelope_a.starts_with("[ALPHA | "));
    assert!(envelope_a.contains("for alpha"));

    let envelope_b = read_envelope(&mut sub_b).await;
    assert!(envelope_b.starts_with("[BETA | "));
    assert!(envelope_b.contains("for beta"));

    // Nothing else may arrive on either side.
    let mut line = String::new();
    let crossed = timeout(Duration::from_millis(200), sub_a.read_line(&mut line)).await;
    assert!(crossed.is_err(), "subscriber of ALPHA saw another topic's message");
}

#[tokio::test]
async fn test_subscriber_disconnect_is_cleaned_up() {
    let (addr, broker) = setup_server().await;

    let (sub_reader, sub_write) = connect_subscriber(&addr, "news").await;
    assert_eq!(broker.lock().unwrap().subscriber_count(&topic("news")), 1);

    drop(sub_reader);
    drop(sub_write);

    sleep(Duration::from_millis(200)).await;
    let guard = broker.lock().unwrap();
    assert_eq!(guard.subscriber_count(&topic("news")), 0);
    assert_eq!(guard.topic_count(), 0);
}

#[tokio::test]
async fn test_disconnect_mid_handshake_leaves_server_healthy() {
    let (addr, broker) = setup_server().await;

    let stream = TcpStream::connect(&addr).await.expect("Failed to connect");
    drop(stream);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(broker.lock().unwrap().topic_count(), 0);

    // The acceptor keeps serving afterwards.
    let (_reader, _write) = connect_subscriber(&addr, "news").await;
    assert_eq!(broker.lock().unwrap().subscriber_count(&topic("news")), 1);
}
