//! Integration tests for the ingestion listeners
//!
//! These tests drive real loopback sockets against both listener kinds with a
//! recording notifier standing in for the bot backend.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{BanLog, LangName, Notifier, RoomRegistry};
use relay_service_rust::{
    AntiCheatHandler, ConnectionPolicy, FrameHandler, IngestionListener, ListenerOptions,
    ListenerState, RelayError, RoomHandler,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const PROBE_REPLY: &str = "Test Form SERVER";

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }
}

/// Send one frame and collect everything the server writes back before it
/// closes the connection.
async fn send_frame(addr: SocketAddr, payload: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(payload.as_bytes()).await.expect("write frame");

    let mut reply = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut reply))
        .await
        .expect("server should close the connection")
        .expect("read reply");
    String::from_utf8(reply).expect("utf8 reply")
}

async fn start_room_listener(
    notifier: Arc<RecordingNotifier>,
) -> IngestionListener<RoomHandler> {
    let handler = RoomHandler::new(RoomRegistry::new(), notifier);
    IngestionListener::start("Room", LOOPBACK, 0, handler, ListenerOptions::default())
        .await
        .expect("room listener should bind")
}

#[tokio::test]
async fn test_room_message_is_registered_and_forwarded() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut listener = start_room_listener(notifier.clone()).await;
    let addr = listener.local_addr();

    assert_eq!(send_frame(addr, "ABCD|1.2.3.4|8|13|MyServer|PlayerOne").await, "");
    assert_eq!(send_frame(addr, "too|few|fields").await, "");
    assert_eq!(send_frame(addr, "EFGH|1.0|2|42|S|P").await, "");

    let handler = listener.stop().await.expect("stop");
    let rooms: Vec<_> = handler.registry().rooms().cloned().collect();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].code, "ABCD");
    assert_eq!(rooms[0].lang_id, LangName::SChinese);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    for line in [
        "Code:ABCD",
        "Version:1.2.3.4",
        "Count:8",
        "Lang:SChinese",
        "Server:MyServer",
        "Player:PlayerOne",
    ] {
        assert!(sent[0].lines().any(|l| l == line), "missing line {line}");
    }
}

#[tokio::test]
async fn test_probe_is_answered_without_state_change() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut room = start_room_listener(notifier.clone()).await;

    let anticheat_handler = AntiCheatHandler::new(0, None, notifier.clone());
    let mut anticheat = IngestionListener::start(
        "AntiCheat",
        LOOPBACK,
        0,
        anticheat_handler,
        ListenerOptions::default(),
    )
    .await
    .expect("anti-cheat listener should bind");

    assert_eq!(send_frame(room.local_addr(), "Test").await, PROBE_REPLY);
    assert_eq!(send_frame(anticheat.local_addr(), "Test").await, PROBE_REPLY);

    let room_handler = room.stop().await.expect("stop room");
    let anticheat_handler = anticheat.stop().await.expect("stop anti-cheat");
    assert!(room_handler.registry().is_empty());
    assert!(anticheat_handler.aggregator().is_empty());
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_repeated_reports_ban_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let ban_path = dir.path().join("EAC.txt");
    let notifier = Arc::new(RecordingNotifier::default());

    let handler = AntiCheatHandler::new(
        5,
        Some(BanLog::open(&ban_path).await.unwrap()),
        notifier.clone(),
    );
    let mut listener =
        IngestionListener::start("AntiCheat", LOOPBACK, 0, handler, ListenerOptions::default())
            .await
            .unwrap();
    let addr = listener.local_addr();

    for _ in 0..5 {
        send_frame(addr, "7|c1|hacker|aimbot").await;
    }
    assert!(notifier.sent().is_empty());

    send_frame(addr, "7|c1|hacker|aimbot").await;
    assert_eq!(notifier.sent().len(), 1);

    send_frame(addr, "7|c1|hacker|aimbot").await;
    send_frame(addr, "not-a-number|c1|hacker|aimbot").await;

    let handler = listener.stop().await.unwrap();
    let record = handler.aggregator().get("c1").expect("record for c1");
    assert_eq!(record.report_count, 7);
    assert!(record.banned);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("FriendCode:c1"));
    assert!(sent[0].contains("Count:6"));

    let ban_lines = std::fs::read_to_string(&ban_path).unwrap();
    assert_eq!(ban_lines.lines().count(), 1);
}

#[tokio::test]
async fn test_second_bind_on_same_port_fails() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut first = start_room_listener(notifier.clone()).await;
    let port = first.local_addr().port();

    let handler = RoomHandler::new(RoomRegistry::new(), notifier);
    let second =
        IngestionListener::start("Room", LOOPBACK, port, handler, ListenerOptions::default()).await;

    match second {
        Err(RelayError::Bind { addr, .. }) => assert_eq!(addr.port(), port),
        Err(other) => panic!("expected bind error, got {other}"),
        Ok(_) => panic!("second bind on port {port} should fail"),
    }

    first.stop().await.unwrap();
}

#[tokio::test]
async fn test_state_transitions_and_single_stop() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut listener = start_room_listener(notifier).await;
    assert_eq!(listener.state(), ListenerState::Listening);

    listener.stop().await.unwrap();
    assert_eq!(listener.state(), ListenerState::Stopped);
    assert!(matches!(listener.stop().await, Err(RelayError::NotRunning("Room"))));

    // Listening socket is gone
    assert!(TcpStream::connect(listener.local_addr()).await.is_err());
}

#[tokio::test]
async fn test_retained_connections_close_on_stop() {
    let notifier = Arc::new(RecordingNotifier::default());
    let handler = RoomHandler::new(RoomRegistry::new(), notifier);
    let options = ListenerOptions {
        read_timeout: Some(Duration::from_secs(5)),
        connection_policy: ConnectionPolicy::Retain,
    };
    let mut listener = IngestionListener::start("Room", LOOPBACK, 0, handler, options)
        .await
        .unwrap();

    let mut stream = TcpStream::connect(listener.local_addr()).await.unwrap();
    stream.write_all(b"Test").await.unwrap();

    let mut reply = vec![0u8; PROBE_REPLY.len()];
    stream.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, PROBE_REPLY.as_bytes());

    // Still open while the listener runs
    let mut byte = [0u8; 1];
    assert!(timeout(Duration::from_millis(200), stream.read(&mut byte)).await.is_err());

    listener.stop().await.unwrap();

    let n = timeout(Duration::from_secs(5), stream.read(&mut byte))
        .await
        .expect("connection should be closed after stop")
        .unwrap_or(0);
    assert_eq!(n, 0);
}

struct PanickingHandler;

#[async_trait]
impl FrameHandler for PanickingHandler {
    async fn handle(&mut self, text: &str) {
        panic!("handler blew up on {text}");
    }
}

#[tokio::test]
async fn test_state_is_stopped_when_worker_dies() {
    let mut listener = IngestionListener::start(
        "Room",
        LOOPBACK,
        0,
        PanickingHandler,
        ListenerOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(listener.state(), ListenerState::Listening);

    let mut stream = TcpStream::connect(listener.local_addr()).await.unwrap();
    stream.write_all(b"boom").await.unwrap();

    let mut state = listener.state();
    for _ in 0..100 {
        if state == ListenerState::Stopped {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        state = listener.state();
    }
    assert_eq!(state, ListenerState::Stopped);

    assert!(matches!(listener.stop().await, Err(RelayError::Worker(_))));
    assert_eq!(listener.state(), ListenerState::Stopped);
}
