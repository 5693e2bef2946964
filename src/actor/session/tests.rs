//! Session tests over real loopback sockets.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::*;
use crate::actor::messages::ArtifactBatch;
use crate::reload::message::MAX_INBOUND_MESSAGE;
use crate::store::Content;

const GENEROUS: SessionConfig = SessionConfig {
    pong_timeout: Duration::from_secs(10),
    write_timeout: Duration::from_secs(10),
};

/// 2000-01-01T12:00:00Z
fn t1() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(946_728_000)
}

fn batch(name: &str, data: &str) -> ArtifactBatch {
    let mut batch = ArtifactBatch::new();
    batch.put(name, Content::new(data));
    batch
}

struct Harness {
    coordinator: Arc<Coordinator>,
    client: WebSocket<TcpStream>,
    server: JoinHandle<Result<()>>,
}

impl Harness {
    fn start(coordinator: Arc<Coordinator>, config: SessionConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                let (stream, _) = listener.accept()?;
                Session::accept(stream, coordinator, config)?.run()
            })
        };

        let client = connect(addr);
        wait_until(|| coordinator.sessions() == 1);
        Self {
            coordinator,
            client,
            server,
        }
    }

    /// Next data frame, answering pings along the way.
    fn next_text(&mut self) -> String {
        loop {
            match self.client.read().unwrap() {
                Message::Text(text) => return text.as_str().to_owned(),
                Message::Ping(_) => self.client.flush().unwrap(),
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Wait for the server side to finish and the session to be released.
    fn join(self) {
        self.server.join().unwrap().unwrap();
        assert_eq!(self.coordinator.sessions(), 0);
    }
}

fn connect(addr: SocketAddr) -> WebSocket<TcpStream> {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let (client, _) = tungstenite::client(format!("ws://{addr}/"), stream).unwrap();
    client
}

fn wait_until(condition: impl Fn() -> bool) {
    let start = Instant::now();
    while !condition() {
        assert!(start.elapsed() < Duration::from_secs(5), "condition not met in time");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_new_session_receives_full_manifest() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    coordinator.ingest_at(batch("/game.js", "main()"), t1()).unwrap();

    let mut harness = Harness::start(coordinator, GENEROUS);
    assert_eq!(
        harness.next_text(),
        r#"{"/game.js":"2000-01-01T12:00:00.000000"}"#
    );

    harness.client.close(None).unwrap();
    harness.join();
}

#[test]
fn test_changes_are_pushed_as_deltas() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    coordinator.ingest_at(batch("/game.js", "main()"), t1()).unwrap();
    coordinator
        .ingest_at(batch("/shader/sky.glsl", "void main(){}"), t1())
        .unwrap();

    let mut harness = Harness::start(coordinator, GENEROUS);
    let first = harness.next_text();
    assert!(first.contains("/game.js") && first.contains("/shader/sky.glsl"));

    let later = t1() + Duration::from_secs(1);
    let mut removal = ArtifactBatch::new();
    removal.remove("/shader/sky.glsl");
    harness.coordinator.ingest_at(removal, later).unwrap();
    assert_eq!(harness.next_text(), r#"{"/shader/sky.glsl":null}"#);

    // Identical content is not an update
    harness
        .coordinator
        .ingest_at(batch("/game.js", "main()"), later)
        .unwrap();
    harness
        .coordinator
        .ingest_at(batch("/game.js", "main(2)"), later)
        .unwrap();
    let text = harness.next_text();
    assert!(text.starts_with(r#"{"/game.js":"2000-01-01T12:00:01"#), "{text}");

    harness.client.close(None).unwrap();
    harness.join();
}

#[test]
fn test_heartbeat_sends_ping_and_pong_keeps_session_alive() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let config = SessionConfig {
        pong_timeout: Duration::from_millis(300),
        write_timeout: Duration::from_secs(5),
    };
    let mut harness = Harness::start(coordinator, config);

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(900) {
        harness.coordinator.heartbeat();
        match harness.client.read().unwrap() {
            Message::Ping(_) => harness.client.flush().unwrap(),
            other => panic!("expected ping, got {other:?}"),
        }
        thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(harness.coordinator.sessions(), 1);

    harness.client.close(None).unwrap();
    harness.join();
}

#[test]
fn test_silent_client_times_out() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let config = SessionConfig {
        pong_timeout: Duration::from_millis(150),
        write_timeout: Duration::from_secs(5),
    };
    let harness = Harness::start(coordinator, config);

    // No heartbeats are answered, the read deadline expires
    let started = Instant::now();
    let Harness {
        coordinator,
        client,
        server,
    } = harness;
    server.join().unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(coordinator.sessions(), 0);
    drop(client);
}

#[test]
fn test_blocked_writer_hits_write_timeout() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let config = SessionConfig {
        pong_timeout: Duration::from_secs(30),
        write_timeout: Duration::from_millis(200),
    };
    let harness = Harness::start(coordinator, config);
    let Harness {
        coordinator,
        client,
        server,
    } = harness;

    // The client never reads, so the socket buffers fill up and a write stalls
    let padding = "x".repeat(200);
    let started = Instant::now();
    let mut round = 0;
    while coordinator.sessions() > 0 {
        assert!(
            started.elapsed() < Duration::from_secs(15),
            "session outlived the write timeout"
        );
        let mut batch = ArtifactBatch::new();
        for i in 0..200 {
            batch.put(format!("/{padding}/{i}.js"), Content::new(round.to_string()));
        }
        coordinator.ingest(batch).unwrap();
        round += 1;
        thread::sleep(Duration::from_millis(5));
    }

    server.join().unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(15));
    drop(client);
}

#[test]
fn test_oversized_text_closes_session() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let mut harness = Harness::start(coordinator, GENEROUS);

    harness
        .client
        .send(Message::text("x".repeat(MAX_INBOUND_MESSAGE + 1)))
        .unwrap();
    harness.join();
}

#[test]
fn test_oversized_binary_closes_session() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let mut harness = Harness::start(coordinator, GENEROUS);

    harness
        .client
        .send(Message::binary(vec![0u8; MAX_INBOUND_MESSAGE + 1]))
        .unwrap();
    harness.join();
}

#[test]
fn test_small_binary_is_ignored() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let mut harness = Harness::start(coordinator, GENEROUS);

    harness.client.send(Message::binary(vec![1u8; 16])).unwrap();
    harness.coordinator.ingest_at(batch("/a.js", "a"), t1()).unwrap();
    assert!(harness.next_text().contains("/a.js"));
    assert_eq!(harness.coordinator.sessions(), 1);

    harness.client.close(None).unwrap();
    harness.join();
}

#[test]
fn test_small_text_is_ignored() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let mut harness = Harness::start(coordinator, GENEROUS);

    harness.client.send(Message::text("hello")).unwrap();
    harness.coordinator.ingest_at(batch("/a.js", "a"), t1()).unwrap();
    assert!(harness.next_text().contains("/a.js"));
    assert_eq!(harness.coordinator.sessions(), 1);

    harness.client.close(None).unwrap();
    harness.join();
}

#[test]
fn test_client_disconnect_releases_session() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let harness = Harness::start(coordinator, GENEROUS);

    let Harness {
        coordinator,
        client,
        server,
    } = harness;
    drop(client);
    server.join().unwrap().unwrap();
    assert_eq!(coordinator.sessions(), 0);
}

#[test]
fn test_shutdown_ends_session() {
    let coordinator = Coordinator::shared(Duration::from_secs(10));
    let harness = Harness::start(coordinator, GENEROUS);

    harness.coordinator.shutdown();
    harness.join();
}

#[test]
fn test_close_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (stream, peer) = listener.accept().unwrap();

    let shared = Shared {
        peer,
        stream,
        closed: AtomicBool::new(false),
        coordinator: Coordinator::shared(Duration::from_secs(10)),
    };
    shared.close();
    shared.close();
    assert!(shared.is_closed());
    drop(client);
}
