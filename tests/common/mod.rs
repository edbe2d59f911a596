//! Shared test infrastructure: a scripted fake manager that speaks just
//! enough HTTP/1.1 for the agent's `/ping` probe and `/events` feed, so the
//! pipeline is exercised through its real client path.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What the fake manager does with one event-feed connection. Scripts are
/// consumed in connection order; connections beyond the last script are held
/// open silently.
#[derive(Debug, Clone)]
pub enum FeedScript {
    /// Serve these lines, then hold the connection open.
    ServeAndHold(Vec<String>),
    /// Serve these lines, then close the connection (stream EOF).
    ServeAndClose(Vec<String>),
}

/// A scripted fake manager.
pub struct FakeManager {
    /// `host:port` the manager listens on.
    pub addr: String,
    pings: Arc<Mutex<Vec<Instant>>>,
    feed_paths: Arc<Mutex<Vec<String>>>,
}

impl FakeManager {
    /// Start a manager serving `scripts`, one per `/events` connection.
    pub async fn start(scripts: Vec<FeedScript>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let pings: Arc<Mutex<Vec<Instant>>> = Arc::default();
        let feed_paths: Arc<Mutex<Vec<String>>> = Arc::default();
        let scripts = Arc::new(Mutex::new(scripts));

        {
            let pings = pings.clone();
            let feed_paths = feed_paths.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let pings = pings.clone();
                    let feed_paths = feed_paths.clone();
                    let scripts = scripts.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, pings, feed_paths, scripts).await;
                    });
                }
            });
        }

        Self {
            addr,
            pings,
            feed_paths,
        }
    }

    /// Timestamps of the `/ping` probes received so far.
    pub fn ping_times(&self) -> Vec<Instant> {
        self.pings.lock().unwrap().clone()
    }

    /// Number of `/ping` probes received so far.
    pub fn ping_count(&self) -> usize {
        self.pings.lock().unwrap().len()
    }

    /// Request paths of the `/events` connections received so far.
    pub fn feed_paths(&self) -> Vec<String> {
        self.feed_paths.lock().unwrap().clone()
    }

    /// Number of `/events` connections received so far.
    pub fn feed_count(&self) -> usize {
        self.feed_paths.lock().unwrap().len()
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    pings: Arc<Mutex<Vec<Instant>>>,
    feed_paths: Arc<Mutex<Vec<String>>>,
    scripts: Arc<Mutex<Vec<FeedScript>>>,
) {
    let Some(path) = read_request_path(&mut stream).await else {
        return;
    };

    if path.starts_with("/ping") {
        pings.lock().unwrap().push(Instant::now());
        let _ = stream
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await;
        return;
    }

    if path.starts_with("/events") {
        let script = {
            let mut scripts = scripts.lock().unwrap();
            feed_paths.lock().unwrap().push(path);
            if scripts.is_empty() {
                FeedScript::ServeAndHold(Vec::new())
            } else {
                scripts.remove(0)
            }
        };

        let header =
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
        if stream.write_all(header.as_bytes()).await.is_err() {
            return;
        }

        let (lines, hold) = match script {
            FeedScript::ServeAndHold(lines) => (lines, true),
            FeedScript::ServeAndClose(lines) => (lines, false),
        };

        for line in &lines {
            let framed = format!("{}\n", line);
            if stream.write_all(framed.as_bytes()).await.is_err() {
                return;
            }
        }
        let _ = stream.flush().await;

        if hold {
            // keep the stream open; the test ends long before this does
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

/// Read one request's headers and return its path.
async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 512];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > 64 * 1024 {
            return None;
        }
    }

    let request_line = std::str::from_utf8(&buf).ok()?.lines().next()?.to_string();
    let path = request_line.split_whitespace().nth(1)?;
    Some(path.to_string())
}

/// Bind-then-drop guarantees a connection-refused address.
pub async fn dead_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

/// `event:`/`data:` line pair for one task event.
pub fn event_lines(name: &str, payload: &str) -> Vec<String> {
    vec![format!("event: {}", name), format!("data: {}", payload)]
}

/// JSON payload for a task lifecycle event.
pub fn task_payload(app: &str, task: &str, ip: &str, port: i64, gateway_enabled: bool) -> String {
    format!(
        r#"{{"app_id":"{}","task_id":"{}","version_id":"v1","ip":"{}","port":{},"weight":50.0,"gateway_enabled":{}}}"#,
        app, task, ip, port, gateway_enabled
    )
}

/// Receive with a timeout, panicking on silence or a closed channel.
pub async fn recv_timeout<T>(rx: &mut mpsc::Receiver<T>, ms: u64) -> T {
    tokio::time::timeout(Duration::from_millis(ms), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("channel closed")
}

/// Assert that nothing arrives on `rx` within `ms` milliseconds.
pub async fn assert_no_message<T: std::fmt::Debug>(rx: &mut mpsc::Receiver<T>, ms: u64) {
    let result = tokio::time::timeout(Duration::from_millis(ms), rx.recv()).await;
    assert!(result.is_err(), "unexpected message: {:?}", result.unwrap());
}
