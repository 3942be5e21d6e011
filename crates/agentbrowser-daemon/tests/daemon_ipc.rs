//! End-to-end tests over a real socket against the mock engine.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

use agentbrowser_daemon::{
    DaemonClient, DaemonError, DaemonServer, Endpoint, LifecycleState, ServerOptions,
    SessionPaths, ShutdownHandle, SHUTTING_DOWN_MESSAGE,
};
use agentbrowser_engine::{BrowserEngine, MockElement, MockEngine};
use agentbrowser_protocol::{parse_response, Action, Command, Response};
use agentbrowser_session::{Dispatcher, DispatcherConfig};

const SHOP: &str = "https://shop.test/";

struct Harness {
    _dir: TempDir,
    paths: SessionPaths,
    engine: Arc<MockEngine>,
    handle: ShutdownHandle,
    running: JoinHandle<Result<(), DaemonError>>,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(ServerOptions::default()).await
    }

    async fn start_with(options: ServerOptions) -> Self {
        let dir = TempDir::new().unwrap();
        let paths = SessionPaths::new("ipc", Some(dir.path())).unwrap();
        let engine = Arc::new(MockEngine::new());
        engine.set_document(
            SHOP,
            "Shop",
            vec![
                MockElement::new("#q", "textbox", "Search"),
                MockElement::new("#d1", "button", "Delete"),
                MockElement::new("#d2", "button", "Delete"),
                MockElement::new("#d3", "button", "Delete"),
            ],
        );
        let server = DaemonServer::bind(
            &paths,
            paths.endpoint(),
            Dispatcher::new(engine.clone(), DispatcherConfig::default()),
            options,
        )
        .await
        .unwrap();
        let handle = server.shutdown_handle();
        let running = tokio::spawn(server.run());
        Self {
            _dir: dir,
            paths,
            engine,
            handle,
            running,
        }
    }

    async fn connect(&self) -> Conn {
        let stream = UnixStream::connect(self.paths.socket_path()).await.unwrap();
        let (reader, writer) = stream.into_split();
        Conn {
            reader: BufReader::new(reader),
            writer,
        }
    }

    fn client(&self) -> DaemonClient {
        DaemonClient::new(self.paths.endpoint())
    }

    async fn stop(self) -> Result<(), DaemonError> {
        self.handle.shutdown();
        self.running.await.unwrap()
    }
}

struct Conn {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
}

impl Conn {
    async fn write_raw(&mut self, raw: &[u8]) {
        self.writer.write_all(raw).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn read(&mut self) -> Option<Response> {
        let mut line = String::new();
        let n = tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .unwrap()
            // A reset after the daemon hangs up counts as closed.
            .unwrap_or(0);
        (n > 0).then(|| parse_response(&line).unwrap())
    }

    async fn request(&mut self, value: Value) -> Response {
        self.write_raw(format!("{}\n", value).as_bytes()).await;
        self.read().await.unwrap()
    }
}

#[tokio::test]
async fn test_navigate_on_fresh_daemon() {
    let harness = Harness::start().await;
    let mut conn = harness.connect().await;

    let response = conn
        .request(json!({"id": "1", "action": "navigate", "url": SHOP}))
        .await;
    assert_eq!(response.id(), "1");
    let result = response.into_result().unwrap();
    assert_eq!(result["url"], SHOP);
    assert_eq!(result["status"], 200);
    assert_eq!(harness.engine.launches(), 1);

    drop(conn);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_responses_follow_request_order() {
    let harness = Harness::start().await;
    let mut conn = harness.connect().await;

    let batch = [
        json!({"id": "a", "action": "navigate", "url": SHOP}),
        json!({"id": "b", "action": "bogus"}),
        json!({"id": "c", "action": "getTitle"}),
        json!({"id": "d", "action": "getUrl"}),
    ];
    let mut raw = String::new();
    for command in &batch {
        raw.push_str(&command.to_string());
        raw.push('\n');
    }
    conn.write_raw(raw.as_bytes()).await;

    let mut ids = Vec::new();
    let mut outcomes = Vec::new();
    for _ in 0..batch.len() {
        let response = conn.read().await.unwrap();
        ids.push(response.id().to_string());
        outcomes.push(response.is_success());
    }
    assert_eq!(ids, ["a", "b", "c", "d"]);
    assert_eq!(outcomes, [true, false, true, true]);

    drop(conn);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let harness = Harness::start().await;
    let mut conn = harness.connect().await;

    conn.write_raw(b"\n   \n{\"id\":\"x\",\"action\":\"console\"}\n")
        .await;
    let response = conn.read().await.unwrap();
    assert_eq!(response.id(), "x");
    assert!(response.is_success());

    drop(conn);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_ref_before_snapshot() {
    let harness = Harness::start().await;
    let response = harness
        .client()
        .send(&Command::new(
            "r",
            Action::Click {
                selector: "@e99".to_string(),
                button: None,
                click_count: None,
                timeout: None,
            },
        ))
        .await
        .unwrap();

    assert_eq!(
        response.error(),
        Some(
            "Invalid or expired ref @e99: refs are replaced by every snapshot. \
             Run 'snapshot' to get current refs."
        )
    );
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_connections_share_session_refs() {
    let harness = Harness::start().await;
    let mut first = harness.connect().await;
    let mut second = harness.connect().await;

    first
        .request(json!({"id": "1", "action": "navigate", "url": SHOP}))
        .await
        .into_result()
        .unwrap();
    let snapshot = first
        .request(json!({"id": "2", "action": "snapshot"}))
        .await
        .into_result()
        .unwrap();
    assert!(snapshot["tree"].as_str().unwrap().contains("[nth=2]"));

    let response = second
        .request(json!({"id": "3", "action": "click", "selector": "@e3"}))
        .await;
    assert!(response.is_success(), "{:?}", response.error());
    assert!(harness
        .engine
        .calls()
        .contains(&r#"click role=button[name="Delete"] >> nth=1"#.to_string()));

    drop(first);
    drop(second);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_oversized_request_is_rejected() {
    let options = ServerOptions {
        max_request_bytes: 1024,
        ..ServerOptions::default()
    };
    let harness = Harness::start_with(options).await;
    let mut conn = harness.connect().await;

    let script = "x".repeat(4096);
    let raw = format!(
        "{}\n",
        json!({"id": "big", "action": "evaluate", "script": script})
    );
    conn.write_raw(raw.as_bytes()).await;

    let response = conn.read().await.unwrap();
    assert!(!response.is_success());
    assert!(response.error().unwrap().contains("1024 byte limit"));
    assert!(conn.read().await.is_none());

    // The daemon keeps serving other connections.
    let mut other = harness.connect().await;
    assert!(other
        .request(json!({"id": "ok", "action": "console"}))
        .await
        .is_success());

    drop(other);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_close_shuts_daemon_down() {
    let harness = Harness::start().await;
    let mut closer = harness.connect().await;
    let mut bystander = harness.connect().await;

    closer
        .request(json!({"id": "1", "action": "navigate", "url": SHOP}))
        .await;
    let response = closer.request(json!({"id": "2", "action": "close"})).await;
    assert!(response.is_success());
    assert!(!harness.engine.is_running());

    let rejected = bystander
        .request(json!({"id": "3", "action": "getUrl"}))
        .await;
    assert_eq!(rejected.id(), "3");
    assert_eq!(rejected.error(), Some(SHUTTING_DOWN_MESSAGE));

    drop(closer);
    drop(bystander);
    let Harness {
        _dir,
        paths,
        running,
        ..
    } = harness;
    running.await.unwrap().unwrap();
    assert!(!paths.socket_path().exists());
    assert!(!paths.pid_path().exists());
}

#[tokio::test]
async fn test_shutdown_releases_engine_and_files() {
    let harness = Harness::start().await;
    harness
        .client()
        .send(&Command::new("1", Action::GetTitle))
        .await
        .unwrap();
    assert!(harness.engine.is_running());

    let engine = harness.engine.clone();
    let paths = harness.paths.clone();
    harness.stop().await.unwrap();

    assert!(!engine.is_running());
    assert!(engine.calls().contains(&"close".to_string()));
    assert!(!paths.socket_path().exists());
    assert!(!paths.pid_path().exists());
}

#[tokio::test]
async fn test_grace_period_aborts_idle_connections() {
    let options = ServerOptions {
        shutdown_timeout: Duration::from_millis(100),
        ..ServerOptions::default()
    };
    let harness = Harness::start_with(options).await;
    let mut idle = harness.connect().await;
    idle.request(json!({"id": "1", "action": "console"})).await;

    // The idle connection never hangs up; shutdown must not wait on it.
    tokio::time::timeout(Duration::from_secs(5), harness.stop())
        .await
        .unwrap()
        .unwrap();
    assert!(idle.read().await.is_none());
}

#[tokio::test]
async fn test_second_daemon_for_session_is_refused() {
    let harness = Harness::start().await;

    let result = DaemonServer::bind(
        &harness.paths,
        harness.paths.endpoint(),
        Dispatcher::new(Arc::new(MockEngine::new()), DispatcherConfig::default()),
        ServerOptions::default(),
    )
    .await;
    assert!(matches!(result, Err(DaemonError::AlreadyRunning { .. })));
    assert!(harness.paths.pid_path().exists());

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_stale_socket_is_replaced() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new("stale", Some(dir.path())).unwrap();
    {
        let _abandoned = std::os::unix::net::UnixListener::bind(paths.socket_path()).unwrap();
    }
    assert!(paths.socket_path().exists());

    let server = DaemonServer::bind(
        &paths,
        paths.endpoint(),
        Dispatcher::new(Arc::new(MockEngine::new()), DispatcherConfig::default()),
        ServerOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(server.lifecycle().state(), LifecycleState::Unlaunched);

    let handle = server.shutdown_handle();
    let running = tokio::spawn(server.run());
    assert!(DaemonClient::new(paths.endpoint()).ping().await);
    handle.shutdown();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_regular_file_at_socket_path_is_kept() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new("occupied", Some(dir.path())).unwrap();
    std::fs::write(paths.socket_path(), "precious").unwrap();

    let result = DaemonServer::bind(
        &paths,
        paths.endpoint(),
        Dispatcher::new(Arc::new(MockEngine::new()), DispatcherConfig::default()),
        ServerOptions::default(),
    )
    .await;

    assert!(matches!(result, Err(DaemonError::UnsafeSocketPath { .. })));
    assert_eq!(std::fs::read_to_string(paths.socket_path()).unwrap(), "precious");
    assert!(!paths.pid_path().exists());
}

#[tokio::test]
async fn test_connection_limit() {
    let options = ServerOptions {
        max_connections: 1,
        ..ServerOptions::default()
    };
    let harness = Harness::start_with(options).await;
    let mut first = harness.connect().await;
    first.request(json!({"id": "1", "action": "console"})).await;

    let mut second = harness.connect().await;
    assert!(second.read().await.is_none());

    drop(first);
    drop(second);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_tcp_endpoint() {
    let dir = TempDir::new().unwrap();
    let paths = SessionPaths::new("tcp", Some(dir.path())).unwrap();
    let server = DaemonServer::bind(
        &paths,
        Endpoint::Tcp("127.0.0.1:0".parse().unwrap()),
        Dispatcher::new(Arc::new(MockEngine::new()), DispatcherConfig::default()),
        ServerOptions::default(),
    )
    .await
    .unwrap();
    let endpoint = server.endpoint().clone();
    assert!(matches!(&endpoint, Endpoint::Tcp(addr) if addr.port() != 0));

    let handle = server.shutdown_handle();
    let running = tokio::spawn(server.run());

    let response = DaemonClient::new(endpoint)
        .send(&Command::new("t", Action::Console { clear: None }))
        .await
        .unwrap();
    assert_eq!(response.id(), "t");
    assert!(response.is_success());

    handle.shutdown();
    running.await.unwrap().unwrap();
    assert!(!paths.pid_path().exists());
}
