use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use pairline_server::config::ProtocolConfig;
use pairline_server::protocol::ServerMessage;
use pairline_server::server::{ChatServer, ServerConfig};
use pairline_server::verification::{AcceptAllVerifier, TokenVerifier};
use pairline_server::websocket::run_server;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default server configuration optimized for testing
#[allow(dead_code)]
pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        // Long enough that no sweep fires during a test unless asked for.
        liveness_interval: Duration::from_secs(300),
        join_timeout: Duration::from_secs(30),
        max_connections_per_ip: 1000,
        ..ServerConfig::default()
    }
}

/// A server bound to an ephemeral local port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub server: Arc<ChatServer>,
    pub shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[allow(dead_code)]
pub async fn start_test_server() -> TestServer {
    start_test_server_with(test_server_config(), Arc::new(AcceptAllVerifier)).await
}

#[allow(dead_code)]
pub async fn start_test_server_with_config(config: ServerConfig) -> TestServer {
    start_test_server_with(config, Arc::new(AcceptAllVerifier)).await
}

#[allow(dead_code)]
pub async fn start_test_server_with(
    config: ServerConfig,
    verifier: Arc<dyn TokenVerifier>,
) -> TestServer {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let server = ChatServer::new(config, ProtocolConfig::default(), verifier);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();

    let serve_server = server.clone();
    let serve_shutdown = shutdown.clone();
    tokio::spawn(async move {
        run_server(listener, serve_server, "*", serve_shutdown)
            .await
            .unwrap();
    });

    TestServer {
        addr,
        server,
        shutdown,
    }
}

/// Test-side WebSocket client speaking raw JSON envelopes.
#[allow(dead_code)]
pub struct TestClient {
    pub sink: SplitSink<WsStream, Message>,
    pub stream: SplitStream<WsStream>,
}

#[allow(dead_code)]
impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self::connect_path(addr, "/ws").await
    }

    pub async fn connect_path(addr: SocketAddr, path: &str) -> Self {
        let url = format!("ws://{addr}{path}");
        let (ws, _) = tokio::time::timeout(Duration::from_secs(10), connect_async(&url))
            .await
            .expect("WebSocket connection timed out")
            .expect("Failed to connect");
        let (sink, stream) = ws.split();
        Self { sink, stream }
    }

    pub async fn send_json(&mut self, value: serde_json::Value) {
        self.send_text(&value.to_string()).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.sink
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send failed");
    }

    pub async fn send_raw(&mut self, message: Message) {
        self.sink.send(message).await.expect("send failed");
    }

    pub async fn join(&mut self, name: &str) {
        self.send_json(serde_json::json!({"type": "join", "displayName": name}))
            .await;
    }

    /// Next server envelope, skipping transport-level control frames.
    pub async fn recv(&mut self) -> ServerMessage {
        self.try_recv(Duration::from_secs(5))
            .await
            .expect("expected a server message")
    }

    pub async fn try_recv(&mut self, wait: Duration) -> Option<ServerMessage> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .ok()??;
            match frame.ok()? {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("invalid envelope"))
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Wait until the server closes the socket.
    pub async fn expect_closed(&mut self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => panic!("socket was not closed"),
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// Poll until `check` holds or a few seconds pass.
#[allow(dead_code)]
pub async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}
