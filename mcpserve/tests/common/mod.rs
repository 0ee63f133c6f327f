//! Shared test harness: a minimal MCP client over the in-memory transport.
#![allow(dead_code)] // not every test binary touches every helper

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use mcpserve::{McpServer, MemoryTransport, Transport};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Honor RUST_LOG when a test run wants server-side traces.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A test client driving a served `McpServer` through a memory pair.
pub struct TestClient {
    transport: Arc<MemoryTransport>,
    inbox: Mutex<VecDeque<serde_json::Value>>,
    server: McpServer,
    serving: Option<JoinHandle<()>>,
}

impl TestClient {
    /// Serve the given server over a fresh memory pair and return a client
    /// attached to it.
    pub fn start(server: McpServer) -> Self {
        init_tracing();
        let (client_end, server_end) = MemoryTransport::pair();
        let serving = {
            let server = server.clone();
            tokio::spawn(async move { server.serve_transport(server_end).await })
        };
        Self {
            transport: Arc::new(client_end),
            inbox: Mutex::new(VecDeque::new()),
            server,
            serving: Some(serving),
        }
    }

    /// The server handle (for late registration and server-side pushes).
    pub fn server(&self) -> &McpServer {
        &self.server
    }

    /// Send a raw frame.
    pub async fn send_raw(&self, frame: Vec<u8>) {
        self.transport
            .send(Bytes::from(frame))
            .await
            .expect("send frame");
    }

    /// Fire a request without waiting for its response.
    pub async fn send_request(&self, id: serde_json::Value, method: &str, params: serde_json::Value) {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.send_raw(serde_json::to_vec(&frame).unwrap()).await;
    }

    /// Send a notification.
    pub async fn notify(&self, method: &str, params: serde_json::Value) {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.send_raw(serde_json::to_vec(&frame).unwrap()).await;
    }

    /// Pump frames until the response with the given id arrives. Other
    /// frames (notifications, server requests) are parked in the inbox.
    pub async fn await_response(&self, id: &serde_json::Value) -> serde_json::Value {
        let mut inbox = self.inbox.lock().await;
        if let Some(pos) = inbox
            .iter()
            .position(|f| f.get("id") == Some(id) && f.get("method").is_none())
        {
            return inbox.remove(pos).unwrap();
        }
        loop {
            let frame = self.next_frame().await;
            if frame.get("id") == Some(id) && frame.get("method").is_none() {
                return frame;
            }
            inbox.push_back(frame);
        }
    }

    /// Request and await the response envelope.
    pub async fn request(
        &self,
        id: serde_json::Value,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        self.send_request(id.clone(), method, params).await;
        self.await_response(&id).await
    }

    /// Request and unwrap the `result`, panicking on an error response.
    pub async fn request_ok(
        &self,
        id: u64,
        method: &str,
        params: serde_json::Value,
    ) -> serde_json::Value {
        let response = self.request(serde_json::json!(id), method, params).await;
        assert!(
            response.get("error").is_none(),
            "request {method} failed: {response}"
        );
        response["result"].clone()
    }

    /// Run the initialize handshake for a protocol version.
    pub async fn initialize(&self, version: &str) -> serde_json::Value {
        let result = self
            .request_ok(
                1,
                "initialize",
                serde_json::json!({
                    "protocolVersion": version,
                    "clientInfo": { "name": "test-client", "version": "0.0.0" },
                    "capabilities": {
                        "sampling": { "text": true, "image": true, "audio": true }
                    },
                }),
            )
            .await;
        self.notify("notifications/initialized", serde_json::json!({}))
            .await;
        result
    }

    /// The next parked or incoming notification (frames with a method and
    /// no id).
    pub async fn next_notification(&self) -> serde_json::Value {
        {
            let mut inbox = self.inbox.lock().await;
            if let Some(pos) = inbox
                .iter()
                .position(|f| f.get("method").is_some() && f.get("id").is_none())
            {
                return inbox.remove(pos).unwrap();
            }
        }
        loop {
            let frame = self.next_frame().await;
            if frame.get("method").is_some() && frame.get("id").is_none() {
                return frame;
            }
            self.inbox.lock().await.push_back(frame);
        }
    }

    /// The next server→client request (frames with both a method and an
    /// id), e.g. `sampling/createMessage`.
    pub async fn next_server_request(&self) -> serde_json::Value {
        {
            let mut inbox = self.inbox.lock().await;
            if let Some(pos) = inbox
                .iter()
                .position(|f| f.get("method").is_some() && f.get("id").is_some())
            {
                return inbox.remove(pos).unwrap();
            }
        }
        loop {
            let frame = self.next_frame().await;
            if frame.get("method").is_some() && frame.get("id").is_some() {
                return frame;
            }
            self.inbox.lock().await.push_back(frame);
        }
    }

    /// Answer a server→client request.
    pub async fn respond(&self, id: serde_json::Value, result: serde_json::Value) {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        });
        self.send_raw(serde_json::to_vec(&frame).unwrap()).await;
    }

    /// Whether any frame arrives within the window. Used to assert
    /// silence.
    pub async fn expect_silence(&self, window: Duration) -> bool {
        if !self.inbox.lock().await.is_empty() {
            return false;
        }
        tokio::time::timeout(window, self.transport.recv())
            .await
            .is_err()
    }

    async fn next_frame(&self) -> serde_json::Value {
        let frame = tokio::time::timeout(RECV_TIMEOUT, self.transport.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("transport error")
            .expect("server closed the connection");
        serde_json::from_slice(&frame).expect("frame is not JSON")
    }

    /// Disconnect and wait for the server side to tear down.
    pub async fn shutdown(mut self) {
        self.transport.close().await.ok();
        if let Some(serving) = self.serving.take() {
            serving.await.ok();
        }
    }
}
