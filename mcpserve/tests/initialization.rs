//! Initialize handshake and version negotiation.

mod common;

use common::TestClient;
use mcpserve::prelude::*;

fn server() -> McpServer {
    McpServer::builder("init-test", "0.1.0")
        .static_resource("/text", "Text", ResourceOutput::text("payload"))
        .build()
        .unwrap()
}

#[tokio::test]
async fn initialize_echoes_the_negotiated_version() {
    let client = TestClient::start(server());
    let result = client.initialize("2025-03-26").await;
    assert_eq!(result["protocolVersion"], "2025-03-26");
    assert_eq!(result["serverInfo"]["name"], "init-test");
    assert!(result["capabilities"]["resources"]["subscribe"].as_bool().unwrap());
    client.shutdown().await;
}

#[tokio::test]
async fn latest_and_v_prefix_normalize() {
    let client = TestClient::start(server());
    let result = client.initialize("latest").await;
    assert_eq!(result["protocolVersion"], "2025-03-26");
    client.shutdown().await;

    let client = TestClient::start(server());
    let result = client.initialize("v2024-11-05").await;
    assert_eq!(result["protocolVersion"], "2024-11-05");
    client.shutdown().await;
}

#[tokio::test]
async fn empty_version_selects_the_latest_stable() {
    let client = TestClient::start(server());
    let result = client.initialize("").await;
    assert_eq!(result["protocolVersion"], "2025-03-26");
    client.shutdown().await;
}

#[tokio::test]
async fn unknown_version_fails_with_invalid_params() {
    let client = TestClient::start(server());
    let response = client
        .request(
            serde_json::json!(1),
            "initialize",
            serde_json::json!({ "protocolVersion": "2030-12-31" }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32602);
    client.shutdown().await;
}

#[tokio::test]
async fn requests_before_initialize_are_rejected_except_ping() {
    let client = TestClient::start(server());

    let response = client
        .request(serde_json::json!(1), "ping", serde_json::json!({}))
        .await;
    assert_eq!(response["result"], serde_json::json!({}));

    let response = client
        .request(serde_json::json!(2), "resources/list", serde_json::json!({}))
        .await;
    assert_eq!(response["error"]["code"], -32600);
    client.shutdown().await;
}

#[tokio::test]
async fn second_initialize_is_rejected_and_version_stays() {
    let client = TestClient::start(server());
    client.initialize("2024-11-05").await;

    let response = client
        .request(
            serde_json::json!(5),
            "initialize",
            serde_json::json!({ "protocolVersion": "draft" }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32600);

    // Reads still use the first negotiated shape (flat content array).
    let result = client
        .request_ok(6, "resources/read", serde_json::json!({ "uri": "/text" }))
        .await;
    assert!(result.get("contents").is_none());
    assert_eq!(result["content"][0]["text"], "payload");
    client.shutdown().await;
}

#[tokio::test]
async fn client_only_methods_yield_method_not_found() {
    let client = TestClient::start(server());
    client.initialize("latest").await;
    let response = client
        .request(serde_json::json!(9), "roots/list", serde_json::json!({}))
        .await;
    assert_eq!(response["error"]["code"], -32601);
    client.shutdown().await;
}
