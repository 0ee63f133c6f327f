//! Cooperative cancellation end to end.

mod common;

use std::time::Duration;

use common::TestClient;
use mcpserve::prelude::*;

fn slow_server() -> McpServer {
    McpServer::builder("cancel", "0.1.0")
        .tool(mcpserve::Tool::new("slow"), |ctx: Context, _args| async move {
            // A ten-second worker that polls cancellation each tick.
            for _ in 0..1000u32 {
                ctx.check_cancellation()?;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok(ToolOutput::text("completed"))
        })
        .tool(
            mcpserve::Tool::new("stubborn"),
            |_ctx, _args| async move {
                // Ignores cancellation entirely.
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(ToolOutput::text("finished anyway"))
            },
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn cancelled_request_never_yields_a_success_frame() {
    let client = TestClient::start(slow_server());
    client.initialize("latest").await;

    client
        .send_request(
            serde_json::json!("12345"),
            "tools/call",
            serde_json::json!({ "name": "slow", "arguments": {} }),
        )
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    client
        .notify(
            "notifications/cancelled",
            serde_json::json!({ "requestId": "12345", "reason": "user aborted" }),
        )
        .await;

    // Exactly one response for the id, and it is an error, promptly.
    let started = std::time::Instant::now();
    let response = client.await_response(&serde_json::json!("12345")).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(response.get("result").is_none());
    let error = &response["error"];
    assert!(error["message"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("cancel"));
    client.shutdown().await;
}

#[tokio::test]
async fn cancelling_an_unknown_request_is_a_no_op() {
    let client = TestClient::start(slow_server());
    client.initialize("latest").await;

    client
        .notify(
            "notifications/cancelled",
            serde_json::json!({ "requestId": "never-existed" }),
        )
        .await;

    // The session keeps serving normally.
    let response = client
        .request(serde_json::json!(3), "ping", serde_json::json!({}))
        .await;
    assert_eq!(response["result"], serde_json::json!({}));
    client.shutdown().await;
}

#[tokio::test]
async fn handlers_that_ignore_cancellation_are_not_killed() {
    let client = TestClient::start(slow_server());
    client.initialize("latest").await;

    client
        .send_request(
            serde_json::json!(7),
            "tools/call",
            serde_json::json!({ "name": "stubborn", "arguments": {} }),
        )
        .await;
    client
        .notify(
            "notifications/cancelled",
            serde_json::json!({ "requestId": 7 }),
        )
        .await;

    // The handler runs to completion on its own schedule; the result is
    // then dropped in favor of a cancellation error.
    let response = client.await_response(&serde_json::json!(7)).await;
    assert!(response.get("result").is_none());
    assert!(response.get("error").is_some());
    client.shutdown().await;
}

#[tokio::test]
async fn cancellation_is_scoped_to_the_issuing_session() {
    let server = slow_server();
    let victim = TestClient::start(server.clone());
    victim.initialize("latest").await;
    let bystander = TestClient::start(server);
    bystander.initialize("latest").await;

    // Both sessions fire a request under the same id.
    for client in [&victim, &bystander] {
        client
            .send_request(
                serde_json::json!("shared-id"),
                "tools/call",
                serde_json::json!({ "name": "stubborn", "arguments": {} }),
            )
            .await;
    }
    // Only the victim cancels.
    victim
        .notify(
            "notifications/cancelled",
            serde_json::json!({ "requestId": "shared-id" }),
        )
        .await;

    let cancelled = victim.await_response(&serde_json::json!("shared-id")).await;
    assert!(cancelled.get("error").is_some());

    let untouched = bystander
        .await_response(&serde_json::json!("shared-id"))
        .await;
    assert_eq!(
        untouched["result"]["content"][0]["text"],
        "finished anyway"
    );
    victim.shutdown().await;
    bystander.shutdown().await;
}
