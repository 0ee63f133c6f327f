//! Server→client sampling through the controller.

mod common;

use common::TestClient;
use mcpserve::prelude::*;

/// A server with one tool that asks the client for `max_tokens` of LLM
/// output and returns the generated text.
fn sampling_server(max_tokens: u32, config: SamplingConfig) -> McpServer {
    McpServer::builder("sampler", "0.1.0")
        .sampling(config)
        .tool(
            mcpserve::Tool::new("summarize").description("Summarize with the client's model"),
            move |ctx: Context, _args| async move {
                let request = CreateMessageRequest::new(
                    vec![SamplingMessage::user("summarize the corpus")],
                    max_tokens,
                )
                .system_prompt("be brief");
                let result = ctx.request_sampling(request).await?;
                Ok(ToolOutput::text(
                    result.content.as_text().unwrap_or_default().to_string(),
                ))
            },
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn sampling_round_trips_through_the_client() {
    let client = TestClient::start(sampling_server(256, SamplingConfig::default()));
    client.initialize("2025-03-26").await;

    client
        .send_request(
            serde_json::json!(2),
            "tools/call",
            serde_json::json!({ "name": "summarize", "arguments": {} }),
        )
        .await;

    // The server forwards a sampling request to this session; answer it.
    let sampling = client.next_server_request().await;
    assert_eq!(sampling["method"], "sampling/createMessage");
    assert_eq!(sampling["params"]["maxTokens"], 256);
    assert_eq!(sampling["params"]["systemPrompt"], "be brief");
    assert_eq!(sampling["params"]["messages"][0]["role"], "user");
    client
        .respond(
            sampling["id"].clone(),
            serde_json::json!({
                "role": "assistant",
                "content": { "type": "text", "text": "a fine summary" },
                "model": "claude-3",
                "stopReason": "endTurn",
            }),
        )
        .await;

    let response = client.await_response(&serde_json::json!(2)).await;
    assert_eq!(response["result"]["isError"], false);
    assert_eq!(response["result"]["content"][0]["text"], "a fine summary");
    client.shutdown().await;
}

#[tokio::test]
async fn over_budget_sampling_fails_the_tool_in_band() {
    // 5000 tokens against a 2024-11-05 session (cap 4096): the controller
    // rejects before anything reaches the client, and the tool reports an
    // in-band error.
    let client = TestClient::start(sampling_server(5000, SamplingConfig::default()));
    client.initialize("2024-11-05").await;

    let result = client
        .request_ok(
            2,
            "tools/call",
            serde_json::json!({ "name": "summarize", "arguments": {} }),
        )
        .await;
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("4096"), "expected the cap in {text:?}");
    client.shutdown().await;
}

#[tokio::test]
async fn the_same_budget_passes_on_a_newer_version() {
    let client = TestClient::start(sampling_server(5000, SamplingConfig::default()));
    client.initialize("2025-03-26").await;

    client
        .send_request(
            serde_json::json!(2),
            "tools/call",
            serde_json::json!({ "name": "summarize", "arguments": {} }),
        )
        .await;
    let sampling = client.next_server_request().await;
    assert_eq!(sampling["params"]["maxTokens"], 5000);
    client
        .respond(
            sampling["id"].clone(),
            serde_json::json!({
                "role": "assistant",
                "content": { "type": "text", "text": "ok" },
            }),
        )
        .await;
    let response = client.await_response(&serde_json::json!(2)).await;
    assert_eq!(response["result"]["isError"], false);
    client.shutdown().await;
}

#[tokio::test]
async fn graceful_degradation_clamps_the_budget() {
    let config = SamplingConfig {
        graceful_degradation: true,
        ..SamplingConfig::default()
    };
    let client = TestClient::start(sampling_server(5000, config));
    client.initialize("2024-11-05").await;

    client
        .send_request(
            serde_json::json!(2),
            "tools/call",
            serde_json::json!({ "name": "summarize", "arguments": {} }),
        )
        .await;

    // Instead of failing, the request reaches the client clamped to the
    // version cap.
    let sampling = client.next_server_request().await;
    assert_eq!(sampling["params"]["maxTokens"], 4096);
    client
        .respond(
            sampling["id"].clone(),
            serde_json::json!({
                "role": "assistant",
                "content": { "type": "text", "text": "degraded but fine" },
            }),
        )
        .await;
    let response = client.await_response(&serde_json::json!(2)).await;
    assert_eq!(
        response["result"]["content"][0]["text"],
        "degraded but fine"
    );
    client.shutdown().await;
}
