//! Tool listing and invocation.

mod common;

use common::TestClient;
use mcpserve::prelude::*;
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Deserialize, JsonSchema)]
struct CalcArgs {
    x: f64,
    y: f64,
    operation: String,
}

fn calculator_server() -> McpServer {
    McpServer::builder("calc", "0.1.0")
        .typed_tool(
            "calculator",
            "Basic arithmetic",
            |_ctx, args: CalcArgs| async move {
                let value = match args.operation.as_str() {
                    "add" => args.x + args.y,
                    "subtract" => args.x - args.y,
                    "multiply" => args.x * args.y,
                    "divide" => {
                        if args.y == 0.0 {
                            return Ok(ToolOutput::error("division by zero"));
                        }
                        args.x / args.y
                    }
                    other => {
                        return Ok(ToolOutput::error(format!("unknown operation '{other}'")));
                    }
                };
                Ok(ToolOutput::text(value.to_string()))
            },
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn calculator_adds() {
    let client = TestClient::start(calculator_server());
    client.initialize("2025-03-26").await;

    let result = client
        .request_ok(
            2,
            "tools/call",
            serde_json::json!({
                "name": "calculator",
                "arguments": { "x": 5, "y": 3, "operation": "add" },
            }),
        )
        .await;
    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");
    assert_eq!(result["content"][0]["text"], "8");
    client.shutdown().await;
}

#[tokio::test]
async fn division_by_zero_is_an_in_band_error() {
    let client = TestClient::start(calculator_server());
    client.initialize("2025-03-26").await;

    let result = client
        .request_ok(
            2,
            "tools/call",
            serde_json::json!({
                "name": "calculator",
                "arguments": { "x": 5, "y": 0, "operation": "divide" },
            }),
        )
        .await;
    assert_eq!(result["isError"], true);
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("division by zero"));
    client.shutdown().await;
}

#[tokio::test]
async fn every_call_result_has_content_and_is_error() {
    let client = TestClient::start(calculator_server());
    client.initialize("latest").await;

    for (id, op) in [(2u64, "add"), (3, "divide"), (4, "bogus")] {
        let result = client
            .request_ok(
                id,
                "tools/call",
                serde_json::json!({
                    "name": "calculator",
                    "arguments": { "x": 1, "y": 1, "operation": op },
                }),
            )
            .await;
        assert!(result["content"].is_array(), "missing content for {op}");
        assert!(result["isError"].is_boolean(), "missing isError for {op}");
    }
    client.shutdown().await;
}

#[tokio::test]
async fn registering_n_tools_lists_exactly_those_n() {
    let names = ["alpha", "beta", "gamma", "delta"];
    let mut builder = McpServer::builder("many", "0.1.0");
    for name in names {
        builder = builder.tool(
            mcpserve::Tool::new(name).description(format!("tool {name}")),
            |_ctx, _args| async move { Ok(ToolOutput::text("ok")) },
        );
    }
    let client = TestClient::start(builder.build().unwrap());
    client.initialize("latest").await;

    let result = client.request_ok(2, "tools/list", serde_json::json!({})).await;
    let listed: Vec<&str> = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(listed, names);
    client.shutdown().await;
}

#[tokio::test]
async fn annotations_show_up_in_the_listing() {
    let mut annotations = serde_json::Map::new();
    annotations.insert("category".into(), serde_json::json!("math"));
    annotations.insert("cost".into(), serde_json::json!("low"));
    let server = McpServer::builder("annotated", "0.1.0")
        .tool(mcpserve::Tool::new("calc"), |_ctx, _args| async move {
            Ok(ToolOutput::text("ok"))
        })
        .annotate_tool("calc", annotations)
        .build()
        .unwrap();
    let client = TestClient::start(server);
    client.initialize("latest").await;

    let result = client.request_ok(2, "tools/list", serde_json::json!({})).await;
    assert_eq!(result["tools"][0]["annotations"]["category"], "math");
    assert_eq!(result["tools"][0]["annotations"]["cost"], "low");
    client.shutdown().await;
}

#[tokio::test]
async fn missing_required_argument_is_invalid_params() {
    let client = TestClient::start(calculator_server());
    client.initialize("latest").await;
    let response = client
        .request(
            serde_json::json!(2),
            "tools/call",
            serde_json::json!({ "name": "calculator", "arguments": { "x": 1 } }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32602);
    client.shutdown().await;
}

#[tokio::test]
async fn unknown_tool_is_invalid_params() {
    let client = TestClient::start(calculator_server());
    client.initialize("latest").await;
    let response = client
        .request(
            serde_json::json!(2),
            "tools/call",
            serde_json::json!({ "name": "missing", "arguments": {} }),
        )
        .await;
    assert_eq!(response["error"]["code"], -32602);
    client.shutdown().await;
}

#[tokio::test]
async fn slow_calls_do_not_block_later_requests() {
    let server = McpServer::builder("parallel", "0.1.0")
        .tool(mcpserve::Tool::new("slow"), |_ctx, _args| async move {
            tokio::time::sleep(std::time::Duration::from_millis(300)).await;
            Ok(ToolOutput::text("slow done"))
        })
        .tool(mcpserve::Tool::new("fast"), |_ctx, _args| async move {
            Ok(ToolOutput::text("fast done"))
        })
        .build()
        .unwrap();
    let client = TestClient::start(server);
    client.initialize("latest").await;

    // Fire the slow call first, the fast one second; the fast response
    // must not wait for the slow handler.
    client
        .send_request(
            serde_json::json!("slow-1"),
            "tools/call",
            serde_json::json!({ "name": "slow", "arguments": {} }),
        )
        .await;
    client
        .send_request(
            serde_json::json!("fast-1"),
            "tools/call",
            serde_json::json!({ "name": "fast", "arguments": {} }),
        )
        .await;

    let started = std::time::Instant::now();
    let fast = client.await_response(&serde_json::json!("fast-1")).await;
    assert!(started.elapsed() < std::time::Duration::from_millis(250));
    assert_eq!(fast["result"]["content"][0]["text"], "fast done");

    // The slow response still arrives, under its own id.
    let slow = client.await_response(&serde_json::json!("slow-1")).await;
    assert_eq!(slow["result"]["content"][0]["text"], "slow done");
    client.shutdown().await;
}

#[tokio::test]
async fn progress_notifications_arrive_before_the_response() {
    let server = McpServer::builder("progress", "0.1.0")
        .tool(mcpserve::Tool::new("steps"), |ctx: Context, _args| async move {
            for step in 1..=3u64 {
                ctx.report_progress(step, Some(3), Some("working"))?;
            }
            Ok(ToolOutput::text("all steps done"))
        })
        .build()
        .unwrap();
    let client = TestClient::start(server);
    client.initialize("latest").await;

    client
        .send_request(
            serde_json::json!(2),
            "tools/call",
            serde_json::json!({
                "name": "steps",
                "arguments": {},
                "_meta": { "progressToken": "tok-1" },
            }),
        )
        .await;
    let response = client.await_response(&serde_json::json!(2)).await;
    assert_eq!(response["result"]["isError"], false);

    // All three progress notifications were flushed before the response,
    // so they are already parked in the inbox.
    for expected in 1..=3u64 {
        let notification = client.next_notification().await;
        assert_eq!(notification["method"], "notifications/progress");
        assert_eq!(notification["params"]["progressToken"], "tok-1");
        assert_eq!(notification["params"]["progress"], expected);
    }
    client.shutdown().await;
}
