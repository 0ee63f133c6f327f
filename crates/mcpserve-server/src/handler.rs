//! Handler function types.
//!
//! Tools and dynamic resources are registered as boxed async closures. A
//! tool may be registered raw (taking `serde_json::Value` arguments against
//! an explicit schema) or typed: the argument struct derives
//! `serde::Deserialize` + `schemars::JsonSchema`, the input schema is
//! generated from the type, and the dispatcher's validation plus serde do
//! the coercion.

use std::sync::Arc;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use mcpserve_core::error::McpError;
use mcpserve_core::types::{ResourceOutput, ToolOutput};
use mcpserve_core::uri::Bindings;

use crate::context::Context;

/// A boxed async tool handler over raw JSON arguments.
pub type BoxedToolHandler = Arc<
    dyn Fn(Context, serde_json::Value) -> BoxFuture<'static, Result<ToolOutput, McpError>>
        + Send
        + Sync,
>;

/// A boxed async resource handler.
pub type BoxedResourceHandler = Arc<
    dyn Fn(Context, ResourceRequest) -> BoxFuture<'static, Result<ResourceOutput, McpError>>
        + Send
        + Sync,
>;

/// What a resource handler is invoked with: the concrete URI and the path
/// parameters bound from the template match (registration defaults already
/// merged in).
#[derive(Debug, Clone, Default)]
pub struct ResourceRequest {
    /// The concrete URI being read.
    pub uri: String,
    /// Bound path parameters.
    pub params: Bindings,
}

impl ResourceRequest {
    /// Look up a bound parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }
}

/// Box a raw tool handler.
pub fn tool_handler<F, Fut>(handler: F) -> BoxedToolHandler
where
    F: Fn(Context, serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolOutput, McpError>> + Send + 'static,
{
    Arc::new(move |ctx, args| Box::pin(handler(ctx, args)))
}

/// Box a typed tool handler and derive its input schema from the argument
/// type.
pub fn typed_tool_handler<A, F, Fut>(handler: F) -> (serde_json::Value, BoxedToolHandler)
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
    F: Fn(Context, A) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ToolOutput, McpError>> + Send + 'static,
{
    let schema = schema_for::<A>();
    let handler = Arc::new(handler);
    let boxed: BoxedToolHandler = Arc::new(move |ctx, args| {
        let handler = handler.clone();
        Box::pin(async move {
            let typed: A = serde_json::from_value(args).map_err(|err| {
                McpError::invalid_params("tools/call", format!("argument mismatch: {err}"))
            })?;
            handler(ctx, typed).await
        })
    });
    (schema, boxed)
}

/// Box a resource handler.
pub fn resource_handler<F, Fut>(handler: F) -> BoxedResourceHandler
where
    F: Fn(Context, ResourceRequest) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<ResourceOutput, McpError>> + Send + 'static,
{
    Arc::new(move |ctx, request| Box::pin(handler(ctx, request)))
}

/// Generate the JSON schema for a typed argument struct.
fn schema_for<A: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(A))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
}

/// Validate raw arguments against a tool's input schema.
///
/// Covers the subset the registry accepts: top-level `type: object`, the
/// `required` list, and primitive `type` tags under `properties`. Unknown
/// extra arguments pass; the typed layer is stricter where it applies.
pub(crate) fn validate_args(
    schema: &serde_json::Value,
    args: &serde_json::Value,
) -> Result<(), String> {
    if schema.get("type").and_then(serde_json::Value::as_str) == Some("object")
        && !args.is_object()
    {
        return Err("arguments must be an object".to_string());
    }

    if let Some(required) = schema.get("required").and_then(serde_json::Value::as_array) {
        for name in required.iter().filter_map(serde_json::Value::as_str) {
            if args.get(name).is_none() {
                return Err(format!("missing required argument '{name}'"));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(serde_json::Value::as_object) {
        for (name, prop) in properties {
            let Some(value) = args.get(name) else {
                continue;
            };
            let Some(expected) = prop.get("type").and_then(serde_json::Value::as_str) else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                "null" => value.is_null(),
                _ => true,
            };
            if !ok {
                return Err(format!("argument '{name}' must be of type {expected}"));
            }
        }
    }

    Ok(())
}
