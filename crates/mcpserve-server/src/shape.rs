//! Version shape adaptation for resource reads.
//!
//! The same handler output serializes differently per protocol revision:
//!
//! - `2024-11-05` — a flat `{content: [items]}` envelope;
//! - `2025-03-26` and `draft` — `{contents: [{uri, text|blob, content}]}`,
//!   where the inner `text` mirrors the first text item (or `blob` the
//!   first blob item when no text exists), and an empty read carries an
//!   empty inner `content` array with `text`/`blob` omitted.
//!
//! Handler-supplied metadata rides along at the top level in both shapes.
//! Individual items go through [`Content::to_wire`], which owns the
//! audio coercion rules.

use mcpserve_core::types::{Content, ResourceOutput};
use mcpserve_core::version::ProtocolVersion;

/// Shape a resource read into the version-appropriate result object.
#[must_use]
pub fn resource_read_result(
    version: ProtocolVersion,
    uri: &str,
    output: &ResourceOutput,
) -> serde_json::Value {
    let items: Vec<serde_json::Value> = output
        .content
        .iter()
        .map(|item| item.to_wire(version))
        .collect();

    let mut result = if version.uses_wrapped_contents() {
        let mut entry = serde_json::Map::new();
        entry.insert("uri".to_string(), serde_json::json!(uri));
        if let Some(text) = first_text(&output.content) {
            entry.insert("text".to_string(), serde_json::json!(text));
        } else if let Some(blob) = first_blob(&output.content) {
            entry.insert("blob".to_string(), serde_json::json!(blob));
        }
        entry.insert("content".to_string(), serde_json::json!(items));
        serde_json::json!({ "contents": [entry] })
    } else {
        serde_json::json!({ "content": items })
    };

    if let Some(metadata) = &output.metadata {
        result["metadata"] = serde_json::json!(metadata);
    }
    result
}

fn first_text(content: &[Content]) -> Option<&str> {
    content.iter().find_map(Content::as_text)
}

fn first_blob(content: &[Content]) -> Option<&str> {
    content.iter().find_map(|item| match item {
        Content::Blob(blob) => Some(blob.data.as_str()),
        _ => None,
    })
}
