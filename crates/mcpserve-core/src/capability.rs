//! Capability negotiation types.
//!
//! Exchanged during the `initialize` handshake: the client declares what it
//! can do (notably which sampling content kinds it accepts and whether it
//! streams), the server advertises which capability groups it serves.

use serde::{Deserialize, Serialize};

use crate::version::ProtocolVersion;

/// Information identifying a server implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Create new server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Information identifying a client implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    #[serde(default)]
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: String,
}

/// What the client declared it can sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingCapability {
    /// Whether text sampling is supported.
    #[serde(default = "default_true")]
    pub text: bool,
    /// Whether image sampling is supported.
    #[serde(default)]
    pub image: bool,
    /// Whether audio sampling is supported.
    #[serde(default)]
    pub audio: bool,
    /// Whether the client can stream sampling results.
    #[serde(default)]
    pub streaming: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SamplingCapability {
    fn default() -> Self {
        Self {
            text: true,
            image: false,
            audio: false,
            streaming: false,
        }
    }
}

/// Capabilities declared by the client at initialize time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Sampling support, absent when the client cannot sample at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingCapability>,
    /// Whether the client exposes filesystem roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
}

impl ClientCapabilities {
    /// Whether the client can service sampling requests at all.
    #[must_use]
    pub const fn supports_sampling(&self) -> bool {
        self.sampling.is_some()
    }
}

/// Client-side roots capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootsCapability {
    /// Whether the client emits `notifications/roots/list_changed`.
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Per-group server capability flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// Whether `notifications/tools/list_changed` is emitted.
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Server resources capability flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesCapability {
    /// Whether `resources/subscribe` is served.
    #[serde(default)]
    pub subscribe: bool,
    /// Whether `notifications/resources/list_changed` is emitted.
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Server prompts capability flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsCapability {
    /// Whether `notifications/prompts/list_changed` is emitted.
    #[serde(rename = "listChanged", default)]
    pub list_changed: bool,
}

/// Capabilities advertised by the server in the initialize result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    /// Resources support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    /// Prompts support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptsCapability>,
}

impl ServerCapabilities {
    /// Create an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise tools (with list-changed notifications).
    #[must_use]
    pub fn with_tools(mut self) -> Self {
        self.tools = Some(ToolsCapability { list_changed: true });
        self
    }

    /// Advertise resources (with subscriptions and list-changed
    /// notifications).
    #[must_use]
    pub fn with_resources(mut self) -> Self {
        self.resources = Some(ResourcesCapability {
            subscribe: true,
            list_changed: true,
        });
        self
    }

    /// Advertise prompts (with list-changed notifications).
    #[must_use]
    pub fn with_prompts(mut self) -> Self {
        self.prompts = Some(PromptsCapability { list_changed: true });
        self
    }
}

/// The result of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// The negotiated protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: ProtocolVersion,
    /// Server identity.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Capabilities the server advertises.
    pub capabilities: ServerCapabilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_capabilities_parse_from_initialize_params() {
        let json = serde_json::json!({
            "sampling": { "text": true, "image": true, "streaming": true },
            "roots": { "listChanged": true }
        });
        let caps: ClientCapabilities = serde_json::from_value(json).unwrap();
        assert!(caps.supports_sampling());
        let sampling = caps.sampling.unwrap();
        assert!(sampling.image);
        assert!(!sampling.audio);
        assert!(sampling.streaming);
    }

    #[test]
    fn absent_sampling_means_unsupported() {
        let caps: ClientCapabilities = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!caps.supports_sampling());
    }

    #[test]
    fn initialize_result_wire_shape() {
        let result = InitializeResult {
            protocol_version: ProtocolVersion::V2025_03_26,
            server_info: ServerInfo::new("mcpserve", "0.3.0"),
            capabilities: ServerCapabilities::new().with_tools().with_resources(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["protocolVersion"], "2025-03-26");
        assert_eq!(json["serverInfo"]["name"], "mcpserve");
        assert_eq!(json["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(json["capabilities"]["resources"]["subscribe"], true);
        assert!(json["capabilities"].get("prompts").is_none());
    }
}
