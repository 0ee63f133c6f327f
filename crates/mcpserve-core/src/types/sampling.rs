//! Sampling types.
//!
//! Sampling is the server-initiated path: a tool handler asks the client to
//! run an LLM on its behalf. The controller in the server crate enforces
//! rate, concurrency, token, and content-kind limits before the request
//! leaves the session.

use serde::{Deserialize, Serialize};

use super::content::Content;
use super::prompt::Role;

/// A message in a sampling conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMessage {
    /// The role of the message author.
    pub role: Role,
    /// The message content.
    pub content: Content,
}

impl SamplingMessage {
    /// Create a user message with text content.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::text(text),
        }
    }

    /// Create an assistant message with text content.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
        }
    }

    /// Create a message with arbitrary content.
    #[must_use]
    pub const fn with_content(role: Role, content: Content) -> Self {
        Self { role, content }
    }
}

/// Model preferences for sampling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPreferences {
    /// Model name hints, in preference order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    /// Priority for cost (0.0 = minimize cost, 1.0 = cost no object).
    #[serde(rename = "costPriority", skip_serializing_if = "Option::is_none")]
    pub cost_priority: Option<f64>,
    /// Priority for speed.
    #[serde(rename = "speedPriority", skip_serializing_if = "Option::is_none")]
    pub speed_priority: Option<f64>,
    /// Priority for capability.
    #[serde(
        rename = "intelligencePriority",
        skip_serializing_if = "Option::is_none"
    )]
    pub intelligence_priority: Option<f64>,
}

impl ModelPreferences {
    /// Add a model name hint.
    #[must_use]
    pub fn hint(mut self, name: impl Into<String>) -> Self {
        self.hints.get_or_insert_with(Vec::new).push(name.into());
        self
    }
}

/// A sampling request as a handler hands it to the controller.
///
/// Priority is a controller-side parameter (queue ordering and timeout
/// scaling); it never reaches the wire.
#[derive(Debug, Clone)]
pub struct CreateMessageRequest {
    /// The conversation messages.
    pub messages: Vec<SamplingMessage>,
    /// Model preferences.
    pub model_preferences: Option<ModelPreferences>,
    /// System prompt.
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Priority, 1 (lowest) through 10 (highest).
    pub priority: u8,
}

impl CreateMessageRequest {
    /// Create a request with default priority.
    #[must_use]
    pub fn new(messages: Vec<SamplingMessage>, max_tokens: u32) -> Self {
        Self {
            messages,
            model_preferences: None,
            system_prompt: None,
            max_tokens,
            priority: 5,
        }
    }

    /// Set the model preferences.
    #[must_use]
    pub fn model_preferences(mut self, preferences: ModelPreferences) -> Self {
        self.model_preferences = Some(preferences);
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the priority (1..=10).
    #[must_use]
    pub const fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// The wire params of the `sampling/createMessage` request.
    #[must_use]
    pub fn to_wire_params(&self) -> serde_json::Value {
        let mut params = serde_json::json!({
            "messages": self.messages,
            "maxTokens": self.max_tokens,
        });
        if let Some(prefs) = &self.model_preferences {
            params["modelPreferences"] = serde_json::json!(prefs);
        }
        if let Some(system) = &self.system_prompt {
            params["systemPrompt"] = serde_json::json!(system);
        }
        params
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// The model reached a natural end of turn.
    EndTurn,
    /// A stop sequence was produced.
    StopSequence,
    /// The token ceiling was reached.
    MaxTokens,
    /// Any other client-reported reason.
    #[serde(untagged)]
    Other(String),
}

/// The result of a sampling round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageResult {
    /// The role of the generated message (normally assistant).
    pub role: Role,
    /// The generated content.
    pub content: Content,
    /// The model the client actually used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Why generation stopped.
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}
