//! Prompt types.
//!
//! A prompt is a named, ordered sequence of role + template messages. The
//! template text may contain `{{var}}` placeholders; every distinct
//! placeholder becomes a required argument unless an explicit override says
//! otherwise.

use serde::{Deserialize, Serialize};

use super::content::Content;
use crate::error::McpError;

/// The author role of a prompt or sampling message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// The user.
    User,
    /// The assistant.
    Assistant,
}

/// One message template inside a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    /// The role the rendered message carries.
    pub role: Role,
    /// The template text, possibly containing `{{var}}` placeholders.
    pub content: String,
}

impl MessageTemplate {
    /// Create a system template.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user template.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant template.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An argument a prompt accepts, as listed by `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Name of the argument.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this argument is required.
    pub required: bool,
}

/// A prompt definition.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Unique name of the prompt.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Ordered message templates.
    pub templates: Vec<MessageTemplate>,
    /// Explicit argument overrides (description, optionality).
    overrides: Vec<PromptArgument>,
}

impl Prompt {
    /// Create a new prompt.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            templates: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a message template.
    #[must_use]
    pub fn template(mut self, template: MessageTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Override a derived argument, e.g. to attach a description or mark it
    /// optional. Overrides for names no template mentions are appended to
    /// the declared argument set.
    #[must_use]
    pub fn argument(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.overrides.push(PromptArgument {
            name: name.into(),
            description: Some(description.into()),
            required,
        });
        self
    }

    /// The argument list: every distinct placeholder across all templates,
    /// in first-appearance order, required by default, merged with explicit
    /// overrides.
    #[must_use]
    pub fn arguments(&self) -> Vec<PromptArgument> {
        let mut args: Vec<PromptArgument> = Vec::new();
        for template in &self.templates {
            for name in scan_placeholders(&template.content) {
                if args.iter().any(|a| a.name == name) {
                    continue;
                }
                let arg = self
                    .overrides
                    .iter()
                    .find(|o| o.name == name)
                    .cloned()
                    .unwrap_or_else(|| PromptArgument {
                        name,
                        description: None,
                        required: true,
                    });
                args.push(arg);
            }
        }
        for over in &self.overrides {
            if !args.iter().any(|a| a.name == over.name) {
                args.push(over.clone());
            }
        }
        args
    }

    /// Render the prompt with the given variables.
    ///
    /// Substitution uses display formatting: string values render without
    /// quotes, everything else as its JSON form. A missing required
    /// argument is an invalid-params error; missing optional arguments
    /// render as the empty string. Rendered message content is always a
    /// `{type: "text", text}` object.
    pub fn render(
        &self,
        variables: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<GetPromptResult, McpError> {
        for arg in self.arguments() {
            if arg.required && !variables.contains_key(&arg.name) {
                return Err(McpError::invalid_params(
                    "prompts/get",
                    format!("missing required argument '{}'", arg.name),
                ));
            }
        }

        let messages = self
            .templates
            .iter()
            .map(|template| {
                let mut text = template.content.clone();
                for name in scan_placeholders(&template.content) {
                    let rendered = variables.get(&name).map(render_value).unwrap_or_default();
                    text = text.replace(&format!("{{{{{name}}}}}"), &rendered);
                }
                PromptMessage {
                    role: template.role,
                    content: Content::text(text),
                }
            })
            .collect();

        Ok(GetPromptResult {
            description: self.description.clone(),
            messages,
        })
    }
}

/// A rendered prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// The role of the message.
    pub role: Role,
    /// The message content (always a text content object).
    pub content: Content,
}

/// The result of `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPromptResult {
    /// Optional description of the rendered prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The rendered messages.
    pub messages: Vec<PromptMessage>,
}

/// Collect `{{name}}` placeholder names in appearance order.
///
/// Only identifier characters are accepted between the braces; anything
/// else is left in the text untouched.
fn scan_placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 3 < bytes.len() {
        if &bytes[i..i + 2] == b"{{" {
            if let Some(end) = text[i + 2..].find("}}") {
                let name = &text[i + 2..i + 2 + end];
                if !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    names.push(name.to_string());
                    i += 2 + end + 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    names
}

/// Display form of a variable value.
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn arguments_are_derived_from_placeholders() {
        let prompt = Prompt::new("teach")
            .template(MessageTemplate::system("You teach {{topic}}."))
            .template(MessageTemplate::user(
                "Explain {{concept}} in {{topic}} programming.",
            ));
        let args = prompt.arguments();
        let names: Vec<_> = args.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["topic", "concept"]);
        assert!(args.iter().all(|a| a.required));
    }

    #[test]
    fn overrides_merge_into_derived_arguments() {
        let prompt = Prompt::new("teach")
            .template(MessageTemplate::user("Explain {{topic}}."))
            .argument("topic", "The subject to explain", true)
            .argument("tone", "Optional tone", false);
        let args = prompt.arguments();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].description.as_deref(), Some("The subject to explain"));
        assert!(!args[1].required);
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let prompt = Prompt::new("teach")
            .template(MessageTemplate::user("Tell me about {{topic}} programming."));
        let result = prompt
            .render(&vars(&[("topic", serde_json::json!("Rust"))]))
            .unwrap();
        let text = result.messages[0].content.as_text().unwrap();
        assert_eq!(text, "Tell me about Rust programming.");
        assert!(!text.contains("{{"));
        assert!(!text.contains("}}"));
    }

    #[test]
    fn render_missing_required_argument_fails() {
        let prompt = Prompt::new("teach").template(MessageTemplate::user("About {{topic}}."));
        let err = prompt.render(&serde_json::Map::new()).unwrap_err();
        assert_eq!(err.code(), -32602);
    }

    #[test]
    fn render_missing_optional_argument_is_empty() {
        let prompt = Prompt::new("teach")
            .template(MessageTemplate::user("Hi{{suffix}}"))
            .argument("suffix", "tail", false);
        let result = prompt.render(&serde_json::Map::new()).unwrap();
        assert_eq!(result.messages[0].content.as_text().unwrap(), "Hi");
    }

    #[test]
    fn render_stringifies_non_string_values() {
        let prompt = Prompt::new("n").template(MessageTemplate::user("count={{n}}"));
        let result = prompt
            .render(&vars(&[("n", serde_json::json!(42))]))
            .unwrap();
        assert_eq!(result.messages[0].content.as_text().unwrap(), "count=42");
    }

    #[test]
    fn rendered_content_is_a_text_object() {
        let prompt = Prompt::new("p").template(MessageTemplate::user("plain"));
        let result = prompt.render(&serde_json::Map::new()).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["messages"][0]["content"]["type"], "text");
        assert_eq!(json["messages"][0]["content"]["text"], "plain");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn malformed_placeholders_are_left_alone() {
        let prompt = Prompt::new("p").template(MessageTemplate::user("{{not valid}} {{ok}}"));
        let args = prompt.arguments();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].name, "ok");

        let result = prompt
            .render(&vars(&[("ok", serde_json::json!("yes"))]))
            .unwrap();
        assert_eq!(
            result.messages[0].content.as_text().unwrap(),
            "{{not valid}} yes"
        );
    }
}
