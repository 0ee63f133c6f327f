//! Tool, resource, and prompt catalogs.
//!
//! The registry is append-only at runtime: registrations may arrive after
//! the server has started (the facade broadcasts the matching
//! `notifications/*/list_changed`), but nothing is ever removed.
//! Registration takes the write lock, dispatch takes the read lock.
//!
//! Resources split into two catalogs by their URI pattern: zero template
//! segments puts a resource in `resources/list`, one or more puts it in
//! `resources/templates/list`; never both.

use std::collections::HashMap;
use std::sync::RwLock;

use mcpserve_core::error::McpError;
use mcpserve_core::types::{Prompt, PromptArgument, Resource, ResourceOutput, ResourceTemplate, Tool};
use mcpserve_core::uri::{Bindings, UriTemplate};

use crate::handler::{BoxedResourceHandler, BoxedToolHandler, ResourceRequest};

/// A registered tool: listing entry plus handler.
#[derive(Clone)]
pub struct RegisteredTool {
    /// The listing entry.
    pub tool: Tool,
    /// The handler invoked by `tools/call`.
    pub handler: BoxedToolHandler,
}

/// How a registered resource produces content.
#[derive(Clone)]
pub enum ResourceKind {
    /// Fixed content returned on every read.
    Static(ResourceOutput),
    /// A handler invoked per read.
    Dynamic(BoxedResourceHandler),
}

/// A registered resource or resource template.
#[derive(Clone)]
pub struct RegisteredResource {
    /// The URI or URI-template pattern.
    pub pattern: String,
    /// Parsed template, present iff the pattern has parameters.
    pub template: Option<UriTemplate>,
    /// Human-readable name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Default parameter values merged into bindings at resolution.
    pub defaults: HashMap<String, String>,
    /// Content source.
    pub kind: ResourceKind,
}

impl RegisteredResource {
    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a default parameter value, used when neither the URI nor the
    /// read request binds the name.
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }
}

/// A resource resolution: the matched registration and the request to hand
/// its handler.
pub struct ResolvedResource {
    /// The matched registration.
    pub resource: RegisteredResource,
    /// URI plus bound parameters (defaults applied).
    pub request: ResourceRequest,
}

/// The capability catalogs.
#[derive(Default)]
pub struct Registry {
    tools: RwLock<Vec<RegisteredTool>>,
    annotations: RwLock<HashMap<String, serde_json::Map<String, serde_json::Value>>>,
    resources: RwLock<Vec<RegisteredResource>>,
    prompts: RwLock<Vec<Prompt>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Tools
    // =========================================================================

    /// Register a tool.
    ///
    /// Fails if the name is taken or the input schema is not a JSON
    /// object.
    pub fn register_tool(&self, tool: Tool, handler: BoxedToolHandler) -> Result<(), McpError> {
        if !tool.input_schema.is_object() {
            return Err(McpError::invalid_request(format!(
                "input schema of tool '{}' must be a JSON object",
                tool.name
            )));
        }
        let mut tools = self
            .tools
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if tools.iter().any(|t| t.tool.name == tool.name) {
            return Err(McpError::invalid_request(format!(
                "tool '{}' is already registered",
                tool.name
            )));
        }
        tracing::debug!(tool = %tool.name, "tool registered");
        tools.push(RegisteredTool { tool, handler });
        Ok(())
    }

    /// Attach annotations to a tool name, merging with any existing set.
    /// The tool need not be registered yet; annotations apply by name at
    /// listing time.
    pub fn annotate_tool(
        &self,
        name: impl Into<String>,
        annotations: serde_json::Map<String, serde_json::Value>,
    ) {
        self.annotations
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(name.into())
            .or_default()
            .extend(annotations);
    }

    /// Look up a tool and its handler, annotations merged.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<RegisteredTool> {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut found = tools.iter().find(|t| t.tool.name == name)?.clone();
        found.tool = self.merge_annotations(found.tool);
        Some(found)
    }

    /// The tool catalog in registration order, annotations merged.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        let tools = self
            .tools
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        tools
            .iter()
            .map(|t| self.merge_annotations(t.tool.clone()))
            .collect()
    }

    fn merge_annotations(&self, mut tool: Tool) -> Tool {
        let annotations = self
            .annotations
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(extra) = annotations.get(&tool.name) {
            tool.annotations
                .get_or_insert_with(serde_json::Map::new)
                .extend(extra.clone());
        }
        tool
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Register a resource (static content or dynamic handler).
    ///
    /// A pattern containing `{param}` segments registers a template. Fails
    /// on duplicate patterns or malformed templates (unbalanced braces,
    /// invalid identifiers, non-final wildcard).
    pub fn register_resource(&self, resource: RegisteredResource) -> Result<(), McpError> {
        let mut resources = self
            .resources
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if resources.iter().any(|r| r.pattern == resource.pattern) {
            return Err(McpError::invalid_request(format!(
                "resource '{}' is already registered",
                resource.pattern
            )));
        }
        tracing::debug!(
            pattern = %resource.pattern,
            template = resource.template.is_some(),
            "resource registered"
        );
        resources.push(resource);
        Ok(())
    }

    /// Build a [`RegisteredResource`], parsing and validating the pattern.
    pub fn build_resource(
        pattern: impl Into<String>,
        name: impl Into<String>,
        kind: ResourceKind,
    ) -> Result<RegisteredResource, McpError> {
        let pattern = pattern.into();
        let template = if UriTemplate::is_template(&pattern) {
            Some(UriTemplate::parse(&pattern).map_err(|err| {
                McpError::invalid_request(format!("invalid resource pattern '{pattern}': {err}"))
            })?)
        } else {
            None
        };
        Ok(RegisteredResource {
            pattern,
            template,
            name: name.into(),
            description: None,
            mime_type: None,
            tags: Vec::new(),
            defaults: HashMap::new(),
            kind,
        })
    }

    /// Non-template resources, for `resources/list`.
    #[must_use]
    pub fn list_resources(&self) -> Vec<Resource> {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        resources
            .iter()
            .filter(|r| r.template.is_none())
            .map(|r| {
                let mut entry = Resource::new(r.pattern.clone(), r.name.clone());
                entry.description.clone_from(&r.description);
                entry.mime_type.clone_from(&r.mime_type);
                entry.tags = r.tags.clone();
                entry
            })
            .collect()
    }

    /// Template resources, for `resources/templates/list`.
    #[must_use]
    pub fn list_templates(&self) -> Vec<ResourceTemplate> {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        resources
            .iter()
            .filter(|r| r.template.is_some())
            .map(|r| {
                let mut entry = ResourceTemplate::new(r.pattern.clone(), r.name.clone());
                entry.description.clone_from(&r.description);
                entry.mime_type.clone_from(&r.mime_type);
                entry
            })
            .collect()
    }

    /// Resolve a concrete URI to a registration.
    ///
    /// Static resources match first (exact URI). Among matching templates,
    /// the longest literal prefix wins; at equal length, the earliest
    /// registration.
    ///
    /// Binding precedence: URI captures, then caller-supplied `extra`
    /// parameters, then registration defaults — each filling only names
    /// the previous layer left unbound.
    #[must_use]
    pub fn resolve_resource(
        &self,
        uri: &str,
        extra: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Option<ResolvedResource> {
        let resources = self
            .resources
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let (resource, bindings) = if let Some(found) = resources
            .iter()
            .find(|r| r.template.is_none() && r.pattern == uri)
        {
            (found, Bindings::new())
        } else {
            let mut best: Option<(&RegisteredResource, Bindings, usize)> = None;
            for candidate in resources.iter() {
                let Some(template) = &candidate.template else {
                    continue;
                };
                let Some(bindings) = template.match_uri(uri) else {
                    continue;
                };
                let prefix = template.literal_prefix_len();
                // Strictly-greater keeps the earliest registration on ties.
                if best.as_ref().is_none_or(|(_, _, len)| prefix > *len) {
                    best = Some((candidate, bindings, prefix));
                }
            }
            let (resource, bindings, _) = best?;
            (resource, bindings)
        };

        let mut params = bindings;
        if let Some(extra) = extra {
            for (name, value) in extra {
                if !params.contains(name) {
                    params.insert(name.clone(), stringify_param(value));
                }
            }
        }
        for (name, value) in &resource.defaults {
            if !params.contains(name) {
                params.insert(name.clone(), value.clone());
            }
        }

        Some(ResolvedResource {
            resource: resource.clone(),
            request: ResourceRequest {
                uri: uri.to_string(),
                params,
            },
        })
    }

    // =========================================================================
    // Prompts
    // =========================================================================

    /// Register a prompt. Fails on duplicate names.
    pub fn register_prompt(&self, prompt: Prompt) -> Result<(), McpError> {
        let mut prompts = self
            .prompts
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if prompts.iter().any(|p| p.name == prompt.name) {
            return Err(McpError::invalid_request(format!(
                "prompt '{}' is already registered",
                prompt.name
            )));
        }
        tracing::debug!(prompt = %prompt.name, "prompt registered");
        prompts.push(prompt);
        Ok(())
    }

    /// Look up a prompt by name.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<Prompt> {
        self.prompts
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    /// The prompt catalog with derived argument lists, for `prompts/list`.
    #[must_use]
    pub fn list_prompts(&self) -> Vec<(Prompt, Vec<PromptArgument>)> {
        self.prompts
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|p| (p.clone(), p.arguments()))
            .collect()
    }
}

/// Display form of a caller-supplied parameter value.
fn stringify_param(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
