//! Resource types.
//!
//! Resources are URI-addressable content. A resource whose URI pattern
//! contains `{param}` segments is a template: it is listed by
//! `resources/templates/list` and never by `resources/list`.

use serde::{Deserialize, Serialize};

use super::content::Content;

/// A concrete (non-template) resource as it appears in `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// URI identifying the resource.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Description of what the resource contains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource content.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Free-form tags.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
}

impl Resource {
    /// Create a new resource listing entry.
    #[must_use]
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            tags: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A template resource as it appears in `resources/templates/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// URI template with `{param}` placeholders.
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Human-readable name.
    pub name: String,
    /// Description of the resource family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of resources matching this template.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceTemplate {
    /// Create a new template listing entry.
    #[must_use]
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// What a resource handler produces.
///
/// The dispatcher shapes this into the version-appropriate read envelope;
/// `metadata` is carried through untouched.
#[derive(Debug, Clone, Default)]
pub struct ResourceOutput {
    /// Content items of the read.
    pub content: Vec<Content>,
    /// Arbitrary metadata to surface alongside the contents.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ResourceOutput {
    /// Create an output with a single text item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            metadata: None,
        }
    }

    /// Create an output from content items.
    #[must_use]
    pub fn content(content: Vec<Content>) -> Self {
        Self {
            content,
            metadata: None,
        }
    }

    /// Create an empty output.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach a metadata key/value pair.
    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_entries() {
        let resource = Resource::new("/text", "Greeting")
            .description("A static greeting")
            .mime_type("text/plain")
            .tag("demo");
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["uri"], "/text");
        assert_eq!(json["mimeType"], "text/plain");
        assert_eq!(json["tags"][0], "demo");

        let template = ResourceTemplate::new("/users/{id}", "User").mime_type("application/json");
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["uriTemplate"], "/users/{id}");
    }

    #[test]
    fn empty_tags_are_omitted() {
        let json = serde_json::to_value(Resource::new("/a", "A")).unwrap();
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn output_metadata() {
        let output = ResourceOutput::text("User ID: 123")
            .metadata("resourceType", serde_json::json!("user"));
        assert_eq!(
            output.metadata.unwrap()["resourceType"],
            serde_json::json!("user")
        );
    }
}
