//! URI-template parsing, matching, and expansion.
//!
//! Templates use curly-brace parameters in two forms: simple (`{id}`) and
//! wildcard (`{path*}`). Matching is segment-wise: literals must match
//! exactly, simple parameters capture exactly one non-empty segment, and a
//! wildcard — which must be the final segment — greedily captures the
//! non-empty remainder, slashes included.
//!
//! # Example
//!
//! ```rust
//! use mcpserve_core::uri::UriTemplate;
//!
//! let template = UriTemplate::parse("/files/{dir}/{path*}").unwrap();
//! let bindings = template.match_uri("/files/docs/a/b/c.txt").unwrap();
//! assert_eq!(bindings.get("dir"), Some("docs"));
//! assert_eq!(bindings.get("path"), Some("a/b/c.txt"));
//!
//! // Expansion inverts matching.
//! assert_eq!(template.expand(&bindings).unwrap(), "/files/docs/a/b/c.txt");
//! ```

use std::fmt;

use thiserror::Error;

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

/// Errors produced when parsing a template pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A segment has unbalanced `{`/`}` braces.
    #[error("unbalanced braces in segment '{0}'")]
    UnbalancedBraces(String),
    /// A parameter name is empty or contains characters outside
    /// `[A-Za-z0-9_]`.
    #[error("invalid parameter name in segment '{0}'")]
    InvalidParameter(String),
    /// A wildcard parameter appears before the final segment.
    #[error("wildcard parameter '{0}' must be the final segment")]
    WildcardNotLast(String),
    /// The same parameter name appears twice.
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
}

/// Error produced when expanding a template with incomplete bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no binding for parameter '{name}'")]
pub struct ExpandError {
    /// The unbound parameter.
    pub name: String,
}

/// An ordered parameter-name to captured-substring mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(Vec<(String, String)>);

impl Bindings {
    /// Create an empty binding set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a binding, replacing any existing value for the name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Look up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a binding exists for the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over bindings in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the binding set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl UriTemplate {
    /// Parse a template pattern.
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let raw_segments: Vec<&str> = pattern.split('/').collect();
        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut seen: Vec<&str> = Vec::new();

        for (index, raw) in raw_segments.iter().enumerate() {
            let open = raw.matches('{').count();
            let close = raw.matches('}').count();
            if open != close {
                return Err(TemplateError::UnbalancedBraces((*raw).to_string()));
            }
            if open == 0 {
                segments.push(Segment::Literal((*raw).to_string()));
                continue;
            }
            // A parameter segment is exactly one brace pair spanning the
            // whole segment.
            if open != 1 || !raw.starts_with('{') || !raw.ends_with('}') {
                return Err(TemplateError::InvalidParameter((*raw).to_string()));
            }
            let inner = &raw[1..raw.len() - 1];
            let (name, wildcard) = match inner.strip_suffix('*') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(TemplateError::InvalidParameter((*raw).to_string()));
            }
            if seen.contains(&name) {
                return Err(TemplateError::DuplicateParameter(name.to_string()));
            }
            seen.push(name);
            if wildcard {
                if index + 1 != raw_segments.len() {
                    return Err(TemplateError::WildcardNotLast(name.to_string()));
                }
                segments.push(Segment::Wildcard(name.to_string()));
            } else {
                segments.push(Segment::Param(name.to_string()));
            }
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// Whether a pattern string contains template parameters at all.
    ///
    /// Registries use this to split the static catalog from the template
    /// catalog.
    #[must_use]
    pub fn is_template(pattern: &str) -> bool {
        pattern.contains('{') || pattern.contains('}')
    }

    /// The original pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Parameter names in template order.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param(n) | Segment::Wildcard(n) => Some(n.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Whether the template has any parameters.
    #[must_use]
    pub fn has_params(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Literal(_)))
    }

    /// The character length of the leading literal portion, used by the
    /// registry's tie-break: the template with the longer literal prefix
    /// wins when several match.
    #[must_use]
    pub fn literal_prefix_len(&self) -> usize {
        let mut len = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if index > 0 {
                        len += 1; // the joining '/'
                    }
                    len += lit.len();
                }
                _ => break,
            }
        }
        len
    }

    /// Match a concrete URI against this template.
    ///
    /// Returns the ordered parameter bindings, or `None` if the URI does
    /// not match. Every captured value is non-empty.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<Bindings> {
        let parts: Vec<&str> = uri.split('/').collect();
        let mut bindings = Bindings::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(index)? != lit {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = *parts.get(index)?;
                    if value.is_empty() {
                        return None;
                    }
                    bindings.insert(name.clone(), value);
                }
                Segment::Wildcard(name) => {
                    // Greedy: the rest of the URI, slashes included.
                    if index >= parts.len() {
                        return None;
                    }
                    let rest = parts[index..].join("/");
                    if rest.is_empty() {
                        return None;
                    }
                    bindings.insert(name.clone(), rest);
                    return Some(bindings);
                }
            }
        }

        // No wildcard: the URI must not have extra segments.
        if parts.len() == self.segments.len() {
            Some(bindings)
        } else {
            None
        }
    }

    /// Expand the template with the given bindings.
    ///
    /// Expansion with the bindings captured by [`Self::match_uri`] yields
    /// the original URI.
    pub fn expand(&self, bindings: &Bindings) -> Result<String, ExpandError> {
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => parts.push(lit.clone()),
                Segment::Param(name) | Segment::Wildcard(name) => {
                    let value = bindings.get(name).ok_or_else(|| ExpandError {
                        name: name.clone(),
                    })?;
                    parts.push(value.to_string());
                }
            }
        }
        Ok(parts.join("/"))
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
