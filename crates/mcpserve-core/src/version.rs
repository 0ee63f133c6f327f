//! Protocol version types and selection.
//!
//! The runtime speaks three MCP revisions. The negotiated version decides
//! the shape of resource-read responses, which content kinds a sampling
//! request may carry, and the per-request token ceiling for sampling.
//!
//! # Revision History
//!
//! | Version | Resource read envelope | Audio | Streaming sampling |
//! |---------|------------------------|-------|--------------------|
//! | 2024-11-05 | flat `content` array | coerced to `link` | no |
//! | 2025-03-26 | wrapped `contents` | `{data, mimeType}` | yes |
//! | draft | wrapped `contents` | `{audioUrl, mimeType}` | yes |
//!
//! # Example
//!
//! ```rust
//! use mcpserve_core::version::ProtocolVersion;
//!
//! let version = ProtocolVersion::select("2025-03-26").unwrap();
//! assert!(version.supports_audio_content());
//! assert!(version.uses_wrapped_contents());
//!
//! // "latest" and a "v" prefix are normalized; empty picks the default.
//! assert_eq!(ProtocolVersion::select("latest").unwrap(), ProtocolVersion::V2025_03_26);
//! assert_eq!(ProtocolVersion::select("v2024-11-05").unwrap(), ProtocolVersion::V2024_11_05);
//! assert_eq!(ProtocolVersion::select("").unwrap(), ProtocolVersion::DEFAULT);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ContentKind;

/// MCP protocol revisions in chronological order.
///
/// The ordering is `V2024_11_05 < V2025_03_26 < Draft`, so revisions can be
/// compared directly:
///
/// ```rust
/// use mcpserve_core::version::ProtocolVersion;
///
/// assert!(ProtocolVersion::Draft > ProtocolVersion::V2024_11_05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ProtocolVersion {
    /// Original revision (November 2024).
    ///
    /// Resource reads return a flat `content` array; audio content is not
    /// representable and is coerced to a link.
    V2024_11_05,

    /// March 2025 revision.
    ///
    /// Resource reads return wrapped `contents` entries; adds inline audio
    /// content and streaming sampling.
    V2025_03_26,

    /// The in-progress draft revision.
    ///
    /// Like 2025-03-26, but audio content is carried by reference
    /// (`audioUrl`) rather than inline base64.
    Draft,
}

impl ProtocolVersion {
    /// The latest stable revision.
    pub const LATEST_STABLE: Self = Self::V2025_03_26;

    /// The revision selected when the client does not name one.
    ///
    /// `draft` is never selected implicitly.
    pub const DEFAULT: Self = Self::LATEST_STABLE;

    /// All supported revisions in chronological order.
    pub const ALL: &'static [Self] = &[Self::V2024_11_05, Self::V2025_03_26, Self::Draft];

    /// The string form used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V2024_11_05 => "2024-11-05",
            Self::V2025_03_26 => "2025-03-26",
            Self::Draft => "draft",
        }
    }

    /// Resolve the `protocolVersion` parameter of an `initialize` request.
    ///
    /// Normalization before lookup:
    /// - an empty string selects [`Self::DEFAULT`];
    /// - `"latest"` selects the latest stable revision;
    /// - a leading `v` is stripped (`"v2025-03-26"` reads as `"2025-03-26"`).
    ///
    /// Any other unknown string is an error; the dispatcher reports it as
    /// invalid params.
    pub fn select(requested: &str) -> Result<Self, UnknownVersion> {
        let trimmed = requested.trim();
        if trimmed.is_empty() {
            return Ok(Self::DEFAULT);
        }
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::LATEST_STABLE);
        }
        let normalized = trimmed
            .strip_prefix('v')
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(trimmed);
        normalized.parse()
    }

    // =========================================================================
    // Response shape
    // =========================================================================

    /// Whether resource reads are wrapped in a `contents` array of
    /// `{uri, text|blob, content}` entries.
    ///
    /// `2024-11-05` returns a flat `content` array instead.
    #[must_use]
    pub const fn uses_wrapped_contents(&self) -> bool {
        !matches!(self, Self::V2024_11_05)
    }

    /// Whether audio content items are representable at all.
    ///
    /// On `2024-11-05` the wire adapter coerces audio to a link.
    #[must_use]
    pub const fn supports_audio_content(&self) -> bool {
        !matches!(self, Self::V2024_11_05)
    }

    /// Whether audio items carry an `audioUrl` reference instead of inline
    /// base64 `data`.
    #[must_use]
    pub const fn audio_carries_url(&self) -> bool {
        matches!(self, Self::Draft)
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// Whether the client may stream sampling results incrementally.
    #[must_use]
    pub const fn supports_streaming_sampling(&self) -> bool {
        !matches!(self, Self::V2024_11_05)
    }

    /// Content kinds permitted in sampling messages for this revision.
    #[must_use]
    pub const fn sampling_content_kinds(&self) -> &'static [ContentKind] {
        match self {
            Self::V2024_11_05 => &[ContentKind::Text, ContentKind::Image],
            Self::V2025_03_26 | Self::Draft => {
                &[ContentKind::Text, ContentKind::Image, ContentKind::Audio]
            }
        }
    }

    /// Whether a sampling message may carry the given content kind.
    #[must_use]
    pub fn allows_sampling_kind(&self, kind: ContentKind) -> bool {
        self.sampling_content_kinds().contains(&kind)
    }

    /// The default per-request token ceiling for sampling.
    ///
    /// The draft revision is deliberately conservative while its sampling
    /// surface settles.
    #[must_use]
    pub const fn max_sampling_tokens(&self) -> u32 {
        match self {
            Self::V2024_11_05 => 4096,
            Self::V2025_03_26 => 8192,
            Self::Draft => 2048,
        }
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a version string the runtime does not speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVersion {
    /// The rejected version string.
    pub requested: String,
}

impl fmt::Display for UnknownVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown protocol version '{}', supported versions: {:?}",
            self.requested,
            ProtocolVersion::ALL
                .iter()
                .map(ProtocolVersion::as_str)
                .collect::<Vec<_>>()
        )
    }
}

impl std::error::Error for UnknownVersion {}

impl FromStr for ProtocolVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2024-11-05" => Ok(Self::V2024_11_05),
            "2025-03-26" => Ok(Self::V2025_03_26),
            "draft" => Ok(Self::Draft),
            _ => Err(UnknownVersion {
                requested: s.to_string(),
            }),
        }
    }
}

impl From<ProtocolVersion> for String {
    fn from(version: ProtocolVersion) -> Self {
        version.as_str().to_string()
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = UnknownVersion;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<&str> for ProtocolVersion {
    type Error = UnknownVersion;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}
