//! Content items for tool results, resource reads, and sampling messages.
//!
//! Content is a tagged union: `text`, `image`, `link`, `audio`, or `blob`.
//! The in-memory representation is version-agnostic; [`Content::to_wire`]
//! is the single adaptation point that produces the JSON shape a given
//! protocol revision expects, including the lossy audio-to-link coercion on
//! `2024-11-05`.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::version::ProtocolVersion;

/// A typed fragment of a tool or resource reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text.
    Text(TextContent),
    /// An image, referenced by URL.
    Image(ImageContent),
    /// A link to external content.
    Link(LinkContent),
    /// Audio, inline (base64) or referenced by URL.
    Audio(AudioContent),
    /// Opaque binary data (base64).
    Blob(BlobContent),
}

/// Plain text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text payload.
    pub text: String,
}

/// Image content, referenced by URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// URL of the image.
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    /// Alternative text for the image.
    #[serde(rename = "altText", skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// A link to external content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkContent {
    /// Target URL.
    pub url: String,
    /// Human-readable link title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Audio content.
///
/// At least one of `data` (inline base64) or `audio_url` is present; which
/// one reaches the wire depends on the negotiated revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioContent {
    /// Inline base64 audio payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// URL of the audio.
    #[serde(rename = "audioUrl", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// MIME type (e.g. "audio/mpeg").
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Opaque binary content (base64).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobContent {
    /// Base64-encoded payload.
    pub data: String,
    /// MIME type of the payload.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// The discriminant of a [`Content`] value.
///
/// Used by the sampling controller to enforce per-version allow-sets
/// without inspecting payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Plain text.
    Text,
    /// An image.
    Image,
    /// A link.
    Link,
    /// Audio.
    Audio,
    /// Opaque binary data.
    Blob,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Link => "link",
            Self::Audio => "audio",
            Self::Blob => "blob",
        };
        f.write_str(s)
    }
}

impl Content {
    /// Create text content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextContent { text: text.into() })
    }

    /// Create image content from a URL.
    #[must_use]
    pub fn image(image_url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self::Image(ImageContent {
            image_url: image_url.into(),
            alt_text: Some(alt_text.into()),
        })
    }

    /// Create link content.
    #[must_use]
    pub fn link(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::Link(LinkContent {
            url: url.into(),
            title: Some(title.into()),
        })
    }

    /// Create audio content referencing a URL.
    #[must_use]
    pub fn audio_url(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Audio(AudioContent {
            data: None,
            audio_url: Some(url.into()),
            mime_type: mime_type.into(),
        })
    }

    /// Create audio content from an inline base64 payload.
    #[must_use]
    pub fn audio_data(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Audio(AudioContent {
            data: Some(data.into()),
            audio_url: None,
            mime_type: mime_type.into(),
        })
    }

    /// Create blob content from raw bytes.
    #[must_use]
    pub fn blob(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::Blob(BlobContent {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        })
    }

    /// Create blob content from an already-encoded base64 payload.
    #[must_use]
    pub fn blob_base64(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Blob(BlobContent {
            data: data.into(),
            mime_type: mime_type.into(),
        })
    }

    /// The discriminant of this content value.
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match self {
            Self::Text(_) => ContentKind::Text,
            Self::Image(_) => ContentKind::Image,
            Self::Link(_) => ContentKind::Link,
            Self::Audio(_) => ContentKind::Audio,
            Self::Blob(_) => ContentKind::Blob,
        }
    }

    /// Get the text if this is text content.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Check if this is text content.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Produce the wire form of this content for the given revision.
    ///
    /// This is a pure, exhaustive function over variant and version. The
    /// only lossy case is audio on `2024-11-05`, which becomes a link
    /// carrying the original URL (or a `data:` URI for inline audio).
    #[must_use]
    pub fn to_wire(&self, version: ProtocolVersion) -> serde_json::Value {
        match self {
            Self::Text(t) => serde_json::json!({ "type": "text", "text": t.text }),
            Self::Image(i) => serde_json::json!({
                "type": "image",
                "imageUrl": i.image_url,
                "altText": i.alt_text,
            }),
            Self::Link(l) => serde_json::json!({
                "type": "link",
                "url": l.url,
                "title": l.title,
            }),
            Self::Audio(a) => audio_to_wire(a, version),
            Self::Blob(b) => serde_json::json!({
                "type": "blob",
                "data": b.data,
                "mimeType": b.mime_type,
            }),
        }
    }
}

/// Version-dependent wire form of an audio item.
fn audio_to_wire(audio: &AudioContent, version: ProtocolVersion) -> serde_json::Value {
    let url_form = || {
        audio
            .audio_url
            .clone()
            .or_else(|| audio.data.as_ref().map(|d| data_uri(d, &audio.mime_type)))
            .unwrap_or_default()
    };

    if !version.supports_audio_content() {
        return serde_json::json!({
            "type": "link",
            "url": url_form(),
            "title": audio.mime_type,
        });
    }

    if version.audio_carries_url() {
        serde_json::json!({
            "type": "audio",
            "audioUrl": url_form(),
            "mimeType": audio.mime_type,
        })
    } else {
        // Inline form; a URL-only registration falls back to carrying the
        // URL string in the data slot since the envelope requires `data`.
        let data = audio
            .data
            .clone()
            .or_else(|| audio.audio_url.clone())
            .unwrap_or_default();
        serde_json::json!({
            "type": "audio",
            "data": data,
            "mimeType": audio.mime_type,
        })
    }
}

fn data_uri(base64_payload: &str, mime_type: &str) -> String {
    format!("data:{mime_type};base64,{base64_payload}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_wire_form_is_version_independent() {
        let content = Content::text("hello");
        for version in ProtocolVersion::ALL {
            assert_eq!(
                content.to_wire(*version),
                serde_json::json!({ "type": "text", "text": "hello" })
            );
        }
    }

    #[test]
    fn image_wire_form() {
        let content = Content::image("https://example.com/cat.png", "a cat");
        let wire = content.to_wire(ProtocolVersion::V2025_03_26);
        assert_eq!(wire["type"], "image");
        assert_eq!(wire["imageUrl"], "https://example.com/cat.png");
        assert_eq!(wire["altText"], "a cat");
    }

    #[test]
    fn audio_coerces_to_link_on_oldest_version() {
        let content = Content::audio_url("https://cdn.example/clip.mp3", "audio/mpeg");
        let wire = content.to_wire(ProtocolVersion::V2024_11_05);
        assert_eq!(
            wire,
            serde_json::json!({
                "type": "link",
                "url": "https://cdn.example/clip.mp3",
                "title": "audio/mpeg",
            })
        );
    }

    #[test]
    fn inline_audio_coerces_to_data_uri_link() {
        let content = Content::audio_data("QUJD", "audio/wav");
        let wire = content.to_wire(ProtocolVersion::V2024_11_05);
        assert_eq!(wire["type"], "link");
        assert_eq!(wire["url"], "data:audio/wav;base64,QUJD");
    }

    #[test]
    fn audio_is_inline_on_2025_03_26() {
        let content = Content::audio_data("QUJD", "audio/wav");
        let wire = content.to_wire(ProtocolVersion::V2025_03_26);
        assert_eq!(
            wire,
            serde_json::json!({ "type": "audio", "data": "QUJD", "mimeType": "audio/wav" })
        );
    }

    #[test]
    fn audio_is_url_on_draft() {
        let content = Content::audio_url("https://cdn.example/clip.mp3", "audio/mpeg");
        let wire = content.to_wire(ProtocolVersion::Draft);
        assert_eq!(
            wire,
            serde_json::json!({
                "type": "audio",
                "audioUrl": "https://cdn.example/clip.mp3",
                "mimeType": "audio/mpeg",
            })
        );
    }

    #[test]
    fn inline_audio_becomes_data_uri_on_draft() {
        let content = Content::audio_data("QUJD", "audio/ogg");
        let wire = content.to_wire(ProtocolVersion::Draft);
        assert_eq!(wire["audioUrl"], "data:audio/ogg;base64,QUJD");
    }

    #[test]
    fn blob_round_trips_base64() {
        let content = Content::blob(b"binary", "application/octet-stream");
        let Content::Blob(blob) = &content else {
            panic!("expected blob");
        };
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&blob.data)
            .unwrap();
        assert_eq!(decoded, b"binary");

        let wire = content.to_wire(ProtocolVersion::Draft);
        assert_eq!(wire["type"], "blob");
        assert_eq!(wire["mimeType"], "application/octet-stream");
    }

    #[test]
    fn kinds() {
        assert_eq!(Content::text("x").kind(), ContentKind::Text);
        assert_eq!(Content::image("u", "a").kind(), ContentKind::Image);
        assert_eq!(Content::link("u", "t").kind(), ContentKind::Link);
        assert_eq!(Content::audio_url("u", "m").kind(), ContentKind::Audio);
        assert_eq!(Content::blob(b"x", "m").kind(), ContentKind::Blob);
    }

    #[test]
    fn serde_tagged_form() {
        let content = Content::text("hi");
        let json = serde_json::to_string(&content).unwrap();
        assert_eq!(json, r#"{"type":"text","text":"hi"}"#);

        let parsed: Content = serde_json::from_str(
            r#"{"type":"audio","data":"QUJD","mimeType":"audio/wav"}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind(), ContentKind::Audio);
    }
}
