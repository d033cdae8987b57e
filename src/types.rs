//! Core types used throughout the capture pipeline.
//!
//! This module defines the captured content record, its classification tag,
//! extracted links, and the opaque element handle used for identity checks.

use serde::{Deserialize, Serialize};

/// Opaque reference to a node in the host document.
///
/// Two handles are equal only when they point at the same node; the id is
/// assigned by the host and carries no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub u64);

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Classification tag for captured content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Image,
    Video,
    Audio,
    Table,
    Code,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Table => "table",
            ContentType::Code => "code",
            ContentType::Text => "text",
        }
    }
}

/// A hyperlink found in captured content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

impl Link {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Bounding rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// A single capture emitted to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedContent {
    /// Classification, decided by first matching tag
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Whitespace-normalized plain text
    pub content: String,
    /// Raw inner markup of the captured region
    pub html: String,
    /// Links in document order, unique by URL
    pub links: Vec<Link>,
    /// Present only for selection captures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Present only for hover captures
    #[serde(skip)]
    pub element: Option<ElementHandle>,
    /// Capture time (Unix milliseconds)
    pub captured_at: i64,
}

impl CapturedContent {
    /// Whether this record was captured from the given element
    pub fn is_from(&self, element: ElementHandle) -> bool {
        self.element == Some(element)
    }
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Errors that can occur while reading the host document or its markup
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Element not found: {0}")]
    ElementNotFound(ElementHandle),

    #[error("Element is detached from the document: {0}")]
    DetachedNode(ElementHandle),

    #[error("Selection unavailable: {0}")]
    Selection(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Capture service has stopped")]
    ServiceStopped,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_as_str() {
        assert_eq!(ContentType::Image.as_str(), "image");
        assert_eq!(ContentType::Code.as_str(), "code");
        assert_eq!(ContentType::Text.as_str(), "text");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello \n\n world\t "), "hello world");
        assert_eq!(normalize_whitespace("\n\n"), "");
        assert_eq!(normalize_whitespace("one"), "one");
    }

    #[test]
    fn test_captured_content_serializes_type_tag() {
        let content = CapturedContent {
            content_type: ContentType::Table,
            content: "a b".to_string(),
            html: "<table></table>".to_string(),
            links: vec![],
            position: None,
            element: Some(ElementHandle(4)),
            captured_at: 0,
        };

        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "table");
        // Element handles never leave the process, position is omitted when absent
        assert!(json.get("element").is_none());
        assert!(json.get("position").is_none());
    }

    #[test]
    fn test_is_from_compares_identity() {
        let content = CapturedContent {
            content_type: ContentType::Text,
            content: String::new(),
            html: String::new(),
            links: vec![],
            position: None,
            element: Some(ElementHandle(7)),
            captured_at: 0,
        };

        assert!(content.is_from(ElementHandle(7)));
        assert!(!content.is_from(ElementHandle(8)));
    }
}
