//! Content type detection from raw markup.

use crate::types::ContentType;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Checked in order; the first matching start tag decides the type
    static ref TYPE_PATTERNS: Vec<(ContentType, Regex)> = vec![
        (ContentType::Image, Regex::new(r"(?i)<img\b[^>]*>").unwrap()),
        (ContentType::Video, Regex::new(r"(?i)<video\b[^>]*>").unwrap()),
        (ContentType::Audio, Regex::new(r"(?i)<audio\b[^>]*>").unwrap()),
        (ContentType::Table, Regex::new(r"(?i)<table\b[^>]*>").unwrap()),
        (ContentType::Code, Regex::new(r"(?i)<code\b[^>]*>").unwrap()),
    ];
}

/// Classify markup by the highest-priority media or structure tag it contains.
///
/// Priority is image, video, audio, table, code. Markup with none of these
/// tags is `Text`.
pub fn detect_content_type(markup: &str) -> ContentType {
    TYPE_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(markup))
        .map(|(content_type, _)| *content_type)
        .unwrap_or(ContentType::Text)
}
