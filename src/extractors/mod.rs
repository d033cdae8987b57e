//! Markup inspection for captured content.
//!
//! This module provides the inspection seam used by the capture pipeline:
//! - Content type: classification by the first media or structure tag
//! - Links: anchors in the markup plus bare URLs in the plain text
//!
//! `ContentInspector` is the capability the pipeline depends on, so hosts and
//! tests can swap in their own implementation.

pub mod content_type;
pub mod links;

pub use content_type::detect_content_type;
pub use links::extract_links;

use crate::types::{ContentType, Link};
use url::Url;

/// Classifies markup and finds the links in captured content
pub trait ContentInspector: Send + Sync {
    /// Classify captured markup
    fn classify(&self, markup: &str) -> ContentType;

    /// Find links in captured markup and its plain text, unique by URL
    fn find_links(&self, markup: &str, plain_text: &str) -> Vec<Link>;
}

/// Inspector working directly on serialized markup
#[derive(Debug, Clone, Default)]
pub struct MarkupInspector {
    /// Base for resolving relative anchor hrefs
    base_url: Option<Url>,
}

impl MarkupInspector {
    pub fn new(base_url: Option<Url>) -> Self {
        Self { base_url }
    }
}

impl ContentInspector for MarkupInspector {
    fn classify(&self, markup: &str) -> ContentType {
        detect_content_type(markup)
    }

    fn find_links(&self, markup: &str, plain_text: &str) -> Vec<Link> {
        extract_links(markup, plain_text, self.base_url.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_inspector_uses_base_url() {
        let base = Url::parse("https://docs.example.com/guide/").unwrap();
        let inspector = MarkupInspector::new(Some(base));

        let links = inspector.find_links(r#"<a href="intro">Intro</a>"#, "Intro");
        assert_eq!(links, vec![Link::new("https://docs.example.com/guide/intro", "Intro")]);
    }

    #[test]
    fn test_markup_inspector_classify() {
        let inspector = MarkupInspector::default();
        assert_eq!(inspector.classify("<figure><img src=a></figure>"), ContentType::Image);
        assert_eq!(inspector.classify("<p>words</p>"), ContentType::Text);
    }
}
