//! Hyperlink extraction from captured markup and plain text.
//!
//! Extraction runs in two phases:
//! - Anchors: the markup is parsed into a detached DOM and every `<a href>`
//!   is read from it, resolved against an optional base URL
//! - Bare URLs: a link finder over the plain text catches URLs that are not
//!   wrapped in anchors
//!
//! Both phases share one set of seen URLs, so each URL appears at most once.

use crate::types::{normalize_whitespace, CaptureError, Link};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace, warn};
use url::Url;

/// Schemes that execute script when followed
const SCRIPT_SCHEMES: &[&str] = &["javascript", "vbscript"];

lazy_static! {
    // Schemed URLs, www hosts, and bare domains on common TLDs
    static ref TEXT_URL: Regex = Regex::new(
        r#"(?i)\b(?:[a-z][a-z0-9+.\-]*://[^\s<>"']+|www\.[^\s<>"']+|(?:[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?\.)+(?:com|org|net|edu|gov|mil|int|io|dev|app|ai|co|me|rs|sh|gg|fm|tv|to|ly|info|biz|xyz|site|tech|online|store|blog|news|cloud|page|wiki|us|uk|eu|de|fr|es|it|nl|se|no|fi|dk|ch|at|be|pl|cz|pt|ie|ru|ua|cn|jp|kr|in|br|au|nz|ca|mx)\b(?:[/?#][^\s<>"']*)?)"#
    ).unwrap();

    static ref HAS_SCHEME: Regex = Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://").unwrap();

    static ref HTTP_SCHEME: Regex = Regex::new(r"(?i)^https?://").unwrap();
}

/// Extract links from markup and its plain text.
///
/// If the markup cannot be read the failure is logged and extraction ends
/// with whatever was collected so far.
pub fn extract_links(markup: &str, plain_text: &str, base_url: Option<&Url>) -> Vec<Link> {
    if markup.is_empty() && plain_text.is_empty() {
        return Vec::new();
    }

    let mut collector = LinkCollector::default();

    if let Err(e) = collector.collect_anchors(markup, base_url) {
        warn!("Link extraction failed: {}", e);
        return collector.into_links();
    }

    if !plain_text.is_empty() {
        collector.collect_text_links(plain_text);
    }

    collector.into_links()
}

/// Find bare URLs in plain text.
///
/// Returns `(href, matched text)` pairs. Schemeless matches get `http://`
/// prepended to their href. Matches touching an `@` belong to an email
/// address and are skipped.
pub fn find_text_urls(text: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();

    for m in TEXT_URL.find_iter(text) {
        if text[..m.start()].ends_with('@') || text[m.end()..].starts_with('@') {
            continue;
        }

        let value = trim_trailing_punctuation(m.as_str());
        if value.is_empty() {
            continue;
        }

        let href = if HAS_SCHEME.is_match(value) {
            value.to_string()
        } else {
            format!("http://{}", value)
        };
        found.push((href, value.to_string()));
    }

    found
}

/// Whether a URL uses a scheme that executes script.
///
/// Tabs and newlines inside the URL are ignored, as URL parsers do.
pub fn is_script_url(url: &str) -> bool {
    let cleaned = strip_url_whitespace(url);
    match Url::parse(&cleaned) {
        Ok(parsed) => is_script_scheme(parsed.scheme()),
        Err(_) => {
            let lower = cleaned.to_ascii_lowercase();
            SCRIPT_SCHEMES
                .iter()
                .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| rest.starts_with(':')))
        }
    }
}

fn is_script_scheme(scheme: &str) -> bool {
    SCRIPT_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme))
}

/// Drop leading and trailing controls and spaces, and every tab and newline
fn strip_url_whitespace(url: &str) -> String {
    url.trim_matches(|c: char| c <= ' ')
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

#[derive(Default)]
struct LinkCollector {
    links: Vec<Link>,
    seen: HashSet<String>,
}

impl LinkCollector {
    fn push(&mut self, url: String, text: String) {
        if self.seen.insert(url.clone()) {
            self.links.push(Link { url, text });
        } else {
            trace!("Skipping duplicate link {}", url);
        }
    }

    fn collect_anchors(&mut self, markup: &str, base_url: Option<&Url>) -> Result<(), CaptureError> {
        if markup.is_empty() {
            return Ok(());
        }

        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut markup.as_bytes())?;

        let mut anchors = Vec::new();
        find_anchors(&dom.document, &mut anchors);

        for (raw_href, text) in anchors {
            let Some(url) = resolve_href(&raw_href, base_url) else {
                continue;
            };

            let text = normalize_whitespace(&text);
            let text = if text.is_empty() { url.clone() } else { text };
            self.push(url, text);
        }

        Ok(())
    }

    fn collect_text_links(&mut self, plain_text: &str) {
        for (href, value) in find_text_urls(plain_text) {
            if is_script_url(&href) || !HTTP_SCHEME.is_match(&href) {
                continue;
            }
            self.push(href, value);
        }
    }

    fn into_links(self) -> Vec<Link> {
        self.links
    }
}

/// Collect `(href, text content)` for every anchor carrying an href, in
/// document order
fn find_anchors(handle: &Handle, anchors: &mut Vec<(String, String)>) {
    if let NodeData::Element { name, attrs, .. } = &handle.data {
        if name.local.as_ref() == "a" {
            let href = attrs
                .borrow()
                .iter()
                .find(|a| a.name.local.as_ref() == "href")
                .map(|a| a.value.to_string());
            if let Some(href) = href {
                anchors.push((href, text_content(handle)));
            }
        }
    }

    for child in handle.children.borrow().iter() {
        find_anchors(child, anchors);
    }
}

fn text_content(handle: &Handle) -> String {
    fn collect(handle: &Handle, text: &mut String) {
        match &handle.data {
            NodeData::Text { contents } => text.push_str(&contents.borrow()),
            _ => {
                for child in handle.children.borrow().iter() {
                    collect(child, text);
                }
            }
        }
    }

    let mut text = String::new();
    collect(handle, &mut text);
    text
}

/// Resolve an anchor href. Absolute hrefs are kept as written and relative
/// ones are joined onto the base URL when there is one. Hrefs that do not
/// parse are kept as written. Returns `None` for empty and script URLs.
fn resolve_href(href: &str, base_url: Option<&Url>) -> Option<String> {
    let href = strip_url_whitespace(href);
    if href.is_empty() {
        return None;
    }

    let url = match Url::parse(&href) {
        Ok(parsed) if is_script_scheme(parsed.scheme()) => return None,
        Ok(_) => href,
        Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
            Some(base) => match base.join(&href) {
                Ok(joined) => joined.to_string(),
                Err(e) => {
                    debug!("Keeping unresolvable href {:?}: {}", href, e);
                    href
                }
            },
            None => href,
        },
        Err(e) => {
            debug!("Keeping unparsable href {:?}: {}", href, e);
            href
        }
    };

    if is_script_url(&url) {
        None
    } else {
        Some(url)
    }
}

fn trim_trailing_punctuation(candidate: &str) -> &str {
    let mut end = candidate.len();

    while let Some(last) = candidate[..end].chars().last() {
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | ']' | '}' => true,
            ')' => {
                let head = &candidate[..end];
                head.matches(')').count() > head.matches('(').count()
            }
            _ => false,
        };
        if !trim {
            break;
        }
        end -= last.len_utf8();
    }

    &candidate[..end]
}
