//! Content capture from hover and selection.
//!
//! `ContentCapture` holds the capture mode flag and the last selection and
//! hover capture. Its handlers read the host document, classify and
//! link-extract what they find, and hand each record to the caller's callback.
//!
//! Handlers are synchronous and undebounced; `CaptureService` feeds them from
//! debounced input streams.

use crate::config::CaptureConfig;
use crate::dom::HostDocument;
use crate::extractors::{ContentInspector, MarkupInspector};
use crate::types::{normalize_whitespace, CaptureError, CapturedContent, ElementHandle};
use tracing::{debug, info, trace, warn};

/// Callback receiving every emitted capture
pub type CaptureCallback = Box<dyn FnMut(CapturedContent) + Send>;

/// Hover and selection capture over a host document
pub struct ContentCapture<D> {
    document: D,
    inspector: Box<dyn ContentInspector>,
    /// Key that arms capture mode while held
    modifier_key: String,
    /// Tags accepted as hover capture containers
    block_tags: Vec<String>,
    /// Whether hovering captures blocks
    capture_mode: bool,
    /// Text of the last non-blank selection
    selected_text: String,
    /// Last hover capture, kept to skip re-capturing the same block
    captured_content: Option<CapturedContent>,
    on_captured: CaptureCallback,
    /// Records emitted so far
    emitted: u64,
}

impl<D: HostDocument> ContentCapture<D> {
    /// Create a capture using the markup inspector configured from `config`
    pub fn new<F>(document: D, config: &CaptureConfig, on_captured: F) -> Result<Self, CaptureError>
    where
        F: FnMut(CapturedContent) + Send + 'static,
    {
        let inspector = MarkupInspector::new(config.base_url()?);
        Ok(Self::with_inspector(document, config, Box::new(inspector), on_captured))
    }

    /// Create a capture with a custom inspector
    pub fn with_inspector<F>(
        document: D,
        config: &CaptureConfig,
        inspector: Box<dyn ContentInspector>,
        on_captured: F,
    ) -> Self
    where
        F: FnMut(CapturedContent) + Send + 'static,
    {
        Self {
            document,
            inspector,
            modifier_key: config.modifier_key.clone(),
            block_tags: config.block_tags.clone(),
            capture_mode: false,
            selected_text: String::new(),
            captured_content: None,
            on_captured: Box::new(on_captured),
            emitted: 0,
        }
    }

    pub fn is_capture_mode_active(&self) -> bool {
        self.capture_mode
    }

    pub fn selected_text(&self) -> &str {
        &self.selected_text
    }

    /// Last hover capture
    pub fn captured_content(&self) -> Option<&CapturedContent> {
        self.captured_content.as_ref()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn status(&self) -> CaptureStatus {
        CaptureStatus {
            capture_mode: self.capture_mode,
            emitted: self.emitted,
            last_element: self.captured_content.as_ref().and_then(|c| c.element),
        }
    }

    /// Arm capture mode when the modifier key goes down
    pub fn handle_key_down(&mut self, key: &str) {
        if key == self.modifier_key && !self.capture_mode {
            debug!("Capture mode active ({} down)", key);
            self.capture_mode = true;
        }
    }

    /// Disarm capture mode when the modifier key comes up
    pub fn handle_key_up(&mut self, key: &str) {
        if key == self.modifier_key && self.capture_mode {
            debug!("Capture mode inactive ({} up)", key);
            self.capture_mode = false;
        }
    }

    /// Window lost focus; the key-up may never arrive
    pub fn handle_blur(&mut self) {
        if self.capture_mode {
            debug!("Capture mode inactive (window blur)");
        }
        self.capture_mode = false;
    }

    /// Capture the current selection. Returns whether a record was emitted.
    pub fn handle_selection(&mut self) -> bool {
        match self.capture_selection() {
            Ok(Some(content)) => {
                info!(
                    "Captured selection: {} ({} chars, {} links)",
                    content.content_type.as_str(),
                    content.content.len(),
                    content.links.len()
                );
                self.emit(content);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Selection capture failed: {}", e);
                false
            }
        }
    }

    /// Capture the block under the pointer while capture mode is active.
    /// Returns whether a record was emitted.
    pub fn handle_mouse_move(&mut self, target: ElementHandle) -> bool {
        if !self.capture_mode {
            return false;
        }

        match self.capture_block(target) {
            Ok(Some(content)) => {
                info!(
                    "Captured block {}: {} ({} chars, {} links)",
                    target,
                    content.content_type.as_str(),
                    content.content.len(),
                    content.links.len()
                );
                self.captured_content = Some(content.clone());
                self.emit(content);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Content capture failed for {}: {}", target, e);
                false
            }
        }
    }

    fn capture_selection(&mut self) -> Result<Option<CapturedContent>, CaptureError> {
        let selection = match self.document.selection()? {
            Some(selection) if !selection.text.trim().is_empty() => selection,
            _ => {
                trace!("No selection to capture");
                return Ok(None);
            }
        };

        let text = normalize_whitespace(&selection.text);
        let links = self.inspector.find_links(&selection.markup, &text);
        let content_type = self.inspector.classify(&selection.markup);
        self.selected_text = selection.text;

        Ok(Some(CapturedContent {
            content_type,
            content: text,
            html: selection.markup,
            links,
            position: Some(selection.rect),
            element: None,
            captured_at: chrono::Utc::now().timestamp_millis(),
        }))
    }

    fn capture_block(&mut self, target: ElementHandle) -> Result<Option<CapturedContent>, CaptureError> {
        let container = self.document.closest_block(target, &self.block_tags)?;

        if self
            .captured_content
            .as_ref()
            .is_some_and(|last| last.is_from(container))
        {
            trace!("Block {} already captured", container);
            return Ok(None);
        }

        let html = self.document.inner_html(container)?;
        let text = normalize_whitespace(&self.document.text_content(container)?);
        let links = self.inspector.find_links(&html, &text);
        let content_type = self.inspector.classify(&html);

        Ok(Some(CapturedContent {
            content_type,
            content: text,
            html,
            links,
            position: None,
            element: Some(container),
            captured_at: chrono::Utc::now().timestamp_millis(),
        }))
    }

    fn emit(&mut self, content: CapturedContent) {
        self.emitted += 1;
        (self.on_captured)(content);
    }
}

/// Capture status information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStatus {
    pub capture_mode: bool,
    pub emitted: u64,
    pub last_element: Option<ElementHandle>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, NodeSpec, SelectionSnapshot};
    use crate::types::{ContentType, Link, Position};
    use std::sync::{Arc, Mutex};

    fn document() -> MemoryDocument {
        // 0 div > 1 p > (text, 2 a), 3 section > 4 pre > 5 code
        MemoryDocument::new(
            NodeSpec::element("div")
                .child(
                    NodeSpec::element("p")
                        .child(NodeSpec::text("See "))
                        .child(
                            NodeSpec::element("a")
                                .attr("href", "http://a.com")
                                .child(NodeSpec::text("here")),
                        )
                        .child(NodeSpec::text(" and http://b.com")),
                )
                .child(
                    NodeSpec::element("section").child(
                        NodeSpec::element("pre").child(
                            NodeSpec::element("code")
                                .attr("class", "rust")
                                .child(NodeSpec::text("fn main() {}")),
                        ),
                    ),
                ),
        )
    }

    fn capture() -> (ContentCapture<MemoryDocument>, Arc<Mutex<Vec<CapturedContent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let capture = ContentCapture::new(document(), &CaptureConfig::default(), move |c| {
            sink.lock().unwrap().push(c)
        })
        .unwrap();
        (capture, seen)
    }

    #[test]
    fn test_mode_transitions() {
        let (mut capture, seen) = capture();
        assert!(!capture.is_capture_mode_active());

        capture.handle_key_down("Shift");
        assert!(!capture.is_capture_mode_active());

        capture.handle_key_down("Alt");
        capture.handle_key_down("Alt");
        assert!(capture.is_capture_mode_active());

        // Other keys going up leave the mode alone
        capture.handle_key_up("Shift");
        assert!(capture.is_capture_mode_active());

        capture.handle_key_up("Alt");
        assert!(!capture.is_capture_mode_active());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blur_clears_mode() {
        let (mut capture, _) = capture();
        capture.handle_key_down("Alt");
        capture.handle_blur();
        assert!(!capture.is_capture_mode_active());
    }

    #[test]
    fn test_hover_requires_capture_mode() {
        let (mut capture, seen) = capture();
        for target in 0..6 {
            assert!(!capture.handle_mouse_move(ElementHandle(target)));
        }
        assert!(seen.lock().unwrap().is_empty());
        assert!(capture.captured_content().is_none());
    }

    #[test]
    fn test_hover_captures_enclosing_block() {
        let (mut capture, seen) = capture();
        capture.handle_key_down("Alt");

        assert!(capture.handle_mouse_move(ElementHandle(2)));

        let emitted = seen.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        let content = &emitted[0];
        assert_eq!(content.content_type, ContentType::Text);
        assert_eq!(content.content, "See here and http://b.com");
        assert_eq!(
            content.html,
            r#"See <a href="http://a.com">here</a> and http://b.com"#
        );
        assert_eq!(
            content.links,
            vec![
                Link::new("http://a.com", "here"),
                Link::new("http://b.com", "http://b.com"),
            ]
        );
        assert_eq!(content.element, Some(ElementHandle(1)));
        assert!(content.position.is_none());
        assert_eq!(capture.captured_content(), Some(content));
    }

    #[test]
    fn test_same_block_captured_once() {
        let (mut capture, seen) = capture();
        capture.handle_key_down("Alt");

        assert!(capture.handle_mouse_move(ElementHandle(2)));
        // Same paragraph through a different target
        assert!(!capture.handle_mouse_move(ElementHandle(1)));
        assert!(!capture.handle_mouse_move(ElementHandle(2)));
        assert_eq!(seen.lock().unwrap().len(), 1);

        // A different block emits, and then the first one can emit again
        assert!(capture.handle_mouse_move(ElementHandle(5)));
        assert!(capture.handle_mouse_move(ElementHandle(2)));
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(capture.status().emitted, 3);
    }

    #[test]
    fn test_code_block_classified() {
        let (mut capture, seen) = capture();
        capture.handle_key_down("Alt");
        capture.handle_mouse_move(ElementHandle(5));

        let emitted = seen.lock().unwrap();
        assert_eq!(emitted[0].content_type, ContentType::Code);
        assert_eq!(emitted[0].element, Some(ElementHandle(3)));
        assert_eq!(emitted[0].content, "fn main() {}");
    }

    #[test]
    fn test_detached_target_emits_nothing() {
        let (mut capture, seen) = capture();
        capture.handle_key_down("Alt");
        capture.document_mut().remove(ElementHandle(3)).unwrap();

        assert!(!capture.handle_mouse_move(ElementHandle(5)));
        assert!(seen.lock().unwrap().is_empty());
        // Still ready for the next input
        assert!(capture.handle_mouse_move(ElementHandle(2)));
    }

    #[test]
    fn test_no_selection_no_emission() {
        let (mut capture, seen) = capture();
        assert!(!capture.handle_selection());

        capture.document_mut().set_selection(Some(SelectionSnapshot {
            text: "  \n ".to_string(),
            markup: "<br>".to_string(),
            rect: Position::default(),
        }));
        assert!(!capture.handle_selection());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(capture.selected_text(), "");
    }

    #[test]
    fn test_selection_capture() {
        let (mut capture, seen) = capture();
        capture
            .document_mut()
            .select_contents(ElementHandle(1), Position::new(10.0, 20.0, 200.0, 18.0))
            .unwrap();

        assert!(capture.handle_selection());

        let emitted = seen.lock().unwrap();
        let content = &emitted[0];
        assert_eq!(content.content, "See here and http://b.com");
        assert_eq!(content.position, Some(Position::new(10.0, 20.0, 200.0, 18.0)));
        assert!(content.element.is_none());
        assert_eq!(content.links.len(), 2);
        assert_eq!(capture.selected_text(), "See here and http://b.com");
        // Selections never become the hover capture
        assert!(capture.captured_content().is_none());
    }

    #[test]
    fn test_selection_text_normalized_but_raw_kept() {
        let (mut capture, seen) = capture();
        capture.document_mut().set_selection(Some(SelectionSnapshot {
            text: "line one\n\n  line   two ".to_string(),
            markup: "line one<br><br>  line   two ".to_string(),
            rect: Position::default(),
        }));

        assert!(capture.handle_selection());
        assert_eq!(seen.lock().unwrap()[0].content, "line one line two");
        assert_eq!(capture.selected_text(), "line one\n\n  line   two ");
    }

    struct FixedInspector;

    impl ContentInspector for FixedInspector {
        fn classify(&self, _markup: &str) -> ContentType {
            ContentType::Audio
        }

        fn find_links(&self, _markup: &str, _plain_text: &str) -> Vec<Link> {
            vec![Link::new("https://fixed.example", "fixed")]
        }
    }

    #[test]
    fn test_injected_inspector() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut capture = ContentCapture::with_inspector(
            document(),
            &CaptureConfig::default(),
            Box::new(FixedInspector),
            move |c| sink.lock().unwrap().push(c),
        );

        capture.handle_key_down("Alt");
        capture.handle_mouse_move(ElementHandle(1));

        let emitted = seen.lock().unwrap();
        assert_eq!(emitted[0].content_type, ContentType::Audio);
        assert_eq!(emitted[0].links, vec![Link::new("https://fixed.example", "fixed")]);
    }
}
