//! Recorded capture sessions.
//!
//! A session is a document plus a timeline of user actions. Replaying it runs
//! the actions through a `CaptureService` on a virtual clock, so debounce
//! timing is exact and the output is deterministic.

use crate::capture::ContentCapture;
use crate::config::Config;
use crate::dom::{MemoryDocument, NodeSpec};
use crate::service::{CaptureService, InputEvent};
use crate::types::{CaptureError, CapturedContent, ElementHandle, Position};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A recorded session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Page URL, used to resolve relative links
    #[serde(default)]
    pub base_url: Option<String>,
    pub document: NodeSpec,
    #[serde(default)]
    pub events: Vec<TimedAction>,
}

/// An action at a point on the session timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedAction {
    /// Milliseconds since the session started
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// User actions a session can contain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    KeyDown { key: String },
    KeyUp { key: String },
    MouseMove { target: ElementHandle },
    Blur,
    /// Select the contents of an element
    Select { target: ElementHandle, rect: Position },
    ClearSelection,
}

impl Session {
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

/// Replay a session and collect every emitted capture in order
pub fn replay(session: Session, config: &Config) -> Result<Vec<CapturedContent>, CaptureError> {
    let mut capture_config = config.capture.clone();
    if session.base_url.is_some() {
        capture_config.base_url = session.base_url.clone();
    }

    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let capture = ContentCapture::new(
        MemoryDocument::new(session.document),
        &capture_config,
        move |content| match sink.lock() {
            Ok(mut captured) => captured.push(content),
            Err(_) => warn!("Capture buffer poisoned, dropping capture"),
        },
    )?;
    let mut service = CaptureService::new(capture, &config.timing);

    let mut events = session.events;
    events.sort_by_key(|event| event.at_ms);
    info!("Replaying {} actions", events.len());

    let start = Instant::now();
    for TimedAction { at_ms, action } in events {
        let now = start + Duration::from_millis(at_ms);
        service.advance_to(now);
        debug!("{}ms: {:?}", at_ms, action);

        match apply(&mut service, action) {
            Ok(event) => service.handle_event(event, now),
            Err(e) => warn!("Skipping action at {}ms: {}", at_ms, e),
        }
    }
    service.flush();
    drop(service);

    let captured = captured.lock().map(|c| c.clone()).unwrap_or_default();
    Ok(captured)
}

/// Apply document-side effects and translate into an input event
fn apply(
    service: &mut CaptureService<MemoryDocument>,
    action: Action,
) -> Result<InputEvent, CaptureError> {
    let event = match action {
        Action::KeyDown { key } => InputEvent::KeyDown { key },
        Action::KeyUp { key } => InputEvent::KeyUp { key },
        Action::MouseMove { target } => InputEvent::MouseMove { target },
        Action::Blur => InputEvent::Blur,
        Action::Select { target, rect } => {
            service
                .capture_mut()
                .document_mut()
                .select_contents(target, rect)?;
            InputEvent::SelectionChange
        }
        Action::ClearSelection => {
            service.capture_mut().document_mut().clear_selection();
            InputEvent::SelectionChange
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, Link};
    use pretty_assertions::assert_eq;

    const SESSION: &str = r#"{
        "base_url": "https://blog.example.com/posts/1",
        "document": {
            "tag": "article",
            "children": [
                {"tag": "p", "children": [
                    {"text": "See "},
                    {"tag": "a", "attrs": {"href": "http://a.com"}, "children": [{"text": "here"}]},
                    {"text": " and http://b.com"}
                ]},
                {"tag": "p", "children": [
                    {"tag": "a", "attrs": {"href": "../about"}, "children": [{"text": "About"}]}
                ]}
            ]
        },
        "events": [
            {"at_ms": 0, "type": "key_down", "key": "Alt"},
            {"at_ms": 10, "type": "mouse_move", "target": 2},
            {"at_ms": 60, "type": "mouse_move", "target": 1},
            {"at_ms": 400, "type": "mouse_move", "target": 3},
            {"at_ms": 450, "type": "key_up", "key": "Alt"},
            {"at_ms": 900, "type": "select", "target": 2, "rect": {"x": 4, "y": 8, "width": 30, "height": 12}}
        ]
    }"#;

    #[test]
    fn test_replay() {
        let session = Session::from_json(SESSION).unwrap();
        let captured = replay(session, &Config::default()).unwrap();

        // Hover on the first paragraph, selection of the anchor text; the move
        // at 400ms is cut off by the key-up at 450ms
        assert_eq!(captured.len(), 2);

        assert_eq!(captured[0].content_type, ContentType::Text);
        assert_eq!(captured[0].content, "See here and http://b.com");
        assert_eq!(
            captured[0].links,
            vec![
                Link::new("http://a.com", "here"),
                Link::new("http://b.com", "http://b.com"),
            ]
        );

        assert_eq!(captured[1].content, "here");
        assert_eq!(captured[1].position, Some(Position::new(4.0, 8.0, 30.0, 12.0)));
    }

    #[test]
    fn test_replay_resolves_relative_links() {
        let mut session = Session::from_json(SESSION).unwrap();
        session.events = vec![
            TimedAction {
                at_ms: 0,
                action: Action::KeyDown { key: "Alt".to_string() },
            },
            TimedAction {
                at_ms: 5,
                action: Action::MouseMove { target: ElementHandle(4) },
            },
        ];

        let captured = replay(session, &Config::default()).unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(
            captured[0].links,
            vec![Link::new("https://blog.example.com/about", "About")]
        );
    }

    #[test]
    fn test_invalid_select_target_skipped() {
        let mut session = Session::from_json(SESSION).unwrap();
        session.events = vec![TimedAction {
            at_ms: 0,
            action: Action::Select {
                target: ElementHandle(99),
                rect: Position::default(),
            },
        }];

        assert!(replay(session, &Config::default()).unwrap().is_empty());
    }

    #[test]
    fn test_unsorted_events() {
        let mut session = Session::from_json(SESSION).unwrap();
        session.events.reverse();

        // Same timeline regardless of file order
        assert_eq!(replay(session, &Config::default()).unwrap().len(), 2);
    }
}
