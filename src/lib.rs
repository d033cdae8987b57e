//! Content Capture - hover and selection capture for page content
//!
//! This crate turns user interaction with a page into captured content
//! records:
//!
//! - **Hover**: while a modifier key is held, the block under the pointer is
//!   captured once per distinct element
//! - **Selection**: the selected range is captured with its bounding rectangle
//!
//! Every record is classified (image, video, audio, table, code, text) and
//! carries the links found in its markup and plain text.
//!
//! # Architecture
//!
//! The page is reached only through `HostDocument`, and markup inspection
//! through `ContentInspector`. `ContentCapture` holds the capture state and
//! handlers; `CaptureService` debounces raw input on tokio timers and drives
//! it.

pub mod capture;
pub mod config;
pub mod debounce;
pub mod dom;
pub mod extractors;
pub mod service;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use capture::{CaptureCallback, CaptureStatus, ContentCapture};
pub use config::Config;
pub use debounce::Debouncer;
pub use dom::{HostDocument, MemoryDocument, NodeSpec, SelectionSnapshot};
pub use extractors::{detect_content_type, extract_links, ContentInspector, MarkupInspector};
pub use service::{capture_channel, CaptureHandle, CaptureService, InputEvent};
pub use session::{replay, Session};
pub use types::{
    normalize_whitespace, CaptureError, CapturedContent, ContentType, ElementHandle, Link,
    Position,
};
