//! Event loop driving a `ContentCapture` from raw input.
//!
//! Key and blur events update the capture mode right away. Selection changes
//! and mouse moves go through their own debouncers and reach the capture
//! handlers only after a quiet period.

use crate::capture::ContentCapture;
use crate::config::TimingConfig;
use crate::debounce::Debouncer;
use crate::dom::HostDocument;
use crate::types::{CaptureError, CapturedContent, ElementHandle};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// Input delivered by the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    KeyDown { key: String },
    KeyUp { key: String },
    MouseMove { target: ElementHandle },
    SelectionChange,
    Blur,
}

/// Channel-backed capture callback
pub fn capture_channel() -> (
    impl FnMut(CapturedContent) + Send + 'static,
    mpsc::UnboundedReceiver<CapturedContent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = move |content: CapturedContent| {
        if tx.send(content).is_err() {
            trace!("Capture receiver dropped");
        }
    };
    (sink, rx)
}

/// Debounced input processing around a `ContentCapture`
pub struct CaptureService<D> {
    capture: ContentCapture<D>,
    selection: Debouncer<()>,
    hover: Debouncer<ElementHandle>,
}

impl<D: HostDocument + 'static> CaptureService<D> {
    pub fn new(capture: ContentCapture<D>, timing: &TimingConfig) -> Self {
        Self {
            capture,
            selection: Debouncer::new(timing.selection_debounce()),
            hover: Debouncer::new(timing.hover_debounce()),
        }
    }

    pub fn capture(&self) -> &ContentCapture<D> {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut ContentCapture<D> {
        &mut self.capture
    }

    pub fn into_capture(self) -> ContentCapture<D> {
        self.capture
    }

    /// Apply one input event received at `now`
    pub fn handle_event(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::KeyDown { key } => self.capture.handle_key_down(&key),
            InputEvent::KeyUp { key } => self.capture.handle_key_up(&key),
            InputEvent::Blur => self.capture.handle_blur(),
            InputEvent::MouseMove { target } => self.hover.push(target, now),
            InputEvent::SelectionChange => self.selection.push((), now),
        }
    }

    /// Earliest pending debounce deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.selection.deadline(), self.hover.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run every debounced handler whose quiet period has elapsed by `now`,
    /// earliest deadline first
    pub fn advance_to(&mut self, now: Instant) {
        while let Some(deadline) = self.next_deadline().filter(|d| *d <= now) {
            self.fire_due(deadline);
        }
    }

    /// Run all pending debounced handlers as if their quiet periods elapsed
    pub fn flush(&mut self) {
        while let Some(deadline) = self.next_deadline() {
            self.fire_due(deadline);
        }
    }

    fn fire_due(&mut self, deadline: Instant) {
        if self.selection.take_ready(deadline).is_some() {
            self.capture.handle_selection();
        }
        if let Some(target) = self.hover.take_ready(deadline) {
            self.capture.handle_mouse_move(target);
        }
    }

    /// Process input until the channel closes, then hand the capture back.
    ///
    /// Debounced work still pending at shutdown is dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<InputEvent>) -> ContentCapture<D> {
        info!(
            "Capture service running (selection {:?}, hover {:?})",
            self.selection.delay(),
            self.hover.delay()
        );

        loop {
            let deadline = self.next_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        trace!("Input event: {:?}", event);
                        self.handle_event(event, Instant::now());
                    }
                    None => {
                        debug!("Input channel closed, stopping capture service");
                        break;
                    }
                },
                _ = wait_until(deadline) => {
                    self.advance_to(Instant::now());
                }
            }
        }

        self.capture
    }

    /// Spawn the service on the current tokio runtime
    pub fn spawn(self) -> CaptureHandle<D> {
        let (tx, rx) = mpsc::channel(100);
        let task = tokio::spawn(self.run(rx));
        CaptureHandle { events: tx, task }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle to a spawned capture service
pub struct CaptureHandle<D> {
    events: mpsc::Sender<InputEvent>,
    task: JoinHandle<ContentCapture<D>>,
}

impl<D> CaptureHandle<D> {
    /// Deliver an input event to the service
    pub async fn send(&self, event: InputEvent) -> Result<(), CaptureError> {
        self.events
            .send(event)
            .await
            .map_err(|_| CaptureError::ServiceStopped)
    }

    /// Close the input stream and wait for the service to finish
    pub async fn shutdown(self) -> Result<ContentCapture<D>, CaptureError> {
        drop(self.events);
        self.task.await.map_err(|_| CaptureError::ServiceStopped)
    }
}
