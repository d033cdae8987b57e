//! Host document access.
//!
//! The capture pipeline never touches a DOM directly. Everything it reads goes
//! through `HostDocument`: the live selection, block ancestors of a pointer
//! target, and the markup and text of an element.
//!
//! `MemoryDocument` is an in-process implementation backed by a small node
//! arena. It is what the session replay tool runs against and what the tests
//! inject.

use crate::types::{CaptureError, ElementHandle, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of the current text selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// Selected text as the host reports it
    pub text: String,
    /// Serialized markup of a detached clone of the selected range
    pub markup: String,
    /// Bounding rectangle of the range in viewport coordinates
    pub rect: Position,
}

/// Read access to the host page
pub trait HostDocument: Send {
    /// Current selection, `None` when nothing is selected
    fn selection(&self) -> Result<Option<SelectionSnapshot>, CaptureError>;

    /// Nearest ancestor of `target` (inclusive) whose tag is one of
    /// `block_tags`, or `target` itself when there is none
    fn closest_block(
        &self,
        target: ElementHandle,
        block_tags: &[String],
    ) -> Result<ElementHandle, CaptureError>;

    /// Serialized markup of the element's children
    fn inner_html(&self, element: ElementHandle) -> Result<String, CaptureError>;

    /// Concatenated text of all descendant text nodes
    fn text_content(&self, element: ElementHandle) -> Result<String, CaptureError>;
}

/// Elements serialized without a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Declarative node tree, as found in session files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text {
        text: String,
    },
    Element {
        tag: String,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
}

impl NodeSpec {
    pub fn element(tag: &str) -> Self {
        NodeSpec::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        NodeSpec::Text {
            text: text.to_string(),
        }
    }

    /// Add an attribute (no-op on text nodes)
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let NodeSpec::Element { attrs, .. } = &mut self {
            attrs.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Append a child (no-op on text nodes)
    pub fn child(mut self, node: NodeSpec) -> Self {
        if let NodeSpec::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
}

/// In-memory host document.
///
/// Element handles are assigned in document order starting at 0 for the root
/// element; text nodes get no handle.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    /// Handle id -> arena index
    elements: Vec<usize>,
    selection: Option<SelectionSnapshot>,
}

impl MemoryDocument {
    pub fn new(root: NodeSpec) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            elements: Vec::new(),
            selection: None,
        };
        doc.insert(root, None);
        doc
    }

    fn insert(&mut self, spec: NodeSpec, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        let children = match spec {
            NodeSpec::Text { text } => {
                self.nodes.push(Node {
                    kind: NodeKind::Text(text),
                    parent,
                    children: Vec::new(),
                    attached: true,
                });
                Vec::new()
            }
            NodeSpec::Element { tag, attrs, children } => {
                self.nodes.push(Node {
                    kind: NodeKind::Element {
                        tag: tag.to_ascii_lowercase(),
                        attrs,
                    },
                    parent,
                    children: Vec::new(),
                    attached: true,
                });
                self.elements.push(index);
                children
            }
        };

        for child in children {
            let child_index = self.insert(child, Some(index));
            self.nodes[index].children.push(child_index);
        }

        index
    }

    /// Replace the current selection
    pub fn set_selection(&mut self, selection: Option<SelectionSnapshot>) {
        self.selection = selection;
    }

    /// Select the full contents of an element
    pub fn select_contents(&mut self, element: ElementHandle, rect: Position) -> Result<(), CaptureError> {
        let snapshot = SelectionSnapshot {
            text: self.text_content(element)?,
            markup: self.inner_html(element)?,
            rect,
        };
        self.selection = Some(snapshot);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Detach an element and its subtree from the document
    pub fn remove(&mut self, element: ElementHandle) -> Result<(), CaptureError> {
        let index = self.resolve(element)?;
        if let Some(parent) = self.nodes[index].parent {
            self.nodes[parent].children.retain(|&child| child != index);
        }

        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            self.nodes[current].attached = false;
            stack.extend(self.nodes[current].children.iter().copied());
        }
        Ok(())
    }

    fn resolve(&self, element: ElementHandle) -> Result<usize, CaptureError> {
        let index = usize::try_from(element.0)
            .ok()
            .and_then(|handle| self.elements.get(handle).copied())
            .ok_or(CaptureError::ElementNotFound(element))?;

        if !self.nodes[index].attached {
            return Err(CaptureError::DetachedNode(element));
        }
        Ok(index)
    }

    fn handle_of(&self, index: usize) -> Option<ElementHandle> {
        self.elements
            .iter()
            .position(|&i| i == index)
            .map(|handle| ElementHandle(handle as u64))
    }

    fn write_html(&self, index: usize, out: &mut String) {
        let node = &self.nodes[index];
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }

                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn write_text(&self, index: usize, out: &mut String) {
        let node = &self.nodes[index];
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &node.children {
                    self.write_text(child, out);
                }
            }
        }
    }
}

impl HostDocument for MemoryDocument {
    fn selection(&self) -> Result<Option<SelectionSnapshot>, CaptureError> {
        Ok(self.selection.clone())
    }

    fn closest_block(
        &self,
        target: ElementHandle,
        block_tags: &[String],
    ) -> Result<ElementHandle, CaptureError> {
        let mut current = Some(self.resolve(target)?);

        while let Some(index) = current {
            let node = &self.nodes[index];
            if let NodeKind::Element { tag, .. } = &node.kind {
                if block_tags.iter().any(|block| block.eq_ignore_ascii_case(tag)) {
                    return self.handle_of(index).ok_or(CaptureError::ElementNotFound(target));
                }
            }
            current = node.parent;
        }

        Ok(target)
    }

    fn inner_html(&self, element: ElementHandle) -> Result<String, CaptureError> {
        let index = self.resolve(element)?;
        let mut out = String::new();
        for &child in &self.nodes[index].children {
            self.write_html(child, &mut out);
        }
        Ok(out)
    }

    fn text_content(&self, element: ElementHandle) -> Result<String, CaptureError> {
        let index = self.resolve(element)?;
        let mut out = String::new();
        self.write_text(index, &mut out);
        Ok(out)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\u{a0}', "&nbsp;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\u{a0}', "&nbsp;")
}
