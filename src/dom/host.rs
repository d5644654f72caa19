//! Query surface the snapshot traversal runs against.
//!
//! A host is a read-only view of one document at one instant. The traversal
//! never mutates it; it asks for structure, layout and hit tests through this
//! trait so the same algorithm runs over a captured [`Page`](crate::dom::Page)
//! or any other backing store.

use crate::dom::element::{BoundingBox, ViewportInfo};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle of a node inside a host's own arena
pub type NodeHandle = usize;

/// Kind-specific view of a host node
#[derive(Debug, Clone, Copy)]
pub enum HostNode<'a> {
    Element {
        tag: &'a str,
        attributes: &'a IndexMap<String, String>,
    },
    Text(&'a str),
    ShadowRoot,
}

/// Content of an `<iframe>` element as seen from the embedding document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrameContent {
    /// Same-origin document; `root` is its `<html>` element
    Document { root: NodeHandle },
    /// Cross-origin or otherwise unreachable document
    Blocked { error: String },
}

/// Where a point-based hit test is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitScope {
    /// The top-level document
    Document,
    /// The shadow tree rooted at the given shadow-root node
    ShadowRoot(NodeHandle),
}

#[derive(Debug, Error, PartialEq)]
pub enum HitTestError {
    #[error("hit test point ({x}, {y}) is not finite")]
    InvalidPoint { x: f64, y: f64 },

    #[error("node {0} is not a shadow root")]
    UnknownScope(NodeHandle),

    #[error("hit test unavailable: {0}")]
    Unavailable(String),
}

/// Subset of computed style the classifier and filters read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub cursor: String,
    pub position: String,
    pub opacity: f64,
    pub z_index: Option<i32>,
    pub pointer_events: String,
    pub width: Option<String>,
    pub height: Option<String>,
    /// `overflow` shorthand; anything but `visible` clips descendants
    pub overflow: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            cursor: "auto".to_string(),
            position: "static".to_string(),
            opacity: 1.0,
            z_index: None,
            pointer_events: "auto".to_string(),
            width: None,
            height: None,
            overflow: "visible".to_string(),
        }
    }
}

impl ComputedStyle {
    /// `position: fixed` and `sticky` paint away from their layout position
    pub fn is_fixed_or_sticky(&self) -> bool {
        self.position == "fixed" || self.position == "sticky"
    }

    pub fn is_hidden(&self) -> bool {
        self.display == "none" || self.visibility == "hidden" || self.visibility == "collapse"
    }

    pub fn clips_overflow(&self) -> bool {
        !self.overflow.split_whitespace().all(|value| value == "visible")
    }
}

/// Read-only access to one live document
pub trait DocumentHost {
    /// The top document's `<body>`, if the document has one
    fn body(&self) -> Option<NodeHandle>;

    /// Window size and scroll offset of the top document
    fn viewport(&self) -> ViewportInfo;

    fn node(&self, node: NodeHandle) -> Option<HostNode<'_>>;

    /// Parent node. Shadow roots report their host; frame document roots report none.
    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;

    /// Light-DOM child nodes in document order
    fn children(&self, node: NodeHandle) -> &[NodeHandle];

    fn shadow_root(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn frame_content(&self, node: NodeHandle) -> Option<&FrameContent>;

    fn bounding_rect(&self, node: NodeHandle) -> Option<BoundingBox>;

    /// Per-fragment rects; for text nodes, the rects of a range over its contents
    fn client_rects(&self, node: NodeHandle) -> Option<Vec<BoundingBox>>;

    fn computed_style(&self, node: NodeHandle) -> Option<ComputedStyle>;

    /// Live `isContentEditable` flag, including inherited editability
    fn is_content_editable(&self, node: NodeHandle) -> bool;

    /// Event types with attached listeners, or `None` when the host cannot introspect listeners
    fn event_listeners(&self, node: NodeHandle) -> Option<Vec<String>>;

    /// Topmost element painted at `(x, y)` within `scope`, in viewport coordinates
    fn element_from_point(
        &self,
        scope: HitScope,
        x: f64,
        y: f64,
    ) -> Result<Option<NodeHandle>, HitTestError>;

    fn tag_name(&self, node: NodeHandle) -> Option<&str> {
        match self.node(node)? {
            HostNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn attributes(&self, node: NodeHandle) -> Option<&IndexMap<String, String>> {
        match self.node(node)? {
            HostNode::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    fn attribute(&self, node: NodeHandle, name: &str) -> Option<&str> {
        self.attributes(node)?.get(name).map(String::as_str)
    }

    fn is_element(&self, node: NodeHandle) -> bool {
        matches!(self.node(node), Some(HostNode::Element { .. }))
    }

    /// Parent if it is an element (stops at shadow roots and document boundaries)
    fn parent_element(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.parent(node).filter(|&parent| self.is_element(parent))
    }

    fn element_children(&self, node: NodeHandle) -> Vec<NodeHandle> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    /// The shadow root whose tree directly contains `node`, if any
    fn containing_shadow_root(&self, node: NodeHandle) -> Option<NodeHandle> {
        let mut current = self.parent(node);
        while let Some(candidate) = current {
            if matches!(self.node(candidate), Some(HostNode::ShadowRoot)) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// `ancestor == node` or `ancestor` is an inclusive ancestor within the same tree
    fn contains(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent_element(candidate);
        }
        false
    }
}
