//! Captured document: an owned arena of nodes with layout and computed style.
//!
//! A `Page` is what the capture script returns from a live tab. It can also be
//! built by hand, which is how the traversal is exercised in tests.

use crate::dom::element::{BoundingBox, ViewportInfo};
use crate::dom::host::{
    ComputedStyle, DocumentHost, FrameContent, HitScope, HitTestError, HostNode, NodeHandle,
};
use crate::error::{BrowserError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Deepest element nesting (frame documents included) a captured page may have
pub const MAX_TREE_DEPTH: usize = 512;

type HitKey = (Option<NodeHandle>, i64, i64);

/// A captured document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Window size and scroll of the top document
    pub viewport: ViewportInfo,

    /// The top document's `<body>`
    #[serde(default)]
    pub body: Option<NodeHandle>,

    /// Whether listener lists were captured (requires a devtools command-line API)
    #[serde(default)]
    pub listener_introspection: bool,

    pub nodes: Vec<PageNode>,

    /// Hit tests run by the live document. When present, hit testing answers
    /// only from these; otherwise it is emulated over the captured layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_tests: Option<Vec<RecordedHit>>,

    #[serde(skip)]
    hit_index: OnceLock<HashMap<HitKey, Option<NodeHandle>>>,
}

/// Result of one `elementFromPoint` call made at capture time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedHit {
    /// Shadow root the query ran against; `None` for the top document
    #[serde(default)]
    pub shadow_root: Option<NodeHandle>,
    pub x: f64,
    pub y: f64,
    pub hit: Option<NodeHandle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageNode {
    pub kind: PageNodeKind,

    #[serde(default)]
    pub parent: Option<NodeHandle>,

    #[serde(default)]
    pub children: Vec<NodeHandle>,

    #[serde(default)]
    pub shadow_root: Option<NodeHandle>,

    #[serde(default)]
    pub frame: Option<FrameContent>,

    #[serde(default)]
    pub layout: Option<Layout>,

    #[serde(default)]
    pub style: Option<ComputedStyle>,

    #[serde(default)]
    pub content_editable: bool,

    #[serde(default)]
    pub listeners: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageNodeKind {
    Element {
        tag: String,
        #[serde(default)]
        attributes: IndexMap<String, String>,
    },
    Text {
        text: String,
    },
    ShadowRoot,
}

/// Rects relative to the viewport of the node's own frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Layout {
    pub bounding_rect: BoundingBox,

    #[serde(default)]
    pub client_rects: Vec<BoundingBox>,
}

impl PageNode {
    fn new(kind: PageNodeKind, parent: Option<NodeHandle>) -> Self {
        let style = match kind {
            PageNodeKind::Element { .. } => Some(ComputedStyle::default()),
            _ => None,
        };
        Self {
            kind,
            parent,
            children: Vec::new(),
            shadow_root: None,
            frame: None,
            layout: None,
            style,
            content_editable: false,
            listeners: None,
        }
    }
}

impl Page {
    /// Create an empty document (`<html><body>`) whose body fills the window
    pub fn new(width: f64, height: f64) -> Self {
        let mut page = Self {
            viewport: ViewportInfo { scroll_x: 0.0, scroll_y: 0.0, width, height },
            body: None,
            listener_introspection: false,
            nodes: Vec::new(),
            hit_tests: None,
            hit_index: OnceLock::new(),
        };
        let html = page.push(PageNode::new(element_kind("html"), None));
        let body = page.append_element(html, "body");
        page.set_rect(html, BoundingBox::new(0.0, 0.0, width, height));
        page.set_rect(body, BoundingBox::new(0.0, 0.0, width, height));
        page.body = Some(body);
        page
    }

    /// Parse the JSON produced by the capture script
    pub fn from_json(json: &str) -> Result<Self> {
        let page: Page = serde_json::from_str(json)
            .map_err(|e| BrowserError::SnapshotFailed(format!("Failed to parse captured page: {}", e)))?;
        page.validate()?;
        Ok(page)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check that the arena forms a forest: handles resolve, parent and child
    /// links agree, every node has at most one parent, and nesting is acyclic
    /// and no deeper than [`MAX_TREE_DEPTH`]
    pub fn validate(&self) -> Result<()> {
        let len = self.nodes.len();
        let check = |handle: NodeHandle, what: &str| {
            if handle < len {
                Ok(())
            } else {
                Err(malformed(format!("references missing {} node {}", what, handle)))
            }
        };

        if let Some(body) = self.body {
            check(body, "body")?;
        }
        for hit in self.hit_tests.iter().flatten() {
            if let Some(root) = hit.shadow_root {
                check(root, "hit test scope")?;
            }
            if let Some(target) = hit.hit {
                check(target, "hit test target")?;
            }
        }

        // owner: the node whose children, shadow root or frame document lists this one
        let mut owner: Vec<Option<NodeHandle>> = vec![None; len];
        let mut claim = |child: NodeHandle, parent: NodeHandle| {
            if owner[child].replace(parent).is_some() {
                return Err(malformed(format!("node {} has more than one parent", child)));
            }
            Ok(())
        };
        for (handle, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                check(parent, "parent")?;
            }
            for &child in &node.children {
                check(child, "child")?;
                if self.nodes[child].parent != Some(handle) {
                    return Err(malformed(format!("child {} of node {} points at another parent", child, handle)));
                }
                claim(child, handle)?;
            }
            if let Some(root) = node.shadow_root {
                check(root, "shadow root")?;
                let shadow = &self.nodes[root];
                if shadow.kind != PageNodeKind::ShadowRoot || shadow.parent != Some(handle) {
                    return Err(malformed(format!("shadow root {} of node {} is inconsistent", root, handle)));
                }
                claim(root, handle)?;
            }
            if let Some(FrameContent::Document { root }) = &node.frame {
                check(*root, "frame root")?;
                if self.nodes[*root].parent.is_some() {
                    return Err(malformed(format!("frame document {} of node {} has a parent", root, handle)));
                }
                claim(*root, handle)?;
            }
        }
        for (handle, node) in self.nodes.iter().enumerate() {
            if node.parent.is_some() && owner[handle] != node.parent {
                return Err(malformed(format!("node {} is missing from its parent's children", handle)));
            }
        }

        let mut depths: Vec<Option<usize>> = vec![None; len];
        for start in 0..len {
            let mut path = Vec::new();
            let mut current = Some(start);
            let mut base = 0;
            while let Some(node) = current {
                if let Some(depth) = depths[node] {
                    base = depth + 1;
                    break;
                }
                if path.contains(&node) {
                    return Err(malformed(format!("node {} is its own ancestor", node)));
                }
                if path.len() > MAX_TREE_DEPTH {
                    return Err(malformed(format!("nesting exceeds {} levels", MAX_TREE_DEPTH)));
                }
                path.push(node);
                current = owner[node];
            }
            for (offset, &node) in path.iter().rev().enumerate() {
                let depth = base + offset;
                if depth > MAX_TREE_DEPTH {
                    return Err(malformed(format!("nesting exceeds {} levels", MAX_TREE_DEPTH)));
                }
                depths[node] = Some(depth);
            }
        }
        Ok(())
    }

    /// Body created by [`Page::new`]
    pub fn body_handle(&self) -> NodeHandle {
        self.body.unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: PageNode) -> NodeHandle {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append an element (zero-sized, default style) under `parent`
    pub fn append_element(&mut self, parent: NodeHandle, tag: &str) -> NodeHandle {
        let handle = self.push(PageNode::new(element_kind(tag), Some(parent)));
        self.nodes[parent].children.push(handle);
        handle
    }

    /// Append a text node under `parent`
    pub fn append_text(&mut self, parent: NodeHandle, text: &str) -> NodeHandle {
        let kind = PageNodeKind::Text { text: text.to_string() };
        let handle = self.push(PageNode::new(kind, Some(parent)));
        self.nodes[parent].children.push(handle);
        handle
    }

    pub fn set_attribute(&mut self, node: NodeHandle, name: &str, value: &str) -> &mut Self {
        if let PageNodeKind::Element { attributes, .. } = &mut self.nodes[node].kind {
            attributes.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Lay the node out as a single box
    pub fn set_rect(&mut self, node: NodeHandle, rect: BoundingBox) -> &mut Self {
        self.nodes[node].layout = Some(Layout { bounding_rect: rect, client_rects: vec![rect] });
        self
    }

    /// Lay the node out as several fragments (e.g. a wrapped inline element)
    pub fn set_client_rects(&mut self, node: NodeHandle, rects: Vec<BoundingBox>) -> &mut Self {
        let bounding_rect = union(&rects);
        self.nodes[node].layout = Some(Layout { bounding_rect, client_rects: rects });
        self
    }

    pub fn style_mut(&mut self, node: NodeHandle) -> &mut ComputedStyle {
        self.nodes[node].style.get_or_insert_with(ComputedStyle::default)
    }

    pub fn set_content_editable(&mut self, node: NodeHandle, editable: bool) -> &mut Self {
        self.nodes[node].content_editable = editable;
        self
    }

    pub fn set_listeners(&mut self, node: NodeHandle, events: &[&str]) -> &mut Self {
        self.nodes[node].listeners = Some(events.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn set_listener_introspection(&mut self, available: bool) -> &mut Self {
        self.listener_introspection = available;
        self
    }

    pub fn set_scroll(&mut self, scroll_x: f64, scroll_y: f64) -> &mut Self {
        self.viewport.scroll_x = scroll_x;
        self.viewport.scroll_y = scroll_y;
        self
    }

    /// Record the answer the live document gave for one hit test.
    ///
    /// Once any hit is recorded, points without a record are reported as
    /// [`HitTestError::Unavailable`] instead of being emulated.
    pub fn record_hit(&mut self, scope: HitScope, x: f64, y: f64, hit: Option<NodeHandle>) -> &mut Self {
        let shadow_root = match scope {
            HitScope::Document => None,
            HitScope::ShadowRoot(root) => Some(root),
        };
        self.hit_tests.get_or_insert_with(Vec::new).push(RecordedHit { shadow_root, x, y, hit });
        self.hit_index = OnceLock::new();
        self
    }

    /// `None` when nothing was recorded and the hit must be emulated
    fn recorded_hit(
        &self,
        scope_root: Option<NodeHandle>,
        x: f64,
        y: f64,
    ) -> Option<std::result::Result<Option<NodeHandle>, HitTestError>> {
        let hits = self.hit_tests.as_ref()?;
        let index = self
            .hit_index
            .get_or_init(|| hits.iter().map(|h| (hit_key(h.shadow_root, h.x, h.y), h.hit)).collect());
        Some(
            index
                .get(&hit_key(scope_root, x, y))
                .copied()
                .ok_or_else(|| HitTestError::Unavailable(format!("no hit test was recorded at ({}, {})", x, y))),
        )
    }

    /// Attach an open shadow root to `host` and return it
    pub fn attach_shadow_root(&mut self, host: NodeHandle) -> NodeHandle {
        let root = self.push(PageNode::new(PageNodeKind::ShadowRoot, Some(host)));
        self.nodes[host].shadow_root = Some(root);
        root
    }

    /// Give an iframe a same-origin document and return that document's body
    pub fn attach_frame_document(&mut self, iframe: NodeHandle, width: f64, height: f64) -> NodeHandle {
        let html = self.push(PageNode::new(element_kind("html"), None));
        let body = self.append_element(html, "body");
        self.set_rect(html, BoundingBox::new(0.0, 0.0, width, height));
        self.set_rect(body, BoundingBox::new(0.0, 0.0, width, height));
        self.nodes[iframe].frame = Some(FrameContent::Document { root: html });
        body
    }

    /// Mark an iframe's document as unreachable
    pub fn block_frame(&mut self, iframe: NodeHandle, error: &str) -> &mut Self {
        self.nodes[iframe].frame = Some(FrameContent::Blocked { error: error.to_string() });
        self
    }

    fn document_root(&self) -> Option<NodeHandle> {
        let mut current = self.body?;
        while let Some(parent) = self.nodes.get(current)?.parent {
            current = parent;
        }
        Some(current)
    }

    /// Elements of one tree in paint order, shadow content included, frame documents excluded
    fn paint_order(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else { continue };
            if matches!(node.kind, PageNodeKind::Element { .. }) {
                order.push(handle);
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
            if let Some(root) = node.shadow_root {
                stack.push(root);
            }
        }
        order
    }

    fn accepts_hit(&self, handle: NodeHandle, x: f64, y: f64) -> bool {
        let Some(node) = self.nodes.get(handle) else { return false };
        if let Some(style) = &node.style {
            if style.is_hidden() || style.pointer_events == "none" {
                return false;
            }
        }
        let Some(layout) = &node.layout else { return false };
        let inside = if layout.client_rects.is_empty() {
            layout.bounding_rect.is_visible() && layout.bounding_rect.contains_point(x, y)
        } else {
            layout
                .client_rects
                .iter()
                .any(|rect| rect.is_visible() && rect.contains_point(x, y))
        };
        inside && !self.is_clipped_at(handle, x, y)
    }

    /// Whether an ancestor's `overflow` clip hides the point; fixed boxes escape their ancestors' clips
    fn is_clipped_at(&self, handle: NodeHandle, x: f64, y: f64) -> bool {
        let mut current = handle;
        loop {
            let style = self.nodes.get(current).and_then(|n| n.style.as_ref());
            if style.is_some_and(|s| s.position == "fixed") {
                return false;
            }
            let Some(parent) = self.parent(current) else { return false };
            if let Some(node) = self.nodes.get(parent) {
                if node.style.as_ref().is_some_and(ComputedStyle::clips_overflow) {
                    let clip = node.layout.as_ref().map(|l| l.bounding_rect).unwrap_or_default();
                    if !clip.contains_point(x, y) {
                        return true;
                    }
                }
            }
            current = parent;
        }
    }

    /// z-index of the nearest positioned ancestor-or-self that sets one
    fn stacking_z(&self, handle: NodeHandle) -> i32 {
        let mut current = Some(handle);
        while let Some(candidate) = current {
            if let Some(style) = self.nodes.get(candidate).and_then(|n| n.style.as_ref()) {
                if style.position != "static" {
                    if let Some(z) = style.z_index {
                        return z;
                    }
                }
            }
            current = self.parent(candidate);
        }
        0
    }

    /// Lift a hit out of nested shadow trees until it belongs to `scope_root`'s tree
    fn retarget(&self, mut handle: NodeHandle, scope_root: Option<NodeHandle>) -> NodeHandle {
        loop {
            let root = self.containing_shadow_root(handle);
            if root == scope_root {
                return handle;
            }
            match root.and_then(|r| self.parent(r)) {
                Some(host) => handle = host,
                None => return handle,
            }
        }
    }
}

impl DocumentHost for Page {
    fn body(&self) -> Option<NodeHandle> {
        self.body
    }

    fn viewport(&self) -> ViewportInfo {
        self.viewport
    }

    fn node(&self, node: NodeHandle) -> Option<HostNode<'_>> {
        Some(match &self.nodes.get(node)?.kind {
            PageNodeKind::Element { tag, attributes } => HostNode::Element { tag, attributes },
            PageNodeKind::Text { text } => HostNode::Text(text),
            PageNodeKind::ShadowRoot => HostNode::ShadowRoot,
        })
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(node)?.parent
    }

    fn children(&self, node: NodeHandle) -> &[NodeHandle] {
        self.nodes.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn shadow_root(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(node)?.shadow_root
    }

    fn frame_content(&self, node: NodeHandle) -> Option<&FrameContent> {
        self.nodes.get(node)?.frame.as_ref()
    }

    fn bounding_rect(&self, node: NodeHandle) -> Option<BoundingBox> {
        let node = self.nodes.get(node)?;
        match node.kind {
            PageNodeKind::ShadowRoot => None,
            _ => Some(node.layout.as_ref().map(|l| l.bounding_rect).unwrap_or_default()),
        }
    }

    fn client_rects(&self, node: NodeHandle) -> Option<Vec<BoundingBox>> {
        let node = self.nodes.get(node)?;
        match node.kind {
            PageNodeKind::ShadowRoot => None,
            _ => Some(node.layout.as_ref().map(|l| l.client_rects.clone()).unwrap_or_default()),
        }
    }

    fn computed_style(&self, node: NodeHandle) -> Option<ComputedStyle> {
        self.nodes.get(node)?.style.clone()
    }

    fn is_content_editable(&self, node: NodeHandle) -> bool {
        self.nodes.get(node).is_some_and(|n| n.content_editable)
    }

    fn event_listeners(&self, node: NodeHandle) -> Option<Vec<String>> {
        if !self.listener_introspection {
            return None;
        }
        Some(self.nodes.get(node)?.listeners.clone().unwrap_or_default())
    }

    fn element_from_point(
        &self,
        scope: HitScope,
        x: f64,
        y: f64,
    ) -> std::result::Result<Option<NodeHandle>, HitTestError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(HitTestError::InvalidPoint { x, y });
        }

        let (start, scope_root) = match scope {
            HitScope::Document => match self.document_root() {
                Some(root) => (root, None),
                None => return Ok(None),
            },
            HitScope::ShadowRoot(root) => match self.nodes.get(root).map(|n| &n.kind) {
                Some(PageNodeKind::ShadowRoot) => (root, Some(root)),
                _ => return Err(HitTestError::UnknownScope(root)),
            },
        };

        if let Some(recorded) = self.recorded_hit(scope_root, x, y) {
            return recorded;
        }

        if x < 0.0 || y < 0.0 || x >= self.viewport.width || y >= self.viewport.height {
            return Ok(None);
        }

        let mut best: Option<(i32, usize, NodeHandle)> = None;
        for (order, handle) in self.paint_order(start).into_iter().enumerate() {
            if !self.accepts_hit(handle, x, y) {
                continue;
            }
            let z = self.stacking_z(handle);
            if best.is_none_or(|(best_z, best_order, _)| (z, order) >= (best_z, best_order)) {
                best = Some((z, order, handle));
            }
        }

        Ok(best.map(|(_, _, handle)| self.retarget(handle, scope_root)))
    }
}

fn malformed(message: String) -> BrowserError {
    BrowserError::SnapshotFailed(format!("captured page is malformed: {}", message))
}

/// Points are matched on a 1/64 px grid so float parsing noise cannot split a query from its record
fn hit_key(scope_root: Option<NodeHandle>, x: f64, y: f64) -> HitKey {
    let snap = |v: f64| (v * 64.0).round() as i64;
    (scope_root, snap(x), snap(y))
}

fn element_kind(tag: &str) -> PageNodeKind {
    PageNodeKind::Element { tag: tag.to_ascii_lowercase(), attributes: IndexMap::new() }
}

fn union(rects: &[BoundingBox]) -> BoundingBox {
    let mut iter = rects.iter();
    let Some(first) = iter.next() else { return BoundingBox::default() };
    let (mut left, mut top, mut right, mut bottom) = (first.x, first.y, first.right(), first.bottom());
    for rect in iter {
        left = left.min(rect.x);
        top = top.min(rect.y);
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
    }
    BoundingBox::new(left, top, right - left, bottom - top)
}
