//! Snapshot traversal.
//!
//! Walks a [`DocumentHost`] from its body, including same-origin iframe
//! documents and shadow roots, and produces a flat arena of nodes keyed by id.
//! Interactive, visible, topmost elements receive a highlight index in
//! pre-order; node ids are assigned post-order as nodes are retained.

use crate::dom::element::{BoundingBox, DomNode, ElementNode, NodeId, TextNode, TreeScope};
use crate::dom::geometry::GeometryCache;
use crate::dom::host::{DocumentHost, FrameContent, HostNode, NodeHandle};
use crate::dom::interactive::{
    ElementFacts, MENU_CONTAINER_ROLES, is_element_distinct_interaction, is_interactive_candidate,
    is_interactive_element,
};
use crate::dom::options::SnapshotOptions;
use crate::dom::visibility::{
    ViewportWindow, is_clearly_outside_viewport, is_element_visible, is_in_expanded_viewport, is_text_node_visible,
    is_top_element,
};
use crate::error::{BrowserError, Result};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Id of the container the overlay renderer draws into; never part of a snapshot
pub const HIGHLIGHT_CONTAINER_ID: &str = "page-snapshot-highlight-container";

const ALWAYS_ACCEPTED_TAGS: &[&str] = &["body", "div", "main", "article", "section", "nav", "header", "footer"];

const DENIED_LEAF_TAGS: &[&str] = &["svg", "script", "style", "link", "meta", "noscript", "template"];

/// One traversal result: the node arena plus the overlays it asks for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub root_id: NodeId,

    pub nodes_by_id: IndexMap<NodeId, DomNode>,

    /// Overlays for the renderer, in highlight order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<HighlightRequest>,
}

/// Request to draw an overlay over a highlighted element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighlightRequest {
    pub highlight_index: usize,
    pub xpath: String,
    /// Bounding box in top-level viewport coordinates
    pub rect: BoundingBox,
}

/// Build a snapshot of `host`.
///
/// Fails only when there is no structure to walk; inaccessible iframes and
/// hit-test failures are recorded or tolerated and never abort the traversal.
pub fn build_snapshot<H: DocumentHost + ?Sized>(host: &H, options: &SnapshotOptions) -> Result<Snapshot> {
    let body = host
        .body()
        .ok_or_else(|| BrowserError::SnapshotFailed("document has no body".to_string()))?;
    if host.tag_name(body).is_none() {
        return Err(BrowserError::SnapshotFailed(format!("body handle {} is not an element", body)));
    }

    let mut builder = SnapshotBuilder::new(host, options);
    let root_id = builder.build_body(body);

    let (hits, misses) = builder.geometry.stats();
    debug!(
        "snapshot built: {} nodes, {} highlighted, expansion {}, geometry cache {} hits / {} misses",
        builder.nodes.len(),
        builder.next_highlight_index - options.start_highlight_index,
        options.viewport_expansion,
        hits,
        misses
    );

    Ok(Snapshot { root_id, nodes_by_id: builder.nodes, highlights: builder.highlights })
}

/// Context carried downward: enclosing iframe, accumulated offset and the tree xpaths are relative to
#[derive(Debug, Clone, Copy)]
struct Frame {
    iframe: Option<NodeHandle>,
    offset: (f64, f64),
    scope: TreeScope,
}

impl Frame {
    const TOP: Frame = Frame { iframe: None, offset: (0.0, 0.0), scope: TreeScope::Document };

    fn shadow(self) -> Self {
        match self.scope {
            TreeScope::Frame => self,
            _ => Frame { scope: TreeScope::Shadow, ..self },
        }
    }
}

struct SnapshotBuilder<'h, 'o, H: DocumentHost + ?Sized> {
    host: &'h H,
    options: &'o SnapshotOptions,
    window: ViewportWindow,
    geometry: GeometryCache<'h, H>,
    xpaths: HashMap<NodeHandle, String>,
    next_id: NodeId,
    next_highlight_index: usize,
    nodes: IndexMap<NodeId, DomNode>,
    highlights: Vec<HighlightRequest>,
}

impl<'h, 'o, H: DocumentHost + ?Sized> SnapshotBuilder<'h, 'o, H> {
    fn new(host: &'h H, options: &'o SnapshotOptions) -> Self {
        Self {
            host,
            options,
            window: ViewportWindow::new(host.viewport(), options.viewport_expansion),
            geometry: GeometryCache::new(host),
            xpaths: HashMap::new(),
            next_id: options.start_id,
            next_highlight_index: options.start_highlight_index,
            nodes: IndexMap::new(),
            highlights: Vec::new(),
        }
    }

    fn insert(&mut self, node: DomNode) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// The body is always retained and never classified
    fn build_body(&mut self, body: NodeHandle) -> NodeId {
        let host = self.host;
        let mut element = ElementNode::new("body");
        element.attributes = host.attributes(body).cloned().unwrap_or_default();
        element.xpath = self.xpath(body);
        element.is_visible = is_element_visible(&mut self.geometry, body);
        element.children = self.build_children(host.children(body), Frame::TOP, false);
        self.insert(DomNode::Element(element))
    }

    fn build_children(&mut self, children: &[NodeHandle], frame: Frame, parent_highlighted: bool) -> Vec<NodeId> {
        children
            .iter()
            .filter_map(|&child| self.build_node(child, frame, parent_highlighted))
            .collect()
    }

    fn build_node(&mut self, node: NodeHandle, frame: Frame, parent_highlighted: bool) -> Option<NodeId> {
        let host = self.host;
        match host.node(node)? {
            HostNode::Text(text) => self.build_text(node, text, frame),
            HostNode::Element { tag, attributes } => {
                if attributes.get("id").map(String::as_str) == Some(HIGHLIGHT_CONTAINER_ID) {
                    return None;
                }
                self.build_element(node, tag, attributes, frame, parent_highlighted)
            }
            HostNode::ShadowRoot => None,
        }
    }

    fn build_text(&mut self, node: NodeHandle, text: &str, frame: Frame) -> Option<NodeId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        // text directly under a shadow root has no parent element
        if let Some(parent) = self.host.parent_element(node) {
            if self.host.tag_name(parent) == Some("script") {
                return None;
            }
        }

        let is_visible = is_text_node_visible(&mut self.geometry, node, &self.window, frame.offset);
        Some(self.insert(DomNode::Text(TextNode::new(text, is_visible))))
    }

    fn build_element(
        &mut self,
        node: NodeHandle,
        tag: &str,
        attributes: &IndexMap<String, String>,
        frame: Frame,
        parent_highlighted: bool,
    ) -> Option<NodeId> {
        let host = self.host;
        if !is_element_accepted(tag) {
            return None;
        }
        // shadow hosts can report empty geometry while their shadow content renders
        if host.shadow_root(node).is_none()
            && is_clearly_outside_viewport(&mut self.geometry, node, &self.window, frame.offset)
        {
            return None;
        }

        let facts = ElementFacts::gather(&mut self.geometry, node)?;
        let mut element = ElementNode::new(tag);
        element.xpath = self.xpath(node);
        element.tree_scope = frame.scope;
        if is_interactive_candidate(&facts) || tag == "iframe" || tag == "body" {
            element.attributes = attributes.clone();
        }

        let mut highlighted = false;
        element.is_visible = is_element_visible(&mut self.geometry, node);
        if element.is_visible {
            element.is_top_element =
                is_top_element(&mut self.geometry, node, &self.window, frame.iframe.is_some(), frame.offset);
            let menu_container = attributes
                .get("role")
                .is_some_and(|role| MENU_CONTAINER_ROLES.contains(&role.as_str()));
            if element.is_top_element || menu_container {
                element.is_interactive = is_interactive_element(&facts);
                highlighted = self.handle_highlighting(&mut element, node, &facts, frame, parent_highlighted);
            }
        }

        let pass_down = parent_highlighted || highlighted;
        if tag == "iframe" {
            self.build_frame(&mut element, node, frame, pass_down);
        } else if is_rich_text_container(host, node, tag, attributes) {
            // formatting runs and islands are judged as if the editor were not highlighted
            element.children = self.build_children(host.children(node), frame, parent_highlighted);
        } else {
            let mut children = Vec::new();
            if let Some(root) = host.shadow_root(node) {
                element.shadow_root = true;
                children.extend(self.build_children(host.children(root), frame.shadow(), pass_down));
            }
            children.extend(self.build_children(host.children(node), frame, pass_down));
            element.children = children;
        }

        if tag == "a" && element.children.is_empty() && !element.attributes.contains_key("href") {
            let has_size = self.geometry.bounding_rect(node).is_some_and(|rect| rect.is_visible());
            if !has_size {
                return None;
            }
        }

        Some(self.insert(DomNode::Element(element)))
    }

    fn build_frame(&mut self, element: &mut ElementNode, node: NodeHandle, frame: Frame, pass_down: bool) {
        match self.host.frame_content(node) {
            Some(FrameContent::Document { root }) => {
                if let Some(style) = self.geometry.computed_style(node) {
                    if let Some(height) = style.height {
                        element.add_attribute("computedHeight", height);
                    }
                    if let Some(width) = style.width {
                        element.add_attribute("computedWidth", width);
                    }
                }
                let rect = self.geometry.bounding_rect(node).unwrap_or_default();
                let inner = Frame {
                    iframe: Some(node),
                    offset: (frame.offset.0 + rect.x, frame.offset.1 + rect.y),
                    scope: TreeScope::Frame,
                };
                element.children = self.build_children(&[*root], inner, pass_down);
            }
            Some(FrameContent::Blocked { error }) => {
                warn!("Skipping inaccessible iframe {}: {}", element.xpath, error);
                element.add_attribute("error", error.clone());
            }
            None => {}
        }
    }

    fn handle_highlighting(
        &mut self,
        element: &mut ElementNode,
        node: NodeHandle,
        facts: &ElementFacts<'_>,
        frame: Frame,
        parent_highlighted: bool,
    ) -> bool {
        if !element.is_interactive {
            return false;
        }
        let should_highlight =
            !parent_highlighted || is_element_distinct_interaction(&mut self.geometry, node, facts);
        if !should_highlight {
            return false;
        }

        element.is_in_viewport = is_in_expanded_viewport(&mut self.geometry, node, &self.window, frame.offset);
        if !element.is_in_viewport && !self.window.is_unbounded() {
            return false;
        }

        let index = self.next_highlight_index;
        self.next_highlight_index += 1;
        element.highlight_index = Some(index);

        let viewport = self.host.viewport();
        let rect = self
            .geometry
            .bounding_rect(node)
            .unwrap_or_default()
            .offset(frame.offset.0, frame.offset.1);
        element.viewport_coordinates = Some(rect);
        element.page_coordinates = Some(rect.offset(viewport.scroll_x, viewport.scroll_y));
        element.viewport_info = Some(viewport);

        if self.options.wants_overlay(index) {
            self.highlights.push(HighlightRequest { highlight_index: index, xpath: element.xpath.clone(), rect });
        }
        true
    }

    /// Xpath-like location relative to the node's own document or shadow tree, memoized
    fn xpath(&mut self, node: NodeHandle) -> String {
        if let Some(path) = self.xpaths.get(&node) {
            return path.clone();
        }
        let host = self.host;
        let Some(tag) = host.tag_name(node) else { return String::new() };

        let parent = host.parent(node);
        let siblings = parent.map(|p| host.children(p)).unwrap_or(&[]);
        let position = siblings
            .iter()
            .take_while(|&&sibling| sibling != node)
            .filter(|&&sibling| host.tag_name(sibling) == Some(tag))
            .count();
        let segment = if position > 0 { format!("{}[{}]", tag, position + 1) } else { tag.to_string() };

        let path = match parent {
            Some(parent) if host.is_element(parent) => format!("{}/{}", self.xpath(parent), segment),
            _ => segment,
        };
        self.xpaths.insert(node, path.clone());
        path
    }
}

fn is_element_accepted(tag: &str) -> bool {
    ALWAYS_ACCEPTED_TAGS.contains(&tag) || !DENIED_LEAF_TAGS.contains(&tag)
}

/// Editors whose formatted runs must stay attached to the editable container
fn is_rich_text_container<H: DocumentHost + ?Sized>(
    host: &H,
    node: NodeHandle,
    tag: &str,
    attributes: &IndexMap<String, String>,
) -> bool {
    let attr = |name: &str| attributes.get(name).map(String::as_str);
    host.is_content_editable(node)
        || attr("contenteditable") == Some("true")
        || attr("id") == Some("tinymce")
        || attr("class").is_some_and(|c| c.split_whitespace().any(|c| c == "mce-content-body"))
        || (tag == "body" && attr("data-id").is_some_and(|id| id.starts_with("mce_")))
}
