use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a node inside one snapshot's arena
pub type NodeId = usize;

/// A node of a snapshot: either an element or a run of text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomNode {
    Element(ElementNode),
    Text(TextNode),
}

/// Represents a DOM element node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// Lower-cased HTML tag name (e.g., "div", "button", "input")
    pub tag_name: String,

    /// Element attributes. Only captured for interactive candidates, iframes and body.
    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    /// Position among same-tag siblings under each ancestor, e.g. `html/body/div[2]/button`
    #[serde(default)]
    pub xpath: String,

    /// Child node ids, in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,

    /// Whether the element has a rendered, non-hidden box
    #[serde(default)]
    pub is_visible: bool,

    /// Whether the element is not occluded at its paint position
    #[serde(default)]
    pub is_top_element: bool,

    /// Whether the element is interactive (clickable, input, etc.)
    #[serde(default)]
    pub is_interactive: bool,

    /// Whether the element intersects the (expanded) viewport
    #[serde(default)]
    pub is_in_viewport: bool,

    /// Index assigned to this element when the agent may act on it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_index: Option<usize>,

    /// Whether the element hosts a shadow root
    #[serde(default)]
    pub shadow_root: bool,

    /// Bounding box relative to the top-level viewport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_coordinates: Option<BoundingBox>,

    /// Bounding box relative to the top-level document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_coordinates: Option<BoundingBox>,

    /// Viewport the coordinates were recorded against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport_info: Option<ViewportInfo>,

    /// Tree the xpath is relative to
    #[serde(default, skip_serializing_if = "TreeScope::is_document")]
    pub tree_scope: TreeScope,
}

/// The document tree an element lives in.
///
/// Xpaths restart at every iframe document and shadow root, so only
/// `Document` paths can be resolved from the top-level document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TreeScope {
    #[default]
    Document,
    Frame,
    Shadow,
}

impl TreeScope {
    pub fn is_document(&self) -> bool {
        *self == TreeScope::Document
    }
}

/// A trimmed, non-empty run of text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextNode {
    pub text: String,

    #[serde(default)]
    pub is_visible: bool,
}

/// Bounding box coordinates for an element
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scroll position and size of the viewport at capture time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewportInfo {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomNode {
    /// Borrow the element payload, if this is an element
    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            DomNode::Element(element) => Some(element),
            DomNode::Text(_) => None,
        }
    }

    /// Borrow the text payload, if this is a text node
    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            DomNode::Text(text) => Some(text),
            DomNode::Element(_) => None,
        }
    }

    /// Child ids (always empty for text)
    pub fn children(&self) -> &[NodeId] {
        match self {
            DomNode::Element(element) => &element.children,
            DomNode::Text(_) => &[],
        }
    }
}

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: IndexMap::new(),
            xpath: String::new(),
            children: Vec::new(),
            is_visible: false,
            is_top_element: false,
            is_interactive: false,
            is_in_viewport: false,
            highlight_index: None,
            shadow_root: false,
            viewport_coordinates: None,
            page_coordinates: None,
            viewport_info: None,
            tree_scope: TreeScope::Document,
        }
    }

    /// Builder method: set xpath
    pub fn with_xpath(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = xpath.into();
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<NodeId>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: set highlight index
    pub fn with_highlight_index(mut self, index: usize) -> Self {
        self.highlight_index = Some(index);
        self
    }

    /// Builder method: set visibility
    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    /// Builder method: set interactivity
    pub fn with_interactivity(mut self, interactive: bool) -> Self {
        self.is_interactive = interactive;
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Check if element has a specific class
    pub fn has_class(&self, class_name: &str) -> bool {
        if let Some(classes) = self.attributes.get("class") {
            classes.split_whitespace().any(|c| c == class_name)
        } else {
            false
        }
    }

    /// Get element ID
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Check if the element was selected for the agent to act on
    pub fn is_highlighted(&self) -> bool {
        self.highlight_index.is_some()
    }
}

impl TextNode {
    pub fn new(text: impl Into<String>, is_visible: bool) -> Self {
        Self { text: text.into(), is_visible }
    }
}

impl BoundingBox {
    /// Create a new BoundingBox
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point as `(x, y)`
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Translate the box by `(dx, dy)`
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Half-open containment test: the right and bottom edges are outside
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_creation() {
        let mut element = ElementNode::new("button")
            .with_xpath("html/body/button")
            .with_highlight_index(1)
            .with_visibility(true)
            .with_interactivity(true);
        element.add_attribute("id", "test-id");
        element.add_attribute("class", "btn primary");

        assert_eq!(element.tag_name, "button");
        assert_eq!(element.id(), Some("test-id"));
        assert_eq!(element.highlight_index, Some(1));
        assert!(element.is_highlighted());
        assert!(element.is_visible);
        assert!(element.is_interactive);
    }

    #[test]
    fn test_has_class() {
        let mut element = ElementNode::new("div");
        element.add_attribute("class", "container main active");

        assert!(element.has_class("container"));
        assert!(element.has_class("main"));
        assert!(element.has_class("active"));
        assert!(!element.has_class("hidden"));
    }

    #[test]
    fn test_serialization_is_tagged() {
        let node = DomNode::Element(ElementNode::new("button").with_highlight_index(5).with_children(vec![0]));
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["type"], "element");
        assert_eq!(json["highlight_index"], 5);
        assert_eq!(json["children"], serde_json::json!([0]));

        let text = DomNode::Text(TextNode::new("Go", true));
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "Go");

        let back: DomNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_tree_scope_defaults_to_document() {
        let json = serde_json::to_value(ElementNode::new("button")).unwrap();
        assert!(json.get("tree_scope").is_none());

        let mut framed = ElementNode::new("button");
        framed.tree_scope = TreeScope::Frame;
        let json = serde_json::to_value(&framed).unwrap();
        assert_eq!(json["tree_scope"], "frame");

        let back: ElementNode = serde_json::from_value(serde_json::json!({"tag_name": "a"})).unwrap();
        assert!(back.tree_scope.is_document());
    }

    #[test]
    fn test_text_has_no_children() {
        let node = DomNode::Text(TextNode::new("label", false));
        assert!(node.children().is_empty());
        assert!(node.as_element().is_none());
        assert_eq!(node.as_text().map(|t| t.text.as_str()), Some("label"));
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox::new(10.0, 20.0, 100.0, 50.0);

        assert!(bbox.is_visible());
        assert_eq!(bbox.right(), 110.0);
        assert_eq!(bbox.bottom(), 70.0);
        assert_eq!(bbox.center(), (60.0, 45.0));

        let invisible_bbox = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        assert!(!invisible_bbox.is_visible());
    }

    #[test]
    fn test_bounding_box_contains_point() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains_point(0.0, 0.0));
        assert!(bbox.contains_point(9.9, 9.9));
        assert!(!bbox.contains_point(10.0, 5.0));
        assert_eq!(bbox.offset(5.0, -5.0), BoundingBox::new(5.0, -5.0, 10.0, 10.0));
    }
}
