use crate::dom::element::{ElementNode, NodeId, TreeScope};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attributes stable enough to appear in a derived CSS selector
const SAFE_SELECTOR_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "type",
    "placeholder",
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "role",
    "for",
    "autocomplete",
    "required",
    "readonly",
    "alt",
    "title",
    "src",
    "href",
    "target",
    "data-id",
    "data-qa",
    "data-testid",
    "data-cy",
    "data-test",
];

const MAX_SELECTOR_TEXT: usize = 50;

/// Information needed to locate an element
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementSelector {
    /// CSS selector for the element
    pub css_selector: String,

    /// XPath selector (alternative to CSS)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,

    /// Element's tag name
    pub tag_name: String,

    /// Element's ID attribute (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Element's text content (truncated for display)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Tree the selector paths are relative to; only `Document` paths resolve from the top page
    #[serde(default, skip_serializing_if = "TreeScope::is_document")]
    pub tree_scope: TreeScope,
}

impl ElementSelector {
    /// Create a new ElementSelector with CSS selector
    pub fn new(css_selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            css_selector: css_selector.into(),
            xpath: None,
            tag_name: tag_name.into(),
            id: None,
            text: None,
            tree_scope: TreeScope::Document,
        }
    }

    /// Builder method: set XPath
    pub fn with_xpath(mut self, xpath: impl Into<String>) -> Self {
        self.xpath = Some(xpath.into());
        self
    }

    /// Builder method: set ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_tree_scope(mut self, scope: TreeScope) -> Self {
        self.tree_scope = scope;
        self
    }

    /// Builder method: set text content, truncated for display
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let truncated = if text.chars().count() > MAX_SELECTOR_TEXT {
            let head: String = text.chars().take(MAX_SELECTOR_TEXT - 3).collect();
            format!("{}...", head)
        } else {
            text
        };
        self.text = Some(truncated);
        self
    }

    /// Get the best selector to use (CSS preferred)
    pub fn best_selector(&self) -> &str {
        &self.css_selector
    }
}

/// Highlight index to the node that carries it, valid for one snapshot only.
/// Insertion order is traversal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorMap {
    map: IndexMap<usize, NodeId>,
}

impl SelectorMap {
    /// Create a new empty SelectorMap
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// Register a node under its highlight index, returning any node it displaced
    pub fn insert(&mut self, index: usize, node: NodeId) -> Option<NodeId> {
        self.map.insert(index, node)
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        self.map.get(&index).copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.map.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over all (index, node) pairs in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.map.iter().map(|(index, node)| (*index, *node))
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.map.keys().copied()
    }

    /// Highlight index carried by `node`, if it is in the map
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.map.iter().find(|(_, id)| **id == node).map(|(index, _)| *index)
    }

    /// Export to JSON for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.map)
    }
}

/// Derive a CSS selector for an element from its xpath, classes and stable attributes
pub fn css_selector_for(element: &ElementNode) -> String {
    let path = xpath_to_css(&element.xpath);
    if path.is_empty() {
        return fallback_selector(element);
    }

    let mut selector = path;
    if let Some(classes) = element.get_attribute("class") {
        for class in classes.split_whitespace().filter(|c| is_valid_class_name(c)) {
            selector.push('.');
            selector.push_str(class);
        }
    }

    for (name, value) in &element.attributes {
        if name == "class" || name.is_empty() || !SAFE_SELECTOR_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        let name = name.replace(':', "\\:");
        if value.is_empty() {
            selector.push_str(&format!("[{}]", name));
        } else if value.chars().any(|c| "\"'<>`\n\r\t".contains(c)) {
            let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
            selector.push_str(&format!("[{}*=\"{}\"]", name, escape_attribute_value(&collapsed)));
        } else {
            selector.push_str(&format!("[{}=\"{}\"]", name, escape_attribute_value(value)));
        }
    }
    selector
}

/// Escape for a double-quoted CSS string
fn escape_attribute_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn fallback_selector(element: &ElementNode) -> String {
    match element.highlight_index {
        Some(index) => format!("{}[highlight_index='{}']", element.tag_name, index),
        None => element.tag_name.clone(),
    }
}

/// `html/body/div[2]/a` to `html > body > div:nth-of-type(2) > a`
fn xpath_to_css(xpath: &str) -> String {
    xpath
        .trim_start_matches('/')
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('[') {
            Some((tag, rest)) => match rest.trim_end_matches(']') {
                "last()" => format!("{}:last-of-type", tag),
                n if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => format!("{}:nth-of-type({})", tag, n),
                _ => tag.to_string(),
            },
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

fn is_valid_class_name(class: &str) -> bool {
    let mut chars = class.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
