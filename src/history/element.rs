use crate::dom::element::{BoundingBox, NodeId, ViewportInfo};
use crate::dom::selector_map::css_selector_for;
use crate::dom::tree::DomTree;
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Snapshot-independent record of an element, persisted alongside the action taken on it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryElement {
    pub tag_name: String,

    pub xpath: String,

    /// Index the element carried when it was recorded; meaningless in later snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_index: Option<usize>,

    /// Tag names from below the root down to the element itself
    pub entire_parent_branch_path: Vec<String>,

    #[serde(default)]
    pub attributes: IndexMap<String, String>,

    #[serde(default)]
    pub shadow_root: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_coordinates: Option<BoundingBox>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_coordinates: Option<BoundingBox>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport_info: Option<ViewportInfo>,
}

impl HistoryElement {
    /// Record the element node `id` of `tree`; `None` for text or unknown ids
    pub fn from_tree(tree: &DomTree, id: NodeId) -> Option<Self> {
        let element = tree.element(id)?;
        Some(Self {
            tag_name: element.tag_name.clone(),
            xpath: element.xpath.clone(),
            highlight_index: element.highlight_index,
            entire_parent_branch_path: tree.parent_branch_path(id),
            attributes: element.attributes.clone(),
            shadow_root: element.shadow_root,
            css_selector: Some(css_selector_for(element)),
            page_coordinates: element.page_coordinates,
            viewport_coordinates: element.viewport_coordinates,
            viewport_info: element.viewport_info,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::builder::Snapshot;
    use crate::dom::element::{DomNode, ElementNode, TextNode};

    fn tree() -> DomTree {
        let mut nodes = IndexMap::new();
        nodes.insert(0, DomNode::Text(TextNode::new("Save", true)));
        let mut button = ElementNode::new("button")
            .with_xpath("html/body/form/button")
            .with_children(vec![0])
            .with_visibility(true)
            .with_highlight_index(3);
        button.add_attribute("type", "submit");
        button.page_coordinates = Some(BoundingBox::new(10.0, 1010.0, 80.0, 20.0));
        button.viewport_coordinates = Some(BoundingBox::new(10.0, 10.0, 80.0, 20.0));
        button.viewport_info = Some(ViewportInfo { scroll_x: 0.0, scroll_y: 1000.0, width: 800.0, height: 600.0 });
        nodes.insert(1, DomNode::Element(button));
        nodes.insert(2, DomNode::Element(ElementNode::new("form").with_xpath("html/body/form").with_children(vec![1])));
        nodes.insert(3, DomNode::Element(ElementNode::new("body").with_xpath("html/body").with_children(vec![2])));
        DomTree::from_snapshot(Snapshot { root_id: 3, nodes_by_id: nodes, highlights: Vec::new() }).unwrap()
    }

    #[test]
    fn test_from_tree() {
        let tree = tree();
        let record = HistoryElement::from_tree(&tree, 1).unwrap();

        assert_eq!(record.tag_name, "button");
        assert_eq!(record.highlight_index, Some(3));
        assert_eq!(record.entire_parent_branch_path, vec!["form", "button"]);
        assert_eq!(record.css_selector.as_deref(), Some("html > body > form > button[type=\"submit\"]"));
        assert_eq!(record.viewport_info.map(|v| v.scroll_y), Some(1000.0));
        assert_eq!(tree.history_element(3), Some(record));
    }

    #[test]
    fn test_text_nodes_have_no_record() {
        assert!(HistoryElement::from_tree(&tree(), 0).is_none());
        assert!(HistoryElement::from_tree(&tree(), 42).is_none());
    }

    #[test]
    fn test_json_layout() {
        let record = HistoryElement::from_tree(&tree(), 1).unwrap();
        let json = record.to_json().unwrap();
        assert!(json.contains("\"entire_parent_branch_path\""));
        assert!(json.contains("\"css_selector\""));

        assert_eq!(HistoryElement::from_json(&json).unwrap(), record);
    }
}
