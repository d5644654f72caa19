use crate::dom::builder::{HighlightRequest, Snapshot, build_snapshot};
use crate::dom::element::{DomNode, ElementNode, NodeId};
use crate::dom::host::DocumentHost;
use crate::dom::options::SnapshotOptions;
use crate::dom::selector_map::{ElementSelector, SelectorMap, css_selector_for};
use crate::error::{BrowserError, Result};
use crate::history::{self, HistoryElement};
use std::collections::{HashMap, HashSet};

/// A validated snapshot with its parent links and selector map.
///
/// Read-only: any action that changes the page invalidates it.
#[derive(Debug, Clone)]
pub struct DomTree {
    snapshot: Snapshot,

    parents: HashMap<NodeId, NodeId>,

    /// Map of highlight indices to the nodes carrying them
    pub selector_map: SelectorMap,
}

impl DomTree {
    /// Validate a snapshot arena and index it
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let root_id = snapshot.root_id;
        match snapshot.nodes_by_id.get(&root_id) {
            Some(DomNode::Element(_)) => {}
            Some(DomNode::Text(_)) => return Err(invalid(format!("root {} is a text node", root_id))),
            None => return Err(invalid(format!("root {} is not in the arena", root_id))),
        }

        let mut parents = HashMap::new();
        for (&id, node) in &snapshot.nodes_by_id {
            for &child in node.children() {
                if !snapshot.nodes_by_id.contains_key(&child) {
                    return Err(invalid(format!("node {} references missing child {}", id, child)));
                }
                if child == root_id {
                    return Err(invalid(format!("root {} is a child of node {}", root_id, id)));
                }
                if let Some(previous) = parents.insert(child, id) {
                    return Err(invalid(format!("node {} has two parents ({} and {})", child, previous, id)));
                }
            }
        }

        let mut tree = Self { snapshot, parents, selector_map: SelectorMap::new() };

        let mut reached = HashSet::new();
        let mut selector_map = SelectorMap::new();
        for (id, node) in tree.walk() {
            reached.insert(id);
            if let Some(index) = node.as_element().and_then(|e| e.highlight_index) {
                if let Some(other) = selector_map.insert(index, id) {
                    return Err(invalid(format!("highlight index {} is used by nodes {} and {}", index, other, id)));
                }
            }
        }
        if reached.len() != tree.snapshot.nodes_by_id.len() {
            let orphan = tree.snapshot.nodes_by_id.keys().find(|id| !reached.contains(id)).copied();
            return Err(invalid(format!("node {:?} is not reachable from the root", orphan)));
        }

        tree.selector_map = selector_map;
        Ok(tree)
    }

    /// Snapshot a host and index the result
    pub fn from_host<H: DocumentHost + ?Sized>(host: &H, options: &SnapshotOptions) -> Result<Self> {
        Self::from_snapshot(build_snapshot(host, options)?)
    }

    /// Parse a serialized snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_snapshot(serde_json::from_str(json)?)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn root_id(&self) -> NodeId {
        self.snapshot.root_id
    }

    /// The body element
    pub fn root(&self) -> &ElementNode {
        match self.snapshot.nodes_by_id.get(&self.snapshot.root_id) {
            Some(DomNode::Element(element)) => element,
            _ => unreachable!("root is checked to be an element on construction"),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.snapshot.nodes_by_id.get(&id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementNode> {
        self.node(id).and_then(DomNode::as_element)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(DomNode::children).unwrap_or(&[])
    }

    /// Pre-order walk from the root
    pub fn walk(&self) -> Walk<'_> {
        self.walk_from(self.snapshot.root_id)
    }

    /// Pre-order walk of the subtree rooted at `id`
    pub fn walk_from(&self, id: NodeId) -> Walk<'_> {
        Walk { tree: self, stack: vec![id] }
    }

    /// Overlays requested while building the snapshot
    pub fn highlights(&self) -> &[HighlightRequest] {
        &self.snapshot.highlights
    }

    /// Node id carrying highlight `index`
    pub fn node_id_by_index(&self, index: usize) -> Option<NodeId> {
        self.selector_map.get(index)
    }

    /// Find element node by highlight index
    pub fn element_by_index(&self, index: usize) -> Option<&ElementNode> {
        self.node_id_by_index(index).and_then(|id| self.element(id))
    }

    /// Get element selector by index
    pub fn get_selector(&self, index: usize) -> Option<ElementSelector> {
        let id = self.node_id_by_index(index)?;
        let element = self.element(id)?;

        let mut selector = ElementSelector::new(css_selector_for(element), &element.tag_name)
            .with_xpath(&element.xpath)
            .with_tree_scope(element.tree_scope);
        if let Some(id) = element.id() {
            selector = selector.with_id(id);
        }
        let text = self.text_until_next_highlight(id);
        if !text.is_empty() {
            selector = selector.with_text(text);
        }
        Some(selector)
    }

    /// Selector for `index` that can be resolved from the top document.
    ///
    /// Frame and shadow content has paths relative to its own tree, which could
    /// match an unrelated top-level element, so it is reported as not found.
    pub fn document_selector(&self, index: usize) -> Result<ElementSelector> {
        let selector = self
            .get_selector(index)
            .ok_or_else(|| BrowserError::ElementNotFound(format!("No element with index {}", index)))?;
        if !selector.tree_scope.is_document() {
            return Err(BrowserError::ElementNotFound(format!(
                "Element with index {} is inside an iframe or shadow tree ({:?}) and cannot be located from the top document",
                index, selector.tree_scope
            )));
        }
        Ok(selector)
    }

    /// Get all interactive element indices
    pub fn interactive_indices(&self) -> Vec<usize> {
        self.selector_map.indices().collect()
    }

    /// Count element nodes in the tree
    pub fn count_elements(&self) -> usize {
        self.snapshot.nodes_by_id.values().filter(|n| n.as_element().is_some()).count()
    }

    /// Count highlighted elements
    pub fn count_interactive(&self) -> usize {
        self.selector_map.len()
    }

    /// Tag names from the first element below the root down to and including `id`
    pub fn parent_branch_path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if let Some(element) = self.element(current) {
                path.push(element.tag_name.clone());
            }
            current = parent;
        }
        path.reverse();
        path
    }

    /// Whether any ancestor of `id` carries a highlight index
    pub fn has_highlighted_ancestor(&self, id: NodeId) -> bool {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
            .any(|ancestor| self.element(ancestor).is_some_and(ElementNode::is_highlighted))
    }

    /// Text under `id`, stopping at highlighted descendants, one run per line
    pub fn text_until_next_highlight(&self, id: NodeId) -> String {
        let mut runs = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.node(current) {
                Some(DomNode::Text(text)) => runs.push(text.text.as_str()),
                Some(DomNode::Element(element)) => {
                    if current != id && element.is_highlighted() {
                        continue;
                    }
                    stack.extend(element.children.iter().rev());
                }
                None => {}
            }
        }
        runs.join("\n").trim().to_string()
    }

    /// Listing of the highlighted elements for an agent prompt.
    ///
    /// `[3]<button aria-label="Close">Close</button>` per highlighted element and
    /// `_[:]text` for visible text outside any highlighted element.
    pub fn clickable_elements_to_string(&self, include_attributes: &[&str]) -> String {
        let mut lines = Vec::new();
        for (id, node) in self.walk() {
            match node {
                DomNode::Element(element) => {
                    let Some(index) = element.highlight_index else { continue };
                    let attributes: Vec<String> = include_attributes
                        .iter()
                        .filter_map(|name| element.get_attribute(name).map(|value| format!("{}=\"{}\"", name, value)))
                        .collect();
                    let attributes = if attributes.is_empty() {
                        String::new()
                    } else {
                        format!(" {}", attributes.join(" "))
                    };
                    lines.push(format!(
                        "[{}]<{}{}>{}</{}>",
                        index,
                        element.tag_name,
                        attributes,
                        self.text_until_next_highlight(id),
                        element.tag_name
                    ));
                }
                DomNode::Text(text) => {
                    if text.is_visible && !self.has_highlighted_ancestor(id) {
                        lines.push(format!("_[:]{}", text.text));
                    }
                }
            }
        }
        lines.join("\n")
    }

    /// Durable record of the element carrying highlight `index`
    pub fn history_element(&self, index: usize) -> Option<HistoryElement> {
        HistoryElement::from_tree(self, self.node_id_by_index(index)?)
    }

    /// Node in this tree whose fingerprint equals the recorded element's
    pub fn find_history_element(&self, element: &HistoryElement) -> Option<NodeId> {
        history::find_history_element_in_tree(element, self)
    }

    /// Convert the snapshot to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot)?)
    }
}

fn invalid(message: String) -> BrowserError {
    BrowserError::InvalidSnapshot(message)
}

/// Pre-order iterator over `(id, node)` pairs
pub struct Walk<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a DomNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            if let Some(node) = self.tree.node(id) {
                self.stack.extend(node.children().iter().rev());
                return Some((id, node));
            }
        }
    }
}
