use crate::dom::element::NodeId;
use crate::dom::tree::DomTree;
use crate::history::element::HistoryElement;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Structural identity of an element: SHA-256 hex digests of its ancestor
/// tag path, its attribute set and its xpath. Equal only if all three match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashedDomElement {
    pub branch_path_hash: String,
    pub attributes_hash: String,
    pub xpath_hash: String,
}

impl HashedDomElement {
    pub fn new(branch_path: &[String], attributes: &IndexMap<String, String>, xpath: &str) -> Self {
        Self {
            branch_path_hash: sha256_hex(&branch_path.join("/")),
            attributes_hash: sha256_hex(&attributes_key(attributes)),
            xpath_hash: sha256_hex(xpath),
        }
    }
}

impl From<&HistoryElement> for HashedDomElement {
    fn from(element: &HistoryElement) -> Self {
        Self::new(&element.entire_parent_branch_path, &element.attributes, &element.xpath)
    }
}

/// Fingerprint of element node `id` in `tree`
pub fn hash_dom_element(tree: &DomTree, id: NodeId) -> Option<HashedDomElement> {
    let element = tree.element(id)?;
    Some(HashedDomElement::new(&tree.parent_branch_path(id), &element.attributes, &element.xpath))
}

/// First highlighted element, in pre-order, whose fingerprint equals the record's
pub fn find_history_element_in_tree(history: &HistoryElement, tree: &DomTree) -> Option<NodeId> {
    let wanted = HashedDomElement::from(history);
    tree.walk()
        .filter(|(_, node)| node.as_element().is_some_and(|e| e.is_highlighted()))
        .map(|(id, _)| id)
        .find(|&id| hash_dom_element(tree, id).as_ref() == Some(&wanted))
}

pub fn compare_history_element_and_dom_element(history: &HistoryElement, tree: &DomTree, id: NodeId) -> bool {
    hash_dom_element(tree, id).is_some_and(|hashed| hashed == HashedDomElement::from(history))
}

/// `key=value` pairs sorted by key, so insertion order never matters
fn attributes_key(attributes: &IndexMap<String, String>) -> String {
    let mut pairs: Vec<_> = attributes.iter().collect();
    pairs.sort();
    pairs.iter().map(|(key, value)| format!("{}={}", key, value)).collect()
}

fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
