//! Re-locating elements across snapshots.
//!
//! A [`HistoryElement`] is the durable record of an element the agent acted
//! on. Its [`HashedDomElement`] fingerprint is matched exactly against the
//! highlighted elements of a later snapshot; any change to the ancestor tag
//! path, the attribute set or the xpath means "no longer present".

pub mod element;
pub mod fingerprint;
pub mod record;

pub use element::HistoryElement;
pub use fingerprint::{
    HashedDomElement, compare_history_element_and_dom_element, find_history_element_in_tree, hash_dom_element,
};
pub use record::{ActionRecord, ReplayLog};
