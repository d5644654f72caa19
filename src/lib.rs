//! # page-snapshot
//!
//! Addressable DOM snapshots for browser agents, over the Chrome DevTools Protocol.
//!
//! ## Features
//!
//! - **Snapshots**: walk a page (same-origin iframes and shadow roots included)
//!   into a flat, serializable arena of nodes
//! - **Element indexing**: visible, unoccluded, interactive elements get a
//!   per-snapshot highlight index the agent can act on
//! - **Fingerprints**: a structural identity for indexed elements that finds
//!   the same element again in a later snapshot
//!
//! ## Snapshotting a live page
//!
//! ```rust,no_run
//! use page_snapshot::{BrowserSession, LaunchOptions, SnapshotOptions};
//!
//! # fn main() -> page_snapshot::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::default())?;
//! session.navigate("https://example.com")?;
//! session.wait_for_navigation()?;
//!
//! let tree = session.snapshot(&SnapshotOptions::default())?;
//! println!("{}", tree.clickable_elements_to_string(&["id", "aria-label"]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-finding an element after a re-render
//!
//! ```rust,no_run
//! # use page_snapshot::{BrowserSession, LaunchOptions, SnapshotOptions};
//! # fn main() -> page_snapshot::Result<()> {
//! # let session = BrowserSession::launch(LaunchOptions::default())?;
//! let before = session.snapshot(&SnapshotOptions::default())?;
//! let record = before.history_element(0).expect("index 0 exists");
//!
//! // ... the page re-renders ...
//!
//! let after = session.snapshot(&SnapshotOptions::default())?;
//! match after.find_history_element(&record) {
//!     Some(id) => println!("now at index {:?}", after.element(id).and_then(|e| e.highlight_index)),
//!     None => println!("element no longer present"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Without a browser
//!
//! The traversal runs over any [`DocumentHost`]. [`Page`] is the captured
//! form of a document and can be built by hand:
//!
//! ```rust
//! use page_snapshot::{BoundingBox, DomTree, Page, SnapshotOptions};
//!
//! let mut page = Page::new(800.0, 600.0);
//! let body = page.body_handle();
//! let button = page.append_element(body, "button");
//! page.set_rect(button, BoundingBox::new(10.0, 10.0, 80.0, 24.0));
//!
//! let tree = DomTree::from_host(&page, &SnapshotOptions::default()).unwrap();
//! assert_eq!(tree.interactive_indices(), vec![0]);
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: Browser session management, configuration and overlays
//! - [`dom`]: Capture, traversal, classification and the indexed tree
//! - [`history`]: Element records, fingerprints and replay logs
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod dom;
pub mod error;
pub mod history;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use dom::{
    BoundingBox, DocumentHost, DomNode, DomTree, ElementNode, ElementSelector, NodeId, Page, SelectorMap, Snapshot,
    SnapshotOptions, TreeScope, ViewportExpansion, build_snapshot,
};
pub use error::{BrowserError, Result};
pub use history::{HashedDomElement, HistoryElement, ReplayLog};
