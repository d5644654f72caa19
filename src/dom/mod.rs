//! DOM snapshot and indexing.
//!
//! - [`Page`]: a captured document, and the [`DocumentHost`] query surface over it
//! - [`build_snapshot`]: the traversal that classifies and indexes elements
//! - [`DomTree`]: a validated snapshot with its [`SelectorMap`]

pub mod builder;
pub mod element;
pub mod geometry;
pub mod host;
pub mod interactive;
pub mod options;
pub mod page;
pub mod selector_map;
pub mod tree;
pub mod visibility;

pub use builder::{HIGHLIGHT_CONTAINER_ID, HighlightRequest, Snapshot, build_snapshot};
pub use element::{BoundingBox, DomNode, ElementNode, NodeId, TextNode, TreeScope, ViewportInfo};
pub use host::{DocumentHost, HitScope, HitTestError, NodeHandle};
pub use options::{SnapshotOptions, ViewportExpansion};
pub use page::Page;
pub use selector_map::{ElementSelector, SelectorMap, css_selector_for};
pub use tree::DomTree;

use crate::error::{BrowserError, Result};
use headless_chrome::Tab;
use headless_chrome::protocol::cdp::Runtime;
use std::sync::Arc;

const CAPTURE_SCRIPT: &str = include_str!("capture_page.js");

/// `Runtime.evaluate` for the capture script.
///
/// Unlike `Tab::evaluate`, this exposes the DevTools command-line API so the
/// script can read attached listeners through `getEventListeners`.
fn capture_request() -> Runtime::Evaluate {
    Runtime::Evaluate {
        expression: CAPTURE_SCRIPT.to_string(),
        return_by_value: Some(true),
        generate_preview: Some(false),
        silent: Some(false),
        await_promise: Some(false),
        include_command_line_api: Some(true),
        user_gesture: Some(false),
        object_group: None,
        context_id: None,
        throw_on_side_effect: None,
        timeout: None,
        disable_breaks: None,
        repl_mode: None,
        allow_unsafe_eval_blocked_by_csp: None,
        unique_context_id: None,
        serialization_options: None,
    }
}

/// Capture the tab's current document, including same-origin iframes and open shadow roots
pub fn capture_page(tab: &Arc<Tab>) -> Result<Page> {
    let response = tab
        .call_method(capture_request())
        .map_err(|e| BrowserError::ScriptFailed(format!("Failed to execute page capture script: {}", e)))?;

    if let Some(exception) = response.exception_details {
        return Err(BrowserError::ScriptFailed(format!("Page capture script threw: {}", exception.text)));
    }

    let json_value = response
        .result
        .value
        .ok_or_else(|| BrowserError::SnapshotFailed("No value returned from page capture".to_string()))?;

    // The script returns a JSON string
    let json_str: String = serde_json::from_value(json_value)
        .map_err(|e| BrowserError::SnapshotFailed(format!("Failed to get JSON string: {}", e)))?;

    Page::from_json(&json_str)
}

/// Capture the tab and build an indexed snapshot of it
pub fn extract_dom(tab: &Arc<Tab>, options: &SnapshotOptions) -> Result<DomTree> {
    let page = capture_page(tab)?;
    DomTree::from_host(&page, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports_build_a_tree() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let button = page.append_element(body, "button");
        page.set_rect(button, BoundingBox::new(0.0, 0.0, 40.0, 20.0));

        let tree = DomTree::from_host(&page, &SnapshotOptions::default()).unwrap();
        assert_eq!(tree.root().tag_name, "body");
        assert_eq!(tree.count_interactive(), 1);
    }

    #[test]
    fn test_capture_script_targets_page_layout() {
        assert!(CAPTURE_SCRIPT.contains("listener_introspection"));
        assert!(CAPTURE_SCRIPT.contains("'shadow_root'"));
        assert!(CAPTURE_SCRIPT.contains("hit_tests"));
        assert!(CAPTURE_SCRIPT.contains("elementFromPoint"));
        assert!(CAPTURE_SCRIPT.contains("JSON.stringify"));
    }

    #[test]
    fn test_capture_request_exposes_command_line_api() {
        let request = capture_request();
        assert_eq!(request.include_command_line_api, Some(true));
        assert_eq!(request.return_by_value, Some(true));
        assert_eq!(request.await_promise, Some(false));
        assert!(request.expression.contains("getEventListeners"));
    }
}
