//! Visual overlays over highlighted elements.
//!
//! Overlays live in one fixed-position container identified by
//! [`HIGHLIGHT_CONTAINER_ID`], which the snapshot traversal skips.

use crate::dom::{HIGHLIGHT_CONTAINER_ID, HighlightRequest};
use crate::error::{BrowserError, Result};
use headless_chrome::Tab;

const DRAW_OVERLAYS_JS: &str = r#"
(function (requests) {
    const colors = ['#FF0000', '#00AA00', '#0000FF', '#FFA500', '#800080', '#008080',
                    '#FF69B4', '#4B0082', '#FF4500', '#2E8B57', '#DC143C', '#4682B4'];
    let container = document.getElementById('__CONTAINER_ID__');
    if (!container) {
        container = document.createElement('div');
        container.id = '__CONTAINER_ID__';
        container.style.position = 'fixed';
        container.style.top = '0';
        container.style.left = '0';
        container.style.width = '100%';
        container.style.height = '100%';
        container.style.pointerEvents = 'none';
        container.style.zIndex = '2147483647';
        document.body.appendChild(container);
    }
    for (const request of requests) {
        const color = colors[request.highlight_index % colors.length];
        const box = document.createElement('div');
        box.style.position = 'fixed';
        box.style.left = request.rect.x + 'px';
        box.style.top = request.rect.y + 'px';
        box.style.width = request.rect.width + 'px';
        box.style.height = request.rect.height + 'px';
        box.style.border = '2px solid ' + color;
        box.style.backgroundColor = color + '1A';
        box.style.boxSizing = 'border-box';

        const label = document.createElement('div');
        label.textContent = String(request.highlight_index);
        label.style.position = 'absolute';
        label.style.top = '-2px';
        label.style.right = '-2px';
        label.style.background = color;
        label.style.color = 'white';
        label.style.font = '11px sans-serif';
        label.style.padding = '1px 4px';
        label.style.borderRadius = '2px';
        box.appendChild(label);
        container.appendChild(box);
    }
    return requests.length;
})(__REQUESTS__)
"#;

const REMOVE_OVERLAYS_JS: &str = r#"
(function () {
    const container = document.getElementById('__CONTAINER_ID__');
    if (container) container.remove();
    return true;
})()
"#;

/// Script drawing one box per request into the overlay container
pub fn draw_script(requests: &[HighlightRequest]) -> Result<String> {
    let requests = serde_json::to_string(requests)?;
    Ok(DRAW_OVERLAYS_JS
        .replace("__CONTAINER_ID__", HIGHLIGHT_CONTAINER_ID)
        .replace("__REQUESTS__", &requests))
}

/// Script removing the overlay container; safe to run when there is none
pub fn remove_script() -> String {
    REMOVE_OVERLAYS_JS.replace("__CONTAINER_ID__", HIGHLIGHT_CONTAINER_ID)
}

pub fn draw_highlights(tab: &Tab, requests: &[HighlightRequest]) -> Result<()> {
    if requests.is_empty() {
        return Ok(());
    }
    tab.evaluate(&draw_script(requests)?, false)
        .map_err(|e| BrowserError::ScriptFailed(format!("Failed to draw highlights: {}", e)))?;
    log::debug!("Drew {} highlight overlays", requests.len());
    Ok(())
}

pub fn remove_highlights(tab: &Tab) -> Result<()> {
    tab.evaluate(&remove_script(), false)
        .map_err(|e| BrowserError::ScriptFailed(format!("Failed to remove highlights: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::BoundingBox;

    #[test]
    fn test_draw_script_embeds_requests() {
        let requests = vec![HighlightRequest {
            highlight_index: 3,
            xpath: "html/body/button".to_string(),
            rect: BoundingBox::new(10.0, 20.0, 30.0, 40.0),
        }];
        let script = draw_script(&requests).unwrap();

        assert!(script.contains(HIGHLIGHT_CONTAINER_ID));
        assert!(script.contains("\"highlight_index\":3"));
        assert!(!script.contains("__REQUESTS__"));
        assert!(!script.contains("__CONTAINER_ID__"));
    }

    #[test]
    fn test_remove_script_targets_container() {
        let script = remove_script();
        assert!(script.contains(&format!("getElementById('{}')", HIGHLIGHT_CONTAINER_ID)));
        assert!(script.contains("if (container)"));
    }
}
