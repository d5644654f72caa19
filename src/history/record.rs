use crate::error::Result;
use crate::history::element::HistoryElement;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One executed action and the element it targeted, if any
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    /// Action name and parameters as the action layer produced them
    pub action: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<HistoryElement>,
}

/// Recorded actions of one session, in execution order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReplayLog {
    pub session_id: String,

    #[serde(default)]
    pub steps: Vec<ActionRecord>,
}

impl ReplayLog {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), steps: Vec::new() }
    }

    pub fn record(&mut self, action: serde_json::Value, element: Option<HistoryElement>) {
        self.steps.push(ActionRecord { action, element });
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::json;

    fn history_element() -> HistoryElement {
        HistoryElement {
            tag_name: "input".to_string(),
            xpath: "html/body/form/input".to_string(),
            highlight_index: Some(2),
            entire_parent_branch_path: vec!["form".to_string(), "input".to_string()],
            attributes: IndexMap::from([("name".to_string(), "q".to_string())]),
            shadow_root: false,
            css_selector: Some("html > body > form > input[name=\"q\"]".to_string()),
            page_coordinates: None,
            viewport_coordinates: None,
            viewport_info: None,
        }
    }

    #[test]
    fn test_record_steps() {
        let mut log = ReplayLog::new("session-1");
        assert!(log.is_empty());

        log.record(json!({"open_url": {"url": "https://example.com"}}), None);
        log.record(json!({"input_text": {"index": 2, "text": "rust"}}), Some(history_element()));

        assert_eq!(log.len(), 2);
        assert!(log.steps[0].element.is_none());
        assert_eq!(log.steps[1].element.as_ref().map(|e| e.tag_name.as_str()), Some("input"));
    }

    #[test]
    fn test_save_and_load() {
        let mut log = ReplayLog::new("session-2");
        log.record(json!({"click_element": {"index": 2}}), Some(history_element()));

        let path = std::env::temp_dir().join(format!("page-snapshot-replay-{}.json", std::process::id()));
        log.save(&path).unwrap();
        let loaded = ReplayLog::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, log);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = ReplayLog::load("/nonexistent/page-snapshot/replay.json");
        assert!(matches!(result, Err(crate::error::BrowserError::Io(_))));
    }

    #[test]
    fn test_steps_default_to_empty() {
        let log: ReplayLog = serde_json::from_str(r#"{"session_id": "s"}"#).unwrap();
        assert!(log.is_empty());
    }
}
