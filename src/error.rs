use thiserror::Error;

/// Errors produced while driving the browser or building snapshots
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Page script failed: {0}")]
    ScriptFailed(String),

    /// The traversal could not produce a snapshot; page state is unknown
    #[error("Snapshot build failed: {0}")]
    SnapshotFailed(String),

    /// A snapshot arena violated its structural invariants
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for browser operations
pub type Result<T> = std::result::Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::InvalidSnapshot("root 3 missing".to_string());
        assert_eq!(err.to_string(), "Invalid snapshot: root 3 missing");

        let err = BrowserError::ElementNotFound("No element with index 4".to_string());
        assert!(err.to_string().contains("index 4"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: BrowserError = parse.unwrap_err().into();
        assert!(matches!(err, BrowserError::Json(_)));
    }
}
