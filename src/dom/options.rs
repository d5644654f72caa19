use serde::{Deserialize, Serialize};
use std::fmt;

/// Margin added around the window when deciding whether an element is in view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ViewportExpansion {
    /// Extend the window by this many pixels on every side
    Pixels(u32),
    /// Ignore the viewport entirely (`-1` on the wire)
    Unbounded,
}

impl ViewportExpansion {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, ViewportExpansion::Unbounded)
    }

    /// Pixel margin, if bounded
    pub fn margin(&self) -> Option<f64> {
        match self {
            ViewportExpansion::Pixels(px) => Some(f64::from(*px)),
            ViewportExpansion::Unbounded => None,
        }
    }
}

impl Default for ViewportExpansion {
    fn default() -> Self {
        ViewportExpansion::Pixels(0)
    }
}

impl TryFrom<i64> for ViewportExpansion {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(ViewportExpansion::Unbounded),
            v if v >= 0 => u32::try_from(v)
                .map(ViewportExpansion::Pixels)
                .map_err(|_| format!("viewport expansion {} is too large", v)),
            v => Err(format!("viewport expansion must be -1 or non-negative, got {}", v)),
        }
    }
}

impl From<ViewportExpansion> for i64 {
    fn from(value: ViewportExpansion) -> Self {
        match value {
            ViewportExpansion::Pixels(px) => i64::from(px),
            ViewportExpansion::Unbounded => -1,
        }
    }
}

impl fmt::Display for ViewportExpansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewportExpansion::Pixels(px) => write!(f, "{}px", px),
            ViewportExpansion::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Options for building one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    /// Request visual overlays for highlighted elements
    pub highlight_elements: bool,

    /// Only this index gets an overlay (None = all)
    pub focus_highlight_index: Option<usize>,

    pub viewport_expansion: ViewportExpansion,

    /// First node id to assign
    pub start_id: usize,

    /// First highlight index to assign
    pub start_highlight_index: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            highlight_elements: true,
            focus_highlight_index: None,
            viewport_expansion: ViewportExpansion::default(),
            start_id: 0,
            start_highlight_index: 0,
        }
    }
}

impl SnapshotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlight_elements(mut self, highlight: bool) -> Self {
        self.highlight_elements = highlight;
        self
    }

    pub fn focus_highlight_index(mut self, index: Option<usize>) -> Self {
        self.focus_highlight_index = index;
        self
    }

    pub fn viewport_expansion(mut self, expansion: ViewportExpansion) -> Self {
        self.viewport_expansion = expansion;
        self
    }

    pub fn start_id(mut self, start_id: usize) -> Self {
        self.start_id = start_id;
        self
    }

    pub fn start_highlight_index(mut self, index: usize) -> Self {
        self.start_highlight_index = index;
        self
    }

    /// Whether an overlay should be requested for `index`
    pub fn wants_overlay(&self, index: usize) -> bool {
        self.highlight_elements && self.focus_highlight_index.is_none_or(|focus| focus == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SnapshotOptions::default();
        assert!(opts.highlight_elements);
        assert_eq!(opts.focus_highlight_index, None);
        assert_eq!(opts.viewport_expansion, ViewportExpansion::Pixels(0));
        assert_eq!(opts.start_id, 0);
        assert_eq!(opts.start_highlight_index, 0);
    }

    #[test]
    fn test_expansion_wire_format() {
        let opts: SnapshotOptions = serde_json::from_str(r#"{"viewport_expansion": -1}"#).unwrap();
        assert!(opts.viewport_expansion.is_unbounded());
        assert_eq!(opts.viewport_expansion.margin(), None);

        let opts: SnapshotOptions = serde_json::from_str(r#"{"viewport_expansion": 500}"#).unwrap();
        assert_eq!(opts.viewport_expansion.margin(), Some(500.0));

        let json = serde_json::to_value(SnapshotOptions::new().viewport_expansion(ViewportExpansion::Unbounded)).unwrap();
        assert_eq!(json["viewport_expansion"], -1);
    }

    #[test]
    fn test_expansion_rejects_other_negatives() {
        let parsed: Result<SnapshotOptions, _> = serde_json::from_str(r#"{"viewport_expansion": -2}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_wants_overlay() {
        let all = SnapshotOptions::new();
        assert!(all.wants_overlay(0));
        assert!(all.wants_overlay(7));

        let focused = SnapshotOptions::new().focus_highlight_index(Some(3));
        assert!(focused.wants_overlay(3));
        assert!(!focused.wants_overlay(2));

        let off = SnapshotOptions::new().highlight_elements(false);
        assert!(!off.wants_overlay(0));
    }
}
