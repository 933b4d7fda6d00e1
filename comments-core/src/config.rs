//! Client configuration.
//!
//! The host page may override any of these through the `config` object of
//! its bootstrap document; missing keys keep their defaults.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Geometry constants for the floating comment column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Added to every desired position; negative nudges comments above their anchor
    pub offset: f64,
    /// Minimum vertical space between two stacked comments
    pub gap: f64,
    /// Merged blocks never start above `top_margin + offset` unless a comment is pinned
    pub top_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            offset: -50.0,
            gap: 20.0,
            top_margin: 100.0,
        }
    }
}

impl LayoutConfig {
    /// Topmost position a merged, unpinned block may take.
    pub fn min_block_position(&self) -> f64 {
        self.top_margin + self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub layout: LayoutConfig,
    /// Debounce interval for propagating rich-text positions into the store
    pub position_debounce_ms: u32,
    /// Prefix of the comments formset in the page form
    pub form_prefix: String,
    /// Query parameter naming the remote comment to focus on load
    pub focus_query_param: String,
    /// Document event fired when the host shows or hides content panels
    pub visibility_event: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            position_debounce_ms: 250,
            form_prefix: "comments".to_string(),
            focus_query_param: "comment".to_string(),
            visibility_event: "comments:visibility-changed".to_string(),
        }
    }
}

impl CommentsConfig {
    /// Decode overrides from the bootstrap document. `null` means defaults.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Create a config for testing (production geometry, no debounce)
    pub fn test() -> Self {
        Self {
            position_debounce_ms: 0,
            ..Self::default()
        }
    }
}
