//! Shared types between the comments client and the page that hosts it
//!
//! These types are used by both:
//! - the commenting engine (`comments-core`, native Rust)
//! - the Dioxus client (`comments-ui`, WASM)
//!
//! Serializable with serde for the JSON bootstrap document and the stored
//! comment positions. TypeScript bindings are exported with ts-rs for the
//! host page scripts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Authors
// ============================================================================

/// Author of a comment or reply, as shown in the comment UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct Author {
    pub id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// One entry of the author lookup table sent alongside the initial comments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct AuthorInfo {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Author id -> display data
pub type AuthorTable = HashMap<u64, AuthorInfo>;

/// Resolve an author id against the lookup table.
///
/// Unknown ids still produce an author (with an empty name) so a comment
/// from a since-removed user keeps rendering.
pub fn resolve_author(authors: &AuthorTable, id: u64) -> Author {
    match authors.get(&id) {
        Some(info) => Author {
            id,
            name: info.name.clone(),
            avatar_url: info.avatar_url.clone(),
        },
        None => Author {
            id,
            name: String::new(),
            avatar_url: None,
        },
    }
}

// ============================================================================
// Initial load payload
// ============================================================================

/// A comment as delivered by the server when the edit view loads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct InitialComment {
    pub pk: u64,
    pub user: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<InitialReply>,
    pub contentpath: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub resolved: bool,
}

/// A reply as delivered by the server, nested in its comment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct InitialReply {
    pub pk: u64,
    pub user: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Bootstrap document embedded in the edit page as JSON
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, TS)]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct CommentsBootstrap {
    /// Id of the user editing the page
    #[serde(default)]
    pub user: Option<u64>,
    #[serde(default)]
    pub authors: AuthorTable,
    #[serde(default)]
    pub comments: Vec<InitialComment>,
    /// Client configuration overrides, decoded by the engine
    #[serde(default)]
    #[ts(type = "unknown")]
    pub config: serde_json::Value,
}

// ============================================================================
// Stored positions
// ============================================================================

/// One highlighted range of a rich-text comment.
///
/// A rich-text comment's `position` field is a JSON array of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct StoredRange {
    /// Key of the block the range lives in
    pub key: String,
    /// Inclusive start offset, in characters
    pub start: usize,
    /// Exclusive end offset, in characters
    pub end: usize,
}

/// Serialise ranges in the canonical form stored on a comment.
///
/// An empty list serialises to `"[]"`.
pub fn serialize_ranges(ranges: &[StoredRange]) -> String {
    serde_json::to_string(ranges).unwrap_or_else(|_| "[]".to_string())
}

// ============================================================================
// Form submission
// ============================================================================

/// A single hidden input of the comments formset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "../../comments-ui/src/types/generated.ts")]
pub struct FormField {
    pub name: String,
    pub value: String,
}

impl FormField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Inline style prefix tagging a rich-text range with a comment id
pub const COMMENT_STYLE_PREFIX: &str = "COMMENT-";

/// Management form field names
pub const FORM_TOTAL_FORMS: &str = "TOTAL_FORMS";
pub const FORM_INITIAL_FORMS: &str = "INITIAL_FORMS";
pub const FORM_MIN_NUM_FORMS: &str = "MIN_NUM_FORMS";
pub const FORM_MAX_NUM_FORMS: &str = "MAX_NUM_FORMS";

/// Per-row field names
pub const FORM_FIELD_DELETE: &str = "DELETE";
pub const FORM_FIELD_ID: &str = "id";
pub const FORM_FIELD_TEXT: &str = "text";
pub const FORM_FIELD_RESOLVED: &str = "resolved";
pub const FORM_FIELD_CONTENTPATH: &str = "contentpath";
pub const FORM_FIELD_POSITION: &str = "position";

/// Suffix of the nested reply formset prefix
pub const FORM_REPLIES_SUFFIX: &str = "replies";

// ============================================================================
// Tests
// ============================================================================
