//! Inline comment highlights in rich-text fields.
//!
//! A comment's highlight is an inline style named `COMMENT-<id>` applied to
//! the characters it covers. The functions here move between that in-document
//! representation and the ranges stored in `Comment::position`.

pub mod document;
pub mod overlap;
pub mod positions;
pub mod split;

pub use document::{ContentBlock, RichTextDocument, Selection, SelectionPoint, StyleSet};
pub use overlap::find_least_common_comment_id;
pub use positions::{
    add_comment_at_selection, add_comments_to_document, apply_comment_ranges,
    apply_stored_position, comment_ids_at, extract_comment_positions, parse_positions,
    strip_orphaned_comment_styles, update_comment_positions,
};
pub use split::{split_document, SplitResult};

use shared_types::COMMENT_STYLE_PREFIX;

use crate::state::CommentId;

/// Inline style name for a comment's highlight.
pub fn comment_style(comment_id: CommentId) -> String {
    format!("{COMMENT_STYLE_PREFIX}{comment_id}")
}

/// Comment id carried by an inline style, if it is a comment highlight.
pub fn comment_id_from_style(style: &str) -> Option<CommentId> {
    style.strip_prefix(COMMENT_STYLE_PREFIX)?.parse().ok()
}
