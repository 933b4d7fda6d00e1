//! Splitting one rich-text field into two at the cursor.

use std::collections::BTreeSet;

use crate::richtext::document::{RichTextDocument, Selection};
use crate::richtext::positions::extract_comment_positions;
use crate::state::CommentId;

#[derive(Debug, Clone)]
pub struct SplitResult {
    /// Content strictly before the cursor
    pub before: RichTextDocument,
    /// Content at and after the cursor
    pub after: RichTextDocument,
    /// Comments highlighted anywhere in `after`; their owner must follow the text
    pub comments_to_move: BTreeSet<CommentId>,
}

impl SplitResult {
    pub fn should_move_comment(&self, comment_id: CommentId) -> bool {
        self.comments_to_move.contains(&comment_id)
    }
}

/// Split `document` at the start of `selection`.
///
/// A non-collapsed selection is collapsed to its start first so highlighted
/// text under it is kept. Either half may end up with no content, in which
/// case it holds a single empty block.
pub fn split_document(document: &RichTextDocument, selection: &Selection) -> SplitResult {
    let point = selection.start(document);

    let Some(index) = document.block_index(&point.key) else {
        tracing::warn!(block_key = %point.key, "Cannot split at unknown block");
        return SplitResult {
            before: document.clone(),
            after: RichTextDocument::placeholder(),
            comments_to_move: BTreeSet::new(),
        };
    };

    let blocks = document.blocks();
    let (head, tail) = blocks[index].split_at(point.offset, document.generate_block_key());

    let mut before_blocks = blocks[..index].to_vec();
    if !head.is_empty() {
        before_blocks.push(head);
    }
    let mut after_blocks = vec![tail];
    after_blocks.extend_from_slice(&blocks[index + 1..]);

    let after = RichTextDocument::new(after_blocks);
    let comments_to_move = extract_comment_positions(&after).into_keys().collect();

    SplitResult {
        before: RichTextDocument::new(before_blocks),
        after,
        comments_to_move,
    }
}
