//! Picking one comment when several highlights overlap.

use crate::richtext::{comment_id_from_style, comment_style};
use crate::richtext::document::ContentBlock;
use crate::state::CommentId;

/// The comment that "owns" the character at `offset`, for click-to-focus.
///
/// Prefers the highlight with the fewest rendered runs in the block: a
/// highlight blanketing the block is broken up by every nested highlight,
/// while a small nested one stays a single run. Not foolproof when more than
/// two highlights overlap. Ties go to the highlight covering fewer characters,
/// then to the lower id.
pub fn find_least_common_comment_id(block: &ContentBlock, offset: usize) -> Option<CommentId> {
    let candidates: Vec<CommentId> = block
        .styles_at(offset)?
        .iter()
        .filter_map(|style| comment_id_from_style(style))
        .collect();

    match candidates.as_slice() {
        [] => None,
        [only] => Some(*only),
        _ => candidates.iter().copied().min_by_key(|comment_id| {
            let style = comment_style(*comment_id);
            let characters: usize = block
                .style_ranges(&style)
                .iter()
                .map(|(start, end)| end - start)
                .sum();
            (block.style_run_count(&style), characters, *comment_id)
        }),
    }
}
