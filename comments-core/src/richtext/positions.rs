//! Reconciling in-document highlights with stored comment positions.

use std::rc::Rc;

use indexmap::IndexMap;
use shared_types::{serialize_ranges, StoredRange};

use crate::annotation::Annotation;
use crate::app::CommentApp;
use crate::error::{CommentsError, Result};
use crate::richtext::document::{RichTextDocument, Selection};
use crate::richtext::{comment_id_from_style, comment_style};
use crate::state::{update_comment, Comment, CommentId, CommentMap, CommentUpdate};

/// Every comment highlight in the document, as ranges grouped by comment id.
///
/// Ids appear in order of their first highlighted character; ranges follow
/// document order.
pub fn extract_comment_positions(document: &RichTextDocument) -> IndexMap<CommentId, Vec<StoredRange>> {
    let mut positions: IndexMap<CommentId, Vec<StoredRange>> = IndexMap::new();
    for block in document.blocks() {
        for comment_id in block.comment_ids() {
            let ranges = block
                .style_ranges(&comment_style(comment_id))
                .into_iter()
                .map(|(start, end)| StoredRange {
                    key: block.key().to_string(),
                    start,
                    end,
                });
            positions.entry(comment_id).or_default().extend(ranges);
        }
    }
    positions
}

/// Parse a stored rich-text position. An empty string means no ranges.
pub fn parse_positions(comment_id: CommentId, position: &str) -> Result<Vec<StoredRange>> {
    if position.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(position).map_err(|source| CommentsError::InvalidPosition { comment_id, source })
}

/// Highlight `ranges` for `comment_id`. Ranges that no longer fit the
/// document are logged and skipped. Returns how many were applied.
pub fn apply_comment_ranges(
    document: &mut RichTextDocument,
    comment_id: CommentId,
    ranges: &[StoredRange],
) -> usize {
    let style = comment_style(comment_id);
    let mut applied = 0;
    for range in ranges {
        match document.apply_style(&range.key, range.start, range.end, &style) {
            Ok(()) => applied += 1,
            Err(e) => {
                tracing::warn!(comment_id, block_key = %range.key, "Skipping stored comment range: {}", e);
            }
        }
    }
    applied
}

/// Highlight a comment's stored position. Malformed positions are logged and
/// leave the document untouched.
pub fn apply_stored_position(document: &mut RichTextDocument, comment: &Comment) -> usize {
    match parse_positions(comment.local_id, &comment.position) {
        Ok(ranges) => apply_comment_ranges(document, comment.local_id, &ranges),
        Err(e) => {
            tracing::warn!(comment_id = comment.local_id, "{}", e);
            0
        }
    }
}

/// Highlight every comment on a freshly loaded document and register an
/// annotation for the comments that do not have one yet.
pub fn add_comments_to_document(
    app: &CommentApp,
    document: &mut RichTextDocument,
    comments: &[Rc<Comment>],
    mut make_annotation: impl FnMut(&Comment) -> Rc<dyn Annotation>,
) {
    for comment in comments {
        apply_stored_position(document, comment);
        if comment.annotation.is_none() {
            app.update_annotation(make_annotation(comment), comment.local_id);
        }
    }
}

/// After an edit, push any changed highlight ranges back into the store.
///
/// Comments without an annotation have never been placed in this document
/// and are left alone.
pub fn update_comment_positions(app: &CommentApp, document: &RichTextDocument, comments: &[Rc<Comment>]) {
    let positions = extract_comment_positions(document);

    for comment in comments {
        if comment.annotation.is_none() {
            continue;
        }
        let ranges = positions
            .get(&comment.local_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let position = serialize_ranges(ranges);
        if position != comment.position {
            tracing::debug!(comment_id = comment.local_id, %position, "Comment position changed");
            app.dispatch(update_comment(comment.local_id, CommentUpdate::position(position)));
        }
    }
}

/// Highlight the selected text for a new comment. Returns the number of
/// characters highlighted; a collapsed selection highlights nothing.
pub fn add_comment_at_selection(
    document: &mut RichTextDocument,
    selection: &Selection,
    comment_id: CommentId,
) -> Result<usize> {
    let start = selection.start(document).clone();
    let end = selection.end(document).clone();
    let unknown = |key: &str| CommentsError::UnknownBlock { key: key.to_string() };
    let start_index = document.block_index(&start.key).ok_or_else(|| unknown(&start.key))?;
    let end_index = document.block_index(&end.key).ok_or_else(|| unknown(&end.key))?;

    for (point, index) in [(&start, start_index), (&end, end_index)] {
        let len = document.blocks()[index].len();
        if point.offset > len {
            return Err(CommentsError::RangeOutOfBounds {
                key: point.key.clone(),
                start: start.offset,
                end: end.offset,
                len,
            });
        }
    }

    // Work out every span before styling so a bad selection changes nothing.
    let spans: Vec<(String, usize, usize)> = (start_index..=end_index)
        .filter_map(|index| {
            let block = &document.blocks()[index];
            let from = if index == start_index { start.offset } else { 0 };
            let to = if index == end_index { end.offset } else { block.len() };
            (from < to).then(|| (block.key().to_string(), from, to))
        })
        .collect();

    let style = comment_style(comment_id);
    let mut highlighted = 0;
    for (key, from, to) in spans {
        document.apply_style(&key, from, to, &style)?;
        highlighted += to - from;
    }
    Ok(highlighted)
}

/// Remove highlights whose comment is gone, deleted or resolved. Returns the
/// ids whose highlights were removed.
pub fn strip_orphaned_comment_styles(document: &mut RichTextDocument, comments: &CommentMap) -> Vec<CommentId> {
    let orphaned: Vec<CommentId> = extract_comment_positions(document)
        .into_keys()
        .filter(|comment_id| {
            comments
                .get(comment_id)
                .map_or(true, |comment| comment.deleted || comment.resolved)
        })
        .collect();

    for comment_id in &orphaned {
        document.remove_style(&comment_style(*comment_id));
    }
    orphaned
}

/// Comment ids highlighted at `offset` in block `key`.
pub fn comment_ids_at(document: &RichTextDocument, key: &str, offset: usize) -> Vec<CommentId> {
    document
        .block(key)
        .and_then(|block| block.styles_at(offset))
        .map(|styles| styles.iter().filter_map(|style| comment_id_from_style(style)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::document::{ContentBlock, SelectionPoint};

    fn document() -> RichTextDocument {
        RichTextDocument::new(vec![
            ContentBlock::new("a", "The quick brown fox"),
            ContentBlock::new("b", "jumps over the lazy dog"),
        ])
    }

    #[test]
    fn extract_groups_ranges_by_comment() {
        let mut document = document();
        document.apply_style("a", 4, 9, "COMMENT-1").unwrap();
        document.apply_style("b", 0, 5, "COMMENT-1").unwrap();
        document.apply_style("a", 10, 15, "COMMENT-2").unwrap();
        document.apply_style("a", 0, 3, "BOLD").unwrap();

        let positions = extract_comment_positions(&document);
        assert_eq!(positions.len(), 2);
        assert_eq!(
            positions[&1],
            vec![
                StoredRange { key: "a".into(), start: 4, end: 9 },
                StoredRange { key: "b".into(), start: 0, end: 5 },
            ]
        );
        assert_eq!(positions[&2], vec![StoredRange { key: "a".into(), start: 10, end: 15 }]);
    }

    #[test]
    fn parse_empty_and_malformed() {
        assert!(parse_positions(1, "").unwrap().is_empty());
        assert!(parse_positions(1, "[]").unwrap().is_empty());
        let err = parse_positions(3, "{not json").unwrap_err();
        assert!(matches!(err, CommentsError::InvalidPosition { comment_id: 3, .. }));
    }

    #[test]
    fn bad_ranges_are_skipped() {
        let mut document = document();
        let ranges = vec![
            StoredRange { key: "gone".into(), start: 0, end: 2 },
            StoredRange { key: "a".into(), start: 0, end: 500 },
            StoredRange { key: "b".into(), start: 6, end: 10 },
        ];
        assert_eq!(apply_comment_ranges(&mut document, 4, &ranges), 1);
        assert_eq!(
            extract_comment_positions(&document)[&4],
            vec![StoredRange { key: "b".into(), start: 6, end: 10 }]
        );
    }

    #[test]
    fn selection_across_blocks() {
        let mut document = document();
        let selection = Selection::new(SelectionPoint::new("b", 5), SelectionPoint::new("a", 16));
        assert_eq!(add_comment_at_selection(&mut document, &selection, 7).unwrap(), 8);
        assert_eq!(
            extract_comment_positions(&document)[&7],
            vec![
                StoredRange { key: "a".into(), start: 16, end: 19 },
                StoredRange { key: "b".into(), start: 0, end: 5 },
            ]
        );

        let collapsed = Selection::collapsed("a", 2);
        assert_eq!(add_comment_at_selection(&mut document, &collapsed, 8).unwrap(), 0);
    }

    #[test]
    fn test_out_of_bounds_selection_leaves_document_unstyled() {
        let mut document = document();
        let selection = Selection::new(SelectionPoint::new("a", 4), SelectionPoint::new("b", 99));
        let err = add_comment_at_selection(&mut document, &selection, 9).unwrap_err();
        assert!(matches!(err, CommentsError::RangeOutOfBounds { len: 23, .. }));
        assert!(extract_comment_positions(&document).is_empty());

        let past_start = Selection::new(SelectionPoint::new("a", 40), SelectionPoint::new("b", 3));
        assert!(add_comment_at_selection(&mut document, &past_start, 9).is_err());
        assert!(extract_comment_positions(&document).is_empty());
    }

    #[test]
    fn comment_ids_at_offset() {
        let mut document = document();
        document.apply_style("a", 0, 5, "COMMENT-1").unwrap();
        document.apply_style("a", 3, 8, "COMMENT-2").unwrap();
        assert_eq!(comment_ids_at(&document, "a", 4), vec![1, 2]);
        assert!(comment_ids_at(&document, "a", 10).is_empty());
        assert!(comment_ids_at(&document, "zz", 0).is_empty());
    }
}
