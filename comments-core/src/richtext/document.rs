//! Minimal rich-text document model: keyed blocks of characters, each
//! character carrying a set of inline style names.
//!
//! Offsets are character indices, not byte indices.

use std::collections::BTreeSet;

use crate::error::{CommentsError, Result};
use crate::richtext::comment_id_from_style;
use crate::state::CommentId;

/// Inline styles active on one character
pub type StyleSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    key: String,
    chars: Vec<char>,
    styles: Vec<StyleSet>,
}

impl ContentBlock {
    pub fn new(key: impl Into<String>, text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let styles = vec![StyleSet::new(); chars.len()];
        Self {
            key: key.into(),
            chars,
            styles,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn styles_at(&self, offset: usize) -> Option<&StyleSet> {
        self.styles.get(offset)
    }

    pub fn has_style(&self, offset: usize, style: &str) -> bool {
        self.styles
            .get(offset)
            .is_some_and(|styles| styles.contains(style))
    }

    /// Add `style` to every character in `start..end`.
    pub fn add_style(&mut self, start: usize, end: usize, style: &str) -> Result<()> {
        if start > end || end > self.len() {
            return Err(CommentsError::RangeOutOfBounds {
                key: self.key.clone(),
                start,
                end,
                len: self.len(),
            });
        }
        for styles in &mut self.styles[start..end] {
            styles.insert(style.to_string());
        }
        Ok(())
    }

    /// Remove `style` from the whole block. Returns whether anything changed.
    pub fn remove_style(&mut self, style: &str) -> bool {
        let mut removed = false;
        for styles in &mut self.styles {
            removed |= styles.remove(style);
        }
        removed
    }

    /// Maximal contiguous runs of characters carrying `style`.
    pub fn style_ranges(&self, style: &str) -> Vec<(usize, usize)> {
        self.find_ranges(|styles| styles.contains(style), |_, _| true)
    }

    /// Number of rendered runs (characters sharing an identical style set)
    /// that carry `style`. A highlight broken up by nested highlights
    /// renders as several runs.
    pub fn style_run_count(&self, style: &str) -> usize {
        self.find_ranges(|styles| styles.contains(style), |a, b| a == b)
            .len()
    }

    /// Comment ids with a highlight anywhere in this block, in order of first appearance.
    pub fn comment_ids(&self) -> Vec<CommentId> {
        let mut seen = Vec::new();
        for styles in &self.styles {
            for style in styles {
                if let Some(comment_id) = comment_id_from_style(style) {
                    if !seen.contains(&comment_id) {
                        seen.push(comment_id);
                    }
                }
            }
        }
        seen
    }

    /// Runs of characters passing `filter`; two neighbouring characters only
    /// share a run when `same_run` agrees.
    fn find_ranges(
        &self,
        filter: impl Fn(&StyleSet) -> bool,
        same_run: impl Fn(&StyleSet, &StyleSet) -> bool,
    ) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let mut start: Option<usize> = None;

        for (offset, styles) in self.styles.iter().enumerate() {
            let matches = filter(styles);
            match start {
                Some(run_start) if !matches => {
                    ranges.push((run_start, offset));
                    start = None;
                }
                Some(run_start) if !same_run(&self.styles[offset - 1], styles) => {
                    ranges.push((run_start, offset));
                    start = Some(offset);
                }
                None if matches => start = Some(offset),
                _ => {}
            }
        }
        if let Some(run_start) = start {
            ranges.push((run_start, self.styles.len()));
        }
        ranges
    }

    /// Split at `offset`; the head keeps this block's key.
    pub fn split_at(&self, offset: usize, tail_key: impl Into<String>) -> (Self, Self) {
        let offset = offset.min(self.len());
        let head = Self {
            key: self.key.clone(),
            chars: self.chars[..offset].to_vec(),
            styles: self.styles[..offset].to_vec(),
        };
        let tail = Self {
            key: tail_key.into(),
            chars: self.chars[offset..].to_vec(),
            styles: self.styles[offset..].to_vec(),
        };
        (head, tail)
    }
}

// ============================================================================
// Document
// ============================================================================

/// An ordered list of blocks. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichTextDocument {
    blocks: Vec<ContentBlock>,
}

impl Default for RichTextDocument {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl RichTextDocument {
    /// An empty block list becomes a single empty placeholder block.
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        if blocks.is_empty() {
            return Self::placeholder();
        }
        Self { blocks }
    }

    pub fn placeholder() -> Self {
        Self {
            blocks: vec![ContentBlock::new(new_block_key(), "")],
        }
    }

    /// One block per line, with generated keys.
    pub fn from_plain_text(text: &str) -> Self {
        let mut document = Self { blocks: Vec::new() };
        for line in text.split('\n') {
            let key = document.generate_block_key();
            document.blocks.push(ContentBlock::new(key, line));
        }
        document
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn block(&self, key: &str) -> Option<&ContentBlock> {
        self.blocks.iter().find(|block| block.key == key)
    }

    pub fn block_mut(&mut self, key: &str) -> Option<&mut ContentBlock> {
        self.blocks.iter_mut().find(|block| block.key == key)
    }

    pub fn block_index(&self, key: &str) -> Option<usize> {
        self.blocks.iter().position(|block| block.key == key)
    }

    /// Block texts joined with newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(ContentBlock::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A block key not used anywhere in this document.
    pub fn generate_block_key(&self) -> String {
        loop {
            let key = new_block_key();
            if self.block(&key).is_none() {
                return key;
            }
        }
    }

    pub fn apply_style(&mut self, key: &str, start: usize, end: usize, style: &str) -> Result<()> {
        self.block_mut(key)
            .ok_or_else(|| CommentsError::UnknownBlock {
                key: key.to_string(),
            })?
            .add_style(start, end, style)
    }

    /// Remove `style` from every block. Returns whether anything changed.
    pub fn remove_style(&mut self, style: &str) -> bool {
        let mut removed = false;
        for block in &mut self.blocks {
            removed |= block.remove_style(style);
        }
        removed
    }
}

fn new_block_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..5].to_string()
}

// ============================================================================
// Selection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPoint {
    pub key: String,
    pub offset: usize,
}

impl SelectionPoint {
    pub fn new(key: impl Into<String>, offset: usize) -> Self {
        Self {
            key: key.into(),
            offset,
        }
    }
}

/// Editor selection. `anchor` and `focus` may be in either order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
}

impl Selection {
    pub fn new(anchor: SelectionPoint, focus: SelectionPoint) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(key: impl Into<String>, offset: usize) -> Self {
        let point = SelectionPoint::new(key, offset);
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    fn is_backward(&self, document: &RichTextDocument) -> bool {
        let anchor = document.block_index(&self.anchor.key);
        let focus = document.block_index(&self.focus.key);
        (focus, self.focus.offset) < (anchor, self.anchor.offset)
    }

    /// The earlier point in document order.
    pub fn start(&self, document: &RichTextDocument) -> &SelectionPoint {
        if self.is_backward(document) {
            &self.focus
        } else {
            &self.anchor
        }
    }

    /// The later point in document order.
    pub fn end(&self, document: &RichTextDocument) -> &SelectionPoint {
        if self.is_backward(document) {
            &self.anchor
        } else {
            &self.focus
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> ContentBlock {
        ContentBlock::new("a", "hello world")
    }

    #[test]
    fn style_ranges_are_maximal_runs() {
        let mut block = block();
        block.add_style(0, 3, "COMMENT-1").unwrap();
        block.add_style(3, 5, "COMMENT-1").unwrap();
        block.add_style(7, 9, "COMMENT-1").unwrap();
        assert_eq!(block.style_ranges("COMMENT-1"), vec![(0, 5), (7, 9)]);
        assert!(block.style_ranges("COMMENT-2").is_empty());
    }

    #[test]
    fn run_count_splits_on_nested_styles() {
        let mut block = block();
        block.add_style(0, 10, "COMMENT-1").unwrap();
        block.add_style(3, 6, "COMMENT-2").unwrap();
        assert_eq!(block.style_ranges("COMMENT-1"), vec![(0, 10)]);
        assert_eq!(block.style_run_count("COMMENT-1"), 3);
        assert_eq!(block.style_run_count("COMMENT-2"), 1);
    }

    #[test]
    fn add_style_rejects_out_of_bounds() {
        let mut block = block();
        let err = block.add_style(5, 50, "X").unwrap_err();
        assert!(matches!(err, CommentsError::RangeOutOfBounds { len: 11, .. }));
        assert!(block.add_style(4, 2, "X").is_err());
    }

    #[test]
    fn offsets_are_characters() {
        let mut block = ContentBlock::new("a", "héllo");
        assert_eq!(block.len(), 5);
        block.add_style(1, 2, "X").unwrap();
        let (head, tail) = block.split_at(2, "b");
        assert_eq!(head.text(), "hé");
        assert_eq!(tail.text(), "llo");
        assert!(head.has_style(1, "X"));
        assert_eq!(tail.key(), "b");
    }

    #[test]
    fn empty_document_gets_placeholder_block() {
        let document = RichTextDocument::new(Vec::new());
        assert_eq!(document.blocks().len(), 1);
        assert!(document.blocks()[0].is_empty());
        assert_eq!(document.blocks()[0].key().len(), 5);
    }

    #[test]
    fn plain_text_round_trip() {
        let document = RichTextDocument::from_plain_text("one\ntwo\nthree");
        assert_eq!(document.blocks().len(), 3);
        assert_eq!(document.plain_text(), "one\ntwo\nthree");
        let keys: BTreeSet<&str> = document.blocks().iter().map(ContentBlock::key).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn apply_style_to_unknown_block() {
        let mut document = RichTextDocument::new(vec![block()]);
        let err = document.apply_style("zzz", 0, 1, "X").unwrap_err();
        assert!(matches!(err, CommentsError::UnknownBlock { .. }));
    }

    #[test]
    fn backward_selection_start() {
        let document = RichTextDocument::new(vec![
            ContentBlock::new("a", "first"),
            ContentBlock::new("b", "second"),
        ]);
        let selection = Selection::new(SelectionPoint::new("b", 2), SelectionPoint::new("a", 4));
        assert_eq!(selection.start(&document), &SelectionPoint::new("a", 4));
        assert_eq!(selection.end(&document), &SelectionPoint::new("b", 2));
        assert!(!selection.is_collapsed());
    }
}
