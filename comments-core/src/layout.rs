//! Vertical layout of floating comment cards.
//!
//! Each rendered comment would like to sit at its annotation's position. The
//! packer sorts comments by that desired position and merges any neighbours
//! that would overlap (including the minimum gap) into blocks, repeating until
//! nothing overlaps. A pinned comment is a hard anchor: the block containing
//! it is shifted so the pinned comment lands exactly on its desired position.
//!
//! Rendering layers drive the controller through `element_attached`,
//! `element_height_changed` and `element_detached`; the controller itself
//! knows nothing about the DOM.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::annotation::Annotation;
use crate::config::LayoutConfig;
use crate::state::CommentId;

#[derive(Debug, Clone)]
struct Block {
    position: f64,
    height: f64,
    comments: Vec<CommentId>,
    contains_pinned_comment: bool,
    /// Offset of the pinned comment from the top of the block
    pinned_comment_position: f64,
}

#[derive(Debug)]
pub struct LayoutController {
    config: LayoutConfig,
    /// Rendered comments, in mount order
    comment_elements: IndexSet<CommentId>,
    comment_annotations: HashMap<CommentId, Rc<dyn Annotation>>,
    comment_desired_positions: HashMap<CommentId, f64>,
    comment_heights: HashMap<CommentId, f64>,
    comment_tabs: HashMap<CommentId, Option<String>>,
    comment_calculated_positions: HashMap<CommentId, f64>,
    pinned_comment: Option<CommentId>,
    current_tab: Option<String>,
    is_dirty: bool,
}

impl Default for LayoutController {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutController {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            comment_elements: IndexSet::new(),
            comment_annotations: HashMap::new(),
            comment_desired_positions: HashMap::new(),
            comment_heights: HashMap::new(),
            comment_tabs: HashMap::new(),
            comment_calculated_positions: HashMap::new(),
            pinned_comment: None,
            current_tab: None,
            is_dirty: false,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Record whether the comment's card is currently rendered.
    pub fn set_comment_element(&mut self, comment_id: CommentId, rendered: bool) {
        let changed = if rendered {
            self.comment_elements.insert(comment_id)
        } else {
            self.comment_calculated_positions.remove(&comment_id);
            self.comment_elements.shift_remove(&comment_id)
        };
        if changed {
            self.is_dirty = true;
        }
    }

    pub fn set_comment_height(&mut self, comment_id: CommentId, height: f64) {
        if self.comment_heights.get(&comment_id) != Some(&height) {
            self.comment_heights.insert(comment_id, height);
            self.is_dirty = true;
        }
    }

    pub fn element_attached(&mut self, comment_id: CommentId, measured_height: f64) {
        self.set_comment_element(comment_id, true);
        self.set_comment_height(comment_id, measured_height);
    }

    pub fn element_height_changed(&mut self, comment_id: CommentId, new_height: f64) {
        self.set_comment_height(comment_id, new_height);
    }

    pub fn element_detached(&mut self, comment_id: CommentId) {
        self.set_comment_element(comment_id, false);
        self.comment_heights.remove(&comment_id);
    }

    pub fn set_comment_annotation(&mut self, comment_id: CommentId, annotation: Rc<dyn Annotation>) {
        self.comment_tabs.insert(comment_id, annotation.tab());
        self.comment_annotations.insert(comment_id, annotation);
        self.update_desired_position(comment_id);
        self.is_dirty = true;
    }

    /// Forget everything about a comment that left the store.
    pub fn remove_comment(&mut self, comment_id: CommentId) {
        self.comment_elements.shift_remove(&comment_id);
        self.comment_annotations.remove(&comment_id);
        self.comment_desired_positions.remove(&comment_id);
        self.comment_heights.remove(&comment_id);
        self.comment_tabs.remove(&comment_id);
        self.comment_calculated_positions.remove(&comment_id);
        if self.pinned_comment == Some(comment_id) {
            self.pinned_comment = None;
        }
        self.is_dirty = true;
    }

    pub fn set_pinned_comment(&mut self, comment_id: Option<CommentId>) {
        if self.pinned_comment == comment_id {
            return;
        }
        let previous = std::mem::replace(&mut self.pinned_comment, comment_id);

        // Annotations may report a different anchor when pinned.
        if let Some(previous) = previous {
            self.update_desired_position(previous);
        }
        if let Some(current) = comment_id {
            self.update_desired_position(current);
        }
        self.is_dirty = true;
    }

    pub fn pinned_comment(&self) -> Option<CommentId> {
        self.pinned_comment
    }

    pub fn set_current_tab(&mut self, tab: Option<String>) {
        if self.current_tab != tab {
            self.current_tab = tab;
            self.is_dirty = true;
        }
    }

    pub fn current_tab(&self) -> Option<&str> {
        self.current_tab.as_deref()
    }

    fn update_desired_position(&mut self, comment_id: CommentId) {
        let Some(annotation) = self.comment_annotations.get(&comment_id) else {
            return;
        };
        let is_pinned = self.pinned_comment == Some(comment_id);
        let position = annotation.desired_position(is_pinned) + self.config.offset;
        if self.comment_desired_positions.get(&comment_id) != Some(&position) {
            self.comment_desired_positions.insert(comment_id, position);
            self.is_dirty = true;
        }
    }

    /// Re-read every visible comment's annotation.
    pub fn refresh_desired_positions(&mut self) {
        let tab = self.current_tab.clone();
        let visible: Vec<CommentId> = self
            .comment_annotations
            .keys()
            .copied()
            .filter(|comment_id| self.comment_visible(tab.as_deref(), *comment_id))
            .collect();
        for comment_id in visible {
            self.update_desired_position(comment_id);
        }
    }

    /// Recompute calculated positions. Returns `false` without doing any work
    /// when nothing changed since the last run.
    pub fn refresh_layout(&mut self) -> bool {
        if !self.is_dirty {
            return false;
        }

        let gap = self.config.gap;
        let min_position = self.config.min_block_position();
        let tab = self.current_tab.clone();

        let laid_out: Vec<CommentId> = self
            .comment_elements
            .iter()
            .copied()
            .filter(|comment_id| self.comment_visible(tab.as_deref(), *comment_id))
            .collect();
        let pinned = self
            .pinned_comment
            .filter(|comment_id| laid_out.contains(comment_id));

        let mut blocks: Vec<Block> = laid_out
            .iter()
            .map(|comment_id| Block {
                position: self.desired_position(*comment_id),
                height: self.height(*comment_id),
                comments: vec![*comment_id],
                contains_pinned_comment: pinned == Some(*comment_id),
                pinned_comment_position: 0.0,
            })
            .collect();
        // Stable: equal positions keep mount order.
        blocks.sort_by(|a, b| a.position.total_cmp(&b.position));

        let mut overlaps = true;
        while overlaps {
            overlaps = false;
            let mut merged: Vec<Block> = Vec::with_capacity(blocks.len());

            for block in blocks {
                if let Some(previous) = merged.last_mut() {
                    if previous.position + previous.height + gap > block.position {
                        overlaps = true;

                        if block.contains_pinned_comment {
                            previous.contains_pinned_comment = true;
                            previous.pinned_comment_position =
                                previous.height + gap + block.pinned_comment_position;
                        }
                        previous.height += gap + block.height;
                        previous.comments.extend(block.comments);

                        match pinned {
                            Some(pinned_id) if previous.contains_pinned_comment => {
                                previous.position = self.desired_position(pinned_id)
                                    - previous.pinned_comment_position;
                            }
                            None if previous.position < min_position => {
                                previous.position = min_position;
                            }
                            _ => {}
                        }
                        continue;
                    }
                }
                merged.push(block);
            }

            blocks = merged;
        }

        self.comment_calculated_positions.clear();
        for block in &blocks {
            let mut current = block.position;
            for comment_id in &block.comments {
                self.comment_calculated_positions.insert(*comment_id, current);
                current += self.height(*comment_id) + gap;
            }
        }
        tracing::debug!(comments = laid_out.len(), blocks = blocks.len(), "Repacked comment layout");

        self.is_dirty = false;
        true
    }

    /// Desired positions then layout, in one call.
    pub fn refresh(&mut self) -> bool {
        self.refresh_desired_positions();
        self.refresh_layout()
    }

    pub fn comment_position(&self, comment_id: CommentId) -> Option<f64> {
        self.comment_calculated_positions.get(&comment_id).copied()
    }

    pub fn desired_position(&self, comment_id: CommentId) -> f64 {
        self.comment_desired_positions
            .get(&comment_id)
            .copied()
            .unwrap_or(0.0)
    }

    fn height(&self, comment_id: CommentId) -> f64 {
        self.comment_heights.get(&comment_id).copied().unwrap_or(0.0)
    }

    /// Whether a comment belongs on `tab`. Comments with no known tab, and
    /// lookups without a tab, are always visible.
    pub fn comment_visible(&self, tab: Option<&str>, comment_id: CommentId) -> bool {
        match (tab, self.comment_tabs.get(&comment_id)) {
            (None, _) => true,
            (Some(_), None) | (Some(_), Some(None)) => true,
            (Some(tab), Some(Some(comment_tab))) => tab == comment_tab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnchorNode;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Anchor {
        top: Cell<f64>,
        tab: Option<String>,
    }

    #[derive(Debug)]
    struct Fixed(Rc<Anchor>);

    impl AnchorNode for Anchor {
        fn document_top(&self) -> f64 {
            self.top.get()
        }

        fn tab(&self) -> Option<String> {
            self.tab.clone()
        }
    }

    impl Annotation for Fixed {
        fn anchor_node(&self, _focused: bool) -> Rc<dyn AnchorNode> {
            self.0.clone()
        }

        fn tab(&self) -> Option<String> {
            self.0.tab.clone()
        }
    }

    fn annotation(top: f64) -> Rc<dyn Annotation> {
        Rc::new(Fixed(Rc::new(Anchor {
            top: Cell::new(top),
            tab: None,
        })))
    }

    #[test]
    fn refresh_is_noop_when_clean() {
        let mut layout = LayoutController::default();
        assert!(!layout.refresh_layout());
        layout.element_attached(1, 100.0);
        assert!(layout.refresh_layout());
        assert!(!layout.refresh_layout());

        layout.element_height_changed(1, 100.0);
        assert!(!layout.refresh_layout());
        layout.element_height_changed(1, 120.0);
        assert!(layout.refresh_layout());
    }

    #[test]
    fn separated_comments_keep_desired_positions() {
        let mut layout = LayoutController::default();
        layout.set_comment_annotation(1, annotation(200.0));
        layout.set_comment_annotation(2, annotation(600.0));
        layout.element_attached(1, 100.0);
        layout.element_attached(2, 100.0);
        assert!(layout.refresh_layout());

        assert_eq!(layout.comment_position(1), Some(150.0));
        assert_eq!(layout.comment_position(2), Some(550.0));
    }

    #[test]
    fn overlapping_comments_stack_in_desired_order() {
        let mut layout = LayoutController::default();
        layout.set_comment_annotation(1, annotation(300.0));
        layout.set_comment_annotation(2, annotation(250.0));
        layout.element_attached(1, 100.0);
        layout.element_attached(2, 100.0);
        layout.refresh_layout();

        assert_eq!(layout.comment_position(2), Some(200.0));
        assert_eq!(layout.comment_position(1), Some(320.0));
    }

    #[test]
    fn pinned_comment_lands_on_desired_position() {
        let mut layout = LayoutController::default();
        layout.set_comment_annotation(1, annotation(250.0));
        layout.set_comment_annotation(2, annotation(300.0));
        layout.element_attached(1, 100.0);
        layout.element_attached(2, 100.0);
        layout.set_pinned_comment(Some(2));
        layout.refresh_layout();

        assert_eq!(layout.comment_position(2), Some(250.0));
        assert_eq!(layout.comment_position(1), Some(130.0));
    }

    #[test]
    fn comments_without_data_form_a_gapped_stack() {
        let mut layout = LayoutController::default();
        for comment_id in 1..=3 {
            layout.set_comment_element(comment_id, true);
        }
        layout.refresh_layout();

        assert_eq!(layout.comment_position(1), Some(50.0));
        assert_eq!(layout.comment_position(2), Some(70.0));
        assert_eq!(layout.comment_position(3), Some(90.0));
    }

    #[test]
    fn detached_comments_are_not_laid_out() {
        let mut layout = LayoutController::default();
        layout.element_attached(1, 10.0);
        layout.element_attached(2, 10.0);
        layout.refresh_layout();
        layout.element_detached(2);
        assert!(layout.refresh_layout());
        assert_eq!(layout.comment_position(2), None);
        assert!(layout.comment_position(1).is_some());
    }

    #[test]
    fn tab_visibility() {
        let mut layout = LayoutController::default();
        let on_tab: Rc<dyn Annotation> = Rc::new(Fixed(Rc::new(Anchor {
            top: Cell::new(0.0),
            tab: Some("settings".to_string()),
        })));
        layout.set_comment_annotation(1, on_tab);
        layout.set_comment_annotation(2, annotation(0.0));

        assert!(layout.comment_visible(None, 1));
        assert!(layout.comment_visible(Some("settings"), 1));
        assert!(!layout.comment_visible(Some("content"), 1));
        assert!(layout.comment_visible(Some("content"), 2));
        assert!(layout.comment_visible(Some("content"), 3));

        layout.element_attached(1, 10.0);
        layout.element_attached(2, 10.0);
        layout.set_current_tab(Some("content".to_string()));
        layout.refresh_layout();
        assert_eq!(layout.comment_position(1), None);
        assert!(layout.comment_position(2).is_some());
    }
}
