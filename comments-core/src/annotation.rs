//! Annotations: where a comment's anchor currently sits on screen.
//!
//! The layout controller only ever asks an annotation three things: the node
//! to float next to, the tab that node lives in, and the resulting vertical
//! position. Rendering layers provide the nodes through [`AnchorNode`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// A DOM-like node the layout can measure
pub trait AnchorNode: fmt::Debug {
    /// Top edge of the node, measured from the top of the document (not the viewport).
    fn document_top(&self) -> f64;

    /// Id of the tab panel containing the node, if any.
    fn tab(&self) -> Option<String>;

    /// Whether the node is currently attached to the document.
    fn is_mounted(&self) -> bool {
        true
    }
}

pub trait Annotation: fmt::Debug {
    /// Node the comment should float beside. `focused` narrows the choice to
    /// the part of the anchor the user is working in.
    fn anchor_node(&self, focused: bool) -> Rc<dyn AnchorNode>;

    fn tab(&self) -> Option<String>;

    /// Unconstrained vertical position for the comment.
    fn desired_position(&self, is_pinned: bool) -> f64 {
        self.anchor_node(is_pinned).document_top()
    }
}

// ============================================================================
// Field-anchored
// ============================================================================

/// Anchors a comment to one fixed field element.
#[derive(Debug, Clone)]
pub struct FieldAnnotation {
    field: Rc<dyn AnchorNode>,
}

impl FieldAnnotation {
    pub fn new(field: Rc<dyn AnchorNode>) -> Self {
        Self { field }
    }
}

impl Annotation for FieldAnnotation {
    fn anchor_node(&self, _focused: bool) -> Rc<dyn AnchorNode> {
        Rc::clone(&self.field)
    }

    fn tab(&self) -> Option<String> {
        self.field.tab()
    }
}

// ============================================================================
// Inline rich-text
// ============================================================================

/// Handle for a decorator registered with an [`InlineAnnotation`]
pub type DecoratorId = u64;

#[derive(Debug, Clone)]
struct DecoratorRef {
    node: Rc<dyn AnchorNode>,
    block_key: String,
}

#[derive(Debug, Default)]
struct InlineState {
    decorators: IndexMap<DecoratorId, DecoratorRef>,
    next_decorator: DecoratorId,
    focused_block_key: Option<String>,
    /// Last median found among mounted decorators. Cleared on add/remove.
    cached_median: Option<DecoratorId>,
}

/// Anchors a comment to the highlighted runs of a rich-text field.
///
/// The editor may render one logical highlight as several decorated runs
/// (around entities, across blocks). The comment floats beside the median
/// run by vertical position so it stays near the middle of its text.
#[derive(Debug)]
pub struct InlineAnnotation {
    field: Rc<dyn AnchorNode>,
    state: RefCell<InlineState>,
}

impl InlineAnnotation {
    /// `field` is the fallback anchor used while no decorator is mounted.
    pub fn new(field: Rc<dyn AnchorNode>) -> Self {
        Self {
            field,
            state: RefCell::new(InlineState::default()),
        }
    }

    pub fn add_decorator_ref(
        &self,
        node: Rc<dyn AnchorNode>,
        block_key: impl Into<String>,
    ) -> DecoratorId {
        let mut state = self.state.borrow_mut();
        state.next_decorator += 1;
        let id = state.next_decorator;
        state.decorators.insert(
            id,
            DecoratorRef {
                node,
                block_key: block_key.into(),
            },
        );
        state.cached_median = None;
        id
    }

    pub fn remove_decorator_ref(&self, id: DecoratorId) {
        let mut state = self.state.borrow_mut();
        if state.decorators.shift_remove(&id).is_some() {
            state.cached_median = None;
        }
    }

    pub fn set_focused_block_key(&self, block_key: Option<String>) {
        self.state.borrow_mut().focused_block_key = block_key;
    }

    pub fn decorator_count(&self) -> usize {
        self.state.borrow().decorators.len()
    }

    /// Lower median by document position of the mounted decorators passing `filter`.
    fn median_decorator(
        decorators: &IndexMap<DecoratorId, DecoratorRef>,
        filter: impl Fn(&DecoratorRef) -> bool,
    ) -> Option<DecoratorId> {
        let mut candidates: Vec<(DecoratorId, f64)> = decorators
            .iter()
            .filter(|(_, decorator)| decorator.node.is_mounted() && filter(decorator))
            .map(|(id, decorator)| (*id, decorator.node.document_top()))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));
        Some(candidates[(candidates.len() - 1) / 2].0)
    }
}

impl Annotation for InlineAnnotation {
    fn anchor_node(&self, focused: bool) -> Rc<dyn AnchorNode> {
        let mut state = self.state.borrow_mut();

        let median = if focused {
            // Keep the comment next to the block being edited even if the
            // highlight has been split across several blocks.
            let focused_key = state.focused_block_key.clone();
            Self::median_decorator(&state.decorators, |decorator| {
                focused_key.as_deref() == Some(decorator.block_key.as_str())
            })
        } else {
            let cached = state.cached_median.filter(|id| {
                state
                    .decorators
                    .get(id)
                    .is_some_and(|decorator| decorator.node.is_mounted())
            });
            match cached {
                Some(id) => Some(id),
                // Nothing cached or the cached run has unmounted since.
                None => {
                    let computed = Self::median_decorator(&state.decorators, |_| true);
                    state.cached_median = computed;
                    computed
                }
            }
        };

        median
            .and_then(|id| state.decorators.get(&id))
            .filter(|decorator| decorator.node.is_mounted())
            .map(|decorator| Rc::clone(&decorator.node))
            .unwrap_or_else(|| Rc::clone(&self.field))
    }

    fn tab(&self) -> Option<String> {
        self.field.tab()
    }
}
