//! Derived read views over the store.
//!
//! Plain functions are pure and cheap. The `*_factory` selectors memoize on
//! the identity of the comment map: while the map `Rc` is unchanged they
//! hand back the very same result `Rc`, so views can skip re-rendering with
//! a pointer comparison.

use std::cell::RefCell;
use std::rc::Rc;

use crate::state::comments::{Comment, CommentMap};
use crate::state::{AppState, CommentId};

pub fn select_comments(state: &AppState) -> &Rc<CommentMap> {
    &state.comments.comments
}

pub fn select_focused(state: &AppState) -> Option<CommentId> {
    state.comments.focused_comment
}

pub fn select_pinned(state: &AppState) -> Option<CommentId> {
    state.comments.pinned_comment
}

pub fn select_enabled(state: &AppState) -> bool {
    state.settings.comments_enabled
}

pub fn select_remote_comment_count(state: &AppState) -> usize {
    state.comments.remote_comment_count
}

/// Comments still open: neither deleted nor resolved.
pub fn select_comment_count(state: &AppState) -> usize {
    state
        .comments
        .comments
        .values()
        .filter(|comment| !comment.deleted && !comment.resolved)
        .count()
}

/// Something needs to go to the server on the next save.
pub fn select_is_dirty(state: &AppState) -> bool {
    state.comments.comments.values().any(|comment| comment.is_dirty())
}

/// Non-deleted comments attached to `content_path`, in insertion order.
pub fn comments_for_content_path(comments: &CommentMap, content_path: &str) -> Vec<Rc<Comment>> {
    comments
        .values()
        .filter(|comment| !comment.deleted && comment.contentpath == content_path)
        .cloned()
        .collect()
}

/// A single comment; deleted tombstones are reported as absent.
pub fn comment_by_id(comments: &CommentMap, comment_id: CommentId) -> Option<Rc<Comment>> {
    comments
        .get(&comment_id)
        .filter(|comment| !comment.deleted)
        .cloned()
}

/// Memoizing selector over the comment map.
pub struct Selector<T> {
    compute: Box<dyn Fn(&CommentMap) -> T>,
    cache: RefCell<Option<(Rc<CommentMap>, Rc<T>)>>,
}

impl<T> Selector<T> {
    pub fn new(compute: impl Fn(&CommentMap) -> T + 'static) -> Self {
        Self {
            compute: Box::new(compute),
            cache: RefCell::new(None),
        }
    }

    pub fn select(&self, state: &AppState) -> Rc<T> {
        let comments = &state.comments.comments;
        if let Some((input, output)) = self.cache.borrow().as_ref() {
            if Rc::ptr_eq(input, comments) {
                return Rc::clone(output);
            }
        }

        let output = Rc::new((self.compute)(comments));
        *self.cache.borrow_mut() = Some((Rc::clone(comments), Rc::clone(&output)));
        output
    }
}

pub fn select_comments_for_content_path_factory(
    content_path: impl Into<String>,
) -> Selector<Vec<Rc<Comment>>> {
    let content_path = content_path.into();
    Selector::new(move |comments| comments_for_content_path(comments, &content_path))
}

pub fn select_comment_factory(comment_id: CommentId) -> Selector<Option<Rc<Comment>>> {
    Selector::new(move |comments| comment_by_id(comments, comment_id))
}
