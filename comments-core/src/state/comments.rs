//! Comment and reply entities and the comments reducer.
//!
//! State is copy-on-write: the comment map and each comment live behind
//! `Rc`, and the reducer only clones the branches it touches. Callers holding
//! a previous state never observe a mutation.

use std::rc::Rc;

use indexmap::IndexMap;
use shared_types::Author;

use crate::annotation::Annotation;
use crate::modes::{CommentMode, ReplyMode};
use crate::state::actions::Action;
use crate::state::{CommentId, ReplyId};

/// Comments keyed by local id, in insertion order
pub type CommentMap = IndexMap<CommentId, Rc<Comment>>;

// ============================================================================
// Replies
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommentReply {
    pub local_id: ReplyId,
    /// Server id; `None` until the reply has been saved
    pub remote_id: Option<u64>,
    pub text: String,
    /// Text as last confirmed saved
    pub original_text: String,
    /// Edit buffer
    pub new_text: String,
    pub author: Option<Author>,
    /// Epoch millis
    pub date: i64,
    pub mode: ReplyMode,
    pub deleted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReplyOptions {
    pub remote_id: Option<u64>,
    pub text: String,
    pub mode: ReplyMode,
    pub deleted: bool,
}

impl CommentReply {
    pub fn new(local_id: ReplyId, author: Option<Author>, date: i64, options: ReplyOptions) -> Self {
        Self {
            local_id,
            remote_id: options.remote_id,
            original_text: options.text.clone(),
            new_text: options.text.clone(),
            text: options.text,
            author,
            date,
            mode: options.mode,
            deleted: options.deleted,
        }
    }

    /// Has changes the server has not seen yet.
    pub fn is_dirty(&self) -> bool {
        self.deleted || self.remote_id.is_none() || self.text != self.original_text
    }
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Clone)]
pub struct Comment {
    pub local_id: CommentId,
    /// Server id; `None` until the comment has been saved
    pub remote_id: Option<u64>,
    /// Field or block the comment is attached to
    pub contentpath: String,
    /// Anchor within the field; format owned by the field type
    pub position: String,
    pub text: String,
    /// Text as last confirmed saved
    pub original_text: String,
    /// Edit buffer for the comment text
    pub new_text: String,
    /// Edit buffer for a reply being composed
    pub new_reply: String,
    pub author: Option<Author>,
    /// Epoch millis
    pub date: i64,
    pub mode: CommentMode,
    pub deleted: bool,
    pub resolved: bool,
    /// Session-only back reference; the layout controller owns annotations
    pub annotation: Option<Rc<dyn Annotation>>,
    pub replies: IndexMap<ReplyId, CommentReply>,
    /// Number of replies with a remote id, tombstones included
    pub remote_reply_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CommentOptions {
    pub remote_id: Option<u64>,
    pub text: String,
    pub mode: CommentMode,
    pub deleted: bool,
    pub resolved: bool,
    pub annotation: Option<Rc<dyn Annotation>>,
}

impl Comment {
    pub fn new(
        local_id: CommentId,
        contentpath: impl Into<String>,
        position: impl Into<String>,
        author: Option<Author>,
        date: i64,
        options: CommentOptions,
    ) -> Self {
        Self {
            local_id,
            remote_id: options.remote_id,
            contentpath: contentpath.into(),
            position: position.into(),
            original_text: options.text.clone(),
            new_text: options.text.clone(),
            text: options.text,
            new_reply: String::new(),
            author,
            date,
            mode: options.mode,
            deleted: options.deleted,
            resolved: options.resolved,
            annotation: options.annotation,
            replies: IndexMap::new(),
            remote_reply_count: 0,
        }
    }

    /// Replies that should still be rendered.
    pub fn visible_replies(&self) -> impl Iterator<Item = &CommentReply> {
        self.replies.values().filter(|reply| !reply.deleted)
    }

    /// Has changes the server has not seen yet, including in its replies.
    pub fn is_dirty(&self) -> bool {
        self.deleted
            || self.resolved
            || self.remote_id.is_none()
            || self.text != self.original_text
            || self.replies.values().any(CommentReply::is_dirty)
    }
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CommentsState {
    pub comments: Rc<CommentMap>,
    pub focused_comment: Option<CommentId>,
    pub pinned_comment: Option<CommentId>,
    /// Number of comments in the map with a remote id, tombstones included
    pub remote_comment_count: usize,
    pub force_focus: bool,
}

/// `candidate` is `path` itself or nested below it (`path.child`).
pub fn content_path_contains(path: &str, candidate: &str) -> bool {
    candidate == path
        || candidate
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn apply_delta(count: usize, delta: i64) -> usize {
    match delta {
        d if d > 0 => count + 1,
        d if d < 0 => count.saturating_sub(1),
        _ => count,
    }
}

/// Drop a never-saved comment or turn a saved one into a tombstone.
fn remove_comment(
    next: &mut CommentsState,
    comment_id: CommentId,
    tombstone: impl FnOnce(&mut Comment),
) {
    let Some(existing) = next.comments.get(&comment_id) else {
        return;
    };
    let is_remote = existing.remote_id.is_some();

    let comments = Rc::make_mut(&mut next.comments);
    if is_remote {
        if let Some(entry) = comments.get_mut(&comment_id) {
            tombstone(Rc::make_mut(entry));
        }
    } else {
        comments.shift_remove(&comment_id);
    }

    if next.focused_comment == Some(comment_id) {
        next.focused_comment = None;
    }
    if next.pinned_comment == Some(comment_id) {
        next.pinned_comment = None;
    }
}

fn has_reply(state: &CommentsState, comment_id: CommentId, reply_id: ReplyId) -> bool {
    state
        .comments
        .get(&comment_id)
        .is_some_and(|comment| comment.replies.contains_key(&reply_id))
}

pub fn comments_reducer(state: &CommentsState, action: &Action) -> CommentsState {
    let mut next = state.clone();

    match action {
        Action::AddComment(comment) => {
            let comment = Comment::clone(comment);
            let comment_id = comment.local_id;
            let replaced_remote = next
                .comments
                .get(&comment_id)
                .is_some_and(|existing| existing.remote_id.is_some());
            if replaced_remote {
                next.remote_comment_count = next.remote_comment_count.saturating_sub(1);
            }
            if comment.remote_id.is_some() {
                next.remote_comment_count += 1;
            }
            Rc::make_mut(&mut next.comments).insert(comment_id, Rc::new(comment));
        }
        Action::UpdateComment { comment_id, update } => {
            if !next.comments.contains_key(comment_id) {
                return next;
            }
            let comments = Rc::make_mut(&mut next.comments);
            if let Some(entry) = comments.get_mut(comment_id) {
                let delta = update.apply(Rc::make_mut(entry));
                next.remote_comment_count = apply_delta(next.remote_comment_count, delta);
            }
        }
        Action::DeleteComment { comment_id } => {
            remove_comment(&mut next, *comment_id, |comment| comment.deleted = true);
        }
        Action::ResolveComment { comment_id } => {
            remove_comment(&mut next, *comment_id, |comment| comment.resolved = true);
        }
        Action::SetFocusedComment {
            comment_id,
            update_pinned_comment,
            force_focus,
        } => {
            let exists = comment_id.map_or(true, |id| next.comments.contains_key(&id));
            if exists {
                next.focused_comment = *comment_id;
                if *update_pinned_comment {
                    next.pinned_comment = *comment_id;
                }
            }
            next.force_focus = *force_focus;
        }
        Action::AddReply { comment_id, reply } => {
            if !next.comments.contains_key(comment_id) {
                return next;
            }
            let comments = Rc::make_mut(&mut next.comments);
            if let Some(entry) = comments.get_mut(comment_id) {
                let comment = Rc::make_mut(entry);
                let replaced_remote = comment
                    .replies
                    .get(&reply.local_id)
                    .is_some_and(|existing| existing.remote_id.is_some());
                if replaced_remote {
                    comment.remote_reply_count = comment.remote_reply_count.saturating_sub(1);
                }
                if reply.remote_id.is_some() {
                    comment.remote_reply_count += 1;
                }
                comment.replies.insert(reply.local_id, reply.clone());
            }
        }
        Action::UpdateReply {
            comment_id,
            reply_id,
            update,
        } => {
            if !has_reply(&next, *comment_id, *reply_id) {
                return next;
            }
            let comments = Rc::make_mut(&mut next.comments);
            if let Some(entry) = comments.get_mut(comment_id) {
                let comment = Rc::make_mut(entry);
                if let Some(reply) = comment.replies.get_mut(reply_id) {
                    let delta = update.apply(reply);
                    comment.remote_reply_count = apply_delta(comment.remote_reply_count, delta);
                }
            }
        }
        Action::DeleteReply {
            comment_id,
            reply_id,
        } => {
            if !has_reply(&next, *comment_id, *reply_id) {
                return next;
            }
            let comments = Rc::make_mut(&mut next.comments);
            if let Some(entry) = comments.get_mut(comment_id) {
                let comment = Rc::make_mut(entry);
                let is_remote = comment
                    .replies
                    .get(reply_id)
                    .is_some_and(|reply| reply.remote_id.is_some());
                if is_remote {
                    if let Some(reply) = comment.replies.get_mut(reply_id) {
                        reply.deleted = true;
                    }
                } else {
                    comment.replies.shift_remove(reply_id);
                }
            }
        }
        Action::InvalidateContentPath { content_path } => {
            let affected: Vec<CommentId> = next
                .comments
                .values()
                .filter(|comment| content_path_contains(content_path, &comment.contentpath))
                .map(|comment| comment.local_id)
                .collect();
            for comment_id in affected {
                remove_comment(&mut next, comment_id, |comment| comment.deleted = true);
            }
        }
        Action::UpdateGlobalSettings(_) => {}
    }

    next
}
