//! Action vocabulary for the comment and settings stores.

use std::rc::Rc;

use shared_types::Author;

use crate::annotation::Annotation;
use crate::modes::{CommentMode, ReplyMode};
use crate::state::comments::{Comment, CommentReply};
use crate::state::settings::SettingsUpdate;
use crate::state::{CommentId, ReplyId};

#[derive(Debug, Clone)]
pub enum Action {
    AddComment(Box<Comment>),
    UpdateComment {
        comment_id: CommentId,
        update: CommentUpdate,
    },
    DeleteComment {
        comment_id: CommentId,
    },
    ResolveComment {
        comment_id: CommentId,
    },
    SetFocusedComment {
        comment_id: Option<CommentId>,
        update_pinned_comment: bool,
        force_focus: bool,
    },
    AddReply {
        comment_id: CommentId,
        reply: CommentReply,
    },
    UpdateReply {
        comment_id: CommentId,
        reply_id: ReplyId,
        update: ReplyUpdate,
    },
    DeleteReply {
        comment_id: CommentId,
        reply_id: ReplyId,
    },
    /// A field or block disappeared; comments attached to it go with it
    InvalidateContentPath {
        content_path: String,
    },
    UpdateGlobalSettings(SettingsUpdate),
}

/// Partial update of a comment. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct CommentUpdate {
    pub remote_id: Option<Option<u64>>,
    pub contentpath: Option<String>,
    pub position: Option<String>,
    pub text: Option<String>,
    pub original_text: Option<String>,
    pub new_text: Option<String>,
    pub new_reply: Option<String>,
    pub author: Option<Option<Author>>,
    pub date: Option<i64>,
    pub mode: Option<CommentMode>,
    pub deleted: Option<bool>,
    pub resolved: Option<bool>,
    pub annotation: Option<Option<Rc<dyn Annotation>>>,
}

impl CommentUpdate {
    pub fn mode(mode: CommentMode) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }

    pub fn position(position: impl Into<String>) -> Self {
        Self {
            position: Some(position.into()),
            ..Default::default()
        }
    }

    pub fn annotation(annotation: Rc<dyn Annotation>) -> Self {
        Self {
            annotation: Some(Some(annotation)),
            ..Default::default()
        }
    }

    /// Merge into `comment`, returning how the remote/local status changed
    /// (-1, 0 or 1) so counters can follow.
    pub(crate) fn apply(&self, comment: &mut Comment) -> i64 {
        let was_remote = comment.remote_id.is_some();

        if let Some(remote_id) = self.remote_id {
            comment.remote_id = remote_id;
        }
        if let Some(contentpath) = &self.contentpath {
            comment.contentpath = contentpath.clone();
        }
        if let Some(position) = &self.position {
            comment.position = position.clone();
        }
        if let Some(text) = &self.text {
            comment.text = text.clone();
        }
        if let Some(original_text) = &self.original_text {
            comment.original_text = original_text.clone();
        }
        if let Some(new_text) = &self.new_text {
            comment.new_text = new_text.clone();
        }
        if let Some(new_reply) = &self.new_reply {
            comment.new_reply = new_reply.clone();
        }
        if let Some(author) = &self.author {
            comment.author = author.clone();
        }
        if let Some(date) = self.date {
            comment.date = date;
        }
        if let Some(mode) = self.mode {
            comment.mode = mode;
        }
        if let Some(deleted) = self.deleted {
            comment.deleted = deleted;
        }
        if let Some(resolved) = self.resolved {
            comment.resolved = resolved;
        }
        if let Some(annotation) = &self.annotation {
            comment.annotation = annotation.clone();
        }

        remote_delta(was_remote, comment.remote_id.is_some())
    }
}

/// Partial update of a reply. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ReplyUpdate {
    pub remote_id: Option<Option<u64>>,
    pub text: Option<String>,
    pub original_text: Option<String>,
    pub new_text: Option<String>,
    pub author: Option<Option<Author>>,
    pub date: Option<i64>,
    pub mode: Option<ReplyMode>,
    pub deleted: Option<bool>,
}

impl ReplyUpdate {
    pub fn mode(mode: ReplyMode) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }

    pub(crate) fn apply(&self, reply: &mut CommentReply) -> i64 {
        let was_remote = reply.remote_id.is_some();

        if let Some(remote_id) = self.remote_id {
            reply.remote_id = remote_id;
        }
        if let Some(text) = &self.text {
            reply.text = text.clone();
        }
        if let Some(original_text) = &self.original_text {
            reply.original_text = original_text.clone();
        }
        if let Some(new_text) = &self.new_text {
            reply.new_text = new_text.clone();
        }
        if let Some(author) = &self.author {
            reply.author = author.clone();
        }
        if let Some(date) = self.date {
            reply.date = date;
        }
        if let Some(mode) = self.mode {
            reply.mode = mode;
        }
        if let Some(deleted) = self.deleted {
            reply.deleted = deleted;
        }

        remote_delta(was_remote, reply.remote_id.is_some())
    }
}

fn remote_delta(was_remote: bool, is_remote: bool) -> i64 {
    match (was_remote, is_remote) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}

/// Options for [`set_focused_comment`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusOptions {
    pub update_pinned_comment: bool,
    pub force_focus: bool,
}

// ============================================================================
// Action creators
// ============================================================================

pub fn add_comment(comment: Comment) -> Action {
    Action::AddComment(Box::new(comment))
}

pub fn update_comment(comment_id: CommentId, update: CommentUpdate) -> Action {
    Action::UpdateComment { comment_id, update }
}

pub fn delete_comment(comment_id: CommentId) -> Action {
    Action::DeleteComment { comment_id }
}

pub fn resolve_comment(comment_id: CommentId) -> Action {
    Action::ResolveComment { comment_id }
}

pub fn set_focused_comment(comment_id: Option<CommentId>, options: FocusOptions) -> Action {
    Action::SetFocusedComment {
        comment_id,
        update_pinned_comment: options.update_pinned_comment,
        force_focus: options.force_focus,
    }
}

pub fn add_reply(comment_id: CommentId, reply: CommentReply) -> Action {
    Action::AddReply { comment_id, reply }
}

pub fn update_reply(comment_id: CommentId, reply_id: ReplyId, update: ReplyUpdate) -> Action {
    Action::UpdateReply {
        comment_id,
        reply_id,
        update,
    }
}

pub fn delete_reply(comment_id: CommentId, reply_id: ReplyId) -> Action {
    Action::DeleteReply {
        comment_id,
        reply_id,
    }
}

pub fn invalidate_content_path(content_path: impl Into<String>) -> Action {
    Action::InvalidateContentPath {
        content_path: content_path.into(),
    }
}

pub fn update_global_settings(update: SettingsUpdate) -> Action {
    Action::UpdateGlobalSettings(update)
}
