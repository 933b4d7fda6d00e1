//! User-driven comment and reply workflows.
//!
//! Each workflow moves the entity into an in-flight mode, awaits the
//! persistence collaborator, then dispatches the outcome. A failed request
//! leaves the entity in a `*_error` mode from which the user can retry or
//! cancel. Events that make no sense in the entity's current mode are
//! ignored, which is what keeps double submits harmless.

use async_trait::async_trait;

use crate::app::CommentApp;
use crate::error::PersistenceError;
use crate::modes::{CommentMode, ModeEvent, ReplyMode};
use crate::state::actions;
use crate::state::{
    Comment, CommentId, CommentReply, CommentUpdate, ReplyId, ReplyOptions, ReplyUpdate,
};

/// What the persistence collaborator knows after a save
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Saved {
    /// Server id, once the server has one
    pub remote_id: Option<u64>,
    /// The server now holds this text. False when the change only lives in
    /// the store until the page form is submitted.
    pub persisted: bool,
}

/// Where comment changes are sent.
#[async_trait(?Send)]
pub trait CommentPersistence {
    async fn save_comment(&self, comment: &Comment) -> Result<Saved, PersistenceError>;

    async fn delete_comment(&self, comment: &Comment) -> Result<(), PersistenceError>;

    async fn save_reply(
        &self,
        comment: &Comment,
        reply: &CommentReply,
    ) -> Result<Saved, PersistenceError>;

    async fn delete_reply(
        &self,
        comment: &Comment,
        reply: &CommentReply,
    ) -> Result<(), PersistenceError>;
}

/// Keeps everything in the store; changes reach the server with the page
/// form submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPersistence;

#[async_trait(?Send)]
impl CommentPersistence for LocalPersistence {
    async fn save_comment(&self, comment: &Comment) -> Result<Saved, PersistenceError> {
        Ok(Saved {
            remote_id: comment.remote_id,
            persisted: false,
        })
    }

    async fn delete_comment(&self, _comment: &Comment) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn save_reply(
        &self,
        _comment: &Comment,
        reply: &CommentReply,
    ) -> Result<Saved, PersistenceError> {
        Ok(Saved {
            remote_id: reply.remote_id,
            persisted: false,
        })
    }

    async fn delete_reply(
        &self,
        _comment: &Comment,
        _reply: &CommentReply,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }
}

// ============================================================================
// Mode helpers
// ============================================================================

fn comment_transition(app: &CommentApp, comment_id: CommentId, event: ModeEvent) -> Option<CommentMode> {
    let comment = app.comment(comment_id)?;
    let Some(mode) = comment.mode.transition(event) else {
        tracing::debug!(comment_id, mode = comment.mode.as_str(), ?event, "Ignoring comment event");
        return None;
    };
    Some(mode)
}

fn find_reply(app: &CommentApp, comment_id: CommentId, reply_id: ReplyId) -> Option<(Comment, CommentReply)> {
    let comment = app.comment(comment_id)?;
    let reply = comment.replies.get(&reply_id)?.clone();
    Some((Comment::clone(&comment), reply))
}

fn reply_transition(
    app: &CommentApp,
    comment_id: CommentId,
    reply_id: ReplyId,
    event: ModeEvent,
) -> Option<ReplyMode> {
    let (_, reply) = find_reply(app, comment_id, reply_id)?;
    let Some(mode) = reply.mode.transition(event) else {
        tracing::debug!(comment_id, reply_id, mode = reply.mode.as_str(), ?event, "Ignoring reply event");
        return None;
    };
    Some(mode)
}

fn set_comment_mode(app: &CommentApp, comment_id: CommentId, mode: CommentMode) {
    app.dispatch(actions::update_comment(comment_id, CommentUpdate::mode(mode)));
}

fn set_reply_mode(app: &CommentApp, comment_id: CommentId, reply_id: ReplyId, mode: ReplyMode) {
    app.dispatch(actions::update_reply(comment_id, reply_id, ReplyUpdate::mode(mode)));
}

// ============================================================================
// Comments
// ============================================================================

/// Update the comment's edit buffer.
pub fn set_comment_text(app: &CommentApp, comment_id: CommentId, text: impl Into<String>) {
    app.dispatch(actions::update_comment(
        comment_id,
        CommentUpdate {
            new_text: Some(text.into()),
            ..Default::default()
        },
    ));
}

pub fn start_editing(app: &CommentApp, comment_id: CommentId) {
    let Some(mode) = comment_transition(app, comment_id, ModeEvent::Edit) else {
        return;
    };
    let text = app.comment(comment_id).map(|comment| comment.text.clone());
    app.dispatch(actions::update_comment(
        comment_id,
        CommentUpdate {
            mode: Some(mode),
            new_text: text,
            ..Default::default()
        },
    ));
}

/// Save the edit buffer. Also retries a failed save.
pub async fn save_comment(
    app: &CommentApp,
    persistence: &dyn CommentPersistence,
    comment_id: CommentId,
) -> Option<CommentMode> {
    let current = app.comment(comment_id)?;
    let event = if current.mode == CommentMode::SaveError {
        ModeEvent::Retry
    } else {
        ModeEvent::Save
    };
    let saving = comment_transition(app, comment_id, event)?;

    app.dispatch(actions::update_comment(
        comment_id,
        CommentUpdate {
            mode: Some(saving),
            text: Some(current.new_text.clone()),
            ..Default::default()
        },
    ));
    let comment = app.comment(comment_id)?;

    let (event, update) = match persistence.save_comment(&comment).await {
        Ok(saved) => {
            let mut update = CommentUpdate::default();
            if saved.remote_id.is_some() {
                update.remote_id = Some(saved.remote_id);
            }
            if saved.persisted {
                update.original_text = Some(comment.text.clone());
            }
            (ModeEvent::Succeeded, update)
        }
        Err(e) => {
            tracing::error!(comment_id, "Failed to save comment: {}", e);
            (ModeEvent::Failed, CommentUpdate::default())
        }
    };

    let mode = comment_transition(app, comment_id, event)?;
    app.dispatch(actions::update_comment(
        comment_id,
        CommentUpdate {
            mode: Some(mode),
            ..update
        },
    ));
    Some(mode)
}

/// Leave the current form. A comment still being composed is discarded.
pub fn cancel_comment(app: &CommentApp, comment_id: CommentId) {
    let Some(comment) = app.comment(comment_id) else {
        return;
    };
    if comment.mode == CommentMode::Creating {
        app.dispatch(actions::delete_comment(comment_id));
        return;
    }
    let Some(mode) = comment_transition(app, comment_id, ModeEvent::Cancel) else {
        return;
    };
    app.dispatch(actions::update_comment(
        comment_id,
        CommentUpdate {
            mode: Some(mode),
            new_text: Some(comment.text.clone()),
            ..Default::default()
        },
    ));
}

/// Ask the user to confirm deletion.
pub fn request_delete(app: &CommentApp, comment_id: CommentId) {
    if let Some(mode) = comment_transition(app, comment_id, ModeEvent::Delete) {
        set_comment_mode(app, comment_id, mode);
    }
}

/// Delete after confirmation. Also retries a failed delete.
pub async fn delete_comment(
    app: &CommentApp,
    persistence: &dyn CommentPersistence,
    comment_id: CommentId,
) -> Option<CommentMode> {
    let current = app.comment(comment_id)?;
    let event = if current.mode == CommentMode::DeleteError {
        ModeEvent::Retry
    } else {
        ModeEvent::ConfirmDelete
    };
    let deleting = comment_transition(app, comment_id, event)?;
    set_comment_mode(app, comment_id, deleting);

    match persistence.delete_comment(&current).await {
        Ok(()) => {
            let mode = comment_transition(app, comment_id, ModeEvent::Succeeded)?;
            set_comment_mode(app, comment_id, mode);
            app.dispatch(actions::delete_comment(comment_id));
            Some(mode)
        }
        Err(e) => {
            tracing::error!(comment_id, "Failed to delete comment: {}", e);
            let mode = comment_transition(app, comment_id, ModeEvent::Failed)?;
            set_comment_mode(app, comment_id, mode);
            Some(mode)
        }
    }
}

/// Mark the comment resolved; it leaves the page like a deleted one.
pub fn resolve_comment(app: &CommentApp, comment_id: CommentId) {
    if app.comment(comment_id).is_some_and(|comment| !comment.mode.is_busy()) {
        app.dispatch(actions::resolve_comment(comment_id));
    }
}

// ============================================================================
// Replies
// ============================================================================

/// Update the buffer for the reply being composed under a comment.
pub fn set_new_reply_text(app: &CommentApp, comment_id: CommentId, text: impl Into<String>) {
    app.dispatch(actions::update_comment(
        comment_id,
        CommentUpdate {
            new_reply: Some(text.into()),
            ..Default::default()
        },
    ));
}

/// Post the composed reply. Blank replies are not sent.
pub async fn save_new_reply(
    app: &CommentApp,
    persistence: &dyn CommentPersistence,
    comment_id: CommentId,
) -> Option<ReplyId> {
    let comment = app.comment(comment_id)?;
    if comment.new_reply.trim().is_empty() {
        return None;
    }

    let reply_id = app.next_reply_id();
    app.dispatch(actions::add_reply(
        comment_id,
        CommentReply::new(
            reply_id,
            app.current_user(),
            chrono::Utc::now().timestamp_millis(),
            ReplyOptions {
                text: comment.new_reply.clone(),
                mode: ReplyMode::Saving,
                ..Default::default()
            },
        ),
    ));
    set_new_reply_text(app, comment_id, "");

    finish_reply_save(app, persistence, comment_id, reply_id).await;
    Some(reply_id)
}

async fn finish_reply_save(
    app: &CommentApp,
    persistence: &dyn CommentPersistence,
    comment_id: CommentId,
    reply_id: ReplyId,
) -> Option<ReplyMode> {
    let (comment, reply) = find_reply(app, comment_id, reply_id)?;

    let (event, update) = match persistence.save_reply(&comment, &reply).await {
        Ok(saved) => {
            let mut update = ReplyUpdate::default();
            if saved.remote_id.is_some() {
                update.remote_id = Some(saved.remote_id);
            }
            if saved.persisted {
                update.original_text = Some(reply.text.clone());
            }
            (ModeEvent::Succeeded, update)
        }
        Err(e) => {
            tracing::error!(comment_id, reply_id, "Failed to save reply: {}", e);
            (ModeEvent::Failed, ReplyUpdate::default())
        }
    };

    let mode = reply_transition(app, comment_id, reply_id, event)?;
    app.dispatch(actions::update_reply(
        comment_id,
        reply_id,
        ReplyUpdate {
            mode: Some(mode),
            ..update
        },
    ));
    Some(mode)
}

/// Update an existing reply's edit buffer.
pub fn set_reply_text(app: &CommentApp, comment_id: CommentId, reply_id: ReplyId, text: impl Into<String>) {
    app.dispatch(actions::update_reply(
        comment_id,
        reply_id,
        ReplyUpdate {
            new_text: Some(text.into()),
            ..Default::default()
        },
    ));
}

pub fn start_editing_reply(app: &CommentApp, comment_id: CommentId, reply_id: ReplyId) {
    let Some(mode) = reply_transition(app, comment_id, reply_id, ModeEvent::Edit) else {
        return;
    };
    let text = find_reply(app, comment_id, reply_id).map(|(_, reply)| reply.text);
    app.dispatch(actions::update_reply(
        comment_id,
        reply_id,
        ReplyUpdate {
            mode: Some(mode),
            new_text: text,
            ..Default::default()
        },
    ));
}

/// Save an edited reply. Also retries a failed save.
pub async fn save_reply(
    app: &CommentApp,
    persistence: &dyn CommentPersistence,
    comment_id: CommentId,
    reply_id: ReplyId,
) -> Option<ReplyMode> {
    let (_, current) = find_reply(app, comment_id, reply_id)?;
    let event = if current.mode == ReplyMode::SaveError {
        ModeEvent::Retry
    } else {
        ModeEvent::Save
    };
    let saving = reply_transition(app, comment_id, reply_id, event)?;

    // A failed new reply has no edit buffer; keep its text
    let text = if current.new_text.is_empty() {
        current.text.clone()
    } else {
        current.new_text.clone()
    };
    app.dispatch(actions::update_reply(
        comment_id,
        reply_id,
        ReplyUpdate {
            mode: Some(saving),
            text: Some(text),
            ..Default::default()
        },
    ));

    finish_reply_save(app, persistence, comment_id, reply_id).await
}

pub fn cancel_reply(app: &CommentApp, comment_id: CommentId, reply_id: ReplyId) {
    let Some(mode) = reply_transition(app, comment_id, reply_id, ModeEvent::Cancel) else {
        return;
    };
    let text = find_reply(app, comment_id, reply_id).map(|(_, reply)| reply.text);
    app.dispatch(actions::update_reply(
        comment_id,
        reply_id,
        ReplyUpdate {
            mode: Some(mode),
            new_text: text,
            ..Default::default()
        },
    ));
}

pub fn request_delete_reply(app: &CommentApp, comment_id: CommentId, reply_id: ReplyId) {
    if let Some(mode) = reply_transition(app, comment_id, reply_id, ModeEvent::Delete) {
        set_reply_mode(app, comment_id, reply_id, mode);
    }
}

/// Delete a reply after confirmation. Also retries a failed delete.
pub async fn delete_reply(
    app: &CommentApp,
    persistence: &dyn CommentPersistence,
    comment_id: CommentId,
    reply_id: ReplyId,
) -> Option<ReplyMode> {
    let (comment, current) = find_reply(app, comment_id, reply_id)?;
    let event = if current.mode == ReplyMode::DeleteError {
        ModeEvent::Retry
    } else {
        ModeEvent::ConfirmDelete
    };
    let deleting = reply_transition(app, comment_id, reply_id, event)?;
    set_reply_mode(app, comment_id, reply_id, deleting);

    match persistence.delete_reply(&comment, &current).await {
        Ok(()) => {
            let mode = reply_transition(app, comment_id, reply_id, ModeEvent::Succeeded)?;
            set_reply_mode(app, comment_id, reply_id, mode);
            app.dispatch(actions::delete_reply(comment_id, reply_id));
            Some(mode)
        }
        Err(e) => {
            tracing::error!(comment_id, reply_id, "Failed to delete reply: {}", e);
            let mode = reply_transition(app, comment_id, reply_id, ModeEvent::Failed)?;
            set_reply_mode(app, comment_id, reply_id, mode);
            Some(mode)
        }
    }
}
