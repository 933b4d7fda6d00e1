//! Comment and reply UI mode state machines.
//!
//! The mode is the only per-entity concurrency control: while a comment is
//! `Saving` or `Deleting` the UI disables the affordances that would start a
//! second request.

use serde::{Deserialize, Serialize};

/// User or network event driving a mode transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    Save,
    Edit,
    Delete,
    ConfirmDelete,
    Cancel,
    Succeeded,
    Failed,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentMode {
    #[default]
    Default,
    Creating,
    Editing,
    Saving,
    SaveError,
    DeleteConfirm,
    Deleting,
    DeleteError,
}

impl CommentMode {
    /// Next mode for `event`, or `None` if the event is not valid here.
    ///
    /// Cancelling `Creating` has no successor mode: the comment is discarded.
    pub fn transition(self, event: ModeEvent) -> Option<Self> {
        use CommentMode::*;
        use ModeEvent as E;

        match (self, event) {
            (Creating, E::Save) => Some(Saving),
            (Default, E::Edit) => Some(Editing),
            (Default, E::Delete) => Some(DeleteConfirm),
            (Editing, E::Save) => Some(Saving),
            (Editing, E::Cancel) => Some(Default),
            (Saving, E::Succeeded) => Some(Default),
            (Saving, E::Failed) => Some(SaveError),
            (SaveError, E::Retry) => Some(Saving),
            (SaveError, E::Cancel) => Some(Default),
            (DeleteConfirm, E::ConfirmDelete) => Some(Deleting),
            (DeleteConfirm, E::Cancel) => Some(Default),
            (Deleting, E::Succeeded) => Some(Default),
            (Deleting, E::Failed) => Some(DeleteError),
            (DeleteError, E::Retry) => Some(Deleting),
            (DeleteError, E::Cancel) => Some(Default),
            _ => None,
        }
    }

    /// A request is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, CommentMode::Saving | CommentMode::Deleting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommentMode::Default => "default",
            CommentMode::Creating => "creating",
            CommentMode::Editing => "editing",
            CommentMode::Saving => "saving",
            CommentMode::SaveError => "save_error",
            CommentMode::DeleteConfirm => "delete_confirm",
            CommentMode::Deleting => "deleting",
            CommentMode::DeleteError => "delete_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    #[default]
    Default,
    Editing,
    Saving,
    SaveError,
    DeleteConfirm,
    Deleting,
    DeleteError,
    /// Shown briefly after a remote reply is deleted, before its tombstone is hidden
    Deleted,
}

impl ReplyMode {
    /// Next mode for `event`, or `None` if the event is not valid here.
    pub fn transition(self, event: ModeEvent) -> Option<Self> {
        use ModeEvent as E;
        use ReplyMode::*;

        match (self, event) {
            (Default, E::Edit) => Some(Editing),
            (Default, E::Delete) => Some(DeleteConfirm),
            (Editing, E::Save) => Some(Saving),
            (Editing, E::Cancel) => Some(Default),
            (Saving, E::Succeeded) => Some(Default),
            (Saving, E::Failed) => Some(SaveError),
            (SaveError, E::Retry) => Some(Saving),
            (SaveError, E::Cancel) => Some(Default),
            (DeleteConfirm, E::ConfirmDelete) => Some(Deleting),
            (DeleteConfirm, E::Cancel) => Some(Default),
            (Deleting, E::Succeeded) => Some(Deleted),
            (Deleting, E::Failed) => Some(DeleteError),
            (DeleteError, E::Retry) => Some(Deleting),
            (DeleteError, E::Cancel) => Some(Default),
            _ => None,
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(self, ReplyMode::Saving | ReplyMode::Deleting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReplyMode::Default => "default",
            ReplyMode::Editing => "editing",
            ReplyMode::Saving => "saving",
            ReplyMode::SaveError => "save_error",
            ReplyMode::DeleteConfirm => "delete_confirm",
            ReplyMode::Deleting => "deleting",
            ReplyMode::DeleteError => "delete_error",
            ReplyMode::Deleted => "deleted",
        }
    }
}
