//! Client-held comment state: entities, actions, reducers and selectors.

pub mod actions;
pub mod comments;
pub mod selectors;
pub mod settings;

pub use actions::*;
pub use comments::{
    comments_reducer, Comment, CommentMap, CommentOptions, CommentReply, CommentsState,
    ReplyOptions,
};
pub use settings::{settings_reducer, SettingsState, SettingsUpdate};

/// Session-local comment id
pub type CommentId = u64;

/// Session-local reply id
pub type ReplyId = u64;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub comments: CommentsState,
    pub settings: SettingsState,
}

/// Root reducer: `(state, action) -> state`.
pub fn reducer(state: &AppState, action: &Action) -> AppState {
    AppState {
        comments: comments_reducer(&state.comments, action),
        settings: settings_reducer(&state.settings, action),
    }
}
