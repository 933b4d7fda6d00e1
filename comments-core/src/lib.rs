//! Comments Core - collaborative commenting engine for the page editor
//!
//! This crate holds everything the browser client needs that does not touch
//! the DOM: the comment store and its reducer, the floating comment layout,
//! annotations, rich-text highlight reconciliation, and the save/delete
//! workflows.

pub mod annotation;
pub mod app;
pub mod config;
pub mod error;
pub mod forms;
pub mod ids;
pub mod layout;
pub mod modes;
pub mod richtext;
pub mod state;
pub mod store;
pub mod workflow;

pub use annotation::{AnchorNode, Annotation, DecoratorId, FieldAnnotation, InlineAnnotation};
pub use app::CommentApp;
pub use config::{CommentsConfig, LayoutConfig};
pub use error::{CommentsError, PersistenceError, Result};
pub use layout::LayoutController;
pub use modes::{CommentMode, ModeEvent, ReplyMode};
pub use state::{AppState, Comment, CommentId, CommentReply, ReplyId};
pub use store::{Store, SubscriptionId};
pub use workflow::{CommentPersistence, LocalPersistence, Saved};
