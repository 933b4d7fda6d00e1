//! `CommentApp`: store, layout and id sequences wired together.
//!
//! Views talk to this type only. Every mutation goes through
//! [`CommentApp::dispatch`], which keeps the layout controller's pinned
//! comment and current tab in step with the store.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use shared_types::{resolve_author, Author, AuthorTable, CommentsBootstrap, FormField, InitialComment};

use crate::annotation::Annotation;
use crate::config::CommentsConfig;
use crate::error::Result;
use crate::forms::comment_form_fields;
use crate::ids::IdSequence;
use crate::layout::LayoutController;
use crate::modes::CommentMode;
use crate::state::{
    add_comment, add_reply, invalidate_content_path, set_focused_comment, update_comment,
    update_global_settings, Action, AppState, Comment, CommentId, CommentOptions, CommentReply,
    CommentUpdate, FocusOptions, ReplyId, ReplyOptions, SettingsUpdate,
};
use crate::store::Store;

#[derive(Debug)]
pub struct CommentApp {
    config: CommentsConfig,
    store: Store,
    layout: RefCell<LayoutController>,
    comment_ids: IdSequence,
    reply_ids: IdSequence,
}

impl Default for CommentApp {
    fn default() -> Self {
        Self::new(CommentsConfig::default())
    }
}

impl CommentApp {
    pub fn new(config: CommentsConfig) -> Self {
        Self {
            layout: RefCell::new(LayoutController::new(config.layout)),
            config,
            store: Store::default(),
            comment_ids: IdSequence::new(),
            reply_ids: IdSequence::new(),
        }
    }

    /// Build an app from the page's bootstrap document, focusing the comment
    /// named by the focus query parameter if there is one.
    pub fn from_bootstrap(bootstrap: &CommentsBootstrap, focused_remote_id: Option<u64>) -> Result<Self> {
        let config = CommentsConfig::from_value(&bootstrap.config)?;
        let app = Self::new(config);
        if let Some(user_id) = bootstrap.user {
            app.set_user(user_id, &bootstrap.authors);
        }
        app.init_comments(&bootstrap.comments, &bootstrap.authors, focused_remote_id);
        Ok(app)
    }

    pub fn config(&self) -> &CommentsConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> AppState {
        self.store.state()
    }

    pub fn layout(&self) -> Ref<'_, LayoutController> {
        self.layout.borrow()
    }

    pub fn layout_mut(&self) -> RefMut<'_, LayoutController> {
        self.layout.borrow_mut()
    }

    pub fn comment(&self, comment_id: CommentId) -> Option<Rc<Comment>> {
        self.store.state().comments.comments.get(&comment_id).cloned()
    }

    pub fn next_comment_id(&self) -> CommentId {
        self.comment_ids.next()
    }

    pub fn next_reply_id(&self) -> ReplyId {
        self.reply_ids.next()
    }

    pub fn dispatch(&self, action: Action) {
        let before = self.store.state();
        self.store.dispatch(action);
        let after = self.store.state();

        let mut layout = self.layout.borrow_mut();
        if !Rc::ptr_eq(&before.comments.comments, &after.comments.comments) {
            // Comments that stopped being shown no longer take part in layout.
            for (comment_id, comment) in before.comments.comments.iter() {
                let was_shown = !comment.deleted && !comment.resolved;
                let is_shown = after
                    .comments
                    .comments
                    .get(comment_id)
                    .is_some_and(|comment| !comment.deleted && !comment.resolved);
                if was_shown && !is_shown {
                    layout.remove_comment(*comment_id);
                }
            }
        }
        layout.set_pinned_comment(after.comments.pinned_comment);
        layout.set_current_tab(after.settings.current_tab.clone());
    }

    pub fn current_user(&self) -> Option<Author> {
        self.store.state().settings.user
    }

    pub fn set_user(&self, user_id: u64, authors: &AuthorTable) {
        self.dispatch(update_global_settings(SettingsUpdate {
            user: Some(Some(resolve_author(authors, user_id))),
            ..Default::default()
        }));
    }

    /// Import the comments the server sent with the page.
    pub fn init_comments(
        &self,
        comments: &[InitialComment],
        authors: &AuthorTable,
        focused_remote_id: Option<u64>,
    ) {
        for initial in comments {
            let comment_id = self.comment_ids.next();
            self.dispatch(add_comment(Comment::new(
                comment_id,
                initial.contentpath.as_str(),
                initial.position.as_str(),
                Some(resolve_author(authors, initial.user)),
                initial.created_at.timestamp_millis(),
                CommentOptions {
                    remote_id: Some(initial.pk),
                    text: initial.text.clone(),
                    deleted: initial.deleted,
                    resolved: initial.resolved,
                    ..Default::default()
                },
            )));

            for initial_reply in &initial.replies {
                self.dispatch(add_reply(
                    comment_id,
                    CommentReply::new(
                        self.reply_ids.next(),
                        Some(resolve_author(authors, initial_reply.user)),
                        initial_reply.created_at.timestamp_millis(),
                        ReplyOptions {
                            remote_id: Some(initial_reply.pk),
                            text: initial_reply.text.clone(),
                            ..Default::default()
                        },
                    ),
                ));
            }

            if focused_remote_id == Some(initial.pk) {
                self.dispatch(set_focused_comment(
                    Some(comment_id),
                    FocusOptions {
                        update_pinned_comment: true,
                        force_focus: true,
                    },
                ));
            }
        }
        tracing::debug!(count = comments.len(), "Loaded comments");
    }

    /// Start a new comment on `contentpath`, authored by the current user,
    /// and focus it so its form opens.
    pub fn make_comment(
        &self,
        annotation: Rc<dyn Annotation>,
        contentpath: impl Into<String>,
        position: impl Into<String>,
    ) -> CommentId {
        let comment_id = self.comment_ids.next();
        self.layout
            .borrow_mut()
            .set_comment_annotation(comment_id, Rc::clone(&annotation));

        self.dispatch(add_comment(Comment::new(
            comment_id,
            contentpath,
            position,
            self.current_user(),
            chrono::Utc::now().timestamp_millis(),
            CommentOptions {
                mode: CommentMode::Creating,
                annotation: Some(annotation),
                ..Default::default()
            },
        )));
        self.dispatch(set_focused_comment(
            Some(comment_id),
            FocusOptions {
                update_pinned_comment: true,
                force_focus: true,
            },
        ));
        comment_id
    }

    /// Attach (or replace) the annotation a comment floats beside.
    pub fn update_annotation(&self, annotation: Rc<dyn Annotation>, comment_id: CommentId) {
        self.layout
            .borrow_mut()
            .set_comment_annotation(comment_id, Rc::clone(&annotation));
        self.dispatch(update_comment(comment_id, CommentUpdate::annotation(annotation)));
    }

    /// Focus a comment and pin it in the layout. `None` clears focus.
    pub fn focus_comment(&self, comment_id: Option<CommentId>) {
        self.dispatch(set_focused_comment(
            comment_id,
            FocusOptions {
                update_pinned_comment: true,
                force_focus: false,
            },
        ));
    }

    /// Whether `comment_id` was focused with a request to move keyboard
    /// focus to it. The request is cleared so it is honoured once.
    pub fn take_force_focus(&self, comment_id: CommentId) -> bool {
        let comments = self.store.state().comments;
        if !comments.force_focus || comments.focused_comment != Some(comment_id) {
            return false;
        }
        self.dispatch(set_focused_comment(
            Some(comment_id),
            FocusOptions {
                update_pinned_comment: false,
                force_focus: false,
            },
        ));
        true
    }

    pub fn set_current_tab(&self, tab: Option<String>) {
        self.dispatch(update_global_settings(SettingsUpdate {
            current_tab: Some(tab),
            ..Default::default()
        }));
    }

    pub fn set_visible(&self, visible: bool) {
        self.dispatch(update_global_settings(SettingsUpdate {
            comments_enabled: Some(visible),
            ..Default::default()
        }));
    }

    pub fn invalidate_content_path(&self, content_path: impl Into<String>) {
        self.dispatch(invalidate_content_path(content_path));
    }

    /// Re-measure annotations and repack. Returns whether positions changed.
    pub fn refresh_layout(&self) -> bool {
        self.layout.borrow_mut().refresh()
    }

    /// Hidden inputs describing every comment for the page form.
    pub fn form_fields(&self) -> Vec<FormField> {
        comment_form_fields(&self.store.state().comments, &self.config.form_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnchorNode, FieldAnnotation};
    use chrono::{TimeZone, Utc};
    use shared_types::{AuthorInfo, InitialReply};

    #[derive(Debug)]
    struct Node(f64);

    impl AnchorNode for Node {
        fn document_top(&self) -> f64 {
            self.0
        }

        fn tab(&self) -> Option<String> {
            None
        }
    }

    fn authors() -> AuthorTable {
        AuthorTable::from([(
            1,
            AuthorInfo {
                name: "Ada".to_string(),
                avatar_url: None,
            },
        )])
    }

    fn initial(pk: u64) -> InitialComment {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        InitialComment {
            pk,
            user: 1,
            text: format!("comment {pk}"),
            created_at: created,
            updated_at: created,
            replies: vec![InitialReply {
                pk: pk * 10,
                user: 2,
                text: "reply".to_string(),
                created_at: created,
                updated_at: created,
            }],
            contentpath: "title".to_string(),
            position: String::new(),
            deleted: false,
            resolved: false,
        }
    }

    #[test]
    fn init_comments_assigns_local_ids_and_focuses_requested() {
        let app = CommentApp::new(CommentsConfig::test());
        app.init_comments(&[initial(40), initial(41)], &authors(), Some(41));

        let state = app.state();
        assert_eq!(state.comments.remote_comment_count, 2);
        let first = &state.comments.comments[&1];
        assert_eq!(first.remote_id, Some(40));
        assert_eq!(first.author.as_ref().map(|a| a.name.as_str()), Some("Ada"));
        assert_eq!(first.remote_reply_count, 1);
        assert_eq!(state.comments.focused_comment, Some(2));
        assert_eq!(state.comments.pinned_comment, Some(2));
        assert!(state.comments.force_focus);
        assert_eq!(app.layout().pinned_comment(), Some(2));
    }

    #[test]
    fn test_force_focus_is_taken_once_by_focused_comment() {
        let app = CommentApp::new(CommentsConfig::test());
        app.init_comments(&[initial(40), initial(41)], &authors(), Some(41));

        assert!(!app.take_force_focus(1));
        assert!(app.state().comments.force_focus);

        assert!(app.take_force_focus(2));
        let state = app.state();
        assert!(!state.comments.force_focus);
        assert_eq!(state.comments.focused_comment, Some(2));
        assert_eq!(state.comments.pinned_comment, Some(2));
        assert!(!app.take_force_focus(2));
    }

    #[test]
    fn make_comment_is_creating_and_pinned() {
        let app = CommentApp::new(CommentsConfig::test());
        app.set_user(1, &authors());
        let annotation = Rc::new(FieldAnnotation::new(Rc::new(Node(300.0))));
        let comment_id = app.make_comment(annotation, "body", "");

        let comment = app.comment(comment_id).unwrap();
        assert_eq!(comment.mode, CommentMode::Creating);
        assert_eq!(comment.author.as_ref().map(|a| a.id), Some(1));
        assert!(comment.annotation.is_some());
        assert_eq!(app.state().comments.pinned_comment, Some(comment_id));
        assert_eq!(app.layout().desired_position(comment_id), 250.0);
    }

    #[test]
    fn tab_and_visibility_flow_into_state_and_layout() {
        let app = CommentApp::default();
        app.set_current_tab(Some("settings".to_string()));
        app.set_visible(false);
        let state = app.state();
        assert_eq!(state.settings.current_tab.as_deref(), Some("settings"));
        assert!(!state.settings.comments_enabled);
        assert_eq!(app.layout().current_tab(), Some("settings"));
    }
}
