//! Save/delete workflows against fake persistence backends.
//!
//! Run:
//!   cargo test -p comments-core --test workflow_test

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use comments_core::annotation::{AnchorNode, FieldAnnotation};
use comments_core::state::selectors::select_is_dirty;
use comments_core::state::{actions, CommentOptions, ReplyOptions};
use comments_core::workflow::{self, CommentPersistence, LocalPersistence, Saved};
use comments_core::{
    Comment, CommentApp, CommentMode, CommentReply, CommentsConfig, PersistenceError, ReplyMode,
};

// ─── Fakes ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Node;

impl AnchorNode for Node {
    fn document_top(&self) -> f64 {
        0.0
    }

    fn tab(&self) -> Option<String> {
        None
    }
}

/// Assigns server ids and can be told to fail the next requests.
#[derive(Default)]
struct FakeServer {
    next_id: Cell<u64>,
    failing: Cell<bool>,
    calls: RefCell<Vec<&'static str>>,
}

impl FakeServer {
    fn fail(&self, failing: bool) {
        self.failing.set(failing);
    }

    fn respond<T>(&self, call: &'static str, ok: impl FnOnce() -> T) -> Result<T, PersistenceError> {
        self.calls.borrow_mut().push(call);
        if self.failing.get() {
            Err(PersistenceError::Network("connection reset".to_string()))
        } else {
            Ok(ok())
        }
    }

    fn assign(&self, existing: Option<u64>) -> Saved {
        let remote_id = existing.unwrap_or_else(|| {
            self.next_id.set(self.next_id.get() + 1);
            100 + self.next_id.get()
        });
        Saved {
            remote_id: Some(remote_id),
            persisted: true,
        }
    }
}

#[async_trait(?Send)]
impl CommentPersistence for FakeServer {
    async fn save_comment(&self, comment: &Comment) -> Result<Saved, PersistenceError> {
        self.respond("save_comment", || self.assign(comment.remote_id))
    }

    async fn delete_comment(&self, _comment: &Comment) -> Result<(), PersistenceError> {
        self.respond("delete_comment", || ())
    }

    async fn save_reply(
        &self,
        _comment: &Comment,
        reply: &CommentReply,
    ) -> Result<Saved, PersistenceError> {
        self.respond("save_reply", || self.assign(reply.remote_id))
    }

    async fn delete_reply(
        &self,
        _comment: &Comment,
        _reply: &CommentReply,
    ) -> Result<(), PersistenceError> {
        self.respond("delete_reply", || ())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("comments_core=debug")
        .with_test_writer()
        .try_init();
}

fn new_comment(app: &CommentApp, text: &str) -> u64 {
    let comment_id = app.make_comment(Rc::new(FieldAnnotation::new(Rc::new(Node))), "title", "");
    workflow::set_comment_text(app, comment_id, text);
    comment_id
}

// ─── Comments ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_save_with_local_persistence() {
    let app = CommentApp::new(CommentsConfig::test());
    let comment_id = new_comment(&app, "First!");

    let mode = workflow::save_comment(&app, &LocalPersistence, comment_id).await;
    assert_eq!(mode, Some(CommentMode::Default));

    let comment = app.comment(comment_id).unwrap();
    assert_eq!(comment.text, "First!");
    assert_eq!(comment.remote_id, None);
    assert!(comment.is_dirty());
    assert_eq!(app.form_fields().iter().filter(|f| f.name.ends_with("-text")).count(), 1);
}

#[tokio::test]
async fn test_failed_save_can_be_retried() {
    init_tracing();
    let app = CommentApp::new(CommentsConfig::test());
    let server = FakeServer::default();
    let comment_id = new_comment(&app, "Needs a source");

    server.fail(true);
    let mode = workflow::save_comment(&app, &server, comment_id).await;
    assert_eq!(mode, Some(CommentMode::SaveError));
    assert_eq!(app.comment(comment_id).unwrap().remote_id, None);

    server.fail(false);
    let mode = workflow::save_comment(&app, &server, comment_id).await;
    assert_eq!(mode, Some(CommentMode::Default));

    let comment = app.comment(comment_id).unwrap();
    assert_eq!(comment.remote_id, Some(101));
    assert_eq!(comment.original_text, "Needs a source");
    assert_eq!(app.state().comments.remote_comment_count, 1);
    assert_eq!(*server.calls.borrow(), vec!["save_comment", "save_comment"]);
}

#[tokio::test]
async fn test_edit_and_cancel() {
    let app = CommentApp::new(CommentsConfig::test());
    let comment_id = new_comment(&app, "Original");
    workflow::save_comment(&app, &LocalPersistence, comment_id).await;

    workflow::start_editing(&app, comment_id);
    assert_eq!(app.comment(comment_id).unwrap().mode, CommentMode::Editing);
    workflow::set_comment_text(&app, comment_id, "Changed my mind");
    workflow::cancel_comment(&app, comment_id);

    let comment = app.comment(comment_id).unwrap();
    assert_eq!(comment.mode, CommentMode::Default);
    assert_eq!(comment.text, "Original");
    assert_eq!(comment.new_text, "Original");
}

#[tokio::test]
async fn test_cancel_while_creating_discards_comment() {
    let app = CommentApp::new(CommentsConfig::test());
    let comment_id = new_comment(&app, "never mind");
    workflow::cancel_comment(&app, comment_id);
    assert!(app.comment(comment_id).is_none());
    assert_eq!(app.state().comments.pinned_comment, None);
}

#[tokio::test]
async fn test_delete_requires_confirmation_and_recovers_from_failure() {
    init_tracing();
    let app = CommentApp::new(CommentsConfig::test());
    let server = FakeServer::default();
    let comment_id = new_comment(&app, "Delete me");
    workflow::save_comment(&app, &server, comment_id).await;

    // Not confirmed yet
    assert_eq!(workflow::delete_comment(&app, &server, comment_id).await, None);

    workflow::request_delete(&app, comment_id);
    assert_eq!(app.comment(comment_id).unwrap().mode, CommentMode::DeleteConfirm);

    server.fail(true);
    let mode = workflow::delete_comment(&app, &server, comment_id).await;
    assert_eq!(mode, Some(CommentMode::DeleteError));
    assert!(!app.comment(comment_id).unwrap().deleted);

    server.fail(false);
    workflow::delete_comment(&app, &server, comment_id).await;
    let comment = app.comment(comment_id).unwrap();
    assert!(comment.deleted);
    assert_eq!(comment.mode, CommentMode::Default);
}

#[tokio::test]
async fn test_resolve_hides_comment() {
    let app = CommentApp::new(CommentsConfig::test());
    let server = FakeServer::default();
    let comment_id = new_comment(&app, "Done?");
    workflow::save_comment(&app, &server, comment_id).await;

    workflow::resolve_comment(&app, comment_id);
    assert!(app.comment(comment_id).unwrap().resolved);
    assert_eq!(app.layout().comment_position(comment_id), None);
}

#[tokio::test]
async fn test_local_edits_of_saved_comment_and_reply_stay_dirty() {
    let app = CommentApp::new(CommentsConfig::test());
    let comment_id = app.next_comment_id();
    app.dispatch(actions::add_comment(Comment::new(
        comment_id,
        "title",
        "",
        None,
        0,
        CommentOptions {
            remote_id: Some(10),
            text: "From the server".to_string(),
            ..Default::default()
        },
    )));
    let reply_id = app.next_reply_id();
    app.dispatch(actions::add_reply(
        comment_id,
        CommentReply::new(
            reply_id,
            None,
            0,
            ReplyOptions {
                remote_id: Some(11),
                text: "Server reply".to_string(),
                ..Default::default()
            },
        ),
    ));
    assert!(!select_is_dirty(&app.state()));

    workflow::start_editing(&app, comment_id);
    workflow::set_comment_text(&app, comment_id, "edited locally");
    let mode = workflow::save_comment(&app, &LocalPersistence, comment_id).await;
    assert_eq!(mode, Some(CommentMode::Default));

    let comment = app.comment(comment_id).unwrap();
    assert_eq!(comment.text, "edited locally");
    assert_eq!(comment.original_text, "From the server");
    assert_eq!(comment.remote_id, Some(10));
    assert!(select_is_dirty(&app.state()));

    // Only the reply differs from the server now
    workflow::start_editing(&app, comment_id);
    workflow::set_comment_text(&app, comment_id, "From the server");
    workflow::save_comment(&app, &LocalPersistence, comment_id).await;
    assert!(!select_is_dirty(&app.state()));

    workflow::start_editing_reply(&app, comment_id, reply_id);
    workflow::set_reply_text(&app, comment_id, reply_id, "reply edited");
    let mode = workflow::save_reply(&app, &LocalPersistence, comment_id, reply_id).await;
    assert_eq!(mode, Some(ReplyMode::Default));

    let reply = app.comment(comment_id).unwrap().replies[&reply_id].clone();
    assert_eq!(reply.text, "reply edited");
    assert_eq!(reply.original_text, "Server reply");
    assert_eq!(reply.remote_id, Some(11));
    assert!(select_is_dirty(&app.state()));
}

// ─── Replies ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reply_lifecycle() {
    let app = CommentApp::new(CommentsConfig::test());
    let server = FakeServer::default();
    let comment_id = new_comment(&app, "Thread");
    workflow::save_comment(&app, &server, comment_id).await;

    // Blank replies are ignored
    assert_eq!(workflow::save_new_reply(&app, &server, comment_id).await, None);

    workflow::set_new_reply_text(&app, comment_id, "Agreed");
    let reply_id = workflow::save_new_reply(&app, &server, comment_id)
        .await
        .unwrap();
    let comment = app.comment(comment_id).unwrap();
    assert_eq!(comment.new_reply, "");
    assert_eq!(comment.replies[&reply_id].mode, ReplyMode::Default);
    assert_eq!(comment.replies[&reply_id].remote_id, Some(102));
    assert_eq!(comment.remote_reply_count, 1);

    workflow::start_editing_reply(&app, comment_id, reply_id);
    workflow::set_reply_text(&app, comment_id, reply_id, "Strongly agreed");
    let mode = workflow::save_reply(&app, &server, comment_id, reply_id).await;
    assert_eq!(mode, Some(ReplyMode::Default));
    assert_eq!(
        app.comment(comment_id).unwrap().replies[&reply_id].text,
        "Strongly agreed"
    );

    workflow::request_delete_reply(&app, comment_id, reply_id);
    let mode = workflow::delete_reply(&app, &server, comment_id, reply_id).await;
    assert_eq!(mode, Some(ReplyMode::Deleted));
    let comment = app.comment(comment_id).unwrap();
    assert!(comment.replies[&reply_id].deleted);
    assert_eq!(comment.visible_replies().count(), 0);
    assert_eq!(comment.remote_reply_count, 1);
}

#[tokio::test]
async fn test_failed_new_reply_keeps_text_for_retry() {
    init_tracing();
    let app = CommentApp::new(CommentsConfig::test());
    let server = FakeServer::default();
    let comment_id = new_comment(&app, "Thread");
    workflow::save_comment(&app, &server, comment_id).await;

    server.fail(true);
    workflow::set_new_reply_text(&app, comment_id, "Lost?");
    let reply_id = workflow::save_new_reply(&app, &server, comment_id)
        .await
        .unwrap();
    let reply = app.comment(comment_id).unwrap().replies[&reply_id].clone();
    assert_eq!(reply.mode, ReplyMode::SaveError);
    assert_eq!(reply.text, "Lost?");

    server.fail(false);
    let mode = workflow::save_reply(&app, &server, comment_id, reply_id).await;
    assert_eq!(mode, Some(ReplyMode::Default));
    assert_eq!(app.comment(comment_id).unwrap().replies[&reply_id].text, "Lost?");
}

#[tokio::test]
async fn test_local_reply_delete_removes_it() {
    let app = CommentApp::new(CommentsConfig::test());
    let comment_id = new_comment(&app, "Thread");
    workflow::save_comment(&app, &LocalPersistence, comment_id).await;
    workflow::set_new_reply_text(&app, comment_id, "draft");
    let reply_id = workflow::save_new_reply(&app, &LocalPersistence, comment_id)
        .await
        .unwrap();

    workflow::request_delete_reply(&app, comment_id, reply_id);
    workflow::delete_reply(&app, &LocalPersistence, comment_id, reply_id).await;
    assert!(!app.comment(comment_id).unwrap().replies.contains_key(&reply_id));
}
