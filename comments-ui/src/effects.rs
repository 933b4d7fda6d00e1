use std::cell::{Cell, RefCell};
use std::rc::Rc;

use comments_core::richtext::{update_comment_positions, RichTextDocument};
use comments_core::state::selectors::comments_for_content_path;
use comments_core::CommentApp;
use dioxus::prelude::{ReadableExt, Signal, WritableExt};
use gloo_timers::callback::Timeout;

/// Runs the most recently scheduled callback once calls stop arriving for
/// `delay_ms`.
pub struct Debouncer {
    delay_ms: u32,
    timeout: RefCell<Option<Timeout>>,
    pending: Rc<Cell<bool>>,
}

impl Debouncer {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            timeout: RefCell::new(None),
            pending: Rc::new(Cell::new(false)),
        }
    }

    /// Replace any pending callback with `callback`.
    pub fn schedule(&self, callback: impl FnOnce() + 'static) {
        let pending = Rc::clone(&self.pending);
        pending.set(true);
        let timeout = Timeout::new(self.delay_ms, move || {
            pending.set(false);
            callback();
        });
        // Dropping the previous Timeout clears it.
        self.timeout.replace(Some(timeout));
    }

    pub fn cancel(&self) {
        self.timeout.replace(None);
        self.pending.set(false);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }
}

/// Propagates highlight ranges from a rich-text field into the store after
/// the editor has been idle for the configured interval.
pub struct PositionSync {
    app: Rc<CommentApp>,
    contentpath: String,
    debouncer: Debouncer,
}

impl PositionSync {
    pub fn new(app: Rc<CommentApp>, contentpath: impl Into<String>) -> Self {
        let delay_ms = app.config().position_debounce_ms;
        Self {
            app,
            contentpath: contentpath.into(),
            debouncer: Debouncer::new(delay_ms),
        }
    }

    /// Queue `document` for reconciliation, superseding any earlier snapshot.
    pub fn document_changed(&self, document: RichTextDocument) {
        let app = Rc::clone(&self.app);
        let contentpath = self.contentpath.clone();
        self.debouncer.schedule(move || {
            // Only dispatches, so firing after the field is gone is harmless.
            let state = app.state();
            let comments = comments_for_content_path(&state.comments.comments, &contentpath);
            update_comment_positions(&app, &document, &comments);
        });
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

/// Repack the comment column and bump `layout_version` when anything moved.
pub fn refresh_layout(app: &CommentApp, mut layout_version: Signal<u64>) {
    if app.refresh_layout() {
        let next = *layout_version.peek() + 1;
        layout_version.set(next);
    }
}
