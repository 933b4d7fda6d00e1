use std::rc::Rc;

use comments_core::state::CommentId;
use comments_core::workflow::{self, LocalPersistence};
use comments_core::{
    AppState, CommentApp, CommentMode, CommentReply, CommentsConfig, FieldAnnotation,
    ReplyId, ReplyMode,
};
use dioxus::prelude::*;
use shared_types::{Author, CommentsBootstrap};

use crate::effects::refresh_layout;
use crate::interop::{
    add_comment_target, focus_card, focused_remote_id, DocumentListener, DomAnchor,
};

/// Shared by every component under [`CommentsRoot`].
#[derive(Clone)]
pub struct CommentsContext {
    pub app: Rc<CommentApp>,
    /// Mirror of the store, replaced on every dispatch
    pub state: Signal<AppState>,
    /// Bumped whenever the layout controller moves a comment
    pub layout_version: Signal<u64>,
}

/// Build the engine for this page. A broken bootstrap leaves comments
/// disabled rather than taking the editor down with it.
fn build_app(bootstrap: Option<&CommentsBootstrap>) -> CommentApp {
    let Some(bootstrap) = bootstrap else {
        let app = CommentApp::default();
        app.set_visible(false);
        return app;
    };

    let param = CommentsConfig::from_value(&bootstrap.config)
        .map(|config| config.focus_query_param)
        .unwrap_or_default();
    match CommentApp::from_bootstrap(bootstrap, focused_remote_id(&param)) {
        Ok(app) => app,
        Err(e) => {
            dioxus_logger::tracing::error!("Failed to initialise comments: {}", e);
            let app = CommentApp::default();
            app.set_visible(false);
            app
        }
    }
}

/// Give every comment on a field rendered on this page a DOM anchor.
fn attach_field_anchors(app: &CommentApp) {
    let state = app.state();
    for comment in state.comments.comments.values() {
        if comment.annotation.is_some() {
            continue;
        }
        match DomAnchor::for_content_path(&comment.contentpath) {
            Some(anchor) => {
                app.update_annotation(Rc::new(FieldAnnotation::new(Rc::new(anchor))), comment.local_id)
            }
            None => dioxus_logger::tracing::debug!(
                "No field on page for comment {} at {}",
                comment.local_id,
                comment.contentpath
            ),
        }
    }
}

fn format_date(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|date| date.format("%-d %b %Y %H:%M").to_string())
        .unwrap_or_default()
}

fn author_name(author: Option<&Author>) -> &str {
    author.map(|a| a.name.as_str()).filter(|name| !name.is_empty()).unwrap_or("Unknown user")
}

fn is_own(author: Option<&Author>, user: Option<&Author>) -> bool {
    matches!((author, user), (Some(author), Some(user)) if author.id == user.id)
}

const COMMENT_STYLES: &str = r#"
.comments-panel {
  position: relative;
  width: 320px;
}

.comment-slot {
  position: absolute;
  left: 0;
  right: 0;
  transition: top 0.2s ease;
}

.comment {
  background: #fff;
  border: 1px solid #e6e6e6;
  border-radius: 6px;
  padding: 0.75rem;
  font-size: 0.875rem;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.08);
}

.comment--focused {
  border-color: #007d7e;
  box-shadow: 0 2px 8px rgba(0, 125, 126, 0.25);
}

.comment__header {
  display: flex;
  justify-content: space-between;
  margin-bottom: 0.5rem;
  color: #5c5c5c;
}

.comment__author {
  font-weight: 600;
  color: #262626;
}

.comment__text {
  white-space: pre-wrap;
  margin: 0 0 0.5rem;
}

.comment__error {
  color: #cd3238;
}

.comment textarea {
  width: 100%;
  min-height: 4rem;
  box-sizing: border-box;
  resize: vertical;
}

.comment__actions {
  display: flex;
  gap: 0.5rem;
}

.comment__replies {
  border-top: 1px solid #f0f0f0;
  margin-top: 0.5rem;
  padding-top: 0.5rem;
}

.comment-reply {
  margin-bottom: 0.5rem;
}
"#;

#[component]
pub fn CommentsRoot(bootstrap: Option<CommentsBootstrap>) -> Element {
    let app = use_hook(|| Rc::new(build_app(bootstrap.as_ref())));
    let state = use_signal(|| app.state());
    let layout_version = use_signal(|| 0u64);
    use_context_provider(|| CommentsContext {
        app: app.clone(),
        state,
        layout_version,
    });

    // Mirror the store into the signal so components re-render on dispatch
    let subscription = use_hook(|| {
        app.store().subscribe(move |next| {
            let mut state = state;
            state.set(next.clone());
        })
    });
    use_drop({
        let app = app.clone();
        move || app.store().unsubscribe(subscription)
    });

    use_effect({
        let app = app.clone();
        move || attach_field_anchors(&app)
    });

    let _listeners = use_hook({
        let app = app.clone();
        move || {
            let mut listeners = Vec::new();

            let visibility_app = app.clone();
            listeners.extend(DocumentListener::new(
                &app.config().visibility_event,
                move |_: web_sys::Event| refresh_layout(&visibility_app, layout_version),
            ));

            let click_app = app.clone();
            listeners.extend(DocumentListener::new("click", move |event| {
                if let Some((contentpath, element)) = add_comment_target(&event) {
                    event.prevent_default();
                    let annotation = FieldAnnotation::new(Rc::new(DomAnchor::new(element)));
                    click_app.make_comment(Rc::new(annotation), contentpath, "");
                }
            }));

            Rc::new(listeners)
        }
    });

    let enabled = state.read().settings.comments_enabled;

    rsx! {
        style { {COMMENT_STYLES} }
        if enabled {
            CommentPanel {}
        }
        CommentFormFields {}
    }
}

/// The floating column of comments for the current tab.
#[component]
pub fn CommentPanel() -> Element {
    let ctx = use_context::<CommentsContext>();

    use_effect({
        let app = ctx.app.clone();
        let layout_version = ctx.layout_version;
        move || {
            let _ = ctx.state.read();
            refresh_layout(&app, layout_version);
        }
    });

    let _version = (ctx.layout_version)();
    let slots: Vec<(CommentId, f64)> = {
        let state = ctx.state.read();
        let layout = ctx.app.layout();
        let tab = state.settings.current_tab.as_deref();
        state
            .comments
            .comments
            .values()
            .filter(|comment| !comment.deleted && !comment.resolved)
            .filter(|comment| layout.comment_visible(tab, comment.local_id))
            .map(|comment| {
                let top = layout
                    .comment_position(comment.local_id)
                    .unwrap_or_else(|| layout.desired_position(comment.local_id));
                (comment.local_id, top)
            })
            .collect()
    };

    rsx! {
        div { class: "comments-panel",
            for (comment_id, top) in slots {
                div {
                    key: "{comment_id}",
                    class: "comment-slot",
                    style: "top: {top}px;",
                    CommentCard { comment_id }
                }
            }
        }
    }
}

#[component]
pub fn CommentCard(comment_id: CommentId) -> Element {
    let ctx = use_context::<CommentsContext>();
    let app = ctx.app.clone();
    let layout_version = ctx.layout_version;
    let mut element = use_signal(|| None::<web_sys::Element>);

    // Report height changes after every re-render of this card
    use_effect({
        let app = app.clone();
        move || {
            let _ = ctx.state.read();
            let Some(el) = element.read().clone() else {
                return;
            };
            let height = el.get_bounding_client_rect().height();
            app.layout_mut().element_height_changed(comment_id, height);
            refresh_layout(&app, layout_version);
        }
    });

    // Scroll to and focus a comment opened from a link or just created
    use_effect({
        let app = app.clone();
        move || {
            let _ = ctx.state.read();
            let Some(el) = element.read().clone() else {
                return;
            };
            if app.take_force_focus(comment_id) {
                focus_card(&el);
            }
        }
    });

    use_drop({
        let app = app.clone();
        move || app.layout_mut().element_detached(comment_id)
    });

    let (comment, focused, user) = {
        let state = ctx.state.read();
        (
            state.comments.comments.get(&comment_id).cloned(),
            state.comments.focused_comment == Some(comment_id),
            state.settings.user.clone(),
        )
    };
    let Some(comment) = comment else {
        return rsx! {};
    };

    let class = if focused {
        "comment comment--focused"
    } else {
        "comment"
    };

    let on_mounted = {
        let app = app.clone();
        move |event: MountedEvent| {
            if let Some(el) = event.data().downcast::<web_sys::Element>() {
                let height = el.get_bounding_client_rect().height();
                app.layout_mut().element_attached(comment_id, height);
                element.set(Some(el.clone()));
                refresh_layout(&app, layout_version);
            }
        }
    };

    let on_focus = {
        let app = app.clone();
        move |_: MouseEvent| {
            if !focused {
                app.focus_comment(Some(comment_id));
            }
        }
    };

    let replies: Vec<ReplyId> = comment.visible_replies().map(|reply| reply.local_id).collect();
    let show_composer = focused && comment.mode == CommentMode::Default;
    let own = is_own(comment.author.as_ref(), user.as_ref());
    let author = author_name(comment.author.as_ref()).to_string();
    let date = format_date(comment.date);

    rsx! {
        div {
            class: "{class}",
            "data-mode": comment.mode.as_str(),
            tabindex: "-1",
            onmounted: on_mounted,
            onclick: on_focus,
            div { class: "comment__header",
                span { class: "comment__author", "{author}" }
                span { class: "comment__date", "{date}" }
            }
            CommentBody { comment_id, own }
            if !replies.is_empty() || show_composer {
                div { class: "comment__replies",
                    for reply_id in replies {
                        ReplyCard { key: "{reply_id}", comment_id, reply_id }
                    }
                    if show_composer {
                        ReplyComposer { comment_id }
                    }
                }
            }
        }
    }
}

/// Text, edit form or status line of a comment, depending on its mode.
#[component]
fn CommentBody(comment_id: CommentId, own: bool) -> Element {
    let ctx = use_context::<CommentsContext>();
    let app = ctx.app.clone();
    let Some(comment) = ctx.state.read().comments.comments.get(&comment_id).cloned() else {
        return rsx! {};
    };

    let save = {
        let app = app.clone();
        move |_: MouseEvent| {
            let app = app.clone();
            spawn(async move {
                workflow::save_comment(&app, &LocalPersistence, comment_id).await;
            });
        }
    };
    let confirm_delete = {
        let app = app.clone();
        move |_: MouseEvent| {
            let app = app.clone();
            spawn(async move {
                workflow::delete_comment(&app, &LocalPersistence, comment_id).await;
            });
        }
    };
    let cancel = {
        let app = app.clone();
        move |_: MouseEvent| workflow::cancel_comment(&app, comment_id)
    };

    match comment.mode {
        CommentMode::Creating | CommentMode::Editing => {
            let input = {
                let app = app.clone();
                move |event: FormEvent| workflow::set_comment_text(&app, comment_id, event.value())
            };
            let blank = comment.new_text.trim().is_empty();
            rsx! {
                textarea {
                    placeholder: "Enter your comments...",
                    value: "{comment.new_text}",
                    autofocus: true,
                    oninput: input,
                }
                div { class: "comment__actions",
                    button { disabled: blank, onclick: save, "Save" }
                    button { onclick: cancel, "Cancel" }
                }
            }
        }
        CommentMode::Saving => rsx! {
            p { class: "comment__text", "{comment.new_text}" }
            p { class: "comment__status", "Saving..." }
        },
        CommentMode::Deleting => rsx! {
            p { class: "comment__text", "{comment.text}" }
            p { class: "comment__status", "Deleting..." }
        },
        CommentMode::SaveError => rsx! {
            p { class: "comment__text", "{comment.new_text}" }
            p { class: "comment__error", "Save error" }
            div { class: "comment__actions",
                button { onclick: save, "Retry" }
                button { onclick: cancel, "Cancel" }
            }
        },
        CommentMode::DeleteConfirm => rsx! {
            p { class: "comment__text", "{comment.text}" }
            p { class: "comment__status", "Are you sure?" }
            div { class: "comment__actions",
                button { onclick: confirm_delete, "Delete" }
                button { onclick: cancel, "Cancel" }
            }
        },
        CommentMode::DeleteError => rsx! {
            p { class: "comment__text", "{comment.text}" }
            p { class: "comment__error", "Delete error" }
            div { class: "comment__actions",
                button { onclick: confirm_delete, "Retry" }
                button { onclick: cancel, "Cancel" }
            }
        },
        CommentMode::Default => {
            let edit = {
                let app = app.clone();
                move |_: MouseEvent| workflow::start_editing(&app, comment_id)
            };
            let delete = {
                let app = app.clone();
                move |_: MouseEvent| workflow::request_delete(&app, comment_id)
            };
            let resolve = {
                let app = app.clone();
                move |_: MouseEvent| workflow::resolve_comment(&app, comment_id)
            };
            rsx! {
                p { class: "comment__text", "{comment.text}" }
                div { class: "comment__actions",
                    button { onclick: resolve, "Resolve" }
                    if own {
                        button { onclick: edit, "Edit" }
                        button { onclick: delete, "Delete" }
                    }
                }
            }
        }
    }
}

#[component]
fn ReplyCard(comment_id: CommentId, reply_id: ReplyId) -> Element {
    let ctx = use_context::<CommentsContext>();
    let app = ctx.app.clone();

    let (reply, own) = {
        let state = ctx.state.read();
        let reply: Option<CommentReply> = state
            .comments
            .comments
            .get(&comment_id)
            .and_then(|comment| comment.replies.get(&reply_id))
            .cloned();
        let own = reply
            .as_ref()
            .is_some_and(|reply| is_own(reply.author.as_ref(), state.settings.user.as_ref()));
        (reply, own)
    };
    let Some(reply) = reply else {
        return rsx! {};
    };

    let save = {
        let app = app.clone();
        move |_: MouseEvent| {
            let app = app.clone();
            spawn(async move {
                workflow::save_reply(&app, &LocalPersistence, comment_id, reply_id).await;
            });
        }
    };
    let confirm_delete = {
        let app = app.clone();
        move |_: MouseEvent| {
            let app = app.clone();
            spawn(async move {
                workflow::delete_reply(&app, &LocalPersistence, comment_id, reply_id).await;
            });
        }
    };
    let cancel = {
        let app = app.clone();
        move |_: MouseEvent| workflow::cancel_reply(&app, comment_id, reply_id)
    };

    let body = match reply.mode {
        ReplyMode::Editing => {
            let input = {
                let app = app.clone();
                move |event: FormEvent| {
                    workflow::set_reply_text(&app, comment_id, reply_id, event.value())
                }
            };
            rsx! {
                textarea { value: "{reply.new_text}", oninput: input }
                div { class: "comment__actions",
                    button { disabled: reply.new_text.trim().is_empty(), onclick: save, "Save" }
                    button { onclick: cancel, "Cancel" }
                }
            }
        }
        ReplyMode::Saving => rsx! {
            p { class: "comment__text", "{reply.text}" }
            p { class: "comment__status", "Saving..." }
        },
        ReplyMode::Deleting => rsx! {
            p { class: "comment__text", "{reply.text}" }
            p { class: "comment__status", "Deleting..." }
        },
        ReplyMode::Deleted => rsx! {
            p { class: "comment__status", "Reply deleted" }
        },
        ReplyMode::SaveError => rsx! {
            p { class: "comment__text", "{reply.text}" }
            p { class: "comment__error", "Save error" }
            div { class: "comment__actions",
                button { onclick: save, "Retry" }
                button { onclick: cancel, "Cancel" }
            }
        },
        ReplyMode::DeleteConfirm => rsx! {
            p { class: "comment__text", "{reply.text}" }
            p { class: "comment__status", "Are you sure?" }
            div { class: "comment__actions",
                button { onclick: confirm_delete, "Delete" }
                button { onclick: cancel, "Cancel" }
            }
        },
        ReplyMode::DeleteError => rsx! {
            p { class: "comment__text", "{reply.text}" }
            p { class: "comment__error", "Delete error" }
            div { class: "comment__actions",
                button { onclick: confirm_delete, "Retry" }
                button { onclick: cancel, "Cancel" }
            }
        },
        ReplyMode::Default => {
            let edit = {
                let app = app.clone();
                move |_: MouseEvent| workflow::start_editing_reply(&app, comment_id, reply_id)
            };
            let delete = {
                let app = app.clone();
                move |_: MouseEvent| workflow::request_delete_reply(&app, comment_id, reply_id)
            };
            rsx! {
                p { class: "comment__text", "{reply.text}" }
                if own {
                    div { class: "comment__actions",
                        button { onclick: edit, "Edit" }
                        button { onclick: delete, "Delete" }
                    }
                }
            }
        }
    };

    let author = author_name(reply.author.as_ref()).to_string();
    let date = format_date(reply.date);

    rsx! {
        div { class: "comment-reply", "data-mode": reply.mode.as_str(),
            div { class: "comment__header",
                span { class: "comment__author", "{author}" }
                span { class: "comment__date", "{date}" }
            }
            {body}
        }
    }
}

#[component]
fn ReplyComposer(comment_id: CommentId) -> Element {
    let ctx = use_context::<CommentsContext>();
    let app = ctx.app.clone();
    let new_reply = ctx
        .state
        .read()
        .comments
        .comments
        .get(&comment_id)
        .map(|comment| comment.new_reply.clone())
        .unwrap_or_default();

    let input = {
        let app = app.clone();
        move |event: FormEvent| workflow::set_new_reply_text(&app, comment_id, event.value())
    };
    let submit = {
        let app = app.clone();
        move |_: MouseEvent| {
            let app = app.clone();
            spawn(async move {
                workflow::save_new_reply(&app, &LocalPersistence, comment_id).await;
            });
        }
    };

    rsx! {
        textarea {
            placeholder: "Enter your reply...",
            value: "{new_reply}",
            oninput: input,
        }
        div { class: "comment__actions",
            button { disabled: new_reply.trim().is_empty(), onclick: submit, "Reply" }
        }
    }
}

/// Hidden inputs submitted with the page form. The mount point must sit
/// inside that form.
#[component]
pub fn CommentFormFields() -> Element {
    let ctx = use_context::<CommentsContext>();
    let _ = ctx.state.read();
    let fields = ctx.app.form_fields();

    rsx! {
        div { class: "comments-form-fields", hidden: true,
            for field in fields {
                input {
                    key: "{field.name}",
                    r#type: "hidden",
                    name: "{field.name}",
                    value: "{field.value}",
                }
            }
        }
    }
}
