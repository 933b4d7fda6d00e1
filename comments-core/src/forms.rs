//! Serialising comments into the page's formset fields.
//!
//! Rows for records the server already knows come first, so the first
//! `INITIAL_FORMS` rows of each formset are exactly the existing ones.

use std::rc::Rc;

use shared_types::{
    FormField, FORM_FIELD_CONTENTPATH, FORM_FIELD_DELETE, FORM_FIELD_ID, FORM_FIELD_POSITION,
    FORM_FIELD_RESOLVED, FORM_FIELD_TEXT, FORM_INITIAL_FORMS, FORM_MAX_NUM_FORMS,
    FORM_MIN_NUM_FORMS, FORM_REPLIES_SUFFIX, FORM_TOTAL_FORMS,
};

use crate::modes::CommentMode;
use crate::state::{Comment, CommentReply, CommentsState};

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        ""
    }
}

fn remote_id(id: Option<u64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

fn management_fields(prefix: &str, total: usize, initial: usize) -> [FormField; 4] {
    [
        FormField::new(format!("{prefix}-{FORM_TOTAL_FORMS}"), total.to_string()),
        FormField::new(format!("{prefix}-{FORM_INITIAL_FORMS}"), initial.to_string()),
        FormField::new(format!("{prefix}-{FORM_MIN_NUM_FORMS}"), "0"),
        FormField::new(format!("{prefix}-{FORM_MAX_NUM_FORMS}"), ""),
    ]
}

fn reply_form_fields(comment: &Comment, prefix: &str) -> Vec<FormField> {
    let mut replies: Vec<&CommentReply> = comment.replies.values().collect();
    replies.sort_by_key(|reply| reply.remote_id.is_none());

    let mut fields = Vec::from(management_fields(prefix, replies.len(), comment.remote_reply_count));
    for (index, reply) in replies.into_iter().enumerate() {
        let row = format!("{prefix}-{index}");
        fields.extend([
            FormField::new(format!("{row}-{FORM_FIELD_DELETE}"), flag(reply.deleted)),
            FormField::new(format!("{row}-{FORM_FIELD_ID}"), remote_id(reply.remote_id)),
            FormField::new(format!("{row}-{FORM_FIELD_TEXT}"), reply.text.as_str()),
        ]);
    }
    fields
}

/// Every hidden input for the comments formset under `prefix`.
///
/// Comments still being composed are not submitted.
pub fn comment_form_fields(state: &CommentsState, prefix: &str) -> Vec<FormField> {
    let mut comments: Vec<&Rc<Comment>> = state
        .comments
        .values()
        .filter(|comment| comment.mode != CommentMode::Creating)
        .collect();
    comments.sort_by_key(|comment| comment.remote_id.is_none());

    let mut fields = Vec::from(management_fields(prefix, comments.len(), state.remote_comment_count));
    for (index, comment) in comments.into_iter().enumerate() {
        let row = format!("{prefix}-{index}");
        fields.extend([
            FormField::new(format!("{row}-{FORM_FIELD_DELETE}"), flag(comment.deleted)),
            FormField::new(format!("{row}-{FORM_FIELD_ID}"), remote_id(comment.remote_id)),
            FormField::new(format!("{row}-{FORM_FIELD_CONTENTPATH}"), comment.contentpath.as_str()),
            FormField::new(format!("{row}-{FORM_FIELD_POSITION}"), comment.position.as_str()),
            FormField::new(format!("{row}-{FORM_FIELD_TEXT}"), comment.text.as_str()),
            FormField::new(format!("{row}-{FORM_FIELD_RESOLVED}"), flag(comment.resolved)),
        ]);
        fields.extend(reply_form_fields(comment, &format!("{row}-{FORM_REPLIES_SUFFIX}")));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::actions::*;
    use crate::state::{comments_reducer, CommentOptions, ReplyOptions};

    fn value<'a>(fields: &'a [FormField], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    fn comment(local_id: u64, remote_id: Option<u64>, mode: CommentMode) -> Comment {
        Comment::new(
            local_id,
            "body",
            "[]",
            None,
            0,
            CommentOptions {
                remote_id,
                text: format!("comment {local_id}"),
                mode,
                ..Default::default()
            },
        )
    }

    fn state(actions: Vec<Action>) -> CommentsState {
        actions
            .iter()
            .fold(CommentsState::default(), |state, action| comments_reducer(&state, action))
    }

    #[test]
    fn management_counts_follow_remote_counts() {
        let state = state(vec![
            add_comment(comment(1, None, CommentMode::Default)),
            add_comment(comment(2, Some(20), CommentMode::Default)),
            add_comment(comment(3, None, CommentMode::Creating)),
        ]);
        let fields = comment_form_fields(&state, "comments");

        assert_eq!(value(&fields, "comments-TOTAL_FORMS"), Some("2"));
        assert_eq!(value(&fields, "comments-INITIAL_FORMS"), Some("1"));
        assert_eq!(value(&fields, "comments-MIN_NUM_FORMS"), Some("0"));
        assert_eq!(value(&fields, "comments-MAX_NUM_FORMS"), Some(""));

        // Existing comment first
        assert_eq!(value(&fields, "comments-0-id"), Some("20"));
        assert_eq!(value(&fields, "comments-1-id"), Some(""));
        assert_eq!(value(&fields, "comments-1-text"), Some("comment 1"));
        assert_eq!(value(&fields, "comments-2-id"), None);
    }

    #[test]
    fn tombstones_are_flagged() {
        let state = state(vec![
            add_comment(comment(1, Some(10), CommentMode::Default)),
            add_comment(comment(2, Some(11), CommentMode::Default)),
            delete_comment(1),
            resolve_comment(2),
        ]);
        let fields = comment_form_fields(&state, "comments");
        assert_eq!(value(&fields, "comments-0-DELETE"), Some("1"));
        assert_eq!(value(&fields, "comments-0-resolved"), Some(""));
        assert_eq!(value(&fields, "comments-1-DELETE"), Some(""));
        assert_eq!(value(&fields, "comments-1-resolved"), Some("1"));
        assert_eq!(value(&fields, "comments-0-contentpath"), Some("body"));
        assert_eq!(value(&fields, "comments-0-position"), Some("[]"));
    }

    #[test]
    fn replies_nest_under_their_comment() {
        let reply = |local_id, remote_id| {
            CommentReply::new(
                local_id,
                None,
                0,
                ReplyOptions {
                    remote_id,
                    text: format!("reply {local_id}"),
                    ..Default::default()
                },
            )
        };
        let state = state(vec![
            add_comment(comment(1, Some(10), CommentMode::Default)),
            add_reply(1, reply(1, None)),
            add_reply(1, reply(2, Some(200))),
            delete_reply(1, 2),
        ]);
        let fields = comment_form_fields(&state, "comments");

        assert_eq!(value(&fields, "comments-0-replies-TOTAL_FORMS"), Some("2"));
        assert_eq!(value(&fields, "comments-0-replies-INITIAL_FORMS"), Some("1"));
        assert_eq!(value(&fields, "comments-0-replies-0-id"), Some("200"));
        assert_eq!(value(&fields, "comments-0-replies-0-DELETE"), Some("1"));
        assert_eq!(value(&fields, "comments-0-replies-1-text"), Some("reply 1"));
    }
}
