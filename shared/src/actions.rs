//! The three optimistic call sites: poll votes, post likes and comment counts.

use uuid::Uuid;

use crate::models::{comment_thread_id, Collection, CommentDraft, Mutation, COMMENTS_SUB_ITEM, LIKES_SUB_ITEM};

/// Sub-item id of the poll option at `index`.
pub fn option_id(index: usize) -> String {
    format!("opt-{}", index)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Vote { poll_id: String, option_id: String },
    Like { post_id: String },
    /// Counted under the comment id, so every comment adds exactly one.
    Comment { post_id: String, comment_id: Uuid, draft: CommentDraft },
}

impl Action {
    pub fn collection(&self) -> Collection {
        match self {
            Action::Vote { .. } => Collection::Polls,
            Action::Like { .. } => Collection::Posts,
            Action::Comment { .. } => Collection::Comments,
        }
    }

    pub fn into_mutation(self, participant_id: &str) -> Mutation {
        match self {
            Action::Vote { poll_id, option_id } => Mutation {
                entity_id: poll_id,
                sub_item_id: option_id,
                participant_id: participant_id.to_string(),
                comment: None,
            },
            Action::Like { post_id } => Mutation {
                entity_id: post_id,
                sub_item_id: LIKES_SUB_ITEM.to_string(),
                participant_id: participant_id.to_string(),
                comment: None,
            },
            Action::Comment { post_id, comment_id, draft } => Mutation {
                entity_id: comment_thread_id(&post_id),
                sub_item_id: COMMENTS_SUB_ITEM.to_string(),
                participant_id: comment_id.to_string(),
                comment: Some(draft),
            },
        }
    }
}
