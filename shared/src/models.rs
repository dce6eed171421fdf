use serde::{Serialize, Deserialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Sub-item carrying a post's likes.
pub const LIKES_SUB_ITEM: &str = "likes";
/// Sub-item carrying a comment thread's count.
pub const COMMENTS_SUB_ITEM: &str = "comments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "entity_kind", rename_all = "snake_case"))]
pub enum EntityKind {
    Poll,
    Post,
    CommentThread,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Poll => "poll",
            EntityKind::Post => "post",
            EntityKind::CommentThread => "comment_thread",
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poll" => Ok(EntityKind::Poll),
            "post" => Ok(EntityKind::Post),
            "comment_thread" => Ok(EntityKind::CommentThread),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

/// A queryable collection of entities. Each collection holds exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Polls,
    Posts,
    Comments,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Polls => "polls",
            Collection::Posts => "posts",
            Collection::Comments => "comments",
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            Collection::Polls => EntityKind::Poll,
            Collection::Posts => EntityKind::Post,
            Collection::Comments => EntityKind::CommentThread,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polls" => Ok(Collection::Polls),
            "posts" => Ok(Collection::Posts),
            "comments" => Ok(Collection::Comments),
            other => Err(format!("unknown collection: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubItem {
    pub id: String,
    pub label: String,
    pub count: u32,
    pub participants: BTreeSet<String>,
}

impl SubItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            count: 0,
            participants: BTreeSet::new(),
        }
    }
}

/// A poll, post or comment thread together with its counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub title: String,
    pub body: String,
    pub author: String,
    pub total_count: u32,
    pub sub_items: Vec<SubItem>,
    pub created_at: OffsetDateTime,
}

impl Entity {
    pub fn sub_item(&self, id: &str) -> Option<&SubItem> {
        self.sub_items.iter().find(|item| item.id == id)
    }

    /// The sub-item `participant` already counts toward, if any.
    pub fn participation_of(&self, participant: &str) -> Option<&SubItem> {
        self.sub_items.iter().find(|item| item.participants.contains(participant))
    }

    pub fn has_participant(&self, participant: &str) -> bool {
        self.participation_of(participant).is_some()
    }

    /// Checks the counter invariants: the total equals the sum of sub-item
    /// counts and the number of distinct participants, each sub-item count
    /// equals its set size, and nobody is counted twice.
    pub fn is_consistent(&self) -> bool {
        let sum: u64 = self.sub_items.iter().map(|item| u64::from(item.count)).sum();
        let members: usize = self.sub_items.iter().map(|item| item.participants.len()).sum();
        let distinct: BTreeSet<&String> = self.sub_items.iter()
            .flat_map(|item| item.participants.iter())
            .collect();

        sum == u64::from(self.total_count)
            && distinct.len() == members
            && members as u64 == sum
            && self.sub_items.iter().all(|item| item.count as usize == item.participants.len())
    }
}

/// How the store treats an increment for a given participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    Applied,
    /// Replay of a write already counted on the same sub-item.
    AlreadyCounted,
    /// The participant already counts toward a different sub-item.
    Conflict,
    UnknownSubItem,
}

/// Decides an increment from the sub-item the participant is already counted
/// on, if any.
pub fn classify_participation(existing: Option<&str>, requested: &str) -> IncrementOutcome {
    match existing {
        None => IncrementOutcome::Applied,
        Some(current) if current == requested => IncrementOutcome::AlreadyCounted,
        Some(_) => IncrementOutcome::Conflict,
    }
}

impl Entity {
    /// Set-union increment as the store applies it: replays are no-ops.
    pub fn apply_increment(&mut self, sub_item_id: &str, participant: &str) -> IncrementOutcome {
        if self.sub_item(sub_item_id).is_none() {
            return IncrementOutcome::UnknownSubItem;
        }
        let existing = self.participation_of(participant).map(|item| item.id.clone());
        let outcome = classify_participation(existing.as_deref(), sub_item_id);
        if outcome == IncrementOutcome::Applied {
            if let Some(item) = self.sub_items.iter_mut().find(|item| item.id == sub_item_id) {
                item.count += 1;
                item.participants.insert(participant.to_string());
                self.total_count += 1;
            }
        }
        outcome
    }
}

/// Thread id holding the comment count of `post_id`.
pub fn comment_thread_id(post_id: &str) -> String {
    format!("{}:comments", post_id)
}

/// An entity as last received from the store, stamped by arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub seq: u64,
    pub entity: Entity,
}

/// One participant's attempted change to one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    pub entity_id: String,
    pub sub_item_id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentDraft>,
}

/// Text attached to a comment-count increment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    pub author: String,
    pub body: String,
}

impl Mutation {
    pub fn key(&self) -> MutationKey {
        MutationKey {
            entity_id: self.entity_id.clone(),
            participant_id: self.participant_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationKey {
    pub entity_id: String,
    pub participant_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    InFlight,
    Acknowledged,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub mutation: Mutation,
    pub status: MutationStatus,
}

impl PendingMutation {
    pub fn in_flight(mutation: Mutation) -> Self {
        Self { mutation, status: MutationStatus::InFlight }
    }

    /// Whether the overlay for this mutation should still be rendered.
    pub fn is_overlaid(&self) -> bool {
        matches!(self.status, MutationStatus::InFlight | MutationStatus::Acknowledged)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Acknowledged,
    Failed(crate::error::DispatchFailure),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub csrf_token: String,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub csrf_token: String,
    pub title: String,
    pub body: String,
    pub author: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncrementRequest {
    pub sub_item_id: String,
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentDraft>,
}

impl From<&Mutation> for IncrementRequest {
    fn from(mutation: &Mutation) -> Self {
        Self {
            sub_item_id: mutation.sub_item_id.clone(),
            participant_id: mutation.participant_id.clone(),
            comment: mutation.comment.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncrementResponse {
    pub entity_id: String,
    /// False when the participant was already counted on the same sub-item.
    pub applied: bool,
    pub total_count: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: String,
    pub author: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}
