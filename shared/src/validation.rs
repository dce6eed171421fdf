use std::collections::{BTreeSet, HashSet};
use serde::Deserialize;
use time::OffsetDateTime;
use crate::models::{CreatePollRequest, CreatePostRequest, CommentDraft, Entity, EntityKind, SubItem};

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_BODY_LENGTH: usize = 4000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_OPTION_LENGTH: usize = 40;
pub const MAX_AUTHOR_LENGTH: usize = 40;
pub const MAX_OPTIONS: usize = 20;
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Title exceeds maximum length of {MAX_TITLE_LENGTH}")]
    TitleTooLong,
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Description exceeds maximum length of {MAX_DESCRIPTION_LENGTH}")]
    DescriptionTooLong,
    #[error("Body exceeds maximum length of {MAX_BODY_LENGTH}")]
    BodyTooLong,
    #[error("Comment exceeds maximum length of {MAX_COMMENT_LENGTH}")]
    CommentTooLong,
    #[error("Comment must not be empty")]
    EmptyComment,
    #[error("Author name exceeds maximum length of {MAX_AUTHOR_LENGTH}")]
    AuthorTooLong,
    #[error("Option text exceeds maximum length of {MAX_OPTION_LENGTH}")]
    OptionTooLong,
    #[error("Too many options (maximum {MAX_OPTIONS})")]
    TooManyOptions,
    #[error("Too few options (minimum {MIN_OPTIONS})")]
    TooFewOptions,
    #[error("Duplicate option: {0}")]
    DuplicateOption(String),
    #[error("Empty option text")]
    EmptyOption,
    #[error("Malformed entity {id}: {reason}")]
    MalformedEntity { id: String, reason: String },
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() { return Err(ValidationError::EmptyTitle); }
    if title.chars().count() > MAX_TITLE_LENGTH { return Err(ValidationError::TitleTooLong); }
    Ok(())
}

fn validate_author(author: &str) -> Result<(), ValidationError> {
    if author.chars().count() > MAX_AUTHOR_LENGTH { return Err(ValidationError::AuthorTooLong); }
    Ok(())
}

pub fn validate_poll_request(request: &CreatePollRequest) -> Result<(), ValidationError> {
    validate_title(&request.title)?;
    validate_author(&request.author)?;
    if request.description.chars().count() > MAX_DESCRIPTION_LENGTH { return Err(ValidationError::DescriptionTooLong); }
    if request.options.len() > MAX_OPTIONS { return Err(ValidationError::TooManyOptions); }
    if request.options.len() < MIN_OPTIONS { return Err(ValidationError::TooFewOptions); }
    if request.options.iter().any(|opt| opt.trim().is_empty()) { return Err(ValidationError::EmptyOption); }
    if request.options.iter().any(|opt| opt.chars().count() > MAX_OPTION_LENGTH) { return Err(ValidationError::OptionTooLong); }

    let mut seen = HashSet::new();
    if let Some(dup) = request.options.iter().find(|opt| !seen.insert(opt.trim().to_lowercase())) {
        return Err(ValidationError::DuplicateOption(dup.clone()));
    }

    Ok(())
}

pub fn validate_post_request(request: &CreatePostRequest) -> Result<(), ValidationError> {
    validate_title(&request.title)?;
    validate_author(&request.author)?;
    if request.body.chars().count() > MAX_BODY_LENGTH { return Err(ValidationError::BodyTooLong); }
    Ok(())
}

pub fn validate_comment(comment: &CommentDraft) -> Result<(), ValidationError> {
    validate_author(&comment.author)?;
    if comment.body.trim().is_empty() { return Err(ValidationError::EmptyComment); }
    if comment.body.chars().count() > MAX_COMMENT_LENGTH { return Err(ValidationError::CommentTooLong); }
    Ok(())
}

/// A store record as it arrives over the wire, before any invariant is known
/// to hold. Converted into [`Entity`] with `TryFrom`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntity {
    pub id: Option<String>,
    pub kind: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    pub total_count: Option<i64>,
    pub sub_items: Option<Vec<RawSubItem>>,
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubItem {
    pub id: Option<String>,
    pub label: Option<String>,
    pub count: Option<i64>,
    pub participants: Option<Vec<String>>,
}

fn non_negative(id: &str, field: &str, value: Option<i64>) -> Result<u32, ValidationError> {
    let value = value.unwrap_or(0);
    u32::try_from(value).map_err(|_| ValidationError::MalformedEntity {
        id: id.to_string(),
        reason: format!("{} out of range: {}", field, value),
    })
}

impl TryFrom<RawEntity> for Entity {
    type Error = ValidationError;

    fn try_from(raw: RawEntity) -> Result<Self, Self::Error> {
        let id = raw.id.filter(|id| !id.is_empty()).ok_or_else(|| ValidationError::MalformedEntity {
            id: String::new(),
            reason: "missing id".into(),
        })?;
        let malformed = |reason: String| ValidationError::MalformedEntity { id: id.clone(), reason };

        let kind: EntityKind = raw.kind.as_deref()
            .ok_or_else(|| malformed("missing kind".into()))?
            .parse()
            .map_err(malformed)?;
        let total_count = non_negative(&id, "totalCount", raw.total_count)?;

        let mut sub_items = Vec::new();
        let mut seen_ids = HashSet::new();
        for raw_item in raw.sub_items.unwrap_or_default() {
            let item_id = raw_item.id.filter(|s| !s.is_empty())
                .ok_or_else(|| malformed("sub-item without id".into()))?;
            if !seen_ids.insert(item_id.clone()) {
                return Err(malformed(format!("duplicate sub-item {}", item_id)));
            }
            let participants_list = raw_item.participants.unwrap_or_default();
            let participants: BTreeSet<String> = participants_list.iter().cloned().collect();
            if participants.len() != participants_list.len() {
                return Err(malformed(format!("repeated participant in {}", item_id)));
            }
            sub_items.push(SubItem {
                label: raw_item.label.unwrap_or_else(|| item_id.clone()),
                count: non_negative(&id, "count", raw_item.count)?,
                participants,
                id: item_id,
            });
        }

        let entity = Entity {
            kind,
            title: raw.title.unwrap_or_default(),
            body: raw.body.unwrap_or_default(),
            author: raw.author.unwrap_or_default(),
            total_count,
            sub_items,
            created_at: raw.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH),
            id,
        };

        if !entity.is_consistent() {
            return Err(ValidationError::MalformedEntity {
                id: entity.id,
                reason: "counters disagree with participant sets".into(),
            });
        }
        Ok(entity)
    }
}

/// Converts a whole collection, failing on the first malformed record.
pub fn parse_collection(raw: Vec<RawEntity>) -> Result<Vec<Entity>, ValidationError> {
    raw.into_iter().map(Entity::try_from).collect()
}
