use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use shared::models::*;
use shared::{classify_participation, option_id};

use crate::error::ApiError;

pub struct EntityProcessor;

fn count(value: i32) -> Result<u32, ApiError> {
    u32::try_from(value).map_err(|_| ApiError::Internal(format!("negative counter: {}", value)))
}

fn entity_from_row(row: &PgRow) -> Result<Entity, ApiError> {
    Ok(Entity {
        id: row.try_get("id")?,
        kind: row.try_get("kind")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        author: row.try_get("author")?,
        total_count: count(row.try_get("total_count")?)?,
        sub_items: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

async fn insert_entity(
    tx: &mut Transaction<'_, Postgres>,
    entity: &Entity,
    user_fingerprint: &str,
) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO entities (id, kind, title, body, author, total_count, user_fingerprint, created_at)
         VALUES ($1, $2, $3, $4, $5, 0, $6, $7)",
    )
    .bind(&entity.id)
    .bind(entity.kind)
    .bind(&entity.title)
    .bind(&entity.body)
    .bind(&entity.author)
    .bind(user_fingerprint)
    .bind(entity.created_at)
    .execute(&mut **tx)
    .await?;

    for (position, item) in entity.sub_items.iter().enumerate() {
        sqlx::query("INSERT INTO sub_items (entity_id, id, label, position) VALUES ($1, $2, $3, $4)")
            .bind(&entity.id)
            .bind(&item.id)
            .bind(&item.label)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn new_entity(id: String, kind: EntityKind, title: &str, body: &str, author: &str, sub_items: Vec<SubItem>) -> Entity {
    Entity {
        id,
        kind,
        title: title.trim().to_string(),
        body: body.trim().to_string(),
        author: author.trim().to_string(),
        total_count: 0,
        sub_items,
        created_at: OffsetDateTime::now_utc(),
    }
}

impl EntityProcessor {
    /// Reads a whole collection as one consistent snapshot, newest first.
    pub async fn fetch_collection(pool: &PgPool, collection: Collection) -> Result<Vec<Entity>, ApiError> {
        let kind = collection.kind();
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query(
            "SELECT id, kind, title, body, author, total_count, created_at
             FROM entities WHERE kind = $1 ORDER BY created_at DESC",
        )
        .bind(kind)
        .fetch_all(&mut *tx)
        .await?;

        let mut order = Vec::with_capacity(rows.len());
        let mut entities = HashMap::with_capacity(rows.len());
        for row in &rows {
            let entity = entity_from_row(row)?;
            order.push(entity.id.clone());
            entities.insert(entity.id.clone(), entity);
        }

        let items = sqlx::query(
            "SELECT s.entity_id, s.id, s.label, s.count
             FROM sub_items s JOIN entities e ON e.id = s.entity_id
             WHERE e.kind = $1 ORDER BY s.entity_id, s.position",
        )
        .bind(kind)
        .fetch_all(&mut *tx)
        .await?;

        for row in items {
            let entity_id: String = row.try_get("entity_id")?;
            if let Some(entity) = entities.get_mut(&entity_id) {
                let mut item = SubItem::new(row.try_get::<String, _>("id")?, row.try_get::<String, _>("label")?);
                item.count = count(row.try_get("count")?)?;
                entity.sub_items.push(item);
            }
        }

        let members = sqlx::query(
            "SELECT p.entity_id, p.sub_item_id, p.participant_id
             FROM participants p JOIN entities e ON e.id = p.entity_id
             WHERE e.kind = $1",
        )
        .bind(kind)
        .fetch_all(&mut *tx)
        .await?;

        for row in members {
            let entity_id: String = row.try_get("entity_id")?;
            let sub_item_id: String = row.try_get("sub_item_id")?;
            let participant: String = row.try_get("participant_id")?;
            let item = entities.get_mut(&entity_id)
                .and_then(|entity| entity.sub_items.iter_mut().find(|item| item.id == sub_item_id));
            if let Some(item) = item {
                item.participants.insert(participant);
            }
        }
        tx.commit().await?;

        debug!(%collection, count = order.len(), "collection loaded");
        Ok(order.into_iter().filter_map(|id| entities.remove(&id)).collect())
    }

    pub async fn create_poll(
        pool: &PgPool,
        request: &CreatePollRequest,
        user_fingerprint: &str,
    ) -> Result<Entity, ApiError> {
        let options = request.options.iter()
            .enumerate()
            .map(|(index, label)| SubItem::new(option_id(index), label.trim()))
            .collect();
        let poll = new_entity(
            Uuid::new_v4().to_string(),
            EntityKind::Poll,
            &request.title,
            &request.description,
            &request.author,
            options,
        );

        let mut tx = pool.begin().await?;
        insert_entity(&mut tx, &poll, user_fingerprint).await?;
        tx.commit().await?;
        Ok(poll)
    }

    /// Creates a post together with the thread counting its comments.
    pub async fn create_post(
        pool: &PgPool,
        request: &CreatePostRequest,
        user_fingerprint: &str,
    ) -> Result<Entity, ApiError> {
        let post = new_entity(
            Uuid::new_v4().to_string(),
            EntityKind::Post,
            &request.title,
            &request.body,
            &request.author,
            vec![SubItem::new(LIKES_SUB_ITEM, "Likes")],
        );
        let thread = new_entity(
            comment_thread_id(&post.id),
            EntityKind::CommentThread,
            &request.title,
            "",
            &request.author,
            vec![SubItem::new(COMMENTS_SUB_ITEM, "Comments")],
        );

        let mut tx = pool.begin().await?;
        insert_entity(&mut tx, &post, user_fingerprint).await?;
        insert_entity(&mut tx, &thread, user_fingerprint).await?;
        tx.commit().await?;
        Ok(post)
    }

    /// Adds `participant_id` to the sub-item and bumps both counters in one
    /// transaction. Replays of an already counted participant change nothing.
    pub async fn apply_increment(
        pool: &PgPool,
        entity_id: &str,
        request: &IncrementRequest,
    ) -> Result<IncrementResponse, ApiError> {
        let mut tx = pool.begin().await?;

        let row = sqlx::query("SELECT kind, total_count FROM entities WHERE id = $1 FOR UPDATE")
            .bind(entity_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ApiError::NotFound)?;
        let kind: EntityKind = row.try_get("kind")?;
        let total_count = count(row.try_get("total_count")?)?;

        let known = sqlx::query("SELECT 1 FROM sub_items WHERE entity_id = $1 AND id = $2")
            .bind(entity_id)
            .bind(&request.sub_item_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !known {
            return Err(ApiError::UnknownSubItem(request.sub_item_id.clone()));
        }

        match (kind, &request.comment) {
            (EntityKind::CommentThread, None) => {
                return Err(ApiError::InvalidInput("A comment needs a body".into()));
            }
            (EntityKind::Poll | EntityKind::Post, Some(_)) => {
                return Err(ApiError::InvalidInput("Only comment threads accept comments".into()));
            }
            _ => {}
        }

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT sub_item_id FROM participants WHERE entity_id = $1 AND participant_id = $2",
        )
        .bind(entity_id)
        .bind(&request.participant_id)
        .fetch_optional(&mut *tx)
        .await?;

        match classify_participation(existing.as_deref(), &request.sub_item_id) {
            IncrementOutcome::Applied => {}
            IncrementOutcome::AlreadyCounted => {
                debug!(entity_id, "increment replayed, nothing to do");
                return Ok(IncrementResponse {
                    entity_id: entity_id.to_string(),
                    applied: false,
                    total_count,
                });
            }
            IncrementOutcome::Conflict => return Err(ApiError::AlreadyParticipated),
            IncrementOutcome::UnknownSubItem => {
                return Err(ApiError::UnknownSubItem(request.sub_item_id.clone()));
            }
        }

        let (comment_author, comment_body) = match &request.comment {
            Some(draft) => (Some(draft.author.trim()), Some(draft.body.trim())),
            None => (None, None),
        };
        sqlx::query(
            "INSERT INTO participants (entity_id, sub_item_id, participant_id, comment_author, comment_body)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entity_id)
        .bind(&request.sub_item_id)
        .bind(&request.participant_id)
        .bind(comment_author)
        .bind(comment_body)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE sub_items SET count = count + 1 WHERE entity_id = $1 AND id = $2")
            .bind(entity_id)
            .bind(&request.sub_item_id)
            .execute(&mut *tx)
            .await?;

        let total: i32 = sqlx::query_scalar(
            "UPDATE entities SET total_count = total_count + 1 WHERE id = $1 RETURNING total_count",
        )
        .bind(entity_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(IncrementResponse {
            entity_id: entity_id.to_string(),
            applied: true,
            total_count: count(total)?,
        })
    }

    pub async fn list_comments(pool: &PgPool, post_id: Uuid) -> Result<Vec<Comment>, ApiError> {
        let post_key = post_id.to_string();
        let thread_id = comment_thread_id(&post_key);

        let exists = sqlx::query("SELECT 1 FROM entities WHERE id = $1")
            .bind(&thread_id)
            .fetch_optional(pool)
            .await?
            .is_some();
        if !exists {
            return Err(ApiError::NotFound);
        }

        let rows = sqlx::query(
            "SELECT participant_id, comment_author, comment_body, created_at
             FROM participants
             WHERE entity_id = $1 AND comment_body IS NOT NULL
             ORDER BY created_at",
        )
        .bind(&thread_id)
        .fetch_all(pool)
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            let participant: String = row.try_get("participant_id")?;
            let Ok(id) = Uuid::parse_str(&participant) else {
                debug!(%participant, "skipping comment with a non-uuid id");
                continue;
            };
            comments.push(Comment {
                id,
                post_id: post_key.clone(),
                author: row.try_get::<Option<String>, _>("comment_author")?.unwrap_or_default(),
                body: row.try_get::<Option<String>, _>("comment_body")?.unwrap_or_default(),
                created_at: row.try_get("created_at")?,
            });
        }
        Ok(comments)
    }
}
