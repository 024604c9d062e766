use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{zero_rows, StoreError, StoreResult, MESSAGES_LIMIT};
use crate::cache::{expected_window, keys, Cache};
use crate::database::models::{Message, MessageWindow, MessageWithCreator, UserSummary};
use crate::database::query_builder::{
    bind_values_as, filter_fields, insert_fragment, FieldValue,
};
use crate::validation;

const ALLOWED_FIELDS: &[&str] = &["text"];

pub async fn get_message_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<Message>> {
    let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(message)
}

/// One window of a project's messages with creator summaries, oldest first.
/// Served from the cache when the window is fully populated there; a partial
/// window falls through to the store and repopulates it.
pub async fn get_messages_by_project_id(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    offset: i64,
) -> StoreResult<MessageWindow> {
    let offset = offset.max(0);
    let window_key = keys::project_messages(project_id);
    let count_key = keys::project_messages_count(project_id);

    if let Some(total) = cache.get_count(&count_key).await {
        if let Some(cached) = cache
            .window_get::<MessageWithCreator>(&window_key, offset, MESSAGES_LIMIT)
            .await
        {
            if cached.len() as i64 == expected_window(total, offset, MESSAGES_LIMIT) {
                return Ok(MessageWindow {
                    offset,
                    total_count: total,
                    messages: cached,
                });
            }
        }
    }

    let rows = sqlx::query(
        "SELECT m.id, m.project_id, m.creator_id, m.text, m.created_on,
                u.id AS u_id, u.username, u.first_name, u.last_name
         FROM messages m
         LEFT JOIN users u ON u.id = m.creator_id
         WHERE m.project_id = $1
         ORDER BY m.created_on
         OFFSET $2 LIMIT $3",
    )
    .bind(project_id)
    .bind(offset)
    .bind(MESSAGES_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in &rows {
        messages.push(message_from_row(row)?);
    }

    let total_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await?;

    cache.window_put(&window_key, offset, &messages).await;
    cache.put_count(&count_key, total_count).await;

    Ok(MessageWindow {
        offset,
        total_count,
        messages,
    })
}

/// Membership of the creator is the controller's pre-check; this layer only
/// validates and inserts.
pub async fn create_message(
    pool: &PgPool,
    cache: &Cache,
    creator_id: Uuid,
    project_id: Uuid,
    text: &str,
) -> StoreResult<Message> {
    validation::message_base(text)?;

    let fields = filter_fields(
        vec![("text", Some(FieldValue::Text(text.to_string())))],
        ALLOWED_FIELDS,
        &[],
    );
    let frag = insert_fragment(fields, 3);

    let sql = format!(
        "INSERT INTO messages (project_id, creator_id, {}) VALUES ($1, $2, {}) RETURNING *",
        frag.columns, frag.placeholders
    );
    let q = sqlx::query_as::<_, Message>(&sql)
        .bind(project_id)
        .bind(creator_id);
    let message = bind_values_as(q, &frag.values).fetch_one(pool).await?;

    invalidate_messages(pool, cache, project_id).await?;
    Ok(message)
}

/// Deletable by the message's creator or any admin of its project.
pub async fn delete_message_by_id(
    pool: &PgPool,
    cache: &Cache,
    id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<Message> {
    let deleted = sqlx::query_as::<_, Message>(
        "DELETE FROM messages
         WHERE id = $1
           AND (
             creator_id = $2
             OR project_id IN (
               SELECT project_id FROM project_members
               WHERE user_id = $2 AND is_admin = true
             )
           )
         RETURNING *",
    )
    .bind(id)
    .bind(accessor_id)
    .fetch_optional(pool)
    .await?;

    match deleted {
        Some(message) => {
            invalidate_messages(pool, cache, message.project_id).await?;
            Ok(message)
        }
        None => {
            let exists = get_message_by_id(pool, id).await?.is_some();
            Err(zero_rows(exists, "Message"))
        }
    }
}

/// Admin-only bulk delete. Zero rows with messages still present means the
/// predicate failed, not that there was nothing to delete.
pub async fn delete_messages_by_project_id(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<Vec<Message>> {
    let deleted = sqlx::query_as::<_, Message>(
        "DELETE FROM messages
         WHERE project_id = $1
           AND project_id IN (
             SELECT project_id FROM project_members
             WHERE user_id = $2 AND is_admin = true
           )
         RETURNING *",
    )
    .bind(project_id)
    .bind(accessor_id)
    .fetch_all(pool)
    .await?;

    if deleted.is_empty() {
        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(pool)
                .await?;
        if remaining > 0 {
            return Err(StoreError::AccessDenied);
        }
        return Ok(vec![]);
    }

    invalidate_messages(pool, cache, project_id).await?;
    Ok(deleted)
}

/// Message writes stale both the window keys and every member's cached
/// project pages, which embed message summaries.
async fn invalidate_messages(pool: &PgPool, cache: &Cache, project_id: Uuid) -> StoreResult<()> {
    cache
        .invalidate(&[
            keys::project_messages(project_id),
            keys::project_messages_count(project_id),
        ])
        .await;
    super::projects::invalidate_for_members(pool, cache, project_id).await
}

fn message_from_row(row: &PgRow) -> Result<MessageWithCreator, StoreError> {
    let creator_user_id: Option<Uuid> = row.try_get("u_id").map_err(StoreError::Database)?;
    let creator = match creator_user_id {
        Some(id) => Some(UserSummary {
            id,
            username: row.try_get("username").map_err(StoreError::Database)?,
            first_name: row.try_get("first_name").map_err(StoreError::Database)?,
            last_name: row.try_get("last_name").map_err(StoreError::Database)?,
        }),
        None => None,
    };

    Ok(MessageWithCreator {
        id: row.try_get("id").map_err(StoreError::Database)?,
        project_id: row.try_get("project_id").map_err(StoreError::Database)?,
        creator_id: row.try_get("creator_id").map_err(StoreError::Database)?,
        text: row.try_get("text").map_err(StoreError::Database)?,
        created_on: row.try_get("created_on").map_err(StoreError::Database)?,
        creator,
    })
}
