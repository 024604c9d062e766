use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{zero_rows, StoreError, StoreResult, FILES_LIMIT};
use crate::cache::{expected_window, keys, Cache};
use crate::database::models::{FileWindow, FileWithCreator, ProjectFile, UserSummary};
use crate::database::query_builder::{
    bind_values_as, filter_fields, insert_fragment, update_fragment, FieldValue,
};
use crate::validation;

const ALLOWED_FIELDS: &[&str] = &["name", "url"];

#[derive(Debug, Default, Clone)]
pub struct FileUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
}

pub async fn get_file_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<ProjectFile>> {
    let file = sqlx::query_as::<_, ProjectFile>("SELECT * FROM files WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(file)
}

/// One window of a project's files with uploader summaries, oldest first.
/// Same cache discipline as the message window.
pub async fn get_files_by_project_id(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    offset: i64,
) -> StoreResult<FileWindow> {
    let offset = offset.max(0);
    let window_key = keys::project_files(project_id);
    let count_key = keys::project_files_count(project_id);

    if let Some(total) = cache.get_count(&count_key).await {
        if let Some(cached) = cache
            .window_get::<FileWithCreator>(&window_key, offset, FILES_LIMIT)
            .await
        {
            if cached.len() as i64 == expected_window(total, offset, FILES_LIMIT) {
                return Ok(FileWindow {
                    offset,
                    total_count: total,
                    files: cached,
                });
            }
        }
    }

    let rows = sqlx::query(
        "SELECT f.id, f.project_id, f.creator_id, f.name, f.url, f.created_on,
                u.id AS u_id, u.username, u.first_name, u.last_name
         FROM files f
         LEFT JOIN users u ON u.id = f.creator_id
         WHERE f.project_id = $1
         ORDER BY f.created_on
         OFFSET $2 LIMIT $3",
    )
    .bind(project_id)
    .bind(offset)
    .bind(FILES_LIMIT)
    .fetch_all(pool)
    .await?;

    let mut files = Vec::with_capacity(rows.len());
    for row in &rows {
        files.push(file_from_row(row)?);
    }

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(pool)
        .await?;

    cache.window_put(&window_key, offset, &files).await;
    cache.put_count(&count_key, total_count).await;

    Ok(FileWindow {
        offset,
        total_count,
        files,
    })
}

/// Membership of the uploader is the controller's pre-check.
pub async fn create_file(
    pool: &PgPool,
    cache: &Cache,
    creator_id: Uuid,
    project_id: Uuid,
    name: &str,
    url: &str,
) -> StoreResult<ProjectFile> {
    validation::file_base(name, url)?;

    let fields = filter_fields(
        vec![
            ("name", Some(FieldValue::Text(name.to_string()))),
            ("url", Some(FieldValue::Text(url.to_string()))),
        ],
        ALLOWED_FIELDS,
        &[],
    );
    let frag = insert_fragment(fields, 3);

    let sql = format!(
        "INSERT INTO files (project_id, creator_id, {}) VALUES ($1, $2, {}) RETURNING *",
        frag.columns, frag.placeholders
    );
    let q = sqlx::query_as::<_, ProjectFile>(&sql)
        .bind(project_id)
        .bind(creator_id);
    let file = bind_values_as(q, &frag.values).fetch_one(pool).await?;

    invalidate_files(pool, cache, project_id).await?;
    Ok(file)
}

/// Updatable by the file's uploader or any admin of its project.
pub async fn update_file(
    pool: &PgPool,
    cache: &Cache,
    id: Uuid,
    accessor_id: Uuid,
    update: FileUpdate,
) -> StoreResult<ProjectFile> {
    validation::file_updated(update.name.as_deref(), update.url.as_deref())?;

    let fields = filter_fields(
        vec![
            ("name", update.name.map(FieldValue::Text)),
            ("url", update.url.map(FieldValue::Text)),
        ],
        ALLOWED_FIELDS,
        &[],
    );
    let frag = update_fragment(fields, 3);

    let sql = format!(
        "UPDATE files
         SET {}
         WHERE id = $1
           AND (
             creator_id = $2
             OR project_id IN (
               SELECT project_id FROM project_members
               WHERE user_id = $2 AND is_admin = true
             )
           )
         RETURNING *",
        frag.assignments
    );
    let q = sqlx::query_as::<_, ProjectFile>(&sql).bind(id).bind(accessor_id);
    let updated = bind_values_as(q, &frag.values).fetch_optional(pool).await?;

    match updated {
        Some(file) => {
            invalidate_files(pool, cache, file.project_id).await?;
            Ok(file)
        }
        None => {
            let exists = get_file_by_id(pool, id).await?.is_some();
            Err(zero_rows(exists, "File"))
        }
    }
}

/// Deletable by the file's uploader or any admin of its project. The caller
/// hands the returned row's `url` to the object-storage collaborator.
pub async fn delete_file_by_id(
    pool: &PgPool,
    cache: &Cache,
    id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<ProjectFile> {
    let deleted = sqlx::query_as::<_, ProjectFile>(
        "DELETE FROM files
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
        Some(file) => {
            invalidate_files(pool, cache, file.project_id).await?;
            Ok(file)
        }
        None => {
            let exists = get_file_by_id(pool, id).await?.is_some();
            Err(zero_rows(exists, "File"))
        }
    }
}

/// Admin-only bulk delete, mirroring the message variant.
pub async fn delete_files_by_project_id(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<Vec<ProjectFile>> {
    let deleted = sqlx::query_as::<_, ProjectFile>(
        "DELETE FROM files
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
            sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(pool)
                .await?;
        if remaining > 0 {
            return Err(StoreError::AccessDenied);
        }
        return Ok(vec![]);
    }

    invalidate_files(pool, cache, project_id).await?;
    Ok(deleted)
}

/// File writes stale both the window keys and every member's cached
/// project pages, which embed file summaries.
async fn invalidate_files(pool: &PgPool, cache: &Cache, project_id: Uuid) -> StoreResult<()> {
    cache
        .invalidate(&[
            keys::project_files(project_id),
            keys::project_files_count(project_id),
        ])
        .await;
    super::projects::invalidate_for_members(pool, cache, project_id).await
}

fn file_from_row(row: &PgRow) -> Result<FileWithCreator, StoreError> {
    let uploader_id: Option<Uuid> = row.try_get("u_id").map_err(StoreError::Database)?;
    let creator = match uploader_id {
        Some(id) => Some(UserSummary {
            id,
            username: row.try_get("username").map_err(StoreError::Database)?,
            first_name: row.try_get("first_name").map_err(StoreError::Database)?,
            last_name: row.try_get("last_name").map_err(StoreError::Database)?,
        }),
        None => None,
    };

    Ok(FileWithCreator {
        id: row.try_get("id").map_err(StoreError::Database)?,
        project_id: row.try_get("project_id").map_err(StoreError::Database)?,
        creator_id: row.try_get("creator_id").map_err(StoreError::Database)?,
        name: row.try_get("name").map_err(StoreError::Database)?,
        url: row.try_get("url").map_err(StoreError::Database)?,
        created_on: row.try_get("created_on").map_err(StoreError::Database)?,
        creator,
    })
}
