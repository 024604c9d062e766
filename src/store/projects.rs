use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{zero_rows, StoreError, StoreResult, SEARCH_PAGE_SIZE};
use crate::cache::{keys, Cache};
use crate::database::models::{
    DeletedProject, FileSummary, Member, MemberSummary, Message, MessageSummary, Project,
    ProjectDetails, ProjectFile, ProjectPage,
};
use crate::database::query_builder::{bind_values_as, filter_fields, update_fragment, FieldValue};
use crate::validation;

/// Enriched project row: the accessor's own membership plus aggregated
/// member/message/file summaries, built in one statement.
const DETAIL_COLUMNS: &str = "
    p.id, p.name, p.creator_id, p.created_on,
    pm.position, pm.is_admin,
    COALESCE((
        SELECT json_agg(json_build_object(
            'id', u.id, 'username', u.username,
            'first_name', u.first_name, 'last_name', u.last_name,
            'position', m.position, 'is_admin', m.is_admin
        ) ORDER BY u.username)
        FROM project_members m JOIN users u ON u.id = m.user_id
        WHERE m.project_id = p.id
    ), '[]'::json) AS members,
    COALESCE((
        SELECT json_agg(json_build_object(
            'id', msg.id, 'creator_id', msg.creator_id,
            'text', msg.text, 'created_on', msg.created_on
        ) ORDER BY msg.created_on)
        FROM messages msg WHERE msg.project_id = p.id
    ), '[]'::json) AS messages,
    COALESCE((
        SELECT json_agg(json_build_object(
            'id', f.id, 'creator_id', f.creator_id, 'name', f.name,
            'url', f.url, 'created_on', f.created_on
        ) ORDER BY f.created_on)
        FROM files f WHERE f.project_id = p.id
    ), '[]'::json) AS files";

pub(crate) async fn project_exists(pool: &PgPool, id: Uuid) -> StoreResult<bool> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Insert the project and the creator's admin membership as one
/// transaction, so a project can never exist without an admin.
pub async fn create_project(
    pool: &PgPool,
    cache: &Cache,
    creator_id: Uuid,
    name: &str,
    position: &str,
) -> StoreResult<Project> {
    validation::project_base(name)?;
    validation::member_base(position)?;

    let mut tx = pool.begin().await?;
    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (creator_id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(creator_id)
    .bind(name)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query(
        "INSERT INTO project_members (project_id, user_id, position, is_admin)
         VALUES ($1, $2, $3, true)",
    )
    .bind(project.id)
    .bind(creator_id)
    .bind(position)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    cache
        .invalidate_prefix(&keys::user_projects_prefix(creator_id))
        .await;
    Ok(project)
}

/// Projects the accessor is a member of, optionally filtered by name,
/// paginated and enriched. Cache-backed per (accessor, page, query).
pub async fn get_projects(
    pool: &PgPool,
    cache: &Cache,
    accessor_id: Uuid,
    name_query: Option<&str>,
    page: i64,
) -> StoreResult<ProjectPage> {
    let page = page.max(1);
    let key = keys::user_projects(accessor_id, page, name_query);
    if let Some(cached) = cache.get_json::<ProjectPage>(&key).await {
        return Ok(cached);
    }

    let term = name_query
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", q));
    let offset = (page - 1) * SEARCH_PAGE_SIZE;

    let rows = sqlx::query(&format!(
        "SELECT {DETAIL_COLUMNS}
         FROM projects p
         JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $1
         WHERE ($2::text IS NULL OR p.name ILIKE $2)
         ORDER BY p.created_on DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(accessor_id)
    .bind(term.as_deref())
    .bind(SEARCH_PAGE_SIZE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in &rows {
        projects.push(details_from_row(row)?);
    }

    let total_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM projects p
         JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $1
         WHERE ($2::text IS NULL OR p.name ILIKE $2)",
    )
    .bind(accessor_id)
    .bind(term.as_deref())
    .fetch_one(pool)
    .await?;

    let result = ProjectPage {
        page,
        total_count,
        projects,
    };
    cache.put_json(&key, &result).await;
    Ok(result)
}

/// One enriched project, scoped to the accessor's membership. `None` when
/// the project doesn't exist or the accessor isn't a member of it.
pub async fn get_project_by_id(
    pool: &PgPool,
    project_id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<Option<ProjectDetails>> {
    let row = sqlx::query(&format!(
        "SELECT {DETAIL_COLUMNS}
         FROM projects p
         JOIN project_members pm ON pm.project_id = p.id AND pm.user_id = $1
         WHERE p.id = $2"
    ))
    .bind(accessor_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(details_from_row).transpose()
}

pub async fn update_project(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    accessor_id: Uuid,
    name: Option<&str>,
) -> StoreResult<ProjectDetails> {
    validation::project_updated(name)?;

    let fields = filter_fields(
        vec![(
            "name",
            name.map(|n| FieldValue::Text(n.to_string())),
        )],
        &["name"],
        &[],
    );
    let frag = update_fragment(fields, 3);

    let sql = format!(
        "UPDATE projects
         SET {}
         WHERE id = $1
           AND id = (
             SELECT project_id
             FROM project_members
             WHERE user_id = $2 AND is_admin = true AND project_id = $1
           )
         RETURNING *",
        frag.assignments
    );
    let q = sqlx::query_as::<_, Project>(&sql)
        .bind(project_id)
        .bind(accessor_id);
    if bind_values_as(q, &frag.values)
        .fetch_optional(pool)
        .await?
        .is_none()
    {
        return Err(zero_rows(project_exists(pool, project_id).await?, "Project"));
    }

    invalidate_for_members(pool, cache, project_id).await?;
    let details = get_project_by_id(pool, project_id, accessor_id)
        .await?
        .ok_or(StoreError::NotFound("Project"))?;
    Ok(details)
}

/// Admin-guarded cascade: the project row and all of its members, messages
/// and files go in one transaction, and everything removed is returned.
pub async fn delete_project(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<DeletedProject> {
    let mut tx = pool.begin().await?;

    // Lock the accessor's admin membership row for the duration of the
    // cascade. The member/message/file children reference the project row,
    // so they have to go first.
    let admin: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM project_members
         WHERE project_id = $1 AND user_id = $2 AND is_admin = true
         FOR UPDATE",
    )
    .bind(project_id)
    .bind(accessor_id)
    .fetch_optional(&mut *tx)
    .await?;

    if admin.is_none() {
        tx.rollback().await?;
        return Err(zero_rows(project_exists(pool, project_id).await?, "Project"));
    }

    let messages =
        sqlx::query_as::<_, Message>("DELETE FROM messages WHERE project_id = $1 RETURNING *")
            .bind(project_id)
            .fetch_all(&mut *tx)
            .await?;
    let files =
        sqlx::query_as::<_, ProjectFile>("DELETE FROM files WHERE project_id = $1 RETURNING *")
            .bind(project_id)
            .fetch_all(&mut *tx)
            .await?;
    let members = sqlx::query_as::<_, Member>(
        "DELETE FROM project_members WHERE project_id = $1 RETURNING *",
    )
    .bind(project_id)
    .fetch_all(&mut *tx)
    .await?;
    let project =
        sqlx::query_as::<_, Project>("DELETE FROM projects WHERE id = $1 RETURNING *")
            .bind(project_id)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;

    cache.invalidate_prefix(&keys::project_prefix(project_id)).await;
    for member in &members {
        cache
            .invalidate_prefix(&keys::user_projects_prefix(member.user_id))
            .await;
    }

    Ok(DeletedProject {
        project,
        members,
        messages,
        files,
    })
}

/// A write anywhere under a project changes what every member sees in
/// their project list, since the cached pages embed member/message/file
/// summaries.
pub(crate) async fn invalidate_for_members(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
) -> StoreResult<()> {
    let member_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT user_id FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(pool)
            .await?;
    for user_id in member_ids {
        cache
            .invalidate_prefix(&keys::user_projects_prefix(user_id))
            .await;
    }
    Ok(())
}

fn details_from_row(row: &PgRow) -> Result<ProjectDetails, StoreError> {
    let members: Vec<MemberSummary> = decode_json(row, "members")?;
    let messages: Vec<MessageSummary> = decode_json(row, "messages")?;
    let files: Vec<FileSummary> = decode_json(row, "files")?;

    Ok(ProjectDetails {
        id: row.try_get("id").map_err(StoreError::Database)?,
        name: row.try_get("name").map_err(StoreError::Database)?,
        creator_id: row.try_get("creator_id").map_err(StoreError::Database)?,
        created_on: row.try_get("created_on").map_err(StoreError::Database)?,
        position: row.try_get("position").map_err(StoreError::Database)?,
        is_admin: row.try_get("is_admin").map_err(StoreError::Database)?,
        members,
        messages,
        files,
    })
}

fn decode_json<T: serde::de::DeserializeOwned>(
    row: &PgRow,
    column: &str,
) -> Result<T, StoreError> {
    let value: serde_json::Value = row.try_get(column).map_err(StoreError::Database)?;
    serde_json::from_value(value)
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}
