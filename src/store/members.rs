use sqlx::PgPool;
use uuid::Uuid;

use super::projects::project_exists;
use super::{zero_rows, StoreError, StoreResult};
use crate::cache::{keys, Cache};
use crate::database::models::Member;
use crate::database::query_builder::{
    bind_values_as, filter_fields, insert_fragment, update_fragment, FieldValue,
};
use crate::validation;

const ALLOWED_FIELDS: &[&str] = &["position", "is_admin"];

#[derive(Debug, Default, Clone)]
pub struct MemberUpdate {
    pub position: Option<String>,
    pub is_admin: Option<bool>,
}

/// Direct membership lookup. No authorization: this is the primitive the
/// other modules' access checks are built from.
pub async fn get_member(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> StoreResult<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(
        "SELECT project_id, user_id, position, is_admin
         FROM project_members
         WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(member)
}

/// No authorization at this layer: the controller pre-checks that the actor
/// is an admin and the target is not already a member, using lookups this
/// layer doesn't duplicate.
pub async fn create_member(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    user_id: Uuid,
    position: &str,
    is_admin: bool,
) -> StoreResult<Member> {
    validation::member_base(position)?;

    let fields = filter_fields(
        vec![
            ("position", Some(FieldValue::Text(position.to_string()))),
            ("is_admin", Some(FieldValue::Bool(is_admin))),
        ],
        ALLOWED_FIELDS,
        &[],
    );
    let frag = insert_fragment(fields, 3);

    let sql = format!(
        "INSERT INTO project_members (project_id, user_id, {}) VALUES ($1, $2, {}) RETURNING *",
        frag.columns, frag.placeholders
    );
    let q = sqlx::query_as::<_, Member>(&sql)
        .bind(project_id)
        .bind(user_id);
    let member = bind_values_as(q, &frag.values).fetch_one(pool).await?;

    invalidate_membership(pool, cache, project_id, user_id).await?;
    Ok(member)
}

pub async fn update_member(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    user_id: Uuid,
    accessor_id: Uuid,
    update: MemberUpdate,
) -> StoreResult<Member> {
    validation::member_updated(update.position.as_deref(), update.is_admin)?;

    let fields = filter_fields(
        vec![
            ("position", update.position.map(FieldValue::Text)),
            ("is_admin", update.is_admin.map(FieldValue::Bool)),
        ],
        ALLOWED_FIELDS,
        &[],
    );
    let frag = update_fragment(fields, 4);

    let sql = format!(
        "UPDATE project_members
         SET {}
         WHERE project_id = $1
           AND user_id = $2
           AND project_id = (
             SELECT project_id
             FROM project_members
             WHERE project_id = $1 AND user_id = $3 AND is_admin = true
           )
         RETURNING *",
        frag.assignments
    );
    let q = sqlx::query_as::<_, Member>(&sql)
        .bind(project_id)
        .bind(user_id)
        .bind(accessor_id);
    let updated = bind_values_as(q, &frag.values).fetch_optional(pool).await?;

    match updated {
        Some(member) => {
            invalidate_membership(pool, cache, project_id, user_id).await?;
            Ok(member)
        }
        None => Err(missing_member_cause(pool, project_id, user_id).await?),
    }
}

pub async fn delete_member_by_id(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    member_id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<Member> {
    let deleted = sqlx::query_as::<_, Member>(
        "DELETE FROM project_members
         WHERE user_id = $1
           AND project_id = $2
           AND project_id = (
             SELECT project_id
             FROM project_members
             WHERE project_id = $2 AND user_id = $3 AND is_admin = true
           )
         RETURNING *",
    )
    .bind(member_id)
    .bind(project_id)
    .bind(accessor_id)
    .fetch_optional(pool)
    .await?;

    match deleted {
        Some(member) => {
            invalidate_membership(pool, cache, project_id, member_id).await?;
            Ok(member)
        }
        None => Err(missing_member_cause(pool, project_id, member_id).await?),
    }
}

pub async fn delete_members_by_project_id(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    accessor_id: Uuid,
) -> StoreResult<Vec<Member>> {
    let deleted = sqlx::query_as::<_, Member>(
        "DELETE FROM project_members
         WHERE project_id = $1
           AND project_id = (
             SELECT project_id
             FROM project_members
             WHERE project_id = $1 AND user_id = $2 AND is_admin = true
           )
         RETURNING *",
    )
    .bind(project_id)
    .bind(accessor_id)
    .fetch_all(pool)
    .await?;

    if deleted.is_empty() {
        // A project always carries at least one admin member, so zero rows
        // means either the project is gone or the accessor isn't an admin.
        return Err(zero_rows(project_exists(pool, project_id).await?, "Project"));
    }
    for member in &deleted {
        invalidate_membership(pool, cache, project_id, member.user_id).await?;
    }
    Ok(deleted)
}

/// Zero rows from a guarded member mutation: walk outward to name the cause.
async fn missing_member_cause(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> StoreResult<StoreError> {
    if !project_exists(pool, project_id).await? {
        return Ok(StoreError::NotFound("Project"));
    }
    if get_member(pool, project_id, user_id).await?.is_none() {
        return Ok(StoreError::NotFound("Member"));
    }
    Ok(StoreError::AccessDenied)
}

/// Membership changes affect which projects the affected user sees, which
/// users are addable to the project, and the roster embedded in every
/// remaining member's cached project pages. The affected user is handled
/// explicitly since on a removal they no longer appear in the member list.
async fn invalidate_membership(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    user_id: Uuid,
) -> StoreResult<()> {
    cache
        .invalidate_prefix(&keys::user_projects_prefix(user_id))
        .await;
    cache
        .invalidate_prefix(&keys::project_users_prefix(project_id))
        .await;
    super::projects::invalidate_for_members(pool, cache, project_id).await
}
