use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, StoreResult, SEARCH_PAGE_SIZE};
use crate::cache::{keys, Cache};
use crate::config;
use crate::database::models::{SanitizedUser, User, UserPage};
use crate::database::query_builder::{
    bind_values_as, filter_fields, insert_fragment, update_fragment, FieldValue,
};
use crate::validation;

const USER_COLUMNS: &str = "id, username, first_name, last_name, created_on";
const ALLOWED_FIELDS: &[&str] = &["username", "first_name", "last_name", "password"];

/// Mutable user fields for [`update_user`]. Identifiers and the current
/// password are carried separately; they authorize the update but are not
/// part of it.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<SanitizedUser>> {
    let user = sqlx::query_as::<_, SanitizedUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Provider-linked accounts store an empty hash, which bcrypt refuses to
/// parse. Any unverifiable hash reads as a failed match, never an
/// internal error.
fn password_matches(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Internal-only variant carrying the password hash, used solely for
/// credential checks.
async fn get_user_with_password(pool: &PgPool, id: Uuid) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> StoreResult<Option<SanitizedUser>> {
    let user = sqlx::query_as::<_, SanitizedUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> StoreResult<SanitizedUser> {
    validation::user_base(username, password, first_name, last_name)?;

    if get_user_by_username(pool, username).await?.is_some() {
        return Err(StoreError::Conflict("User already exists".to_string()));
    }

    let hashed = bcrypt::hash(password, config::config().security.bcrypt_cost)?;
    let fields = filter_fields(
        vec![
            ("first_name", Some(FieldValue::Text(first_name.to_string()))),
            ("last_name", Some(FieldValue::Text(last_name.to_string()))),
        ],
        ALLOWED_FIELDS,
        &["username", "password"],
    );
    let frag = insert_fragment(fields, 3);

    let sql = format!(
        "INSERT INTO users (username, password, {}) VALUES ($1, $2, {}) RETURNING {USER_COLUMNS}",
        frag.columns, frag.placeholders
    );
    let q = sqlx::query_as::<_, SanitizedUser>(&sql)
        .bind(username)
        .bind(hashed);
    let user = bind_values_as(q, &frag.values).fetch_one(pool).await?;
    Ok(user)
}

/// Create-or-update keyed by unique username, for identity providers that
/// perform their own authentication. Race-free via the uniqueness
/// constraint.
pub async fn upsert_user(
    pool: &PgPool,
    username: &str,
    first_name: &str,
    last_name: &str,
) -> StoreResult<SanitizedUser> {
    validation::user_link(username, first_name, last_name)?;

    let user = sqlx::query_as::<_, SanitizedUser>(&format!(
        "INSERT INTO users (username, password, first_name, last_name)
         VALUES ($1, '', $2, $3)
         ON CONFLICT (username) DO UPDATE
         SET first_name = EXCLUDED.first_name, last_name = EXCLUDED.last_name
         RETURNING {USER_COLUMNS}"
    ))
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn update_user(
    pool: &PgPool,
    id: Uuid,
    current_password: &str,
    update: UserUpdate,
) -> StoreResult<SanitizedUser> {
    validation::user_updated(
        update.username.as_deref(),
        update.first_name.as_deref(),
        update.last_name.as_deref(),
        update.password.as_deref(),
    )?;

    let user = get_user_with_password(pool, id)
        .await?
        .ok_or(StoreError::NotFound("User"))?;
    if !password_matches(current_password, &user.password) {
        return Err(StoreError::IncorrectPassword);
    }

    if let Some(new_username) = update.username.as_deref() {
        if new_username != user.username
            && get_user_by_username(pool, new_username).await?.is_some()
        {
            return Err(StoreError::Conflict("Username already taken".to_string()));
        }
    }

    let hashed = match update.password.as_deref() {
        Some(p) => Some(bcrypt::hash(p, config::config().security.bcrypt_cost)?),
        None => None,
    };
    let fields = filter_fields(
        vec![
            ("username", update.username.map(FieldValue::Text)),
            ("first_name", update.first_name.map(FieldValue::Text)),
            ("last_name", update.last_name.map(FieldValue::Text)),
            ("password", hashed.map(FieldValue::Text)),
        ],
        ALLOWED_FIELDS,
        &[],
    );
    let frag = update_fragment(fields, 2);

    let sql = format!(
        "UPDATE users SET {} WHERE id = $1 RETURNING {USER_COLUMNS}",
        frag.assignments
    );
    let q = sqlx::query_as::<_, SanitizedUser>(&sql).bind(id);
    let updated = bind_values_as(q, &frag.values).fetch_one(pool).await?;
    Ok(updated)
}

/// Remove the user and their membership rows in one transaction, after
/// re-verifying credentials. Authored messages and files keep their
/// creator id; reassignment is an open product question.
pub async fn delete_user(
    pool: &PgPool,
    cache: &Cache,
    id: Uuid,
    current_password: &str,
) -> StoreResult<SanitizedUser> {
    let user = get_user_with_password(pool, id)
        .await?
        .ok_or(StoreError::NotFound("User"))?;
    if !password_matches(current_password, &user.password) {
        return Err(StoreError::IncorrectPassword);
    }

    let mut tx = pool.begin().await?;
    let project_ids: Vec<Uuid> = sqlx::query_scalar(
        "DELETE FROM project_members WHERE user_id = $1 RETURNING project_id",
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;
    let deleted = sqlx::query_as::<_, SanitizedUser>(&format!(
        "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    cache
        .invalidate_prefix(&keys::user_projects_prefix(id))
        .await;
    // The departed user's roster entry is embedded in the remaining
    // members' cached pages and in the addable-users searches.
    for project_id in project_ids {
        cache
            .invalidate_prefix(&keys::project_users_prefix(project_id))
            .await;
        super::projects::invalidate_for_members(pool, cache, project_id).await?;
    }
    Ok(deleted)
}

/// Users addable to a project: not already a member, not the requester,
/// optionally filtered by a case-insensitive partial match on username or
/// name. Cache-backed per (project, requester, page, query).
pub async fn search_users(
    pool: &PgPool,
    cache: &Cache,
    project_id: Uuid,
    requester_id: Uuid,
    query: Option<&str>,
    page: i64,
) -> StoreResult<UserPage> {
    let page = page.max(1);
    let key = keys::project_users(project_id, requester_id, page, query);
    if let Some(cached) = cache.get_json::<UserPage>(&key).await {
        return Ok(cached);
    }

    let term = query
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", q));
    let offset = (page - 1) * SEARCH_PAGE_SIZE;

    let users = sqlx::query_as::<_, SanitizedUser>(&format!(
        "SELECT {USER_COLUMNS}
         FROM users
         WHERE id <> $2
           AND id NOT IN (SELECT user_id FROM project_members WHERE project_id = $1)
           AND ($3::text IS NULL
                OR username ILIKE $3
                OR first_name ILIKE $3
                OR last_name ILIKE $3)
         ORDER BY username
         LIMIT $4 OFFSET $5"
    ))
    .bind(project_id)
    .bind(requester_id)
    .bind(term.as_deref())
    .bind(SEARCH_PAGE_SIZE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)
         FROM users
         WHERE id <> $2
           AND id NOT IN (SELECT user_id FROM project_members WHERE project_id = $1)
           AND ($3::text IS NULL
                OR username ILIKE $3
                OR first_name ILIKE $3
                OR last_name ILIKE $3)",
    )
    .bind(project_id)
    .bind(requester_id)
    .bind(term.as_deref())
    .fetch_one(pool)
    .await?;

    let result = UserPage {
        page,
        total_count,
        users,
    };
    cache.put_json(&key, &result).await;
    Ok(result)
}

/// Password check for login. Resolves to the sanitized user on success; an
/// unknown username reads the same as a wrong password.
pub async fn verify_credentials(
    pool: &PgPool,
    username: &str,
    password: &str,
) -> StoreResult<SanitizedUser> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::IncorrectPassword)?;
    if !password_matches(password, &user.password) {
        return Err(StoreError::IncorrectPassword);
    }
    Ok(user.into())
}
