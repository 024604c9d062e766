use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::AppState;
use crate::database::models::{SanitizedUser, UserPage};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::store::users::{self, UserUpdate};
use crate::store::{self, StoreError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub current_password: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    pub current_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub query: Option<String>,
    pub page: Option<i64>,
}

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<SanitizedUser>, ApiError> {
    let user = users::get_user_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(StoreError::NotFound("User"))?;
    Ok(Json(user))
}

pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<SanitizedUser>, ApiError> {
    let updated = users::update_user(
        &state.pool,
        auth.user_id,
        &req.current_password,
        UserUpdate {
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password: req.password,
        },
    )
    .await?;
    Ok(Json(updated))
}

pub async fn delete_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DeleteUserRequest>,
) -> Result<Json<SanitizedUser>, ApiError> {
    let deleted =
        users::delete_user(&state.pool, &state.cache, auth.user_id, &req.current_password).await?;
    Ok(Json(deleted))
}

/// Users addable to a project, for the member-invite picker.
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(params): Query<UserSearchQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let page = users::search_users(
        &state.pool,
        &state.cache,
        project_id,
        auth.user_id,
        params.query.as_deref(),
        params.page.unwrap_or(1),
    )
    .await?;
    Ok(Json(page))
}
