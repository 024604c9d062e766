use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::AppState;
use crate::database::models::{Message, MessageWindow};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::store::{self, members, messages, projects, StoreError};

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub offset: Option<i64>,
}

/// Posting and reading both require membership; the pre-check also
/// distinguishes a missing project from a non-member caller.
pub(super) async fn require_membership(
    state: &AppState,
    project_id: uuid::Uuid,
    user_id: uuid::Uuid,
) -> Result<(), ApiError> {
    if members::get_member(&state.pool, project_id, user_id)
        .await?
        .is_some()
    {
        return Ok(());
    }
    if projects::project_exists(&state.pool, project_id).await? {
        Err(StoreError::AccessDenied.into())
    } else {
        Err(StoreError::NotFound("Project").into())
    }
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<MessageWindow>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    require_membership(&state, project_id, auth.user_id).await?;
    let window = messages::get_messages_by_project_id(
        &state.pool,
        &state.cache,
        project_id,
        params.offset.unwrap_or(0),
    )
    .await?;
    Ok(Json(window))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    require_membership(&state, project_id, auth.user_id).await?;
    let message = messages::create_message(
        &state.pool,
        &state.cache,
        auth.user_id,
        project_id,
        &req.text,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((_project_id, message_id)): Path<(String, String)>,
) -> Result<Json<Message>, ApiError> {
    let message_id = store::parse_id(&message_id, "Message")?;
    let message =
        messages::delete_message_by_id(&state.pool, &state.cache, message_id, auth.user_id)
            .await?;
    Ok(Json(message))
}

pub async fn delete_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let deleted =
        messages::delete_messages_by_project_id(&state.pool, &state.cache, project_id, auth.user_id)
            .await?;
    Ok(Json(deleted))
}
