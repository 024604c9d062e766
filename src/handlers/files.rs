use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::messages::require_membership;
use super::AppState;
use crate::database::models::{FileWindow, ProjectFile};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::store::files::{self, FileUpdate};
use crate::store;

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFileRequest {
    pub name: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub offset: Option<i64>,
}

pub async fn get_files(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<FileWindow>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    require_membership(&state, project_id, auth.user_id).await?;
    let window = files::get_files_by_project_id(
        &state.pool,
        &state.cache,
        project_id,
        params.offset.unwrap_or(0),
    )
    .await?;
    Ok(Json(window))
}

pub async fn create_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(req): Json<CreateFileRequest>,
) -> Result<(StatusCode, Json<ProjectFile>), ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    require_membership(&state, project_id, auth.user_id).await?;
    let file = files::create_file(
        &state.pool,
        &state.cache,
        auth.user_id,
        project_id,
        &req.name,
        &req.url,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

pub async fn update_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((_project_id, file_id)): Path<(String, String)>,
    Json(req): Json<UpdateFileRequest>,
) -> Result<Json<ProjectFile>, ApiError> {
    let file_id = store::parse_id(&file_id, "File")?;
    let file = files::update_file(
        &state.pool,
        &state.cache,
        file_id,
        auth.user_id,
        FileUpdate {
            name: req.name,
            url: req.url,
        },
    )
    .await?;
    Ok(Json(file))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((_project_id, file_id)): Path<(String, String)>,
) -> Result<Json<ProjectFile>, ApiError> {
    let file_id = store::parse_id(&file_id, "File")?;
    let file =
        files::delete_file_by_id(&state.pool, &state.cache, file_id, auth.user_id).await?;

    if let Err(e) = state.storage.delete(&file.url).await {
        tracing::warn!("failed to delete stored object {}: {}", file.url, e);
    }

    Ok(Json(file))
}

pub async fn delete_files(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<ProjectFile>>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let deleted =
        files::delete_files_by_project_id(&state.pool, &state.cache, project_id, auth.user_id)
            .await?;

    for file in &deleted {
        if let Err(e) = state.storage.delete(&file.url).await {
            tracing::warn!("failed to delete stored object {}: {}", file.url, e);
        }
    }

    Ok(Json(deleted))
}
