use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::AppState;
use crate::database::models::{DeletedProject, Project, ProjectDetails, ProjectPage};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::store::{self, projects, StoreError};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    /// The creator's own role title on the new project.
    pub position: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectSearchQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = projects::create_project(
        &state.pool,
        &state.cache,
        auth.user_id,
        &req.name,
        &req.position,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ProjectSearchQuery>,
) -> Result<Json<ProjectPage>, ApiError> {
    let page = projects::get_projects(
        &state.pool,
        &state.cache,
        auth.user_id,
        params.name.as_deref(),
        params.page.unwrap_or(1),
    )
    .await?;
    Ok(Json(page))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectDetails>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let details = projects::get_project_by_id(&state.pool, project_id, auth.user_id)
        .await?
        .ok_or(StoreError::NotFound("Project"))?;
    Ok(Json(details))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectDetails>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let details = projects::update_project(
        &state.pool,
        &state.cache,
        project_id,
        auth.user_id,
        req.name.as_deref(),
    )
    .await?;
    Ok(Json(details))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<DeletedProject>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let deleted =
        projects::delete_project(&state.pool, &state.cache, project_id, auth.user_id).await?;

    // Release stored objects for every file row the cascade removed.
    for file in &deleted.files {
        if let Err(e) = state.storage.delete(&file.url).await {
            tracing::warn!("failed to delete stored object {}: {}", file.url, e);
        }
    }

    Ok(Json(deleted))
}
