use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use super::AppState;
use crate::database::models::Member;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::store::members::{self, MemberUpdate};
use crate::store::{self, projects, users, StoreError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub user_id: String,
    pub position: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    pub position: Option<String>,
    pub is_admin: Option<bool>,
}

/// Adding a member needs cross-entity pre-checks the store doesn't embed:
/// the actor must be an admin of the project, the target must exist and
/// must not already be a member.
pub async fn create_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(project_id): Path<String>,
    Json(req): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let user_id = store::parse_id(&req.user_id, "User")?;

    let actor = members::get_member(&state.pool, project_id, auth.user_id).await?;
    match actor {
        Some(m) if m.is_admin => {}
        Some(_) => return Err(StoreError::AccessDenied.into()),
        None => {
            if projects::project_exists(&state.pool, project_id).await? {
                return Err(StoreError::AccessDenied.into());
            }
            return Err(StoreError::NotFound("Project").into());
        }
    }

    if users::get_user_by_id(&state.pool, user_id).await?.is_none() {
        return Err(StoreError::NotFound("User").into());
    }
    if members::get_member(&state.pool, project_id, user_id)
        .await?
        .is_some()
    {
        return Err(StoreError::Conflict("User is already a member".to_string()).into());
    }

    let member = members::create_member(
        &state.pool,
        &state.cache,
        project_id,
        user_id,
        &req.position,
        req.is_admin,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((project_id, user_id)): Path<(String, String)>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<Json<Member>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let user_id = store::parse_id(&user_id, "Member")?;
    let member = members::update_member(
        &state.pool,
        &state.cache,
        project_id,
        user_id,
        auth.user_id,
        MemberUpdate {
            position: req.position,
            is_admin: req.is_admin,
        },
    )
    .await?;
    Ok(Json(member))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((project_id, user_id)): Path<(String, String)>,
) -> Result<Json<Member>, ApiError> {
    let project_id = store::parse_id(&project_id, "Project")?;
    let user_id = store::parse_id(&user_id, "Member")?;
    let member = members::delete_member_by_id(
        &state.pool,
        &state.cache,
        project_id,
        user_id,
        auth.user_id,
    )
    .await?;
    Ok(Json(member))
}
