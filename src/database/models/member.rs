use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's role-bearing association with one project. Composite identity
/// (project_id, user_id); at most one row per pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub position: String,
    pub is_admin: bool,
}

/// Membership row joined with the member's user fields, aggregated into
/// project reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub is_admin: bool,
}
