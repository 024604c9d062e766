use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Full user row including the password hash. Never serialized; only the
/// credential-check paths in the store read this shape.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub created_on: DateTime<Utc>,
}

/// Caller-visible user shape. Everything returned from the store uses this.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SanitizedUser {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_on: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            created_on: user.created_on,
        }
    }
}

/// Compact creator/uploader shape joined onto messages and files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// One page of a user search: users addable to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPage {
    pub page: i64,
    pub total_count: i64,
    pub users: Vec<SanitizedUser>,
}
