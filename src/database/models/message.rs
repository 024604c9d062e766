use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
}

/// Message row joined with a summary of its creator, as served from the
/// windowed list endpoint (and cached verbatim). `creator` is `None` for
/// messages whose author account has since been deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWithCreator {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub creator: Option<UserSummary>,
}

/// Compact shape aggregated into project reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
}

/// One offset window of a project's messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWindow {
    pub offset: i64,
    pub total_count: i64,
    pub messages: Vec<MessageWithCreator>,
}
