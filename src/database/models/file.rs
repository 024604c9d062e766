use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::UserSummary;

/// An uploaded file's metadata row. The bytes live with the external
/// object-storage collaborator; `url` doubles as the storage key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectFile {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_on: DateTime<Utc>,
}

/// File row joined with a summary of its uploader. `creator` is `None` for
/// files whose uploader account has since been deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWithCreator {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_on: DateTime<Utc>,
    pub creator: Option<UserSummary>,
}

/// Compact shape aggregated into project reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub url: String,
    pub created_on: DateTime<Utc>,
}

/// One offset window of a project's files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileWindow {
    pub offset: i64,
    pub total_count: i64,
    pub files: Vec<FileWithCreator>,
}
