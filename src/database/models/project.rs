use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::file::FileSummary;
use super::member::MemberSummary;
use super::message::MessageSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub creator_id: Uuid,
    pub created_on: DateTime<Utc>,
}

/// Project enriched for the accessing member: their own membership row plus
/// aggregated member/message/file summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub id: Uuid,
    pub name: String,
    pub creator_id: Uuid,
    pub created_on: DateTime<Utc>,
    pub position: String,
    pub is_admin: bool,
    pub members: Vec<MemberSummary>,
    pub messages: Vec<MessageSummary>,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPage {
    pub page: i64,
    pub total_count: i64,
    pub projects: Vec<ProjectDetails>,
}

/// Everything removed by a project deletion, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedProject {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<super::member::Member>,
    pub messages: Vec<super::message::Message>,
    pub files: Vec<super::file::ProjectFile>,
}
