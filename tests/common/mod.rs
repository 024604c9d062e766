#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use filmnexus::cache::{Cache, MemoryBackend};
use filmnexus::database::models::{Project, SanitizedUser};
use filmnexus::store::{projects, users};

pub const PASSWORD: &str = "secret123";

/// Connects to the database named by DATABASE_URL and applies the schema.
/// `None` (and thus a silent skip in each test) when the variable is unset
/// or the database is unreachable.
pub async fn try_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(pool)
}

/// Memory-backed cache, one per test so entries never leak across tests.
pub fn cache() -> Cache {
    Cache::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60))
}

/// Random valid username, unique per call.
pub fn username(prefix: &str) -> String {
    let tail = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &tail[..12])
}

pub async fn signup(pool: &PgPool, prefix: &str) -> Result<SanitizedUser> {
    let name = username(prefix);
    Ok(users::create_user(pool, &name, PASSWORD, "Test", "User").await?)
}

pub async fn make_project(pool: &PgPool, creator: &SanitizedUser, name: &str) -> Result<Project> {
    Ok(projects::create_project(pool, &cache(), creator.id, name, "Director").await?)
}
