//! HTTP controllers. Thin by design: parse the request, run the access
//! pre-checks that need cross-entity lookups, delegate to the store, map
//! the result.

pub mod auth;
pub mod files;
pub mod members;
pub mod messages;
pub mod projects;
pub mod users;

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::Cache;
use crate::storage::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: Cache,
    pub storage: Arc<dyn FileStorage>,
}
