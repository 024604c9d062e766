//! Entity data access.
//!
//! Each entity module owns its CRUD operations and authorization
//! predicates. Authorization for mutations is embedded in the statement's
//! WHERE clause; when a guarded statement affects zero rows a follow-up
//! lookup of the target by id alone distinguishes "not found" from "access
//! denied" (see [`zero_rows`]). Validation runs before any query executes.

pub mod files;
pub mod members;
pub mod messages;
pub mod projects;
pub mod users;

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Fixed page size for user and project searches.
pub const SEARCH_PAGE_SIZE: i64 = 10;
/// Window size for message and file list reads.
pub const MESSAGES_LIMIT: i64 = 15;
pub const FILES_LIMIT: i64 = 15;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Access denied")]
    AccessDenied,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(sqlx::Error),

    #[error("Password hashing failed")]
    Hash(#[from] bcrypt::BcryptError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-key violations become conflicts the HTTP layer can name;
        // the pre-checks are kept for their friendlier ordering but the
        // constraint is what actually closes the race.
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                return match db.constraint() {
                    Some("users_username_key") => {
                        StoreError::Conflict("User already exists".to_string())
                    }
                    Some("project_members_pkey") => {
                        StoreError::Conflict("User is already a member".to_string())
                    }
                    _ => StoreError::Conflict("Duplicate record".to_string()),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Resolve the two possible causes of a guarded mutation affecting zero
/// rows, given whether the follow-up lookup found the target.
pub fn zero_rows(target_exists: bool, entity: &'static str) -> StoreError {
    if target_exists {
        StoreError::AccessDenied
    } else {
        StoreError::NotFound(entity)
    }
}

/// Parse an identifier arriving as text. A malformed id is indistinguishable
/// from an id that matches nothing, so it maps to the entity's not-found
/// error rather than a validation failure.
pub fn parse_id(value: &str, entity: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| StoreError::NotFound(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rows_disambiguates() {
        assert!(matches!(zero_rows(true, "Message"), StoreError::AccessDenied));
        assert!(matches!(
            zero_rows(false, "Message"),
            StoreError::NotFound("Message")
        ));
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(StoreError::NotFound("Project").to_string(), "Project not found");
    }

    #[test]
    fn malformed_ids_read_as_not_found() {
        assert!(matches!(
            parse_id("not-a-uuid", "User"),
            Err(StoreError::NotFound("User"))
        ));
        assert!(parse_id("a3bb189e-8bf9-3888-9912-ace4e6543002", "User").is_ok());
    }
}
