//! Cache key construction.
//!
//! Keys are namespaced under `fn:` and scoped so that invalidation can work
//! by exact key for windowed collections and by prefix for per-user search
//! caches.

use uuid::Uuid;

pub fn project_prefix(project_id: Uuid) -> String {
    format!("fn:project:{}:", project_id)
}

pub fn project_messages(project_id: Uuid) -> String {
    format!("fn:project:{}:messages", project_id)
}

pub fn project_messages_count(project_id: Uuid) -> String {
    format!("fn:project:{}:messages:count", project_id)
}

pub fn project_files(project_id: Uuid) -> String {
    format!("fn:project:{}:files", project_id)
}

pub fn project_files_count(project_id: Uuid) -> String {
    format!("fn:project:{}:files:count", project_id)
}

pub fn user_projects_prefix(user_id: Uuid) -> String {
    format!("fn:user:{}:projects:", user_id)
}

pub fn user_projects(user_id: Uuid, page: i64, query: Option<&str>) -> String {
    format!(
        "{}{}:{}",
        user_projects_prefix(user_id),
        page,
        normalize_query(query)
    )
}

pub fn project_users_prefix(project_id: Uuid) -> String {
    format!("fn:project:{}:users:", project_id)
}

pub fn project_users(
    project_id: Uuid,
    requester_id: Uuid,
    page: i64,
    query: Option<&str>,
) -> String {
    format!(
        "{}{}:{}:{}",
        project_users_prefix(project_id),
        requester_id,
        page,
        normalize_query(query)
    )
}

/// Search terms are trimmed and lowercased before keying so equivalent
/// queries share an entry.
pub fn normalize_query(query: Option<&str>) -> String {
    match query.map(|q| q.trim().to_lowercase()) {
        Some(q) if !q.is_empty() => q,
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_queries() {
        assert_eq!(normalize_query(None), "-");
        assert_eq!(normalize_query(Some("  ")), "-");
        assert_eq!(normalize_query(Some(" Cut ")), "cut");
    }

    #[test]
    fn search_keys_share_the_user_prefix() {
        let uid = Uuid::new_v4();
        let key = user_projects(uid, 2, Some("Nexus"));
        assert!(key.starts_with(&user_projects_prefix(uid)));
        assert!(key.ends_with("2:nexus"));
    }

    #[test]
    fn window_keys_live_under_the_project_prefix() {
        let pid = Uuid::new_v4();
        assert!(project_messages(pid).starts_with(&project_prefix(pid)));
        assert!(project_files_count(pid).starts_with(&project_prefix(pid)));
    }
}
