//! Input validation for store operations.
//!
//! Each entity declares a "base" schema for creation (all core fields
//! required) and an "updated" schema for mutations (at least one mutable
//! field required). Validation runs before any query executes and reports
//! the first violated constraint.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

// ---- field rules ----

pub fn username(value: &str) -> Result<(), ValidationError> {
    if value.len() < 3 || value.len() > 30 {
        return Err(ValidationError::new(
            "username",
            "Username must be 3 to 30 characters",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "username",
            "Username must only contain alphanumeric characters",
        ));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    if value.len() < 3 || value.len() > 30 || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(
            "password",
            "Password must be 3 to 30 alphanumeric characters",
        ));
    }
    Ok(())
}

pub fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(
            field,
            format!("{} is not allowed to be empty", field),
        ));
    }
    Ok(())
}

pub fn file_url(value: &str) -> Result<(), ValidationError> {
    url::Url::parse(value)
        .map_err(|_| ValidationError::new("url", "url must be a valid uri"))?;
    Ok(())
}

fn at_least_one(supplied: &[bool]) -> Result<(), ValidationError> {
    if supplied.iter().any(|s| *s) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "fields",
            "At least one update is required",
        ))
    }
}

// ---- per-entity schemas ----

pub fn user_base(
    username_value: &str,
    password_value: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), ValidationError> {
    username(username_value)?;
    password(password_value)?;
    non_empty("first_name", first_name)?;
    non_empty("last_name", last_name)?;
    Ok(())
}

/// Identity-linking variant: no password, the provider authenticated.
pub fn user_link(
    username_value: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), ValidationError> {
    non_empty("username", username_value)?;
    non_empty("first_name", first_name)?;
    non_empty("last_name", last_name)?;
    Ok(())
}

pub fn user_updated(
    username_value: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    new_password: Option<&str>,
) -> Result<(), ValidationError> {
    at_least_one(&[
        username_value.is_some(),
        first_name.is_some(),
        last_name.is_some(),
        new_password.is_some(),
    ])?;
    if let Some(v) = username_value {
        username(v)?;
    }
    if let Some(v) = first_name {
        non_empty("first_name", v)?;
    }
    if let Some(v) = last_name {
        non_empty("last_name", v)?;
    }
    if let Some(v) = new_password {
        password(v)?;
    }
    Ok(())
}

pub fn project_base(name: &str) -> Result<(), ValidationError> {
    non_empty("name", name)
}

pub fn project_updated(name: Option<&str>) -> Result<(), ValidationError> {
    at_least_one(&[name.is_some()])?;
    if let Some(v) = name {
        non_empty("name", v)?;
    }
    Ok(())
}

pub fn member_base(position: &str) -> Result<(), ValidationError> {
    non_empty("position", position)
}

pub fn member_updated(
    position: Option<&str>,
    is_admin: Option<bool>,
) -> Result<(), ValidationError> {
    at_least_one(&[position.is_some(), is_admin.is_some()])?;
    if let Some(v) = position {
        non_empty("position", v)?;
    }
    Ok(())
}

pub fn message_base(text: &str) -> Result<(), ValidationError> {
    non_empty("text", text)
}

pub fn file_base(name: &str, url_value: &str) -> Result<(), ValidationError> {
    non_empty("name", name)?;
    file_url(url_value)?;
    Ok(())
}

pub fn file_updated(
    name: Option<&str>,
    url_value: Option<&str>,
) -> Result<(), ValidationError> {
    at_least_one(&[name.is_some(), url_value.is_some()])?;
    if let Some(v) = name {
        non_empty("name", v)?;
    }
    if let Some(v) = url_value {
        file_url(v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(username("bob").is_ok());
        assert!(username("ab").is_err());
        assert!(username(&"a".repeat(31)).is_err());
        assert!(username("bob jones").is_err());
        assert!(username("bob_jones").is_err());
    }

    #[test]
    fn password_rules() {
        assert!(password("pw123456").is_ok());
        assert!(password("pw").is_err());
        assert!(password("has spaces!").is_err());
    }

    #[test]
    fn user_base_reports_first_failure() {
        let err = user_base("bob", "pw123456", "", "Jones").unwrap_err();
        assert_eq!(err.field, "first_name");
    }

    #[test]
    fn updates_require_at_least_one_field() {
        let err = user_updated(None, None, None, None).unwrap_err();
        assert_eq!(err.message, "At least one update is required");
        assert!(member_updated(None, Some(true)).is_ok());
        assert!(project_updated(None).is_err());
    }

    #[test]
    fn file_url_must_parse() {
        assert!(file_base("cut.mp4", "https://cdn.example.com/cut.mp4").is_ok());
        assert!(file_base("cut.mp4", "not a url").is_err());
    }
}
