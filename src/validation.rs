// ABOUTME: Input validation and normalization helpers shared by the route handlers
// ABOUTME: Email format checks, name sanitizing, and excerpt generation for posts

use regex::Regex;
use std::sync::LazyLock;

pub const EXCERPT_LENGTH: usize = 150;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Checks the optional name and email of a user payload. Absent fields are
/// not validated; callers decide which fields are required.
pub fn validate_user_data(name: Option<&str>, email: Option<&str>) -> Result<(), String> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err("Name must be a non-empty string".to_string());
        }
    }
    if let Some(email) = email {
        if !validate_email(email) {
            return Err("Invalid email format".to_string());
        }
    }
    Ok(())
}

pub fn sanitize_string(input: &str) -> String {
    input.replace(['<', '>'], "").trim().to_string()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn make_excerpt(content: &str) -> String {
    content.chars().take(EXCERPT_LENGTH).collect()
}

/// Treats `None` and empty strings alike, the way optional JSON fields are
/// read throughout the API.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_emails() {
        assert!(validate_email("test@example.com"));
        assert!(validate_email("user.name@domain.co.uk"));
    }

    #[test]
    fn rejects_invalid_emails() {
        assert!(!validate_email("invalid.email"));
        assert!(!validate_email("test@"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("with space@example.com"));
    }

    #[test]
    fn user_data_checks_only_present_fields() {
        assert!(validate_user_data(None, None).is_ok());
        assert_eq!(
            validate_user_data(Some("   "), None),
            Err("Name must be a non-empty string".to_string())
        );
        assert_eq!(
            validate_user_data(Some("Ada"), Some("nope")),
            Err("Invalid email format".to_string())
        );
        assert!(validate_user_data(Some("Ada"), Some("ada@example.com")).is_ok());
    }

    #[test]
    fn sanitize_trims_and_strips_angle_brackets() {
        assert_eq!(sanitize_string("  hello  "), "hello");
        assert_eq!(sanitize_string("< Ada >"), "Ada");
        assert_eq!(sanitize_string(" < > "), "");
        assert_eq!(
            sanitize_string("<script>alert(\"xss\")</script>"),
            "scriptalert(\"xss\")/script"
        );
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let short = "short post";
        assert_eq!(make_excerpt(short), short);

        let long: String = "é".repeat(200);
        let excerpt = make_excerpt(&long);
        assert_eq!(excerpt.chars().count(), EXCERPT_LENGTH);
    }

    #[test]
    fn normalizes_email_case() {
        assert_eq!(normalize_email(" Ada@Example.COM "), "ada@example.com");
    }
}
