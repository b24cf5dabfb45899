//! Token authority: issues opaque role tokens and session ids, derives
//! URL-safe slugs from human names, and resolves a presented token to a role.
//!
//! Tokens are shared capability secrets, not user identities: one creator
//! token and one helper token per session, generated once at creation and
//! never recoverable afterwards.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::constants::{SESSION_ID_BYTES, TOKEN_BYTES};
use crate::error::ApiError;
use crate::queries;

/// The two fixed roles, distinguished solely by which token was presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Helper,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Helper => "helper",
        }
    }

    /// Parse an author_type column value
    pub fn from_db(value: &str) -> Result<Role, ApiError> {
        match value {
            "creator" => Ok(Role::Creator),
            "helper" => Ok(Role::Helper),
            other => Err(ApiError::Internal(format!(
                "unknown author_type in database: '{}'",
                other
            ))),
        }
    }
}

fn random_url_safe(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Generate a role token: 128 bits of CSPRNG output, URL-safe encoded
pub fn issue_token() -> String {
    random_url_safe(TOKEN_BYTES)
}

/// Generate a random session id (64 bits, URL-safe encoded)
pub fn generate_session_id() -> String {
    random_url_safe(SESSION_ID_BYTES)
}

/// Convert a human-supplied session name into a URL-safe slug
///
/// Lowercase, alphanumeric/hyphen only; whitespace runs become single
/// hyphens; repeated hyphens collapse; leading/trailing hyphens are
/// trimmed. May return an empty string for all-punctuation input - the
/// store rejects that as a validation error.
pub fn derive_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());

    for c in name.trim().to_lowercase().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        } else if c.is_ascii_alphanumeric() {
            slug.push(c);
        }
    }

    slug.trim_matches('-').to_string()
}

/// Resolve a presented token against a session's stored tokens
///
/// Returns None for an unknown session as well as an unknown token, so a
/// caller cannot probe which session ids exist.
pub async fn authorize(
    pool: &SqlitePool,
    session_id: &str,
    token: &str,
) -> Result<Option<Role>, ApiError> {
    let sql = queries::sessions::select_tokens(session_id);
    let row = match sqlx::query(&sql).fetch_optional(pool).await? {
        Some(row) => row,
        None => return Ok(None),
    };

    let creator_token: String = row.get(0);
    let helper_token: String = row.get(1);

    if tokens_match(token, &creator_token) {
        Ok(Some(Role::Creator))
    } else if tokens_match(token, &helper_token) {
        Ok(Some(Role::Helper))
    } else {
        Ok(None)
    }
}

/// Compare a presented token to a stored one without short-circuiting on
/// the first mismatched byte
fn tokens_match(presented: &str, stored: &str) -> bool {
    let (a, b) = (presented.as_bytes(), stored.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_tokens_are_distinct_and_url_safe() {
        let a = issue_token();
        let b = issue_token();
        assert_ne!(a, b);
        // 16 bytes -> 22 chars of unpadded base64url
        assert_eq!(a.len(), 22);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_session_ids_are_shorter_than_tokens() {
        let id = generate_session_id();
        assert_eq!(id.len(), 11);
    }

    #[test]
    fn test_slug_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(derive_slug("Tashi's  Talk!!"), "tashis-talk");
    }

    #[test]
    fn test_slug_collapses_hyphen_runs() {
        assert_eq!(derive_slug("a - b"), "a-b");
        assert_eq!(derive_slug("a---b"), "a-b");
    }

    #[test]
    fn test_slug_trims_leading_and_trailing_hyphens() {
        assert_eq!(derive_slug("  -hello-  "), "hello");
        assert_eq!(derive_slug("--Guitar Lesson 3--"), "guitar-lesson-3");
    }

    #[test]
    fn test_slug_can_be_empty() {
        assert_eq!(derive_slug("!!!"), "");
        assert_eq!(derive_slug(""), "");
    }

    #[test]
    fn test_tokens_match_requires_exact_equality() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("abc123", "abc12"));
        assert!(!tokens_match("", "abc12"));
    }
}
