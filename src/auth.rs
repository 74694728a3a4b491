// 🔐 Admin Authentication - password check + session tokens
//
// The raw session token only ever lives in the admin's cookie.
// The database stores its SHA-256 hash with an expiry.

use crate::db;
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ============================================================================
// HASHING
// ============================================================================

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a candidate password against the configured digest.
/// An empty digest means admin login is disabled.
pub fn verify_password(candidate: &str, expected_digest: &str) -> bool {
    if expected_digest.is_empty() {
        return false;
    }
    let actual = sha256_hex(candidate);
    let expected = expected_digest.trim().to_lowercase();

    if actual.len() != expected.len() {
        return false;
    }
    actual
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

// ============================================================================
// COOKIES
// ============================================================================

/// Anything a cookie can be read from (HTTP headers, test maps, ...)
pub trait CookieSource {
    fn cookie(&self, name: &str) -> Option<String>;
}

impl CookieSource for HashMap<String, String> {
    fn cookie(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Find `name` in a `Cookie:` header value ("a=1; b=2")
pub fn parse_cookie_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

/// `Set-Cookie` value for a fresh session
pub fn session_cookie(name: &str, token: &str, ttl_hours: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        name,
        token,
        ttl_hours.max(0).saturating_mul(3600)
    )
}

/// `Set-Cookie` value that clears the session cookie
pub fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0", name)
}

// ============================================================================
// SESSIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct AdminSession {
    /// Raw token for the cookie; never stored
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// When a session issued at `now` runs out. Out-of-range TTLs are an error.
pub fn session_expiry(now: DateTime<Utc>, ttl_hours: i64) -> Result<DateTime<Utc>> {
    if ttl_hours <= 0 {
        bail!("session TTL must be positive, got {} hours", ttl_hours);
    }
    Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| anyhow!("session TTL of {} hours is out of range", ttl_hours))
}

/// Issue a new session that lasts until `expires_at`
pub fn create_session(
    conn: &Connection,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<AdminSession> {
    let token = uuid::Uuid::new_v4().simple().to_string();
    db::insert_session(conn, &sha256_hex(&token), now, expires_at)?;

    Ok(AdminSession { token, expires_at })
}

pub fn validate_session(conn: &Connection, token: &str, now: DateTime<Utc>) -> Result<bool> {
    if token.is_empty() {
        return Ok(false);
    }
    let expiry = db::get_session_expiry(conn, &sha256_hex(token))?;
    Ok(matches!(expiry, Some(expires_at) if expires_at > now))
}

pub fn revoke_session(conn: &Connection, token: &str) -> Result<bool> {
    db::delete_session(conn, &sha256_hex(token))
}

pub fn purge_expired_sessions(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
    db::delete_expired_sessions(conn, now)
}

/// True when `source` carries a live admin session cookie
pub fn is_admin<C: CookieSource>(
    conn: &Connection,
    source: &C,
    cookie_name: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    match source.cookie(cookie_name) {
        Some(token) => validate_session(conn, &token, now),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        conn
    }

    fn issue(conn: &Connection, ttl_hours: i64, now: DateTime<Utc>) -> AdminSession {
        create_session(conn, now, session_expiry(now, ttl_hours).unwrap()).unwrap()
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex("hunter2"),
            "f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7"
        );
    }

    #[test]
    fn test_verify_password() {
        let digest = sha256_hex("open sesame");
        assert!(verify_password("open sesame", &digest));
        assert!(verify_password("open sesame", &digest.to_uppercase()));
        assert!(!verify_password("open sesame!", &digest));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_parse_cookie_header() {
        let header = "theme=dark; wedding_admin=abc123 ; other=x=y";
        assert_eq!(parse_cookie_header(header, "wedding_admin"), Some("abc123".to_string()));
        assert_eq!(parse_cookie_header(header, "other"), Some("x=y".to_string()));
        assert_eq!(parse_cookie_header(header, "missing"), None);
    }

    #[test]
    fn test_session_lifecycle() {
        let conn = test_conn();
        let now = Utc::now();

        let session = issue(&conn, 24, now);
        assert!(validate_session(&conn, &session.token, now).unwrap());
        assert!(!validate_session(&conn, &session.token, now + Duration::hours(25)).unwrap());
        assert!(!validate_session(&conn, "forged", now).unwrap());
        assert!(!validate_session(&conn, "", now).unwrap());

        assert!(revoke_session(&conn, &session.token).unwrap());
        assert!(!validate_session(&conn, &session.token, now).unwrap());
    }

    #[test]
    fn test_is_admin_reads_cookie_source() {
        let conn = test_conn();
        let now = Utc::now();
        let session = issue(&conn, 1, now);

        let mut cookies = HashMap::new();
        assert!(!is_admin(&conn, &cookies, "wedding_admin", now).unwrap());

        cookies.insert("wedding_admin".to_string(), session.token.clone());
        assert!(is_admin(&conn, &cookies, "wedding_admin", now).unwrap());
    }

    #[test]
    fn test_purge_expired_sessions() {
        let conn = test_conn();
        let then = Utc::now() - Duration::hours(48);
        issue(&conn, 1, then);
        issue(&conn, 100, then);

        assert_eq!(purge_expired_sessions(&conn, Utc::now()).unwrap(), 1);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, 24).unwrap(), now + Duration::hours(24));

        assert!(session_expiry(now, 0).is_err());
        assert!(session_expiry(now, -3).is_err());
        // Too large for a Duration
        assert!(session_expiry(now, i64::MAX / 3600).is_err());
        assert!(session_expiry(now, i64::MAX).is_err());
        // Fits a Duration but runs past the last representable date
        assert!(session_expiry(now, 1_000_000_000_000).is_err());
    }

    #[test]
    fn test_cookie_strings() {
        assert_eq!(
            session_cookie("wedding_admin", "tok", 2),
            "wedding_admin=tok; Path=/; HttpOnly; SameSite=Strict; Max-Age=7200"
        );
        assert!(session_cookie("wedding_admin", "tok", i64::MAX).ends_with(&format!("Max-Age={}", i64::MAX)));
        assert!(session_cookie("wedding_admin", "tok", -1).ends_with("Max-Age=0"));
        assert!(expired_cookie("wedding_admin").ends_with("Max-Age=0"));
    }
}
