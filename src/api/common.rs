//! Common API utilities and shared types

use serde::Deserialize;

/// `?page=&limit=` for the combined news feed
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// `?q=` for product search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// `Set-Cookie` value for a session token
pub fn session_cookie(token: &str, days: i64) -> String {
    format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        days * 24 * 60 * 60
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn expired_session_cookie() -> &'static str {
    "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
}
