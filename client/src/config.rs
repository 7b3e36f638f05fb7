//! Base URL resolution for the todo API.
//!
//! # Design
//! The base URL comes from a single environment value (`TODO_API_URL`, also
//! read from a `.env` file when present) with a fixed fallback. Resolution
//! never fails: a blank or whitespace-only value is treated as unset.
//! `build_url` is the only place paths are joined onto the base, so every
//! request URL has exactly one slash at the seam.

/// Environment key holding the API base URL.
pub const BASE_URL_ENV: &str = "TODO_API_URL";

/// Base URL used when `TODO_API_URL` is unset or blank.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Client settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: resolve_base_url(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Read the base URL from the environment, falling back to the default.
pub fn resolve_base_url() -> String {
    let _ = dotenvy::dotenv();
    let value = std::env::var(BASE_URL_ENV).ok();
    base_url_or_default(value.as_deref())
}

/// Pick the configured value if it is non-blank, otherwise the default.
pub fn base_url_or_default(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

/// Join `path` onto `base` with exactly one `/` between them.
pub fn build_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
