//! Configuration management for tronwatch
//!
//! Settings come from the process environment, optionally seeded from a `.env`
//! file in the working directory.

use crate::error::{Result, WatchError};

pub const DEFAULT_API_URL: &str = "https://api.trongrid.io";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite history database.
    pub database_path: String,
    /// Credential sent to the upstream API on every call.
    pub api_key: String,
    pub api_url: String,
    pub port: u16,
}

impl Config {
    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let api_key = required(&lookup, "API_KEY")?;

        let api_url = lookup("TRON_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| WatchError::Config(format!("PORT '{}' is invalid: {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            database_path: database_path_from_url(&database_url)?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            port,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(WatchError::Config(format!("{} must be set", key))),
    }
}

/// Turn a `DATABASE_URL` into a SQLite file path.
///
/// Accepts a bare path, `sqlite:` URLs and SQLAlchemy-style `sqlite+<driver>:`
/// URLs. After `://` one leading slash is dropped, so `sqlite:///./q.db` is
/// relative and `sqlite:////var/q.db` is absolute. Any other scheme is refused.
///
/// Every store operation opens its own connection, so an in-memory database would
/// be gone by the next call and is refused here.
pub fn database_path_from_url(url: &str) -> Result<String> {
    let path = match url.split_once(':') {
        Some((scheme, rest)) if is_scheme(scheme) => {
            if scheme == "sqlite" || scheme.starts_with("sqlite+") {
                match rest.strip_prefix("//") {
                    Some(after) => after.strip_prefix('/').unwrap_or(after),
                    None => rest,
                }
            } else if scheme == "file" {
                url
            } else {
                return Err(WatchError::Config(format!(
                    "DATABASE_URL scheme '{}' is not supported, only SQLite is",
                    scheme
                )));
            }
        }
        _ => url,
    };

    if path.is_empty() {
        return Err(WatchError::Config("DATABASE_URL has no path".to_string()));
    }
    if path.contains(":memory:") || path.contains("mode=memory") {
        return Err(WatchError::Config(
            "DATABASE_URL must point at a file, in-memory databases are not supported".to_string(),
        ));
    }

    Ok(path.to_string())
}

// Single letters are left alone so Windows drive paths like `C:\q.db` pass through.
fn is_scheme(candidate: &str) -> bool {
    candidate.len() > 1
        && candidate.starts_with(|c: char| c.is_ascii_alphabetic())
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Load configuration from `.env` (if present) and the process environment.
pub fn load_config() -> Result<Config> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(WatchError::Config(format!("Failed to read .env: {}", e)));
        }
    }

    Config::from_lookup(|key| std::env::var(key).ok())
}
