//! Backend configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `PUBLIC_SUPABASE_URL` | unset |
//! | `PUBLIC_SUPABASE_ANON_KEY` | unset |
//! | `STRAYWATCH_REQUEST_TIMEOUT_SECS` | `10` |
//! | `STRAYWATCH_MAX_RETRIES` | `3` |
//! | `STRAYWATCH_SESSION_FILE` | `data/session.json` |
//!
//! The backend counts as configured only when both the URL and the key are
//! present and non-empty.

use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default location of the persisted session.
pub const DEFAULT_SESSION_FILE: &str = "data/session.json";

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: Option<String>,
    /// Public (anon) API key.
    pub anon_key: Option<String>,
    /// Hard timeout applied to every HTTP request.
    pub request_timeout: Duration,
    /// Retry policy for idempotent requests.
    pub retry: RetryPolicy,
    /// Where the signed-in session is persisted between runs. `None`
    /// keeps the session in memory only.
    pub session_file: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            session_file: Some(PathBuf::from(DEFAULT_SESSION_FILE)),
        }
    }
}

impl BackendConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset. Unparseable numbers fall back to
    /// their defaults with a warning.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self {
            url: non_empty("PUBLIC_SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            anon_key: non_empty("PUBLIC_SUPABASE_ANON_KEY"),
            ..Self::default()
        };

        if let Some(raw) = non_empty("STRAYWATCH_REQUEST_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => log::warn!("Ignoring invalid STRAYWATCH_REQUEST_TIMEOUT_SECS={raw}"),
            }
        }

        if let Some(raw) = non_empty("STRAYWATCH_MAX_RETRIES") {
            match raw.parse::<u32>() {
                Ok(retries) => config.retry.max_retries = retries,
                Err(_) => log::warn!("Ignoring invalid STRAYWATCH_MAX_RETRIES={raw}"),
            }
        }

        if let Some(path) = non_empty("STRAYWATCH_SESSION_FILE") {
            config.session_file = Some(PathBuf::from(path));
        }

        config
    }

    /// Returns `(url, anon_key)` when both are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.url, &self.anon_key) {
            (Some(url), Some(key)) => Some((url.as_str(), key.as_str())),
            _ => None,
        }
    }

    /// Whether both the URL and the API key are set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}
