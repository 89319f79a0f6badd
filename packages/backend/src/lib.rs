#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Backend collaborator contract for StrayWatch.
//!
//! All durable state lives in a hosted backend (Supabase): a `reports`
//! table served over `PostgREST` and password authentication served by
//! `GoTrue`. The [`Backend`] trait is the only seam the rest of the
//! workspace talks to, so the data access layer and the view-models can be
//! driven against [`memory::MemoryBackend`] in tests and
//! [`supabase::SupabaseBackend`] in production.

pub mod config;
pub mod memory;
pub mod retry;
pub mod supabase;

#[cfg(test)]
mod test_server;

use straywatch_report_models::{Identity, NewReport, Report, ReportId, ReportPatch, UserId};
use thiserror::Error;
use tokio::sync::broadcast;

pub use config::BackendConfig;

/// Capacity of the session-change notification channel.
pub const SESSION_EVENT_CAPACITY: usize = 16;

/// Errors from backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend URL or API key is missing.
    #[error("Backend is not configured")]
    NotConfigured,

    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status. `message` is the
    /// backend's own explanation when it sent one.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message reported by the backend.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid backend response: {message}")]
    Decode {
        /// Description of what was wrong.
        message: String,
    },

    /// Reading or writing the persisted session failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Returns `true` for 401/403 responses.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// A change of the backend session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in (or signed up with an immediately active session).
    SignedIn(Identity),
    /// The access token was refreshed for the same user.
    TokenRefreshed(Identity),
    /// The session ended, by sign-out or expiry.
    SignedOut,
}

impl SessionEvent {
    /// The identity that is current after this event.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedIn(identity) | Self::TokenRefreshed(identity) => Some(identity),
            Self::SignedOut => None,
        }
    }
}

/// The external authentication and persistence service.
///
/// Reads return rows ordered by `created_at` descending. Mutations that
/// target a missing id return `None`/`false` rather than an error so the
/// caller decides how to report it.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Whether the service URL and API key are both present.
    fn is_configured(&self) -> bool;

    /// Creates an account. Returns the new user when the backend reports
    /// one (it may not, e.g. when email confirmation is pending).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails or is rejected.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>, BackendError>;

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the request fails or the credentials are
    /// rejected.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError>;

    /// Ends the current session.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend rejects the sign-out.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Returns the user of the current session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the session cannot be checked.
    async fn current_identity(&self) -> Result<Option<Identity>, BackendError>;

    /// Subscribes to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// Selects all reports, or only those owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the query fails.
    async fn select_reports(&self, owner: Option<&UserId>) -> Result<Vec<Report>, BackendError>;

    /// Inserts a report owned by `owner` and returns the stored row.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the insert fails.
    async fn insert_report(&self, input: &NewReport, owner: &UserId)
    -> Result<Report, BackendError>;

    /// Applies `patch` to the report with `id`. Returns `None` when no
    /// report has that id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the update fails.
    async fn update_report(
        &self,
        id: &ReportId,
        patch: &ReportPatch,
    ) -> Result<Option<Report>, BackendError>;

    /// Deletes the report with `id`. Returns `false` when no report has
    /// that id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the delete fails.
    async fn delete_report(&self, id: &ReportId) -> Result<bool, BackendError>;
}

/// Creates a session-change channel sender.
#[must_use]
pub fn session_channel() -> broadcast::Sender<SessionEvent> {
    broadcast::channel(SESSION_EVENT_CAPACITY).0
}
