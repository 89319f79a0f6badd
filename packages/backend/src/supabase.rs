//! Supabase client: `GoTrue` password auth plus the `PostgREST` `reports`
//! table.
//!
//! See <https://supabase.com/docs/guides/api> for the REST conventions
//! used here (`apikey` header, `Prefer: return=representation`,
//! `column=eq.value` filters).
//!
//! The signed-in session is kept in memory and, when a session file is
//! configured, mirrored to disk so separate CLI runs share one login.
//! Expired access tokens are refreshed before use; a rejected session is
//! dropped and announced as [`SessionEvent::SignedOut`].

use std::io::Write;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use straywatch_report_models::{Identity, NewReport, Report, ReportId, ReportPatch, UserId};
use tokio::sync::broadcast;

use crate::retry::{self, Idempotency};
use crate::{Backend, BackendConfig, BackendError, SessionEvent, session_channel};

/// Name of the reports table.
const REPORTS_TABLE: &str = "reports";

/// Refresh the access token when it expires within this many seconds.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A signed-in session as returned by `GoTrue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// JWT sent as the bearer token.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: Option<String>,
    /// Expiry of the access token (unix seconds).
    pub expires_at: Option<i64>,
    /// The signed-in user.
    pub user: Identity,
}

impl StoredSession {
    /// Whether the access token expires within the refresh margin.
    #[must_use]
    pub fn expires_soon(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at - EXPIRY_MARGIN_SECS <= now)
    }
}

/// Row body for inserts: the report input plus its owner.
#[derive(Serialize)]
struct InsertRow<'a> {
    #[serde(flatten)]
    report: &'a NewReport,
    user_id: &'a UserId,
}

/// [`Backend`] implementation talking to a Supabase project.
pub struct SupabaseBackend {
    config: BackendConfig,
    client: reqwest::Client,
    session: RwLock<Option<StoredSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SupabaseBackend {
    /// Creates a client for the configured project and restores any
    /// persisted session.
    ///
    /// An unconfigured `config` is accepted: every call then fails with
    /// [`BackendError::NotConfigured`] instead of reaching the network.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let session = match &config.session_file {
            Some(path) if config.is_configured() => load_session(path),
            _ => None,
        };
        if let Some(session) = &session {
            log::debug!("Restored session for {}", session.user.email);
        }

        Ok(Self {
            config,
            client,
            session: RwLock::new(session),
            events: session_channel(),
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn credentials(&self) -> Result<(&str, &str), BackendError> {
        self.config.credentials().ok_or(BackendError::NotConfigured)
    }

    fn session(&self) -> Option<StoredSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_session(&self, session: Option<StoredSession>) {
        if let Some(path) = &self.config.session_file
            && let Err(e) = persist_session(path, session.as_ref())
        {
            log::warn!("Failed to persist session to {}: {e}", path.display());
        }
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn expire_session(&self) {
        if self.session().is_some() {
            log::info!("Session rejected by backend, signing out locally");
            self.store_session(None);
            self.emit(SessionEvent::SignedOut);
        }
    }

    /// Drops the local session when the backend rejected our token.
    fn note_failure(&self, error: &BackendError) {
        if error.is_unauthorized() {
            self.expire_session();
        }
    }

    /// Bearer token for the next request: the session's access token
    /// (refreshed when close to expiry) or the anon key.
    async fn bearer_token(&self) -> Result<String, BackendError> {
        let (_, anon_key) = self.credentials()?;
        let Some(session) = self.session() else {
            return Ok(anon_key.to_string());
        };

        if session.expires_soon(Utc::now().timestamp())
            && let Some(refresh_token) = &session.refresh_token
        {
            return match self.refresh(refresh_token).await {
                Ok(fresh) => Ok(fresh.access_token),
                Err(e @ BackendError::Status { .. }) => {
                    log::warn!("Token refresh rejected: {e}");
                    self.expire_session();
                    Ok(anon_key.to_string())
                }
                Err(e) => Err(e),
            };
        }

        Ok(session.access_token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredSession, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let endpoint = format!("{url}/auth/v1/token");
        let body = serde_json::json!({ "refresh_token": refresh_token });

        let resp = retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .post(&endpoint)
                .query(&[("grant_type", "refresh_token")])
                .header("apikey", anon_key)
                .json(&body)
        })
        .await?;
        let value = read_json(resp).await?;

        let session = parse_session(&value, Utc::now().timestamp())?.ok_or_else(|| {
            BackendError::Decode {
                message: "refresh response has no session".to_string(),
            }
        })?;
        log::debug!("Refreshed access token for {}", session.user.email);
        self.store_session(Some(session.clone()));
        self.emit(SessionEvent::TokenRefreshed(session.user.clone()));
        Ok(session)
    }

    fn rest_url(url: &str) -> String {
        format!("{url}/rest/v1/{REPORTS_TABLE}")
    }
}

#[async_trait::async_trait]
impl Backend for SupabaseBackend {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let endpoint = format!("{url}/auth/v1/signup");
        let body = serde_json::json!({ "email": email, "password": password });

        let resp = retry::send(&self.config.retry, Idempotency::NonIdempotent, || {
            self.client
                .post(&endpoint)
                .header("apikey", anon_key)
                .json(&body)
        })
        .await?;
        let value = read_json(resp).await?;

        // With auto-confirm the backend answers with a full session; with
        // email confirmation pending it answers with the bare user.
        if let Some(session) = parse_session(&value, Utc::now().timestamp())? {
            let identity = session.user.clone();
            self.store_session(Some(session));
            self.emit(SessionEvent::SignedIn(identity.clone()));
            return Ok(Some(identity));
        }

        let user = value.get("user").filter(|u| u.is_object()).unwrap_or(&value);
        if user.get("id").is_some() {
            return parse_identity(user).map(Some);
        }
        Ok(None)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let endpoint = format!("{url}/auth/v1/token");
        let body = serde_json::json!({ "email": email, "password": password });

        let resp = retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .post(&endpoint)
                .query(&[("grant_type", "password")])
                .header("apikey", anon_key)
                .json(&body)
        })
        .await?;
        let value = read_json(resp).await?;

        let session = parse_session(&value, Utc::now().timestamp())?.ok_or_else(|| {
            BackendError::Decode {
                message: "sign-in response has no session".to_string(),
            }
        })?;
        let identity = session.user.clone();
        log::info!("Signed in as {}", identity.email);
        self.store_session(Some(session));
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let (url, anon_key) = self.credentials()?;
        let Some(session) = self.session() else {
            return Ok(());
        };
        let endpoint = format!("{url}/auth/v1/logout");

        let result = match retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .post(&endpoint)
                .header("apikey", anon_key)
                .bearer_auth(&session.access_token)
        })
        .await
        {
            Ok(resp) => read_json(resp).await.map(|_| ()),
            Err(e) => Err(e),
        };

        self.store_session(None);
        self.emit(SessionEvent::SignedOut);

        match result {
            Err(BackendError::Status {
                status: 401 | 403 | 404,
                ..
            }) => Ok(()),
            other => other,
        }
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        let (url, anon_key) = self.credentials()?;
        if self.session().is_none() {
            return Ok(None);
        }

        let token = self.bearer_token().await?;
        if self.session().is_none() {
            return Ok(None);
        }

        let endpoint = format!("{url}/auth/v1/user");
        let resp = retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .get(&endpoint)
                .header("apikey", anon_key)
                .bearer_auth(&token)
        })
        .await?;

        match read_json(resp).await {
            Ok(value) => parse_identity(&value).map(Some),
            Err(e) if e.is_unauthorized() => {
                self.expire_session();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn select_reports(&self, owner: Option<&UserId>) -> Result<Vec<Report>, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let token = self.bearer_token().await?;
        let endpoint = Self::rest_url(url);

        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(owner) = owner {
            params.push(("user_id", format!("eq.{owner}")));
        }

        log::debug!("GET {endpoint} {params:?}");
        let resp = retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .get(&endpoint)
                .query(&params)
                .header("apikey", anon_key)
                .bearer_auth(&token)
        })
        .await?;

        let value = read_json(resp).await.inspect_err(|e| self.note_failure(e))?;
        parse_report_rows(value)
    }

    async fn insert_report(
        &self,
        input: &NewReport,
        owner: &UserId,
    ) -> Result<Report, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let token = self.bearer_token().await?;
        let endpoint = Self::rest_url(url);
        let row = InsertRow {
            report: input,
            user_id: owner,
        };

        log::debug!("POST {endpoint}");
        let resp = retry::send(&self.config.retry, Idempotency::NonIdempotent, || {
            self.client
                .post(&endpoint)
                .header("apikey", anon_key)
                .header("Prefer", "return=representation")
                .bearer_auth(&token)
                .json(&row)
        })
        .await?;

        let value = read_json(resp).await.inspect_err(|e| self.note_failure(e))?;
        let mut rows: Vec<Report> = serde_json::from_value(value)?;
        if rows.is_empty() {
            return Err(BackendError::Decode {
                message: "insert returned no row".to_string(),
            });
        }
        Ok(rows.swap_remove(0))
    }

    async fn update_report(
        &self,
        id: &ReportId,
        patch: &ReportPatch,
    ) -> Result<Option<Report>, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let token = self.bearer_token().await?;
        let endpoint = Self::rest_url(url);
        let filter = format!("eq.{id}");

        log::debug!("PATCH {endpoint}?id={filter}");
        let resp = retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .patch(&endpoint)
                .query(&[("id", filter.as_str())])
                .header("apikey", anon_key)
                .header("Prefer", "return=representation")
                .bearer_auth(&token)
                .json(patch)
        })
        .await?;

        let value = read_json(resp).await.inspect_err(|e| self.note_failure(e))?;
        let rows: Vec<Report> = serde_json::from_value(value)?;
        Ok(rows.into_iter().next())
    }

    async fn delete_report(&self, id: &ReportId) -> Result<bool, BackendError> {
        let (url, anon_key) = self.credentials()?;
        let token = self.bearer_token().await?;
        let endpoint = Self::rest_url(url);
        let filter = format!("eq.{id}");

        log::debug!("DELETE {endpoint}?id={filter}");
        let resp = retry::send(&self.config.retry, Idempotency::Idempotent, || {
            self.client
                .delete(&endpoint)
                .query(&[("id", filter.as_str())])
                .header("apikey", anon_key)
                .header("Prefer", "return=representation")
                .bearer_auth(&token)
        })
        .await?;

        let value = read_json(resp).await.inspect_err(|e| self.note_failure(e))?;
        let rows = value.as_array().ok_or_else(|| BackendError::Decode {
            message: "delete response is not an array".to_string(),
        })?;
        Ok(!rows.is_empty())
    }
}

/// Reads a response body as JSON, turning non-success statuses into
/// [`BackendError::Status`] with the backend's message.
async fn read_json(response: reqwest::Response) -> Result<Value, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = error_message(status, &body);
        log::debug!("Backend answered {status}: {message}");
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Extracts a human-readable message from a Supabase error body.
///
/// `GoTrue` uses `msg` or `error_description`, `PostgREST` uses `message`.
#[must_use]
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// Decodes a `PostgREST` row array. Rows that do not form a valid
/// [`Report`] (e.g. coordinates out of range) are skipped with a warning.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if `value` is not an array.
pub fn parse_report_rows(value: Value) -> Result<Vec<Report>, BackendError> {
    let Value::Array(rows) = value else {
        return Err(BackendError::Decode {
            message: "expected an array of report rows".to_string(),
        });
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            serde_json::from_value::<Report>(row)
                .inspect_err(|e| log::warn!("Skipping invalid report row {id}: {e}"))
                .ok()
        })
        .collect())
}

/// Parses a `GoTrue` user object.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if the object has no string `id`.
pub fn parse_identity(value: &Value) -> Result<Identity, BackendError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::Decode {
            message: "user object has no id".to_string(),
        })?;
    let email = value
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(Identity {
        id: UserId(id.to_string()),
        email: email.to_string(),
    })
}

/// Parses a `GoTrue` token response. Returns `None` when the body carries
/// no access token.
///
/// # Errors
///
/// Returns [`BackendError::Decode`] if an access token is present but the
/// user object is missing or malformed.
pub fn parse_session(value: &Value, now: i64) -> Result<Option<StoredSession>, BackendError> {
    let Some(access_token) = value.get("access_token").and_then(Value::as_str) else {
        return Ok(None);
    };

    let user = value.get("user").ok_or_else(|| BackendError::Decode {
        message: "session has no user".to_string(),
    })?;

    let expires_at = value
        .get("expires_at")
        .and_then(Value::as_i64)
        .or_else(|| {
            value
                .get("expires_in")
                .and_then(Value::as_i64)
                .map(|secs| now + secs)
        });

    Ok(Some(StoredSession {
        access_token: access_token.to_string(),
        refresh_token: value
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(String::from),
        expires_at,
        user: parse_identity(user)?,
    }))
}

fn load_session(path: &Path) -> Option<StoredSession> {
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(session) => Some(session),
            Err(e) => {
                log::warn!("Ignoring unreadable session file {}: {e}", path.display());
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("Failed to read session file {}: {e}", path.display());
            None
        }
    }
}

fn persist_session(path: &Path, session: Option<&StoredSession>) -> Result<(), BackendError> {
    match session {
        Some(session) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let mut options = std::fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(path)?;
            // `mode` only applies on creation; tighten files left by older runs.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(&serde_json::to_vec_pretty(session)?)?;
        }
        None => match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}
