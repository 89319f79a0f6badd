//! In-process [`Backend`] used by tests and demos.
//!
//! Behaves like the hosted backend as far as the client can observe:
//! server-assigned ids and timestamps, newest-first ordering, password
//! accounts, session-change notifications, and `NotConfigured` failures
//! when built with [`MemoryBackend::unconfigured`]. It also counts session
//! queries and mutations so tests can assert how often the backend was hit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use straywatch_report_models::{Identity, NewReport, Report, ReportId, ReportPatch, UserId};
use tokio::sync::broadcast;

use crate::{Backend, BackendError, SessionEvent, session_channel};

#[derive(Default)]
struct MemoryState {
    /// Accounts keyed by email.
    accounts: BTreeMap<String, (Identity, String)>,
    session: Option<Identity>,
    /// Reports in insertion order.
    reports: Vec<Report>,
    last_created_at: Option<DateTime<Utc>>,
    /// Message of an injected failure for the next call.
    fail_next: Option<String>,
}

/// In-memory backend.
pub struct MemoryBackend {
    configured: bool,
    state: Mutex<MemoryState>,
    events: broadcast::Sender<SessionEvent>,
    session_queries: AtomicUsize,
    mutations: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty, configured backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            configured: true,
            state: Mutex::new(MemoryState::default()),
            events: session_channel(),
            session_queries: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
        }
    }

    /// Creates a backend that behaves as if no URL/key were configured.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self) -> Result<(), BackendError> {
        if !self.configured {
            return Err(BackendError::NotConfigured);
        }
        if let Some(message) = self.state().fail_next.take() {
            return Err(BackendError::Status {
                status: 503,
                message,
            });
        }
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Registers an account without signing in.
    pub fn add_account(&self, email: &str, password: &str) -> Identity {
        let identity = Identity {
            id: UserId(uuid::Uuid::new_v4().to_string()),
            email: email.to_string(),
        };
        self.state()
            .accounts
            .insert(email.to_string(), (identity.clone(), password.to_string()));
        identity
    }

    /// Makes the next backend call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.state().fail_next = Some(message.to_string());
    }

    /// Replaces the session and notifies subscribers, as the hosted
    /// backend does when a session changes elsewhere (expiry, another tab).
    pub fn set_session(&self, identity: Option<Identity>) {
        self.state().session.clone_from(&identity);
        self.emit(identity.map_or(SessionEvent::SignedOut, SessionEvent::SignedIn));
    }

    /// Inserts a report row directly, bypassing auth.
    pub fn seed(&self, input: &NewReport, owner: Option<&UserId>) -> Report {
        let mut state = self.state();
        let report = build_report(&mut state, input, owner.cloned());
        state.reports.push(report.clone());
        report
    }

    /// Number of [`Backend::current_identity`] calls so far.
    #[must_use]
    pub fn session_queries(&self) -> usize {
        self.session_queries.load(Ordering::SeqCst)
    }

    /// Number of insert/update/delete calls that reached the store.
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Snapshot of all stored reports, newest first.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        newest_first(self.state().reports.iter().cloned())
    }
}

fn build_report(state: &mut MemoryState, input: &NewReport, owner: Option<UserId>) -> Report {
    // Strictly increasing timestamps keep newest-first ordering stable.
    let now = Utc::now();
    let created_at = match state.last_created_at {
        Some(last) if now <= last => last + TimeDelta::microseconds(1),
        _ => now,
    };
    state.last_created_at = Some(created_at);

    Report {
        id: ReportId(uuid::Uuid::new_v4().to_string()),
        category: input.category,
        location: input.location,
        count: input.count,
        severity: input.severity,
        notes: input.notes.clone(),
        owner,
        created_at,
    }
}

fn newest_first(reports: impl Iterator<Item = Report>) -> Vec<Report> {
    let mut reports: Vec<Report> = reports.collect();
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    reports
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Identity>, BackendError> {
        self.check()?;
        if self.state().accounts.contains_key(email) {
            return Err(BackendError::Status {
                status: 422,
                message: "User already registered".to_string(),
            });
        }
        let identity = self.add_account(email, password);
        self.state().session = Some(identity.clone());
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(Some(identity))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        self.check()?;
        let identity = {
            let mut state = self.state();
            let identity = match state.accounts.get(email) {
                Some((identity, stored)) if stored == password => identity.clone(),
                _ => {
                    return Err(BackendError::Status {
                        status: 400,
                        message: "Invalid login credentials".to_string(),
                    });
                }
            };
            state.session = Some(identity.clone());
            identity
        };
        self.emit(SessionEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.check()?;
        if self.state().session.take().is_some() {
            self.emit(SessionEvent::SignedOut);
        }
        Ok(())
    }

    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        self.session_queries.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.state().session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn select_reports(&self, owner: Option<&UserId>) -> Result<Vec<Report>, BackendError> {
        self.check()?;
        let state = self.state();
        Ok(newest_first(
            state
                .reports
                .iter()
                .filter(|r| owner.is_none_or(|owner| r.owner.as_ref() == Some(owner)))
                .cloned(),
        ))
    }

    async fn insert_report(
        &self,
        input: &NewReport,
        owner: &UserId,
    ) -> Result<Report, BackendError> {
        self.check()?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let report = build_report(&mut state, input, Some(owner.clone()));
        state.reports.push(report.clone());
        Ok(report)
    }

    async fn update_report(
        &self,
        id: &ReportId,
        patch: &ReportPatch,
    ) -> Result<Option<Report>, BackendError> {
        self.check()?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let Some(report) = state.reports.iter_mut().find(|r| &r.id == id) else {
            return Ok(None);
        };
        patch.apply(report);
        Ok(Some(report.clone()))
    }

    async fn delete_report(&self, id: &ReportId) -> Result<bool, BackendError> {
        self.check()?;
        self.mutations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        let before = state.reports.len();
        state.reports.retain(|r| &r.id != id);
        Ok(state.reports.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use straywatch_report_models::{Location, ReportCategory};

    fn input(category: ReportCategory) -> NewReport {
        NewReport::new(category, Location::new(34.15, 77.58).unwrap())
    }

    #[tokio::test]
    async fn reports_come_back_newest_first_and_filtered_by_owner() {
        let backend = MemoryBackend::new();
        let alice = backend.add_account("alice@example.com", "secret1");
        let first = backend.seed(&input(ReportCategory::Sighting), Some(&alice.id));
        let second = backend.seed(&input(ReportCategory::Bite), None);
        let third = backend.seed(&input(ReportCategory::Garbage), Some(&alice.id));

        let all = backend.select_reports(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![third.id.clone(), second.id, first.id.clone()]);

        let mine = backend.select_reports(Some(&alice.id)).await.unwrap();
        let ids: Vec<_> = mine.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[tokio::test]
    async fn sign_in_checks_password_and_notifies() {
        let backend = MemoryBackend::new();
        let identity = backend.add_account("bob@example.com", "hunter22");
        let mut events = backend.subscribe();

        let err = backend
            .sign_in("bob@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let signed_in = backend
            .sign_in("bob@example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(signed_in, identity);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn(identity.clone())
        );
        assert_eq!(backend.current_identity().await.unwrap(), Some(identity));

        backend.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
        assert_eq!(backend.current_identity().await.unwrap(), None);
        assert_eq!(backend.session_queries(), 2);
    }

    #[tokio::test]
    async fn missing_ids_report_absence() {
        let backend = MemoryBackend::new();
        let missing = ReportId::from("nope");
        assert!(
            backend
                .update_report(&missing, &ReportPatch::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(!backend.delete_report(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn injected_failure_hits_next_call_only() {
        let backend = MemoryBackend::new();
        backend.fail_next("connection reset");
        let err = backend.select_reports(None).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
        assert!(backend.select_reports(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_rejects_everything() {
        let backend = MemoryBackend::unconfigured();
        assert!(!backend.is_configured());
        assert!(matches!(
            backend.select_reports(None).await,
            Err(BackendError::NotConfigured)
        ));
        assert!(matches!(
            backend.sign_in("a", "b").await,
            Err(BackendError::NotConfigured)
        ));
    }
}
