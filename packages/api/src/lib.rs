#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data access layer for incident reports.
//!
//! [`ReportsApi`] is the only place the rest of the client reads or writes
//! reports. It turns [`BackendError`]s into the smaller [`ApiError`]
//! taxonomy the view-models render, applies the "reads never fail when the
//! backend is unconfigured" rule, and enforces that creation requires a
//! signed-in user. [`feed::ReportFeed`] caches the last fetched list.

pub mod feed;

use std::sync::Arc;

use straywatch_backend::{Backend, BackendError};
use straywatch_report_models::{NewReport, Report, ReportId, ReportPatch, UserId};
use thiserror::Error;

pub use straywatch_report_models::{CategoryCounts, aggregate_by_category};

/// Errors surfaced by report operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No user is signed in.
    #[error("User must be authenticated to create reports")]
    AuthRequired,

    /// No report has the given id.
    #[error("Report {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: ReportId,
    },

    /// The backend could not be reached or rejected the request.
    #[error("{message}")]
    Transport {
        /// The backend's message.
        message: String,
    },
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        let message = match e {
            BackendError::NotConfigured => "backend is not configured".to_string(),
            other => other.to_string(),
        };
        Self::Transport { message }
    }
}

/// Report operations against a [`Backend`].
#[derive(Clone)]
pub struct ReportsApi {
    backend: Arc<dyn Backend>,
}

impl ReportsApi {
    /// Creates the data access layer over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The backend this layer talks to.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Whether the backend has a URL and key.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    /// Lists every report, newest first. Empty when the backend is not
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the query fails.
    pub async fn list_all_reports(&self) -> Result<Vec<Report>, ApiError> {
        self.select(None).await
    }

    /// Lists the reports created by `owner`, newest first. Empty when the
    /// backend is not configured.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the query fails.
    pub async fn list_reports_by_owner(&self, owner: &UserId) -> Result<Vec<Report>, ApiError> {
        self.select(Some(owner)).await
    }

    async fn select(&self, owner: Option<&UserId>) -> Result<Vec<Report>, ApiError> {
        if !self.backend.is_configured() {
            log::debug!("Backend not configured, returning no reports");
            return Ok(Vec::new());
        }
        let reports = self.backend.select_reports(owner).await?;
        log::debug!("Fetched {} reports", reports.len());
        Ok(reports)
    }

    /// Creates a report owned by the signed-in user.
    ///
    /// # Errors
    ///
    /// * [`ApiError::AuthRequired`] if nobody is signed in. Nothing is
    ///   written in that case.
    /// * [`ApiError::Transport`] if the session check or the insert fails.
    pub async fn create_report(&self, input: &NewReport) -> Result<Report, ApiError> {
        let Some(identity) = self.backend.current_identity().await? else {
            return Err(ApiError::AuthRequired);
        };
        let report = self.backend.insert_report(input, &identity.id).await?;
        log::info!("Created {} report {}", report.category, report.id);
        Ok(report)
    }

    /// Applies a partial update to the report with `id` and returns the
    /// updated record.
    ///
    /// # Errors
    ///
    /// * [`ApiError::NotFound`] if no report has that id.
    /// * [`ApiError::Transport`] if the update fails.
    pub async fn update_report(
        &self,
        id: &ReportId,
        patch: &ReportPatch,
    ) -> Result<Report, ApiError> {
        // An empty PATCH body is rejected by the backend; look the row up
        // instead so the caller still gets the current record or NotFound.
        if patch.is_empty() {
            return self
                .backend
                .select_reports(None)
                .await?
                .into_iter()
                .find(|r| &r.id == id)
                .ok_or_else(|| ApiError::NotFound { id: id.clone() });
        }

        let report = self
            .backend
            .update_report(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound { id: id.clone() })?;
        log::info!("Updated report {id}");
        Ok(report)
    }

    /// Permanently deletes the report with `id`.
    ///
    /// # Errors
    ///
    /// * [`ApiError::NotFound`] if no report has that id.
    /// * [`ApiError::Transport`] if the delete fails.
    pub async fn delete_report(&self, id: &ReportId) -> Result<(), ApiError> {
        if self.backend.delete_report(id).await? {
            log::info!("Deleted report {id}");
            Ok(())
        } else {
            Err(ApiError::NotFound { id: id.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use straywatch_backend::memory::MemoryBackend;
    use straywatch_report_models::{Location, ReportCategory, Severity};

    fn input(category: ReportCategory, count: u32) -> NewReport {
        NewReport {
            count: NonZeroU32::new(count).unwrap(),
            ..NewReport::new(category, Location::new(34.16, 77.58).unwrap())
        }
    }

    fn setup() -> (Arc<MemoryBackend>, ReportsApi) {
        let backend = Arc::new(MemoryBackend::new());
        let api = ReportsApi::new(backend.clone());
        (backend, api)
    }

    async fn signed_in(backend: &MemoryBackend) -> straywatch_report_models::Identity {
        backend.add_account("kunzang@example.com", "julley123");
        backend
            .sign_in("kunzang@example.com", "julley123")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_requires_identity_and_writes_nothing() {
        let (backend, api) = setup();
        let err = api
            .create_report(&input(ReportCategory::Bite, 1))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::AuthRequired);
        assert_eq!(backend.mutations(), 0);
        assert!(backend.reports().is_empty());
    }

    #[tokio::test]
    async fn create_attaches_owner_and_lists_newest_first() {
        let (backend, api) = setup();
        let me = signed_in(&backend).await;
        let other = backend.add_account("dorje@example.com", "pw1234");
        backend.seed(&input(ReportCategory::Garbage, 1), Some(&other.id));

        let created = api
            .create_report(&input(ReportCategory::Sighting, 4))
            .await
            .unwrap();
        assert_eq!(created.owner, Some(me.id.clone()));
        assert_eq!(created.count.get(), 4);

        let all = api.list_all_reports().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, created.id);

        let mine = api.list_reports_by_owner(&me.id).await.unwrap();
        assert_eq!(mine, vec![created]);
    }

    #[tokio::test]
    async fn update_replaces_present_fields() {
        let (backend, api) = setup();
        let report = backend.seed(&input(ReportCategory::Sighting, 2), None);
        let patch = ReportPatch {
            severity: Some(Some(Severity::High)),
            notes: Some(Some("near Shanti Stupa".to_string())),
            ..ReportPatch::default()
        };
        let updated = api.update_report(&report.id, &patch).await.unwrap();
        assert_eq!(updated.severity, Some(Severity::High));
        assert_eq!(updated.notes.as_deref(), Some("near Shanti Stupa"));
        assert_eq!(updated.count.get(), 2);
        assert_eq!(updated.created_at, report.created_at);
    }

    #[tokio::test]
    async fn update_moves_report_to_validated_location() {
        let (backend, api) = setup();
        let report = backend.seed(&input(ReportCategory::Garbage, 1), None);
        let moved = Location::new(34.17, 77.59).unwrap();

        let updated = api
            .update_report(&report.id, &ReportPatch::default().with_location(moved))
            .await
            .unwrap();
        assert_eq!(updated.location, moved);
        assert_eq!(updated.category, ReportCategory::Garbage);
        assert_eq!(backend.reports()[0].location, moved);
    }

    #[tokio::test]
    async fn empty_patch_returns_current_record_or_not_found() {
        let (backend, api) = setup();
        let report = backend.seed(&input(ReportCategory::Bite, 1), None);
        let same = api
            .update_report(&report.id, &ReportPatch::default())
            .await
            .unwrap();
        assert_eq!(same, report);
        assert_eq!(backend.mutations(), 0);

        let missing = ReportId::from("missing");
        assert_eq!(
            api.update_report(&missing, &ReportPatch::default()).await,
            Err(ApiError::NotFound { id: missing })
        );
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found() {
        let (_backend, api) = setup();
        let id = ReportId::from("gone");
        let patch = ReportPatch {
            count: NonZeroU32::new(3),
            ..ReportPatch::default()
        };
        assert_eq!(
            api.update_report(&id, &patch).await,
            Err(ApiError::NotFound { id })
        );
    }

    #[tokio::test]
    async fn delete_missing_id_leaves_set_unchanged() {
        let (backend, api) = setup();
        backend.seed(&input(ReportCategory::Garbage, 1), None);
        let before = api.list_all_reports().await.unwrap();

        let id = ReportId::from("gone");
        assert_eq!(
            api.delete_report(&id).await,
            Err(ApiError::NotFound { id })
        );
        assert_eq!(api.list_all_reports().await.unwrap(), before);
    }

    #[tokio::test]
    async fn delete_removes_report() {
        let (backend, api) = setup();
        let report = backend.seed(&input(ReportCategory::Garbage, 1), None);
        api.delete_report(&report.id).await.unwrap();
        assert!(api.list_all_reports().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_reads_are_empty_and_writes_fail() {
        let api = ReportsApi::new(Arc::new(MemoryBackend::unconfigured()));
        assert!(api.list_all_reports().await.unwrap().is_empty());
        assert!(
            api.list_reports_by_owner(&UserId::from("u"))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            api.create_report(&input(ReportCategory::Bite, 1)).await,
            Err(ApiError::Transport {
                message: "backend is not configured".to_string()
            })
        );
    }

    #[tokio::test]
    async fn backend_message_is_carried() {
        let (backend, api) = setup();
        backend.fail_next("permission denied for table reports");
        assert_eq!(
            api.list_all_reports().await,
            Err(ApiError::Transport {
                message: "permission denied for table reports".to_string()
            })
        );
    }
}
