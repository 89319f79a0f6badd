//! Profile screen: the signed-in user's own reports, with edit and delete.

use std::time::Instant;

use straywatch_api::ApiError;
use straywatch_api::feed::{FeedScope, ReportFeed};
use straywatch_report_models::{Identity, Report, ReportId};
use thiserror::Error;

use crate::AppContext;
use crate::form::{FormError, ReportForm};

/// Why the profile could not be shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// Nobody is signed in.
    #[error("Sign in to view your reports")]
    SignedOut,
    /// Loading the reports failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The profile screen view-model.
pub struct ProfileScreen {
    ctx: AppContext,
    feed: Option<ReportFeed>,
    form: ReportForm,
    pending_delete: Option<ReportId>,
}

impl ProfileScreen {
    /// Creates the screen; nothing is loaded until [`Self::load`].
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self {
            form: ReportForm::new(ctx.clone()),
            ctx,
            feed: None,
            pending_delete: None,
        }
    }

    /// The user whose reports are shown.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.ctx.auth.identity()
    }

    /// Resolves the session and loads the user's reports if stale.
    ///
    /// # Errors
    ///
    /// * [`ProfileError::SignedOut`] if nobody is signed in.
    /// * [`ProfileError::Api`] if the fetch fails.
    pub async fn load(&mut self, now: Instant) -> Result<&[Report], ProfileError> {
        self.ctx.auth.initialize().await;
        let Some(identity) = self.ctx.auth.identity() else {
            self.feed = None;
            return Err(ProfileError::SignedOut);
        };

        let scope = FeedScope::Owner(identity.id);
        if self.feed.as_ref().is_some_and(|feed| *feed.scope() != scope) {
            self.feed = None;
        }
        let feed = self.feed.get_or_insert_with(|| ReportFeed::new(scope));
        Ok(feed.load(&self.ctx.api, now).await?)
    }

    /// The loaded reports, newest first.
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        match &self.feed {
            Some(feed) => feed.reports(),
            None => &[],
        }
    }

    /// "N reports submitted".
    #[must_use]
    pub fn summary(&self) -> String {
        let n = self.reports().len();
        format!("{n} report{} submitted", if n == 1 { "" } else { "s" })
    }

    /// Opens the auth dialog from the signed-out view.
    pub fn prompt_sign_in(&self) {
        self.ctx.ui.open_auth_modal();
    }

    /// Opens the form pre-populated with the report `id`. Returns `false`
    /// if it is not in the list.
    pub fn edit(&mut self, id: &ReportId) -> bool {
        let Some(report) = self.reports().iter().find(|r| &r.id == id).cloned() else {
            return false;
        };
        self.form.open_edit(&report);
        true
    }

    /// The edit form.
    pub const fn form(&mut self) -> &mut ReportForm {
        &mut self.form
    }

    /// Submits the form and refreshes the list on success.
    ///
    /// # Errors
    ///
    /// Returns [`FormError`] if the submission fails.
    pub async fn submit_edit(&mut self, now: Instant) -> Result<Report, FormError> {
        let report = self.form.submit().await?;
        self.refresh(now).await;
        Ok(report)
    }

    /// Asks for confirmation before deleting `id`. Only reports in the
    /// signed-in user's own list can be requested; returns `false` (and
    /// leaves any pending request alone) for any other id.
    pub fn request_delete(&mut self, id: ReportId) -> bool {
        if !self.reports().iter().any(|r| r.id == id) {
            return false;
        }
        self.pending_delete = Some(id);
        true
    }

    /// Drops the pending delete request.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// The report awaiting delete confirmation.
    #[must_use]
    pub const fn pending_delete(&self) -> Option<&ReportId> {
        self.pending_delete.as_ref()
    }

    /// Deletes the report awaiting confirmation. Does nothing if none is
    /// pending. On failure the request stays pending.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the delete fails.
    pub async fn confirm_delete(&mut self, now: Instant) -> Result<Option<ReportId>, ApiError> {
        let Some(id) = self.pending_delete.clone() else {
            return Ok(None);
        };

        match self.ctx.api.delete_report(&id).await {
            Ok(()) => {
                self.ctx.toasts.success("Report deleted successfully", None);
                self.pending_delete = None;
                self.refresh(now).await;
                Ok(Some(id))
            }
            Err(e) => {
                log::error!("Failed to delete report {id}: {e}");
                self.ctx
                    .toasts
                    .error("Failed to delete report", Some(&e.to_string()));
                Err(e)
            }
        }
    }

    async fn refresh(&mut self, now: Instant) {
        let Some(feed) = &mut self.feed else {
            return;
        };
        let refreshed = feed.refetch(&self.ctx.api, now).await.map(|_| ());
        if let Err(e) = refreshed {
            log::warn!("Failed to refresh reports: {e}");
            feed.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use straywatch_backend::Backend;
    use straywatch_backend::memory::MemoryBackend;
    use straywatch_report_models::{Location, NewReport, ReportCategory};

    fn input(category: ReportCategory) -> NewReport {
        NewReport::new(category, Location::new(34.16, 77.58).unwrap())
    }

    async fn signed_in() -> (Arc<MemoryBackend>, AppContext, Identity) {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("rigzin@example.com", "secret1");
        let identity = backend
            .sign_in("rigzin@example.com", "secret1")
            .await
            .unwrap();
        let ctx = AppContext::new(backend.clone());
        (backend, ctx, identity)
    }

    #[tokio::test]
    async fn signed_out_profile_prompts_sign_in() {
        let ctx = AppContext::new(Arc::new(MemoryBackend::new()));
        let mut profile = ProfileScreen::new(ctx.clone());
        assert_eq!(
            profile.load(Instant::now()).await,
            Err(ProfileError::SignedOut)
        );
        profile.prompt_sign_in();
        assert!(ctx.ui.is_auth_modal_open());
    }

    #[tokio::test]
    async fn lists_only_own_reports() {
        let (backend, ctx, identity) = signed_in().await;
        backend.seed(&input(ReportCategory::Bite), Some(&identity.id));
        backend.seed(&input(ReportCategory::Garbage), None);

        let mut profile = ProfileScreen::new(ctx);
        assert_eq!(profile.load(Instant::now()).await.unwrap().len(), 1);
        assert_eq!(profile.summary(), "1 report submitted");
    }

    #[tokio::test]
    async fn delete_is_two_step() {
        let (backend, ctx, identity) = signed_in().await;
        let report = backend.seed(&input(ReportCategory::Bite), Some(&identity.id));
        let mut profile = ProfileScreen::new(ctx.clone());
        let now = Instant::now();
        profile.load(now).await.unwrap();

        assert_eq!(profile.confirm_delete(now).await, Ok(None));
        assert!(profile.request_delete(report.id.clone()));
        profile.cancel_delete();
        assert_eq!(profile.confirm_delete(now).await, Ok(None));
        assert_eq!(backend.reports().len(), 1);

        assert!(profile.request_delete(report.id.clone()));
        assert_eq!(profile.confirm_delete(now).await, Ok(Some(report.id)));
        assert!(profile.reports().is_empty());
        assert_eq!(profile.summary(), "0 reports submitted");
        assert_eq!(ctx.toasts.last().unwrap().title, "Report deleted successfully");
    }

    #[tokio::test]
    async fn failed_delete_keeps_request_pending() {
        let (backend, ctx, identity) = signed_in().await;
        let report = backend.seed(&input(ReportCategory::Bite), Some(&identity.id));
        let mut profile = ProfileScreen::new(ctx.clone());
        let now = Instant::now();
        profile.load(now).await.unwrap();

        assert!(profile.request_delete(report.id.clone()));
        assert!(backend.delete_report(&report.id).await.unwrap());
        assert_eq!(
            profile.confirm_delete(now).await,
            Err(ApiError::NotFound {
                id: report.id.clone()
            })
        );
        assert_eq!(profile.pending_delete(), Some(&report.id));
        assert_eq!(profile.reports().len(), 1);
        let toast = ctx.toasts.last().unwrap();
        assert_eq!(toast.title, "Failed to delete report");
        assert_eq!(
            toast.description.as_deref(),
            Some(format!("Report {} not found", report.id).as_str())
        );
    }

    #[tokio::test]
    async fn cannot_request_delete_of_someone_elses_report() {
        let (backend, ctx, identity) = signed_in().await;
        let other = backend.add_account("dorje@example.com", "secret2");
        let foreign = backend.seed(&input(ReportCategory::Garbage), Some(&other.id));
        let own = backend.seed(&input(ReportCategory::Bite), Some(&identity.id));
        let mut profile = ProfileScreen::new(ctx.clone());
        let now = Instant::now();
        profile.load(now).await.unwrap();

        assert!(!profile.request_delete(foreign.id.clone()));
        assert!(!profile.request_delete(ReportId::from("unknown")));
        assert_eq!(profile.pending_delete(), None);
        assert_eq!(profile.confirm_delete(now).await, Ok(None));
        assert_eq!(backend.reports().len(), 2);

        assert!(profile.request_delete(own.id.clone()));
        assert!(!profile.request_delete(foreign.id));
        assert_eq!(profile.pending_delete(), Some(&own.id));
    }

    #[tokio::test]
    async fn edit_opens_prepopulated_form_and_refreshes() {
        let (backend, ctx, identity) = signed_in().await;
        let report = backend.seed(&input(ReportCategory::Sighting), Some(&identity.id));
        let mut profile = ProfileScreen::new(ctx.clone());
        let now = Instant::now();
        profile.load(now).await.unwrap();

        assert!(!profile.edit(&ReportId::from("unknown")));
        assert!(profile.edit(&report.id));
        assert_eq!(ctx.ui.selected_location(), Some(report.location));
        assert_eq!(profile.form().editing(), Some(&report.id));

        profile.form().count = "6".to_string();
        let updated = profile.submit_edit(now).await.unwrap();
        assert_eq!(updated.count.get(), 6);
        assert_eq!(profile.reports()[0].count.get(), 6);
        assert_eq!(ctx.ui.selected_location(), None);
    }
}
