//! Home screen: statistics, the report map and the add-report flow.

use std::time::Instant;

use straywatch_api::ApiError;
use straywatch_api::feed::{FeedScope, ReportFeed};
use straywatch_report_models::{CategoryCounts, Report};

use crate::AppContext;
use crate::form::{FormError, ReportForm};
use crate::map::{MapView, Marker, Viewport};
use crate::session::{self, SessionError};

/// Banner title shown while the backend is not configured.
pub const NOT_CONFIGURED_TITLE: &str = "Supabase not configured";

/// Banner detail shown while the backend is not configured.
pub const NOT_CONFIGURED_DETAIL: &str = "Set PUBLIC_SUPABASE_URL and PUBLIC_SUPABASE_ANON_KEY \
     environment variables to enable all features.";

/// The home screen view-model.
pub struct HomeScreen {
    ctx: AppContext,
    feed: ReportFeed,
    map: MapView,
    form: ReportForm,
}

impl HomeScreen {
    /// Creates the screen; nothing is loaded until [`Self::load`].
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self {
            feed: ReportFeed::new(FeedScope::All),
            map: MapView::new(ctx.region.clone()),
            form: ReportForm::new(ctx.clone()),
            ctx,
        }
    }

    /// Resolves the session and loads the report list if it is stale.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the reports could not be fetched. The
    /// previously loaded reports are kept.
    pub async fn load(&mut self, now: Instant) -> Result<&[Report], ApiError> {
        self.ctx.auth.initialize().await;
        self.feed.load(&self.ctx.api, now).await
    }

    /// Fetches the report list regardless of staleness.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the fetch fails.
    pub async fn refresh(&mut self, now: Instant) -> Result<&[Report], ApiError> {
        self.feed.refetch(&self.ctx.api, now).await
    }

    /// Whether to show the "not configured" banner.
    #[must_use]
    pub fn show_config_banner(&self) -> bool {
        !self.ctx.api.is_configured()
    }

    /// Reports from the last fetch, newest first.
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        self.feed.reports()
    }

    /// Totals for the statistics bar.
    #[must_use]
    pub fn stats(&self) -> CategoryCounts {
        self.feed.stats()
    }

    /// Markers for the main map.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        self.map
            .markers(self.feed.reports(), self.ctx.ui.selected_location())
    }

    /// Viewport for the main map.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured region centre is invalid.
    pub fn viewport(&self) -> Result<Viewport, straywatch_report_models::InvalidLocationError> {
        self.map.viewport(self.ctx.ui.selected_location())
    }

    /// Starts adding a report. Signed-out users get the auth dialog and a
    /// hint instead. Returns whether the report form opened.
    pub fn add_report(&mut self) -> bool {
        if self.ctx.auth.identity().is_none() {
            self.ctx.ui.open_auth_modal();
            self.ctx
                .toasts
                .info("Please sign in to submit a report", None);
            return false;
        }
        self.form.open_create();
        true
    }

    /// The report form.
    pub const fn form(&mut self) -> &mut ReportForm {
        &mut self.form
    }

    /// Submits the report form and refreshes the list on success.
    ///
    /// # Errors
    ///
    /// Returns [`FormError`] if the submission fails.
    pub async fn submit_report(&mut self, now: Instant) -> Result<Report, FormError> {
        let report = self.form.submit().await?;
        let refreshed = self.feed.refetch(&self.ctx.api, now).await.map(|_| ());
        if let Err(e) = refreshed {
            log::warn!("Report saved but refresh failed: {e}");
            self.feed.invalidate();
        }
        Ok(report)
    }

    /// Signs out.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backend rejects the sign-out.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        session::sign_out(&self.ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;
    use std::sync::Arc;
    use straywatch_backend::Backend;
    use straywatch_backend::memory::MemoryBackend;
    use straywatch_report_models::{Location, NewReport, ReportCategory};

    use crate::notify::ToastKind;

    fn leh() -> Location {
        Location::new(34.1526, 77.5771).unwrap()
    }

    fn input(category: ReportCategory, count: u32) -> NewReport {
        NewReport {
            count: NonZeroU32::new(count).unwrap(),
            ..NewReport::new(category, leh())
        }
    }

    #[tokio::test]
    async fn loads_stats_and_markers() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(&input(ReportCategory::Sighting, 2), None);
        backend.seed(&input(ReportCategory::Bite, 3), None);
        backend.seed(&input(ReportCategory::Sighting, 1), None);

        let mut home = HomeScreen::new(AppContext::new(backend.clone()));
        home.load(Instant::now()).await.unwrap();

        assert!(!home.show_config_banner());
        assert_eq!(
            home.stats(),
            CategoryCounts {
                sighting: 3,
                bite: 3,
                garbage: 0
            }
        );
        assert_eq!(home.markers().len(), 3);
        assert_eq!(home.viewport().unwrap().zoom, 13);
        assert_eq!(backend.session_queries(), 1);
    }

    #[tokio::test]
    async fn unconfigured_shows_banner_and_empty_map() {
        let mut home = HomeScreen::new(AppContext::new(Arc::new(MemoryBackend::unconfigured())));
        assert!(home.load(Instant::now()).await.unwrap().is_empty());
        assert!(home.show_config_banner());
        assert_eq!(home.stats(), CategoryCounts::default());
    }

    #[tokio::test]
    async fn add_report_when_signed_out_prompts_sign_in() {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = AppContext::new(backend);
        let mut home = HomeScreen::new(ctx.clone());
        home.load(Instant::now()).await.unwrap();

        assert!(!home.add_report());
        assert!(ctx.ui.is_auth_modal_open());
        assert!(!ctx.ui.is_report_form_open());
        let toast = ctx.toasts.last().unwrap();
        assert_eq!(toast.kind, ToastKind::Info);
        assert_eq!(toast.title, "Please sign in to submit a report");
    }

    #[tokio::test]
    async fn submit_refreshes_the_feed() {
        let backend = Arc::new(MemoryBackend::new());
        backend.add_account("a@example.com", "secret1");
        backend.sign_in("a@example.com", "secret1").await.unwrap();
        let ctx = AppContext::new(backend.clone());
        let mut home = HomeScreen::new(ctx.clone());
        let now = Instant::now();
        home.load(now).await.unwrap();
        assert!(home.reports().is_empty());

        assert!(home.add_report());
        ctx.ui.set_selected_location(Some(leh()));
        home.form().category = ReportCategory::Garbage;
        let report = home.submit_report(now).await.unwrap();

        assert_eq!(home.reports(), std::slice::from_ref(&report));
        assert_eq!(home.stats().garbage, 1);
        assert!(!ctx.ui.is_report_form_open());
    }
}
