//! Cached report lists with a staleness window.
//!
//! A [`ReportFeed`] remembers the last list it fetched and when. Reading
//! through [`ReportFeed::load`] only goes to the backend when nothing has
//! been fetched yet, the feed was invalidated, or the data is older than
//! the staleness window. Mutating screens call [`ReportFeed::refetch`]
//! after a successful write.

use std::time::{Duration, Instant};

use straywatch_report_models::{CategoryCounts, Report, UserId, aggregate_by_category};

use crate::{ApiError, ReportsApi};

/// How long fetched reports are served without asking the backend again.
pub const STALE_AFTER: Duration = Duration::from_secs(30);

/// Which reports a feed holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    /// Every report.
    All,
    /// Reports created by one user.
    Owner(UserId),
}

/// A cached, scoped list of reports.
#[derive(Debug, Clone)]
pub struct ReportFeed {
    scope: FeedScope,
    reports: Vec<Report>,
    fetched_at: Option<Instant>,
    stale_after: Duration,
}

impl ReportFeed {
    /// Creates an empty feed for `scope`.
    #[must_use]
    pub const fn new(scope: FeedScope) -> Self {
        Self {
            scope,
            reports: Vec::new(),
            fetched_at: None,
            stale_after: STALE_AFTER,
        }
    }

    /// Overrides the staleness window.
    #[must_use]
    pub const fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Which reports this feed fetches.
    #[must_use]
    pub const fn scope(&self) -> &FeedScope {
        &self.scope
    }

    /// The reports from the last successful fetch, newest first.
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Category totals over the cached reports.
    #[must_use]
    pub fn stats(&self) -> CategoryCounts {
        aggregate_by_category(&self.reports)
    }

    /// Whether the next [`load`](Self::load) at `now` would hit the
    /// backend.
    #[must_use]
    pub fn is_stale(&self, now: Instant) -> bool {
        self.fetched_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.stale_after)
    }

    /// Marks the cached data as stale without discarding it.
    pub const fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Returns the cached reports, fetching first if they are stale.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if a fetch was needed and failed. The previous
    /// reports stay cached.
    pub async fn load(&mut self, api: &ReportsApi, now: Instant) -> Result<&[Report], ApiError> {
        if self.is_stale(now) {
            self.refetch(api, now).await?;
        }
        Ok(&self.reports)
    }

    /// Fetches the reports unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the fetch fails. The previous reports stay
    /// cached.
    pub async fn refetch(&mut self, api: &ReportsApi, now: Instant) -> Result<&[Report], ApiError> {
        let reports = match &self.scope {
            FeedScope::All => api.list_all_reports().await,
            FeedScope::Owner(owner) => api.list_reports_by_owner(owner).await,
        }
        .inspect_err(|e| log::error!("Failed to fetch reports: {e}"))?;

        self.reports = reports;
        self.fetched_at = Some(now);
        Ok(&self.reports)
    }
}
