//! Report form for creating and editing reports.
//!
//! The form owns the editable fields (category, count text, severity,
//! notes); the location lives in the shared [`UiState`](crate::ui::UiState)
//! selection so the map and the form agree on it. Submission validates in
//! a fixed order and stops at the first failure:
//!
//! 1. someone is signed in,
//! 2. a location is selected,
//! 3. the count is a whole number of at least 1.

use std::num::NonZeroU32;

use straywatch_api::ApiError;
use straywatch_report_models::{
    InvalidLocationError, Location, NewReport, Report, ReportCategory, ReportId, ReportPatch,
    Severity,
};
use thiserror::Error;

use crate::AppContext;
use crate::map::MapView;

/// Why a submission was rejected.
///
/// The display text of each validation variant is the toast title shown
/// to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// Nobody is signed in.
    #[error("Please sign in to submit a report")]
    AuthRequired,
    /// No location has been selected.
    #[error("Please select a location")]
    LocationRequired,
    /// The count is not a whole number of at least 1.
    #[error("Count must be at least 1")]
    InvalidCount,
    /// The create or update call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

const DEFAULT_COUNT: &str = "1";

/// The create/edit report form.
pub struct ReportForm {
    ctx: AppContext,
    editing: Option<ReportId>,
    show_map: bool,
    /// Selected report type.
    pub category: ReportCategory,
    /// Count as typed by the user.
    pub count: String,
    /// Selected severity, if any.
    pub severity: Option<Severity>,
    /// Free-text notes; blank means none.
    pub notes: String,
}

impl ReportForm {
    /// Creates a closed form with default fields.
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            editing: None,
            show_map: false,
            category: ReportCategory::default(),
            count: DEFAULT_COUNT.to_string(),
            severity: None,
            notes: String::new(),
        }
    }

    fn reset_fields(&mut self) {
        self.category = ReportCategory::default();
        self.count = DEFAULT_COUNT.to_string();
        self.severity = None;
        self.notes.clear();
        self.show_map = false;
    }

    /// Opens the form for a new report. Fields are reset; an already
    /// selected location is kept.
    pub fn open_create(&mut self) {
        self.editing = None;
        self.reset_fields();
        self.ctx.ui.open_report_form(None);
    }

    /// Opens the form pre-populated from `report`, including its location.
    pub fn open_edit(&mut self, report: &Report) {
        self.reset_fields();
        self.editing = Some(report.id.clone());
        self.category = report.category;
        self.count = report.count.to_string();
        self.severity = report.severity;
        self.notes = report.notes.clone().unwrap_or_default();
        self.ctx.ui.open_report_form(Some(report.location));
    }

    /// The report being edited, `None` when creating.
    #[must_use]
    pub const fn editing(&self) -> Option<&ReportId> {
        self.editing.as_ref()
    }

    /// Whether the form is shown.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ctx.ui.is_report_form_open()
    }

    /// Dialog title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Report"
        } else {
            "Submit New Report"
        }
    }

    /// The location the report will be filed at.
    #[must_use]
    pub fn selected_location(&self) -> Option<Location> {
        self.ctx.ui.selected_location()
    }

    /// Asks the position source for the current location and selects it.
    /// Returns whether a location was selected.
    pub async fn use_device_location(&self) -> bool {
        match self.ctx.locator.current_location().await {
            Ok(location) => {
                self.ctx.ui.set_selected_location(Some(location));
                self.ctx.toasts.success("Location detected", None);
                true
            }
            Err(e) => {
                log::warn!("Geolocation failed: {e}");
                self.ctx
                    .toasts
                    .error("Could not get location", Some(&e.to_string()));
                false
            }
        }
    }

    /// Shows or hides the map picker and returns the new visibility.
    pub const fn toggle_map(&mut self) -> bool {
        self.show_map = !self.show_map;
        self.show_map
    }

    /// Whether the map picker is shown.
    #[must_use]
    pub const fn is_map_shown(&self) -> bool {
        self.show_map
    }

    /// The picker map, while it is shown.
    #[must_use]
    pub fn picker(&self) -> Option<MapView> {
        self.show_map
            .then(|| MapView::selecting(self.ctx.region.clone()))
    }

    /// Selects the point the user clicked on the picker map.
    pub fn select_location(&self, location: Location) {
        self.ctx.ui.set_selected_location(Some(location));
        self.ctx.toasts.success("Location selected", None);
    }

    /// Selects typed-in coordinates. Invalid coordinates leave the
    /// selection untouched and raise an "Invalid location" toast.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLocationError`] if the coordinates are out of range
    /// or not finite.
    pub fn enter_coordinates(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Location, InvalidLocationError> {
        match Location::new(lat, lng) {
            Ok(location) => {
                self.select_location(location);
                Ok(location)
            }
            Err(e) => {
                self.ctx
                    .toasts
                    .error("Invalid location", Some(&e.to_string()));
                Err(e)
            }
        }
    }

    /// Handles a click on the picker map. Ignored while the picker is
    /// hidden. Returns whether a location was selected.
    pub fn click_map(&self, lat: f64, lng: f64) -> bool {
        self.picker()
            .is_some_and(|map| map.click(lat, lng, |location| self.select_location(location)))
    }

    /// Checks the fields and builds the report input.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`FormError`].
    pub fn validate(&self) -> Result<NewReport, FormError> {
        if self.ctx.auth.identity().is_none() {
            return Err(FormError::AuthRequired);
        }
        let location = self
            .ctx
            .ui
            .selected_location()
            .ok_or(FormError::LocationRequired)?;
        let count = parse_count(&self.count)?;
        let notes = self.notes.trim();

        Ok(NewReport {
            category: self.category,
            location,
            count,
            severity: self.severity,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
        })
    }

    /// Validates and saves the report, then closes the form.
    ///
    /// Every outcome is reported as a toast. On failure the form stays
    /// open with its fields intact.
    ///
    /// # Errors
    ///
    /// Returns [`FormError`] if validation or the save fails.
    pub async fn submit(&mut self) -> Result<Report, FormError> {
        let input = match self.validate() {
            Ok(input) => input,
            Err(e) => {
                self.ctx.toasts.error(&e.to_string(), None);
                return Err(e);
            }
        };

        let result = match &self.editing {
            Some(id) => {
                self.ctx
                    .api
                    .update_report(id, &ReportPatch::replace_all(&input))
                    .await
            }
            None => self.ctx.api.create_report(&input).await,
        };

        let editing = self.editing.is_some();
        match result {
            Ok(report) => {
                self.ctx.toasts.success(
                    if editing {
                        "Report updated successfully"
                    } else {
                        "Report submitted successfully"
                    },
                    None,
                );
                self.close();
                Ok(report)
            }
            Err(e) => {
                log::error!("Failed to save report: {e}");
                self.ctx.toasts.error(
                    if editing {
                        "Failed to update report"
                    } else {
                        "Failed to submit report"
                    },
                    Some(&e.to_string()),
                );
                Err(e.into())
            }
        }
    }

    /// Closes the form, resets its fields and clears the selection.
    pub fn close(&mut self) {
        self.ctx.ui.close_report_form();
        self.editing = None;
        self.reset_fields();
    }
}

/// Parses a user-entered count.
///
/// # Errors
///
/// Returns [`FormError::InvalidCount`] unless the text is a whole number of
/// at least 1.
pub fn parse_count(text: &str) -> Result<NonZeroU32, FormError> {
    text.trim()
        .parse::<NonZeroU32>()
        .map_err(|_| FormError::InvalidCount)
}
