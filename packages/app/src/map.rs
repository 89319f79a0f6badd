//! Map projection.
//!
//! [`MapView`] turns the current report list and UI selection into what a
//! map widget should draw. In report mode it draws one circle per report;
//! in selection mode it draws only the picked point and forwards clicks.
//! The two sets are never shown together.

use straywatch_report_models::{
    Location, Report, ReportId, SELECTION_MARKER_COLOR, SELECTION_MARKER_RADIUS, format_date,
};

use crate::region::Region;

/// Popup attached to a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    /// Details of one report.
    Report {
        /// Category label, e.g. "Bite Incident".
        label: &'static str,
        /// Reported count.
        count: u32,
        /// Severity label, when set.
        severity: Option<&'static str>,
        /// Notes, when present.
        notes: Option<String>,
        /// Formatted creation time.
        date: String,
    },
    /// The point being picked.
    Selection {
        /// Coordinates to five decimals.
        coordinates: String,
    },
}

/// One circle marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// The report drawn, `None` for the selection marker.
    pub report: Option<ReportId>,
    /// Circle centre.
    pub location: Location,
    /// Circle radius in pixels.
    pub radius: u32,
    /// Fill colour as a hex string.
    pub color: &'static str,
    /// Popup shown on click.
    pub popup: Popup,
}

/// Map centre and zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Map centre.
    pub centre: Location,
    /// Zoom level.
    pub zoom: u8,
}

/// Projection of reports or the current selection onto a map.
#[derive(Debug, Clone)]
pub struct MapView {
    region: Region,
    select_mode: bool,
}

impl MapView {
    /// A map showing reports.
    #[must_use]
    pub const fn new(region: Region) -> Self {
        Self {
            region,
            select_mode: false,
        }
    }

    /// A map used for picking a location.
    #[must_use]
    pub const fn selecting(region: Region) -> Self {
        Self {
            region,
            select_mode: true,
        }
    }

    /// Whether clicks select a point.
    #[must_use]
    pub const fn is_select_mode(&self) -> bool {
        self.select_mode
    }

    /// The region the map is centred on.
    #[must_use]
    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// Markers to draw for `reports` and the current `selected` point.
    #[must_use]
    pub fn markers(&self, reports: &[Report], selected: Option<Location>) -> Vec<Marker> {
        if self.select_mode {
            return selected.map(selection_marker).into_iter().collect();
        }
        reports.iter().map(report_marker).collect()
    }

    /// Where the map should look: the selected point up close, otherwise
    /// the region overview.
    ///
    /// # Errors
    ///
    /// Returns an error if no point is selected and the region centre is
    /// invalid.
    pub fn viewport(
        &self,
        selected: Option<Location>,
    ) -> Result<Viewport, straywatch_report_models::InvalidLocationError> {
        Ok(match selected {
            Some(centre) => Viewport {
                centre,
                zoom: self.region.focus_zoom,
            },
            None => Viewport {
                centre: self.region.centre()?,
                zoom: self.region.zoom,
            },
        })
    }

    /// Handles a click at `lat`/`lng`. In selection mode `on_select` is
    /// called with the clicked point; otherwise the click is ignored.
    /// Returns whether the callback ran.
    pub fn click<F>(&self, lat: f64, lng: f64, on_select: F) -> bool
    where
        F: FnOnce(Location),
    {
        if !self.select_mode {
            return false;
        }
        match Location::new(lat, lng) {
            Ok(location) => {
                on_select(location);
                true
            }
            Err(e) => {
                log::warn!("Ignoring map click: {e}");
                false
            }
        }
    }
}

fn report_marker(report: &Report) -> Marker {
    Marker {
        report: Some(report.id.clone()),
        location: report.location,
        radius: report.marker_radius(),
        color: report.category.color(),
        popup: Popup::Report {
            label: report.category.label(),
            count: report.count.get(),
            severity: report.severity.map(straywatch_report_models::Severity::label),
            notes: report.notes.clone().filter(|n| !n.is_empty()),
            date: format_date(&report.created_at),
        },
    }
}

fn selection_marker(location: Location) -> Marker {
    Marker {
        report: None,
        location,
        radius: SELECTION_MARKER_RADIUS,
        color: SELECTION_MARKER_COLOR,
        popup: Popup::Selection {
            coordinates: location.to_string(),
        },
    }
}
