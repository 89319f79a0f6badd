#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report, location and identity types shared across StrayWatch.
//!
//! These types mirror the rows of the backend `reports` table and the
//! authenticated user returned by the backend session. Everything that is
//! keyed by report category (colours, labels, aggregate counts) is an
//! exhaustive `match` so that adding a category fails to compile until
//! every lookup handles it.

use std::num::NonZeroU32;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Marker radius floor, before the per-count increment is applied.
pub const MARKER_RADIUS_BASE: u32 = 8;

/// Marker radius increment per unit of count.
pub const MARKER_RADIUS_PER_COUNT: u32 = 2;

/// Upper bound on the marker radius.
pub const MARKER_RADIUS_MAX: u32 = 25;

/// Radius of the single marker drawn while picking a location.
pub const SELECTION_MARKER_RADIUS: u32 = 12;

/// Colour of the single marker drawn while picking a location.
pub const SELECTION_MARKER_COLOR: &str = "#3B82F6";

/// Opaque report identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque identifier of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The kind of incident a report describes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportCategory {
    /// One or more stray dogs seen at a location.
    #[default]
    Sighting,
    /// A dog bite.
    Bite,
    /// A garbage dump that attracts strays.
    Garbage,
}

impl ReportCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Sighting, Self::Bite, Self::Garbage]
    }

    /// Human-readable label shown on markers and in lists.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sighting => "Stray Dog Sighting",
            Self::Bite => "Bite Incident",
            Self::Garbage => "Garbage Hotspot",
        }
    }

    /// Short plural label used by the statistics bar.
    #[must_use]
    pub const fn stats_label(self) -> &'static str {
        match self {
            Self::Sighting => "Sightings",
            Self::Bite => "Bites",
            Self::Garbage => "Garbage",
        }
    }

    /// Hex colour used for markers of this category.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Sighting => "#F59E0B",
            Self::Bite => "#EF4444",
            Self::Garbage => "#10B981",
        }
    }
}

/// Optional severity attached to a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical severity.
    Critical,
}

impl Severity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    /// Capitalized label for pickers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// A validated WGS84 point.
///
/// Latitude is within `[-90, 90]`, longitude within `[-180, 180]`, and both
/// are finite. Deserialization applies the same checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawLocation {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = InvalidLocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
    }
}

impl Location {
    /// Creates a location from latitude and longitude.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLocationError`] if either coordinate is not finite
    /// or is outside its valid range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidLocationError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(InvalidLocationError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidLocationError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidLocationError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Error returned when constructing a [`Location`] from invalid coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidLocationError {
    /// A coordinate was NaN or infinite.
    NotFinite,
    /// Latitude outside `[-90, 90]`.
    LatitudeOutOfRange(f64),
    /// Longitude outside `[-180, 180]`.
    LongitudeOutOfRange(f64),
}

impl std::fmt::Display for InvalidLocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFinite => write!(f, "coordinates must be finite numbers"),
            Self::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {lat} out of range: expected -90 to 90")
            }
            Self::LongitudeOutOfRange(lng) => {
                write!(f, "longitude {lng} out of range: expected -180 to 180")
            }
        }
    }
}

impl std::error::Error for InvalidLocationError {}

/// A persisted incident report, as stored in the backend `reports` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Backend-assigned identifier.
    pub id: ReportId,
    /// Incident category.
    #[serde(rename = "type")]
    pub category: ReportCategory,
    /// Where the incident was observed.
    #[serde(flatten)]
    pub location: Location,
    /// Number of animals or occurrences observed.
    pub count: NonZeroU32,
    /// Optional severity.
    pub severity: Option<Severity>,
    /// Optional free-text notes.
    pub notes: Option<String>,
    /// Creator of the report. `None` for rows created before sign-in was
    /// required.
    #[serde(rename = "user_id")]
    pub owner: Option<UserId>,
    /// Insert time, assigned by the backend.
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Radius of this report's map marker.
    #[must_use]
    pub const fn marker_radius(&self) -> u32 {
        marker_radius(self.count.get())
    }
}

/// Input for creating a report. The backend assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReport {
    /// Incident category.
    #[serde(rename = "type")]
    pub category: ReportCategory,
    /// Where the incident was observed.
    #[serde(flatten)]
    pub location: Location,
    /// Number observed.
    pub count: NonZeroU32,
    /// Optional severity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Optional notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewReport {
    /// Creates a report input with `count = 1` and no severity or notes.
    #[must_use]
    pub const fn new(category: ReportCategory, location: Location) -> Self {
        Self {
            category,
            location,
            count: NonZeroU32::MIN,
            severity: None,
            notes: None,
        }
    }
}

/// A partial update. Fields left as `None` are not sent and keep their
/// stored value.
///
/// The location travels as a validated [`Location`], so a patch can never
/// carry an out-of-range or non-finite coordinate. `severity` and `notes`
/// are nullable columns, so they take a nested option: `Some(None)` clears
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportPatch {
    /// New category.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<ReportCategory>,
    /// New location, sent as `lat`/`lng`.
    #[serde(flatten)]
    pub location: Option<Location>,
    /// New count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<NonZeroU32>,
    /// New severity, or `Some(None)` to clear it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Option<Severity>>,
    /// New notes, or `Some(None)` to clear them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl ReportPatch {
    /// Sets the location.
    #[must_use]
    pub const fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns `true` if no field would be changed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.location.is_none()
            && self.count.is_none()
            && self.severity.is_none()
            && self.notes.is_none()
    }

    /// Builds a patch that overwrites every editable field of a report.
    #[must_use]
    pub fn replace_all(input: &NewReport) -> Self {
        Self {
            category: Some(input.category),
            location: Some(input.location),
            count: Some(input.count),
            severity: Some(input.severity),
            notes: Some(input.notes.clone()),
        }
    }

    /// Applies this patch to `report`.
    pub fn apply(&self, report: &mut Report) {
        if let Some(category) = self.category {
            report.category = category;
        }
        if let Some(location) = self.location {
            report.location = location;
        }
        if let Some(count) = self.count {
            report.count = count;
        }
        if let Some(severity) = self.severity {
            report.severity = severity;
        }
        if let Some(notes) = &self.notes {
            report.notes.clone_from(notes);
        }
    }
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend user id.
    pub id: UserId,
    /// Account email address.
    #[serde(default)]
    pub email: String,
}

/// Summed `count` per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    /// Total sightings.
    pub sighting: u64,
    /// Total bites.
    pub bite: u64,
    /// Total garbage hotspots.
    pub garbage: u64,
}

impl CategoryCounts {
    /// Returns the total for one category.
    #[must_use]
    pub const fn get(&self, category: ReportCategory) -> u64 {
        match category {
            ReportCategory::Sighting => self.sighting,
            ReportCategory::Bite => self.bite,
            ReportCategory::Garbage => self.garbage,
        }
    }

    fn slot(&mut self, category: ReportCategory) -> &mut u64 {
        match category {
            ReportCategory::Sighting => &mut self.sighting,
            ReportCategory::Bite => &mut self.bite,
            ReportCategory::Garbage => &mut self.garbage,
        }
    }
}

/// Sums the `count` field per category. Categories that do not appear
/// yield zero.
#[must_use]
pub fn aggregate_by_category<'a, I>(reports: I) -> CategoryCounts
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut counts = CategoryCounts::default();
    for report in reports {
        *counts.slot(report.category) += u64::from(report.count.get());
    }
    counts
}

/// Map marker radius for a report with the given count:
/// `min(8 + 2 * count, 25)`.
#[must_use]
pub const fn marker_radius(count: u32) -> u32 {
    let radius = MARKER_RADIUS_BASE.saturating_add(count.saturating_mul(MARKER_RADIUS_PER_COUNT));
    if radius > MARKER_RADIUS_MAX {
        MARKER_RADIUS_MAX
    } else {
        radius
    }
}

/// Formats a timestamp like `Jan 5, 2024, 03:04 PM` in the given zone.
#[must_use]
pub fn format_timestamp<Tz>(timestamp: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    timestamp
        .with_timezone(zone)
        .format("%b %-d, %Y, %I:%M %p")
        .to_string()
}

/// Formats a timestamp for display in the local time zone.
#[must_use]
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    format_timestamp(timestamp, &chrono::Local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(category: ReportCategory, count: u32) -> Report {
        Report {
            id: ReportId::from("r"),
            category,
            location: Location::new(34.15, 77.57).unwrap(),
            count: NonZeroU32::new(count).unwrap(),
            severity: None,
            notes: None,
            owner: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn marker_radius_follows_linear_rule_with_cap() {
        assert_eq!(marker_radius(1), 10);
        assert_eq!(marker_radius(8), 24);
        assert_eq!(marker_radius(9), 25);
        assert_eq!(marker_radius(100), 25);
        assert_eq!(marker_radius(u32::MAX), 25);
        for count in 1..=50 {
            assert_eq!(marker_radius(count), (8 + 2 * count).min(25));
        }
    }

    #[test]
    fn aggregate_empty_is_all_zero() {
        let counts = aggregate_by_category(&Vec::<Report>::new());
        assert_eq!(counts, CategoryCounts::default());
    }

    #[test]
    fn aggregate_sums_counts_per_category() {
        let reports = [
            report(ReportCategory::Sighting, 2),
            report(ReportCategory::Bite, 3),
            report(ReportCategory::Sighting, 1),
        ];
        let counts = aggregate_by_category(&reports);
        assert_eq!(
            counts,
            CategoryCounts {
                sighting: 3,
                bite: 3,
                garbage: 0,
            }
        );
        assert_eq!(counts.get(ReportCategory::Garbage), 0);
    }

    #[test]
    fn location_rejects_out_of_range_and_non_finite() {
        assert!(Location::new(90.0, 180.0).is_ok());
        assert!(Location::new(-90.0, -180.0).is_ok());
        assert_eq!(
            Location::new(90.5, 0.0),
            Err(InvalidLocationError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            Location::new(0.0, -180.01),
            Err(InvalidLocationError::LongitudeOutOfRange(-180.01))
        );
        assert_eq!(
            Location::new(f64::NAN, 0.0),
            Err(InvalidLocationError::NotFinite)
        );
        assert_eq!(
            Location::new(0.0, f64::INFINITY),
            Err(InvalidLocationError::NotFinite)
        );
    }

    #[test]
    fn deserializes_backend_row() {
        let row = serde_json::json!({
            "id": "0b7c",
            "type": "bite",
            "lat": 34.1526,
            "lng": 77.5771,
            "count": 2,
            "severity": "high",
            "notes": null,
            "user_id": "u-1",
            "created_at": "2024-01-05T15:04:00.123456+00:00"
        });
        let report: Report = serde_json::from_value(row).unwrap();
        assert_eq!(report.category, ReportCategory::Bite);
        assert_eq!(report.count.get(), 2);
        assert_eq!(report.severity, Some(Severity::High));
        assert_eq!(report.notes, None);
        assert_eq!(report.owner, Some(UserId::from("u-1")));
        assert!((report.location.lat() - 34.1526).abs() < 1e-9);
    }

    #[test]
    fn rejects_row_with_invalid_location_or_zero_count() {
        let bad_lat = serde_json::json!({
            "id": "a", "type": "garbage", "lat": 120.0, "lng": 0.0, "count": 1,
            "severity": null, "notes": null, "user_id": null,
            "created_at": "2024-01-05T15:04:00Z"
        });
        assert!(serde_json::from_value::<Report>(bad_lat).is_err());

        let zero_count = serde_json::json!({
            "id": "a", "type": "garbage", "lat": 1.0, "lng": 0.0, "count": 0,
            "severity": null, "notes": null, "user_id": null,
            "created_at": "2024-01-05T15:04:00Z"
        });
        assert!(serde_json::from_value::<Report>(zero_count).is_err());
    }

    #[test]
    fn patch_serializes_only_present_fields_and_explicit_nulls() {
        let patch = ReportPatch {
            count: NonZeroU32::new(4),
            notes: Some(None),
            ..ReportPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "count": 4, "notes": null }));
    }

    #[test]
    fn patch_apply_replaces_present_fields_only() {
        let mut target = report(ReportCategory::Sighting, 1);
        target.notes = Some("near the market".to_string());
        target.severity = Some(Severity::Low);

        let patch = ReportPatch {
            category: Some(ReportCategory::Bite),
            severity: Some(None),
            ..ReportPatch::default()
        };
        patch.apply(&mut target);

        assert_eq!(target.category, ReportCategory::Bite);
        assert_eq!(target.severity, None);
        assert_eq!(target.notes.as_deref(), Some("near the market"));
        assert_eq!(target.count.get(), 1);
    }

    #[test]
    fn patch_location_serializes_as_coordinates() {
        let location = Location::new(34.16, 77.58).unwrap();
        let patch = ReportPatch::default().with_location(location);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "lat": 34.16, "lng": 77.58 })
        );

        let mut target = report(ReportCategory::Garbage, 3);
        patch.apply(&mut target);
        assert_eq!(target.location, location);
        assert_eq!(target.count.get(), 3);
    }

    #[test]
    fn replace_all_sends_every_column() {
        let input = NewReport::new(ReportCategory::Bite, Location::new(1.5, 2.5).unwrap());
        let json = serde_json::to_value(ReportPatch::replace_all(&input)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "bite", "lat": 1.5, "lng": 2.5, "count": 1,
                "severity": null, "notes": null
            })
        );
    }

    #[test]
    fn new_report_omits_absent_optionals() {
        let input = NewReport::new(ReportCategory::Garbage, Location::new(1.0, 2.0).unwrap());
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "garbage", "lat": 1.0, "lng": 2.0, "count": 1 })
        );
    }

    #[test]
    fn category_tables_are_distinct() {
        for (i, a) in ReportCategory::all().iter().enumerate() {
            for b in &ReportCategory::all()[i + 1..] {
                assert_ne!(a.color(), b.color());
                assert_ne!(a.label(), b.label());
            }
        }
        assert_eq!("bite".parse::<ReportCategory>().unwrap(), ReportCategory::Bite);
        assert_eq!(Severity::Critical.to_string(), "critical");
    }

    #[test]
    fn formats_timestamp_in_given_zone() {
        let ts = DateTime::parse_from_rfc3339("2024-01-05T15:04:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(&ts, &Utc), "Jan 5, 2024, 03:04 PM");
    }
}
