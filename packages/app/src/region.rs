//! Map region loaded from an embedded TOML config.
//!
//! The region file is baked into the binary with [`include_str!`]. It sets
//! the default map centre and zoom, and the zoom used when the map focuses
//! on a selected point.

use serde::Deserialize;
use straywatch_report_models::{InvalidLocationError, Location};
use thiserror::Error;

const LEH_TOML: &str = include_str!("../regions/leh.toml");

/// Default zoom when the map focuses on a selected point.
const fn default_focus_zoom() -> u8 {
    16
}

/// Geographic area the client covers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Region {
    /// Short identifier, e.g. `leh`.
    pub id: String,
    /// Display name shown under the app title.
    pub name: String,
    lat: f64,
    lng: f64,
    /// Zoom of the initial viewport.
    pub zoom: u8,
    /// Zoom used when the map flies to a selected point.
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,
}

/// Errors from loading a region config.
#[derive(Debug, Error)]
pub enum RegionError {
    /// The TOML did not parse.
    #[error("invalid region config: {0}")]
    Toml(#[from] toml::de::Error),
    /// The configured centre is not a valid location.
    #[error("invalid region centre: {0}")]
    Centre(#[from] InvalidLocationError),
}

impl Region {
    /// Parses a region from TOML and checks its centre.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if the TOML is malformed or the centre is
    /// not a valid location.
    pub fn from_toml(toml_str: &str) -> Result<Self, RegionError> {
        let region: Self = toml::de::from_str(toml_str)?;
        region.centre()?;
        Ok(region)
    }

    /// The built-in Leh region.
    ///
    /// # Panics
    ///
    /// Panics if the embedded config is invalid.
    #[must_use]
    pub fn leh() -> Self {
        Self::from_toml(LEH_TOML).unwrap_or_else(|e| panic!("Failed to parse leh.toml: {e}"))
    }

    /// Default map centre.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLocationError`] if the configured centre is out of
    /// range.
    pub fn centre(&self) -> Result<Location, InvalidLocationError> {
        Location::new(self.lat, self.lng)
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::leh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_leh_region() {
        let region = Region::leh();
        assert_eq!(region.name, "Leh, Ladakh");
        assert_eq!(region.zoom, 13);
        assert_eq!(region.focus_zoom, 16);
        let centre = region.centre().unwrap();
        assert!((centre.lat() - 34.1526).abs() < 1e-9);
        assert!((centre.lng() - 77.5771).abs() < 1e-9);
    }

    #[test]
    fn rejects_invalid_centre() {
        let toml = "id = \"x\"\nname = \"X\"\nlat = 95.0\nlng = 0.0\nzoom = 10\n";
        assert!(matches!(
            Region::from_toml(toml),
            Err(RegionError::Centre(_))
        ));
    }

    #[test]
    fn focus_zoom_defaults() {
        let toml = "id = \"x\"\nname = \"X\"\nlat = 1.0\nlng = 2.0\nzoom = 10\n";
        assert_eq!(Region::from_toml(toml).unwrap().focus_zoom, 16);
    }
}
