//! Device position lookup.

use straywatch_report_models::Location;
use thiserror::Error;

/// Why a position could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    /// No positioning device is available.
    #[error("Geolocation not supported")]
    Unsupported,
    /// The device could not produce a fix.
    #[error("{0}")]
    Failed(String),
}

/// Source of the device's current position.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Returns [`GeolocationError`] if no position is available.
    async fn current_location(&self) -> Result<Location, GeolocationError>;
}

/// Provider for environments without a positioning device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait::async_trait]
impl LocationProvider for NoGeolocation {
    async fn current_location(&self) -> Result<Location, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Provider that always answers with the same result.
#[derive(Debug, Clone)]
pub struct FixedLocation(pub Result<Location, GeolocationError>);

#[async_trait::async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Location, GeolocationError> {
        self.0.clone()
    }
}
