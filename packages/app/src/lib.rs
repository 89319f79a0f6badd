#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Headless StrayWatch client.
//!
//! The view-models in this crate hold everything a front end needs to
//! render the map, the statistics bar, the report form, the auth dialog and
//! the profile list, and they perform the user actions behind those views.
//! Front ends (the `straywatch` CLI, tests) build one [`AppContext`] and
//! hand it to each screen; all shared state lives in the context.

pub mod auth;
pub mod form;
pub mod geolocation;
pub mod home;
pub mod map;
pub mod notify;
pub mod profile;
pub mod region;
pub mod session;
pub mod ui;

use std::sync::Arc;

use straywatch_api::ReportsApi;
use straywatch_backend::Backend;

use crate::auth::AuthState;
use crate::geolocation::{LocationProvider, NoGeolocation};
use crate::notify::Notifications;
use crate::region::Region;
use crate::ui::UiState;

/// Shared state and collaborators for one client session.
///
/// Clones share the same auth, UI and notification state.
#[derive(Clone)]
pub struct AppContext {
    /// Data access layer.
    pub api: ReportsApi,
    /// Cached identity of the signed-in user.
    pub auth: AuthState,
    /// Modal flags and the selected point.
    pub ui: UiState,
    /// Toast queue.
    pub toasts: Notifications,
    /// Device position source.
    pub locator: Arc<dyn LocationProvider>,
    /// Area shown on the map.
    pub region: Region,
}

impl AppContext {
    /// Builds a context over `backend` for the built-in region, without a
    /// positioning device.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            api: ReportsApi::new(Arc::clone(&backend)),
            auth: AuthState::new(backend),
            ui: UiState::new(),
            toasts: Notifications::new(),
            locator: Arc::new(NoGeolocation),
            region: Region::leh(),
        }
    }

    /// Replaces the position source.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn LocationProvider>) -> Self {
        self.locator = locator;
        self
    }

    /// Replaces the map region.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// The backend behind the data access layer.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.api.backend()
    }
}
