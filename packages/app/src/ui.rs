//! Shared UI state: modal visibility and the selected map point.
//!
//! One [`UiState`] is created per session and handed to every component
//! that needs it. Clones share the same state, so a transition made
//! through one handle is immediately visible through all others.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use straywatch_report_models::Location;

/// Point-in-time copy of the UI state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UiSnapshot {
    /// Whether the sign-in/sign-up dialog is shown.
    pub auth_modal_open: bool,
    /// Whether the report form is shown.
    pub report_form_open: bool,
    /// The point chosen for the report being written.
    pub selected_location: Option<Location>,
}

/// Shared handle to the UI state.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    inner: Arc<RwLock<UiSnapshot>>,
}

impl UiState {
    /// Creates a state with both modals closed and nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, UiSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UiSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies the current state.
    #[must_use]
    pub fn snapshot(&self) -> UiSnapshot {
        *self.read()
    }

    /// Whether the auth dialog is open.
    #[must_use]
    pub fn is_auth_modal_open(&self) -> bool {
        self.read().auth_modal_open
    }

    /// Whether the report form is open.
    #[must_use]
    pub fn is_report_form_open(&self) -> bool {
        self.read().report_form_open
    }

    /// The currently selected point.
    #[must_use]
    pub fn selected_location(&self) -> Option<Location> {
        self.read().selected_location
    }

    /// Shows the auth dialog.
    pub fn open_auth_modal(&self) {
        self.write().auth_modal_open = true;
    }

    /// Hides the auth dialog.
    pub fn close_auth_modal(&self) {
        self.write().auth_modal_open = false;
    }

    /// Opens the report form. A `preset` replaces the selected location;
    /// `None` keeps whatever is already selected.
    pub fn open_report_form(&self, preset: Option<Location>) {
        let mut state = self.write();
        state.report_form_open = true;
        if preset.is_some() {
            state.selected_location = preset;
        }
    }

    /// Closes the report form and clears the selected location.
    pub fn close_report_form(&self) {
        let mut state = self.write();
        state.report_form_open = false;
        state.selected_location = None;
    }

    /// Replaces (or clears) the selected point.
    pub fn set_selected_location(&self, location: Option<Location>) {
        self.write().selected_location = location;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leh() -> Location {
        Location::new(34.1526, 77.5771).unwrap()
    }

    #[test]
    fn modals_are_independent() {
        let ui = UiState::new();
        ui.open_auth_modal();
        ui.open_report_form(None);
        let snap = ui.snapshot();
        assert!(snap.auth_modal_open && snap.report_form_open);

        ui.close_auth_modal();
        assert!(!ui.is_auth_modal_open());
        assert!(ui.is_report_form_open());
    }

    #[test]
    fn open_without_preset_keeps_selection() {
        let ui = UiState::new();
        ui.set_selected_location(Some(leh()));
        ui.open_report_form(None);
        assert_eq!(ui.selected_location(), Some(leh()));

        let other = Location::new(34.0, 77.0).unwrap();
        ui.open_report_form(Some(other));
        assert_eq!(ui.selected_location(), Some(other));
    }

    #[test]
    fn closing_form_clears_selection_for_all_handles() {
        let ui = UiState::new();
        let other_handle = ui.clone();
        ui.open_report_form(Some(leh()));
        assert_eq!(other_handle.selected_location(), Some(leh()));

        other_handle.close_report_form();
        assert!(!ui.is_report_form_open());
        assert_eq!(ui.selected_location(), None);
    }
}
