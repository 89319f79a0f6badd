//! Sign-in, sign-up and sign-out actions behind the auth dialog.

use straywatch_report_models::Identity;
use thiserror::Error;

use crate::AppContext;

/// Minimum accepted password length on sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Why an auth action failed. Validation variants display as the toast
/// title shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A required field is blank.
    #[error("Please fill in all fields")]
    MissingFields,
    /// The confirmation differs from the password.
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// The password is shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    /// The backend rejected the request.
    #[error("{0}")]
    Backend(String),
}

/// Which tab of the dialog is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthTab {
    /// Existing account.
    #[default]
    SignIn,
    /// New account.
    SignUp,
}

/// The auth dialog's fields and actions.
pub struct AuthDialog {
    ctx: AppContext,
    /// Active tab; decides what [`Self::submit`] does.
    pub tab: AuthTab,
    /// Sign-in email field.
    pub sign_in_email: String,
    /// Sign-in password field.
    pub sign_in_password: String,
    /// Sign-up email field.
    pub sign_up_email: String,
    /// Sign-up password field.
    pub sign_up_password: String,
    /// Sign-up password confirmation field.
    pub sign_up_confirm_password: String,
}

impl AuthDialog {
    /// Creates a dialog with empty fields on the sign-in tab.
    #[must_use]
    pub const fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            tab: AuthTab::SignIn,
            sign_in_email: String::new(),
            sign_in_password: String::new(),
            sign_up_email: String::new(),
            sign_up_password: String::new(),
            sign_up_confirm_password: String::new(),
        }
    }

    /// Whether the dialog is shown.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ctx.ui.is_auth_modal_open()
    }

    /// Shows the dialog.
    pub fn open(&self) {
        self.ctx.ui.open_auth_modal();
    }

    /// Hides the dialog.
    pub fn close(&self) {
        self.ctx.ui.close_auth_modal();
    }

    /// Submits the active tab.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if validation or the backend call fails.
    pub async fn submit(&mut self) -> Result<Option<Identity>, SessionError> {
        match self.tab {
            AuthTab::SignIn => self.sign_in().await.map(Some),
            AuthTab::SignUp => self.sign_up().await,
        }
    }

    /// Signs in with the sign-in fields. On success the identity is cached,
    /// the fields are cleared and the dialog closes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingFields`] or the backend's rejection.
    pub async fn sign_in(&mut self) -> Result<Identity, SessionError> {
        if self.sign_in_email.trim().is_empty() || self.sign_in_password.is_empty() {
            return Err(self.reject(SessionError::MissingFields));
        }

        match self
            .ctx
            .backend()
            .sign_in(self.sign_in_email.trim(), &self.sign_in_password)
            .await
        {
            Ok(identity) => {
                log::info!("Signed in as {}", identity.email);
                self.ctx.auth.set_identity(Some(identity.clone()));
                self.ctx.toasts.success("Welcome back!", None);
                self.close();
                self.sign_in_email.clear();
                self.sign_in_password.clear();
                Ok(identity)
            }
            Err(e) => {
                let message = non_empty_or(e.to_string(), "Please check your credentials");
                self.ctx.toasts.error("Sign in failed", Some(&message));
                Err(SessionError::Backend(message))
            }
        }
    }

    /// Creates an account with the sign-up fields. When the backend
    /// returns the new user it is cached and the dialog closes.
    ///
    /// # Errors
    ///
    /// Returns the first failing check or the backend's rejection.
    pub async fn sign_up(&mut self) -> Result<Option<Identity>, SessionError> {
        if self.sign_up_email.trim().is_empty()
            || self.sign_up_password.is_empty()
            || self.sign_up_confirm_password.is_empty()
        {
            return Err(self.reject(SessionError::MissingFields));
        }
        if self.sign_up_password != self.sign_up_confirm_password {
            return Err(self.reject(SessionError::PasswordMismatch));
        }
        if self.sign_up_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(self.reject(SessionError::PasswordTooShort));
        }

        match self
            .ctx
            .backend()
            .sign_up(self.sign_up_email.trim(), &self.sign_up_password)
            .await
        {
            Ok(Some(identity)) => {
                log::info!("Created account {}", identity.email);
                self.ctx.auth.set_identity(Some(identity.clone()));
                self.ctx.toasts.success(
                    "Account created!",
                    Some("Please check your email to verify your account"),
                );
                self.close();
                self.sign_up_email.clear();
                self.sign_up_password.clear();
                self.sign_up_confirm_password.clear();
                Ok(Some(identity))
            }
            Ok(None) => {
                log::warn!("Sign-up returned no user");
                Ok(None)
            }
            Err(e) => {
                let message = non_empty_or(e.to_string(), "Please try again");
                self.ctx.toasts.error("Sign up failed", Some(&message));
                Err(SessionError::Backend(message))
            }
        }
    }

    fn reject(&self, error: SessionError) -> SessionError {
        self.ctx.toasts.error(&error.to_string(), None);
        error
    }
}

/// Ends the session and reports the outcome as a toast.
///
/// # Errors
///
/// Returns [`SessionError::Backend`] if the backend rejects the sign-out.
pub async fn sign_out(ctx: &AppContext) -> Result<(), SessionError> {
    match ctx.backend().sign_out().await {
        Ok(()) => {
            ctx.auth.set_identity(None);
            ctx.toasts.success("Signed out successfully", None);
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to sign out: {e}");
            ctx.toasts.error("Failed to sign out", None);
            Err(SessionError::Backend(e.to_string()))
        }
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
