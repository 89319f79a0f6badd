//! Command implementations shared by the subcommands and the interactive
//! menu.
//!
//! Every command drives the app view-models; outcomes are reported through
//! the toast queue, which the caller prints afterwards.

use std::time::Instant;

use clap::Args;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::MultiProgress;
use straywatch_app::AppContext;
use straywatch_app::form::ReportForm;
use straywatch_app::home::HomeScreen;
use straywatch_app::profile::{ProfileError, ProfileScreen};
use straywatch_app::session::{self, AuthDialog, AuthTab};
use straywatch_report_models::{ReportCategory, ReportId, Severity};

use crate::output;
use crate::progress::with_spinner;

/// Outcome of a command; prompt and output failures only.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Report fields that may be given as flags. Missing fields are prompted
/// for.
#[derive(Debug, Default, Args)]
pub struct ReportArgs {
    /// Report type: sighting, bite or garbage.
    #[arg(long = "type")]
    pub category: Option<ReportCategory>,

    /// Latitude of the incident.
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the incident.
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Number of dogs or occurrences.
    #[arg(long)]
    pub count: Option<String>,

    /// Severity: low, medium, high or critical.
    #[arg(long)]
    pub severity: Option<Severity>,

    /// Free-text notes.
    #[arg(long)]
    pub notes: Option<String>,
}

/// Lists all reports, or the signed-in user's own.
pub async fn list(ctx: &AppContext, multi: &MultiProgress, mine: bool, json: bool) -> CommandResult {
    let reports = if mine {
        let mut profile = ProfileScreen::new(ctx.clone());
        let Some(reports) = load_profile(ctx, multi, &mut profile).await else {
            return Ok(());
        };
        if !json {
            println!("{}", profile.summary());
        }
        reports
    } else {
        let mut home = HomeScreen::new(ctx.clone());
        let Some(reports) = load_home(ctx, multi, &mut home).await else {
            return Ok(());
        };
        reports
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        output::reports(&reports);
    }
    Ok(())
}

/// Prints the per-category totals.
pub async fn stats(ctx: &AppContext, multi: &MultiProgress) -> CommandResult {
    let mut home = HomeScreen::new(ctx.clone());
    if load_home(ctx, multi, &mut home).await.is_some() {
        output::stats(&home.stats());
    }
    Ok(())
}

/// Submits a new report.
pub async fn create(ctx: &AppContext, multi: &MultiProgress, args: ReportArgs) -> CommandResult {
    let mut home = HomeScreen::new(ctx.clone());
    if load_home(ctx, multi, &mut home).await.is_none() {
        return Ok(());
    }
    if !home.add_report() {
        return Ok(());
    }

    if !fill_form(home.form(), args, multi).await? {
        home.form().close();
        return Ok(());
    }
    let submitted = with_spinner(multi, "Submitting report...", home.submit_report(Instant::now()))
        .await;
    if let Ok(report) = submitted {
        output::reports(std::slice::from_ref(&report));
    } else {
        home.form().close();
    }
    Ok(())
}

/// Edits one of the signed-in user's reports.
pub async fn edit(
    ctx: &AppContext,
    multi: &MultiProgress,
    id: ReportId,
    args: ReportArgs,
) -> CommandResult {
    let mut profile = ProfileScreen::new(ctx.clone());
    if load_profile(ctx, multi, &mut profile).await.is_none() {
        return Ok(());
    }
    if !profile.edit(&id) {
        ctx.toasts
            .error("Report not found", Some(&format!("You have no report {id}")));
        return Ok(());
    }

    if !fill_form(profile.form(), args, multi).await? {
        profile.form().close();
        return Ok(());
    }
    let submitted =
        with_spinner(multi, "Updating report...", profile.submit_edit(Instant::now())).await;
    if let Ok(report) = submitted {
        output::reports(std::slice::from_ref(&report));
    } else {
        profile.form().close();
    }
    Ok(())
}

/// Deletes one of the signed-in user's reports after confirmation.
pub async fn delete(
    ctx: &AppContext,
    multi: &MultiProgress,
    id: ReportId,
    yes: bool,
) -> CommandResult {
    let mut profile = ProfileScreen::new(ctx.clone());
    if load_profile(ctx, multi, &mut profile).await.is_none() {
        return Ok(());
    }

    if !profile.request_delete(id.clone()) {
        ctx.toasts
            .error("Report not found", Some(&format!("You have no report {id}")));
        return Ok(());
    }
    let confirmed = yes
        || Confirm::new()
            .with_prompt("Delete this report? This cannot be undone.")
            .default(false)
            .interact()?;

    if confirmed {
        let _ = with_spinner(multi, "Deleting report...", profile.confirm_delete(Instant::now()))
            .await;
    } else {
        profile.cancel_delete();
        println!("Cancelled.");
    }
    Ok(())
}

/// Signs in with email and password.
pub async fn sign_in(
    ctx: &AppContext,
    multi: &MultiProgress,
    email: Option<String>,
) -> CommandResult {
    let mut dialog = AuthDialog::new(ctx.clone());
    dialog.open();
    dialog.tab = AuthTab::SignIn;
    dialog.sign_in_email = prompt_email(email)?;
    dialog.sign_in_password = Password::new().with_prompt("Password").interact()?;

    let _ = with_spinner(multi, "Signing in...", dialog.submit()).await;
    dialog.close();
    Ok(())
}

/// Creates an account.
pub async fn sign_up(
    ctx: &AppContext,
    multi: &MultiProgress,
    email: Option<String>,
) -> CommandResult {
    let mut dialog = AuthDialog::new(ctx.clone());
    dialog.open();
    dialog.tab = AuthTab::SignUp;
    dialog.sign_up_email = prompt_email(email)?;
    dialog.sign_up_password = Password::new().with_prompt("Password").interact()?;
    dialog.sign_up_confirm_password = Password::new()
        .with_prompt("Confirm password")
        .interact()?;

    let _ = with_spinner(multi, "Creating account...", dialog.submit()).await;
    dialog.close();
    Ok(())
}

/// Signs out.
pub async fn sign_out(ctx: &AppContext, multi: &MultiProgress) -> CommandResult {
    let _ = with_spinner(multi, "Signing out...", session::sign_out(ctx)).await;
    Ok(())
}

/// Prints the signed-in user.
pub async fn whoami(ctx: &AppContext, multi: &MultiProgress) -> CommandResult {
    with_spinner(multi, "Checking session...", ctx.auth.initialize()).await;
    match ctx.auth.identity() {
        Some(identity) => println!("{} ({})", identity.email, identity.id),
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn load_home(
    ctx: &AppContext,
    multi: &MultiProgress,
    home: &mut HomeScreen,
) -> Option<Vec<straywatch_report_models::Report>> {
    let loaded = with_spinner(multi, "Loading reports...", home.load(Instant::now()))
        .await
        .map(<[_]>::to_vec);
    if home.show_config_banner() {
        output::config_banner();
    }
    match loaded {
        Ok(reports) => Some(reports),
        Err(e) => {
            ctx.toasts
                .error("Failed to load reports", Some(&e.to_string()));
            None
        }
    }
}

async fn load_profile(
    ctx: &AppContext,
    multi: &MultiProgress,
    profile: &mut ProfileScreen,
) -> Option<Vec<straywatch_report_models::Report>> {
    let loaded = with_spinner(multi, "Loading your reports...", profile.load(Instant::now()))
        .await
        .map(<[_]>::to_vec);
    match loaded {
        Ok(reports) => Some(reports),
        Err(ProfileError::SignedOut) => {
            ctx.toasts.info(
                "Sign in to view your reports",
                Some("Run `straywatch sign-in` first"),
            );
            None
        }
        Err(ProfileError::Api(e)) => {
            ctx.toasts
                .error("Failed to load reports", Some(&e.to_string()));
            None
        }
    }
}

fn prompt_email(email: Option<String>) -> Result<String, dialoguer::Error> {
    match email {
        Some(email) => Ok(email),
        None => Input::new().with_prompt("Email").interact_text(),
    }
}

/// Fills the open form from flags, prompting for anything missing.
/// Returns `false` if the flags cannot be used; the reason is already
/// queued as a toast.
async fn fill_form(
    form: &mut ReportForm,
    args: ReportArgs,
    multi: &MultiProgress,
) -> Result<bool, Box<dyn std::error::Error>> {
    form.category = match args.category {
        Some(category) => category,
        None => {
            let labels: Vec<&str> = ReportCategory::all().iter().map(|c| c.label()).collect();
            let current = ReportCategory::all()
                .iter()
                .position(|c| *c == form.category)
                .unwrap_or(0);
            let idx = Select::new()
                .with_prompt("Report type")
                .items(&labels)
                .default(current)
                .interact()?;
            ReportCategory::all()[idx]
        }
    };

    match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => {
            if form.enter_coordinates(lat, lng).is_err() {
                return Ok(false);
            }
        }
        _ => prompt_location(form, multi).await?,
    }

    form.count = match args.count {
        Some(count) => count,
        None => Input::new()
            .with_prompt("Count")
            .default(form.count.clone())
            .interact_text()?,
    };

    form.severity = match args.severity {
        Some(severity) => Some(severity),
        None => {
            let mut labels = vec!["None"];
            labels.extend(Severity::all().iter().map(|s| s.label()));
            let current = form
                .severity
                .and_then(|s| Severity::all().iter().position(|x| *x == s))
                .map_or(0, |i| i + 1);
            let idx = Select::new()
                .with_prompt("Severity")
                .items(&labels)
                .default(current)
                .interact()?;
            idx.checked_sub(1).map(|i| Severity::all()[i])
        }
    };

    form.notes = match args.notes {
        Some(notes) => notes,
        None => Input::new()
            .with_prompt("Notes (blank for none)")
            .default(form.notes.clone())
            .allow_empty(true)
            .interact_text()?,
    };

    Ok(true)
}

async fn prompt_location(form: &mut ReportForm, multi: &MultiProgress) -> CommandResult {
    if let Some(current) = form.selected_location()
        && Confirm::new()
            .with_prompt(format!("Keep location {current}?"))
            .default(true)
            .interact()?
    {
        return Ok(());
    }

    let items = &["Use device location", "Pick on map", "Skip"];
    let selection = Select::new()
        .with_prompt("Location")
        .items(items)
        .default(1)
        .interact()?;

    match selection {
        0 => {
            with_spinner(multi, "Getting location...", form.use_device_location()).await;
        }
        1 => {
            if !form.is_map_shown() {
                form.toggle_map();
            }
            let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
            let lng: f64 = Input::new().with_prompt("Longitude").interact_text()?;
            if !form.click_map(lat, lng) {
                log::warn!("Coordinates {lat}, {lng} are not a valid location");
            }
            form.toggle_map();
        }
        _ => {}
    }
    Ok(())
}
