//! Menu-driven mode, used when no subcommand is given.

use dialoguer::{Confirm, Input, Select};
use indicatif::MultiProgress;
use straywatch_app::AppContext;
use straywatch_report_models::ReportId;

use crate::commands::{self, CommandResult, ReportArgs};
use crate::output;
use crate::progress::with_spinner;

/// Runs the interactive menu loop until the user exits.
///
/// # Errors
///
/// Returns an error if a prompt fails.
pub async fn run(ctx: &AppContext, multi: &MultiProgress) -> CommandResult {
    with_spinner(multi, "Checking session...", ctx.auth.initialize()).await;

    loop {
        println!();
        let signed_in = ctx.auth.identity().is_some();
        let items: &[&str] = if signed_in {
            &[
                "Browse reports",
                "Show statistics",
                "Submit a report",
                "My reports",
                "Edit a report",
                "Delete a report",
                "Sign out",
                "Exit",
            ]
        } else {
            &[
                "Browse reports",
                "Show statistics",
                "Submit a report",
                "Sign in",
                "Create account",
                "Exit",
            ]
        };

        let idx = Select::new()
            .with_prompt("StrayWatch")
            .items(items)
            .default(0)
            .interact()?;

        match items[idx] {
            "Browse reports" => commands::list(ctx, multi, false, false).await?,
            "Show statistics" => commands::stats(ctx, multi).await?,
            "Submit a report" => commands::create(ctx, multi, ReportArgs::default()).await?,
            "My reports" => commands::list(ctx, multi, true, false).await?,
            "Edit a report" => {
                let id = prompt_id()?;
                commands::edit(ctx, multi, id, ReportArgs::default()).await?;
            }
            "Delete a report" => {
                let id = prompt_id()?;
                commands::delete(ctx, multi, id, false).await?;
            }
            "Sign out" => {
                if Confirm::new()
                    .with_prompt("Sign out?")
                    .default(true)
                    .interact()?
                {
                    commands::sign_out(ctx, multi).await?;
                }
            }
            "Sign in" => commands::sign_in(ctx, multi, None).await?,
            "Create account" => commands::sign_up(ctx, multi, None).await?,
            _ => return Ok(()),
        }

        output::flush_toasts(&ctx.toasts);
    }
}

fn prompt_id() -> Result<ReportId, dialoguer::Error> {
    let id: String = Input::new().with_prompt("Report id").interact_text()?;
    Ok(ReportId(id.trim().to_string()))
}
