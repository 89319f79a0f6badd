#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `straywatch`: report and browse stray-dog incidents from the terminal.
//!
//! Each subcommand drives the same view-models a graphical front end
//! would, against the Supabase backend configured through
//! `PUBLIC_SUPABASE_URL` and `PUBLIC_SUPABASE_ANON_KEY`. The signed-in
//! session is persisted (`STRAYWATCH_SESSION_FILE`) so separate
//! invocations share a login. Without a subcommand an interactive menu
//! starts.
//!
//! Uses `indicatif-log-bridge` (via [`progress::init_logger`]) to route
//! `log` output through `indicatif::MultiProgress` so that log lines and
//! spinners never fight for the terminal.

mod commands;
mod interactive;
mod output;
mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use straywatch_app::AppContext;
use straywatch_backend::BackendConfig;
use straywatch_backend::supabase::SupabaseBackend;
use straywatch_report_models::ReportId;

use crate::commands::ReportArgs;

/// Crowd-sourced stray dog reports for Leh, Ladakh.
#[derive(Parser)]
#[command(name = "straywatch")]
#[command(about = "Crowd-sourced stray dog reports for Leh, Ladakh")]
struct Cli {
    /// Subcommand to execute. Starts the interactive menu when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List reports, newest first.
    List {
        /// Only your own reports.
        #[arg(long)]
        mine: bool,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show report totals per category.
    Stats,

    /// Submit a new report.
    Create {
        #[command(flatten)]
        report: ReportArgs,
    },

    /// Edit one of your reports.
    Edit {
        /// Report id.
        id: String,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Delete one of your reports.
    Delete {
        /// Report id.
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Sign in with email and password.
    SignIn {
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account.
    SignUp {
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out.
    SignOut,

    /// Show the signed-in user.
    Whoami,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();

    let config = BackendConfig::from_env();
    if !config.is_configured() {
        log::warn!("PUBLIC_SUPABASE_URL or PUBLIC_SUPABASE_ANON_KEY is not set");
    }
    let backend = Arc::new(SupabaseBackend::new(config)?);
    let ctx = AppContext::new(backend);

    match cli.command {
        None => {
            println!("StrayWatch - {}", ctx.region.name);
            interactive::run(&ctx, &multi).await?;
        }
        Some(Commands::List { mine, json }) => commands::list(&ctx, &multi, mine, json).await?,
        Some(Commands::Stats) => commands::stats(&ctx, &multi).await?,
        Some(Commands::Create { report }) => commands::create(&ctx, &multi, report).await?,
        Some(Commands::Edit { id, report }) => {
            commands::edit(&ctx, &multi, ReportId(id), report).await?;
        }
        Some(Commands::Delete { id, yes }) => {
            commands::delete(&ctx, &multi, ReportId(id), yes).await?;
        }
        Some(Commands::SignIn { email }) => commands::sign_in(&ctx, &multi, email).await?,
        Some(Commands::SignUp { email }) => commands::sign_up(&ctx, &multi, email).await?,
        Some(Commands::SignOut) => commands::sign_out(&ctx, &multi).await?,
        Some(Commands::Whoami) => commands::whoami(&ctx, &multi).await?,
    }

    let failed = output::flush_toasts(&ctx.toasts);
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
