//! Terminal rendering of toasts, reports and statistics.

use console::style;
use straywatch_app::home::{NOT_CONFIGURED_DETAIL, NOT_CONFIGURED_TITLE};
use straywatch_app::notify::{Notifications, ToastKind};
use straywatch_report_models::{CategoryCounts, Report, ReportCategory, format_date};

/// Prints and removes every queued toast. Returns `true` if any of them
/// was an error.
pub fn flush_toasts(toasts: &Notifications) -> bool {
    let mut failed = false;
    for toast in toasts.drain() {
        let marker = match toast.kind {
            ToastKind::Success => style("✓").green().bold(),
            ToastKind::Error => {
                failed = true;
                style("✗").red().bold()
            }
            ToastKind::Info => style("i").blue().bold(),
        };
        match &toast.description {
            Some(description) => println!(
                "{marker} {} {}",
                style(&toast.title).bold(),
                style(description).dim()
            ),
            None => println!("{marker} {}", style(&toast.title).bold()),
        }
    }
    failed
}

/// Prints the "not configured" banner.
pub fn config_banner() {
    println!("{}", style(NOT_CONFIGURED_TITLE).yellow().bold());
    println!("{}", style(NOT_CONFIGURED_DETAIL).yellow());
    println!();
}

/// Prints one line per report, newest first.
pub fn reports(reports: &[Report]) {
    if reports.is_empty() {
        println!("{}", style("No reports yet").dim());
        return;
    }
    for report in reports {
        let label = style(report.category.label()).bold();
        let label = match report.category {
            ReportCategory::Sighting => label.yellow(),
            ReportCategory::Bite => label.red(),
            ReportCategory::Garbage => label.green(),
        };
        print!(
            "{}  {label}  x{}  {}",
            style(report.id.as_str()).dim(),
            report.count,
            report.location
        );
        if let Some(severity) = report.severity {
            print!("  [{}]", severity.label());
        }
        println!("  {}", style(format_date(&report.created_at)).dim());
        if let Some(notes) = report.notes.as_deref().filter(|n| !n.is_empty()) {
            println!("    {notes}");
        }
    }
}

/// Prints the statistics bar.
pub fn stats(counts: &CategoryCounts) {
    for category in ReportCategory::all() {
        println!(
            "{:<10} {}",
            category.stats_label(),
            style(counts.get(*category)).bold()
        );
    }
}
