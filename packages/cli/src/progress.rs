//! Logger setup and spinners.
//!
//! `log` output is routed through `indicatif-log-bridge` so log lines are
//! suspended while a spinner redraws instead of tearing it.

use std::future::Future;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Initializes `pretty_env_logger` (filter from `RUST_LOG`) wrapped in
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all spinners must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Already set

    log::set_max_level(level);

    multi
}

/// Runs `future` while showing a spinner with `message`.
pub async fn with_spinner<F, T>(multi: &MultiProgress, message: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());

    let output = future.await;
    bar.finish_and_clear();
    multi.remove(&bar);
    output
}
