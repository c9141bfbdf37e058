//! Progress indicator for the background dependency task.
//!
//! The coalesced background task is the single user-visible unit of work for all
//! pending resolutions, and it shows one spinner for its whole lifetime. The spinner
//! is hidden when progress is disabled in the settings or through the
//! `SCRIPTDEPS_NO_PROGRESS` environment variable.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Environment variable that disables all progress output when set.
pub const NO_PROGRESS_ENV: &str = "SCRIPTDEPS_NO_PROGRESS";

/// Checks if progress output has been disabled through the environment.
pub fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// A spinner with consistent styling.
///
/// Cloning shares the underlying indicator.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a spinner for the background task.
    ///
    /// With `visible == false`, or when progress is disabled through the environment,
    /// the spinner is hidden and silently ignores all operations.
    pub fn new_spinner(visible: bool) -> Self {
        let bar = if !visible || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self { inner: bar }
    }

    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    pub fn prefix(&self) -> String {
        self.inner.prefix()
    }

    /// Count one more processed item.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg} ({pos} done)")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
