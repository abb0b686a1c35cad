//! Terminal presentation for build results.
//!
//! `tsbuild build` prints one status label per project (`built`, `up to date`,
//! `failed`, `skipped`, ...) and a summary line, with an indicatif progress
//! bar on stderr while projects compile. Labels are colored and the summary
//! carries an emoji only when color is on.
//!
//! Color follows `--color`. In `auto` mode it is off when `NO_COLOR` is set,
//! when `CLICOLOR=0` or `TERM=dumb`, or when stdout is not a terminal.
//! `CLICOLOR_FORCE` turns it back on for piped output.
//!
//! ```rust,ignore
//! use tsbuild::output::{status_label, OutputConfig};
//! use tsbuild::report::BuildStatus;
//!
//! let config = OutputConfig::from_env_and_flag("never");
//! assert_eq!(status_label(&config, BuildStatus::Failed), "failed    ");
//! ```

use std::env;

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::report::BuildStatus;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` value (`always`, `never` or `auto`, any case)
    /// and apply it to both console streams.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        console::set_colors_enabled(use_color);
        console::set_colors_enabled_stderr(use_color);
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// A fixed-width label for a build status, colored when enabled.
pub fn status_label(config: &OutputConfig, status: BuildStatus) -> String {
    let label = format!("{:<10}", status.to_string());
    if !config.use_color {
        return label;
    }
    let styled = match status {
        BuildStatus::Built | BuildStatus::UpToDate => style(label).green(),
        BuildStatus::Stale | BuildStatus::Building => style(label).yellow(),
        BuildStatus::Failed => style(label).red().bold(),
        BuildStatus::Skipped => style(label).dim(),
        BuildStatus::Unknown => style(label),
    };
    styled.to_string()
}

/// Progress bar over the projects being compiled, drawn on stderr.
///
/// Hidden when `visible` is false or stderr is not a terminal.
pub fn build_progress(len: u64, visible: bool) -> ProgressBar {
    if !visible || !console::Term::stderr().is_term() {
        return ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden());
    }
    let pb = ProgressBar::new(len);
    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(bar_style);
    pb
}
