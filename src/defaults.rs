//! Default values for tsbuild configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::num::NonZeroUsize;

/// File name looked up when a root or reference names a directory.
pub const CONFIG_FILE_NAME: &str = "tsconfig.json";

/// Include patterns used when a project declares neither `files` nor `include`.
pub const DEFAULT_INCLUDE: &[&str] = &["**/*"];

/// Directories never treated as project input.
pub const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// Compile command used when `--compiler` / `TSBUILD_COMPILER` is not set.
pub const DEFAULT_COMPILER: &str = "tsc";

/// Returns the default concurrency limit: the number of available CPUs.
///
/// Falls back to a single worker if parallelism cannot be determined.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
