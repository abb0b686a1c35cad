//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `tsbuild`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `tsbuild` library.

pub mod build;
pub mod completions;
pub mod graph;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tsbuild::defaults::CONFIG_FILE_NAME;
use tsbuild::filesystem::FileSystem;
use tsbuild::loader::resolve_config_path;
use tsbuild::path::absolutize;
use tsbuild::suggestions;

/// Absolute root configuration paths for the given command-line roots.
///
/// No roots means `./tsconfig.json`. Every root must name a configuration
/// file or a directory containing one.
pub fn resolve_roots(fs: &dyn FileSystem, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let cwd = env::current_dir().context("Failed to determine the current directory")?;
    resolve_roots_from(fs, &cwd, roots)
}

fn resolve_roots_from(fs: &dyn FileSystem, cwd: &Path, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let candidates = if roots.is_empty() {
        vec![cwd.join(CONFIG_FILE_NAME)]
    } else {
        roots.iter().map(|root| absolutize(cwd, root)).collect()
    };

    candidates
        .into_iter()
        .map(|candidate| {
            resolve_config_path(fs, &candidate)
                .ok_or_else(|| suggestions::project_not_found(&candidate))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsbuild::filesystem::MemoryFs;

    #[test]
    fn test_default_root_is_cwd_config() {
        let fs = MemoryFs::new();
        fs.add_file_string("/repo/tsconfig.json", "{}");

        let roots = resolve_roots_from(&fs, Path::new("/repo"), &[]).unwrap();
        assert_eq!(roots, vec![PathBuf::from("/repo/tsconfig.json")]);
    }

    #[test]
    fn test_relative_directory_root() {
        let fs = MemoryFs::new();
        fs.add_file_string("/repo/packages/core/tsconfig.json", "{}");

        let roots =
            resolve_roots_from(&fs, Path::new("/repo"), &[PathBuf::from("packages/core")]).unwrap();
        assert_eq!(roots, vec![PathBuf::from("/repo/packages/core/tsconfig.json")]);
    }

    #[test]
    fn test_missing_root_is_reported() {
        let fs = MemoryFs::new();
        let error =
            resolve_roots_from(&fs, Path::new("/repo"), &[PathBuf::from("missing")]).unwrap_err();
        assert!(error.to_string().contains("Project not found: /repo/missing"));
    }
}
