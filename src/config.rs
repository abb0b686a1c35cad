//! # Project Configuration Schema and Parsing
//!
//! This module defines the subset of a `tsconfig.json`-style project
//! configuration that the orchestrator understands, and the logic for
//! loading it through a [`FileSystem`].
//!
//! ## Recognised keys
//!
//! - `compilerOptions.declaration`, `compilerOptions.composite`,
//!   `compilerOptions.emitDeclarationOnly`
//! - `compilerOptions.rootDir`, `compilerOptions.outDir`
//! - `files`, `include`, `exclude`
//! - `references: [{ "path": "..." }]`
//! - `extends` (recorded but not followed)
//!
//! Unknown keys are ignored so that configurations written for the full
//! compiler load unchanged. The raw text is kept alongside the parsed value:
//! its fingerprint is how the up-to-date check notices configuration edits.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;

/// Compiler options relevant to orchestration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Whether declaration output is emitted. `None` when unspecified.
    #[serde(default)]
    pub declaration: Option<bool>,
    /// Composite projects always emit declarations.
    #[serde(default)]
    pub composite: Option<bool>,
    /// Emit only declaration files, no JavaScript.
    #[serde(default)]
    pub emit_declaration_only: Option<bool>,
    /// Base directory for input file identities.
    #[serde(default)]
    pub root_dir: Option<String>,
    /// Output root.
    #[serde(default)]
    pub out_dir: Option<String>,
}

/// A single entry of the `references` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReference {
    /// A configuration file, or a directory containing `tsconfig.json`.
    pub path: String,
}

/// The parsed content of one project configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    /// Explicit input list. When present it must be exhaustive.
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    /// `None` when the field is absent, which is distinct from an empty list.
    #[serde(default)]
    pub references: Option<Vec<ProjectReference>>,
    /// Configuration inheritance is outside the orchestrator's scope.
    #[serde(default)]
    pub extends: Option<String>,
}

impl ProjectConfig {
    /// Whether this project emits declaration output.
    pub fn emits_declarations(&self) -> bool {
        match self.compiler_options.declaration {
            Some(declaration) => declaration,
            None => self.compiler_options.composite.unwrap_or(false),
        }
    }

    /// Whether `declaration` was explicitly turned off.
    pub fn declaration_disabled(&self) -> bool {
        self.compiler_options.declaration == Some(false)
    }
}

/// Fingerprint of configuration text.
///
/// Whitespace-only edits change the fingerprint too; a spurious rebuild is
/// preferred over parsing the text twice.
pub fn fingerprint(text: &str) -> String {
    format!("{:016x}", xxh3_64(text.as_bytes()))
}

/// Parse configuration text. `path` is only used for error messages.
pub fn parse(path: &Path, text: &str) -> Result<ProjectConfig> {
    serde_json::from_str(text).map_err(|e| Error::config(path, e.to_string()))
}

/// A configuration file as loaded from disk.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: ProjectConfig,
    pub fingerprint: String,
}

/// Read and parse the configuration at `path`.
pub fn from_file(fs: &dyn FileSystem, path: &Path) -> Result<LoadedConfig> {
    let text = fs
        .read_to_string(path)
        .map_err(|e| Error::config(path, format!("cannot read file: {e}")))?;
    let config = parse(path, &text)?;
    Ok(LoadedConfig {
        path: path.to_path_buf(),
        config,
        fingerprint: fingerprint(&text),
    })
}
