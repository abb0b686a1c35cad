//! Project nodes: one independently buildable compilation unit each.

use std::path::{Path, PathBuf};

use crate::config::{self, ProjectConfig};
use crate::path::{is_declaration_file, replace_source_extension};

/// One compilation unit, identified by the normalized path of its
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectNode {
    /// Unique identity of the project.
    pub config_path: PathBuf,
    /// Directory containing the configuration file.
    pub config_dir: PathBuf,
    /// Base directory for input file identities.
    pub root_dir: PathBuf,
    /// Output root.
    pub out_dir: PathBuf,
    /// Whether declaration output is emitted. Forced on for referenced projects.
    pub declaration: bool,
    /// Emit declarations only, no JavaScript.
    pub emit_declaration_only: bool,
    /// Configuration paths of referenced projects, in declaration order.
    pub references: Vec<PathBuf>,
    /// Input source files, sorted.
    pub input_files: Vec<PathBuf>,
    /// The parsed configuration.
    pub config: ProjectConfig,
    /// Fingerprint of the configuration text.
    pub config_fingerprint: String,
}

impl ProjectNode {
    /// Create a node with directory defaults derived from `config_path`:
    /// root and output directories are the configuration's directory.
    pub fn new(config_path: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        let config_path = config_path.into();
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let fingerprint = config::fingerprint(&format!("{config:?}"));
        Self {
            root_dir: config_dir.clone(),
            out_dir: config_dir.clone(),
            declaration: config.emits_declarations(),
            emit_declaration_only: config.compiler_options.emit_declaration_only.unwrap_or(false),
            config_dir,
            config_path,
            references: Vec::new(),
            input_files: Vec::new(),
            config,
            config_fingerprint: fingerprint,
        }
    }

    /// Short human-readable name: the configuration's directory name.
    pub fn name(&self) -> String {
        self.config_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config_path.display().to_string())
    }

    /// Declaration output for an input file, if the file produces one.
    pub fn declaration_output_for(&self, input: &Path) -> Option<PathBuf> {
        let relative = input.strip_prefix(&self.root_dir).ok()?;
        if is_declaration_file(relative) {
            return None;
        }
        Some(self.out_dir.join(replace_source_extension(relative, ".d.ts")?))
    }

    /// JavaScript output for an input file, if the file produces one.
    pub fn script_output_for(&self, input: &Path) -> Option<PathBuf> {
        if self.emit_declaration_only {
            return None;
        }
        let relative = input.strip_prefix(&self.root_dir).ok()?;
        if is_declaration_file(relative) {
            return None;
        }
        Some(self.out_dir.join(replace_source_extension(relative, ".js")?))
    }

    /// Every output file a successful compile is expected to produce.
    pub fn expected_outputs(&self) -> Vec<PathBuf> {
        let mut outputs = Vec::new();
        for input in &self.input_files {
            if self.declaration {
                outputs.extend(self.declaration_output_for(input));
            }
            outputs.extend(self.script_output_for(input));
        }
        outputs.sort();
        outputs.dedup();
        outputs
    }

    /// Location of this project's build metadata sidecar.
    pub fn metadata_path(&self) -> PathBuf {
        let stem = self
            .config_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tsconfig".to_string());
        self.out_dir.join(format!("{stem}.tsbuildinfo"))
    }
}
