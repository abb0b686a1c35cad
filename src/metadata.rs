//! Build metadata sidecar.
//!
//! Every project that has been built successfully owns one sidecar file,
//! `<outDir>/<config stem>.tsbuildinfo`, recording the modification signals of
//! its inputs and outputs at the end of that build. The up-to-date check
//! compares these records with the current filesystem.
//!
//! Loading is fail-safe: a missing, unreadable or incompatible sidecar is
//! treated as "no prior build", which forces a rebuild. The scheduler removes
//! the sidecar before compiling and writes a new one atomically only after a
//! successful compile, so a build interrupted halfway also reads as "no prior
//! build" on the next run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::project::ProjectNode;

/// Format version of the sidecar. Sidecars with another version are ignored.
pub const METADATA_VERSION: u32 = 1;

/// Record of a project's last successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub version: u32,
    /// Version of the tool that wrote the sidecar.
    pub tool_version: String,
    /// Configuration path of the project this sidecar belongs to.
    pub project: PathBuf,
    pub config_fingerprint: String,
    /// Identifies this particular build; dependents record it to notice
    /// later rebuilds of this project.
    pub build_stamp: String,
    pub inputs: BTreeMap<PathBuf, SystemTime>,
    pub outputs: BTreeMap<PathBuf, SystemTime>,
    /// Build stamp of each direct reference at the time of this build.
    pub references: BTreeMap<PathBuf, String>,
}

impl BuildMetadata {
    /// Capture the current signals of `node`'s inputs and outputs.
    ///
    /// Outputs that do not exist are left out of the record.
    pub fn record(
        fs: &dyn FileSystem,
        node: &ProjectNode,
        references: BTreeMap<PathBuf, String>,
    ) -> Self {
        let inputs: BTreeMap<PathBuf, SystemTime> = node
            .input_files
            .iter()
            .filter_map(|input| fs.modified(input).map(|time| (input.clone(), time)))
            .collect();
        let outputs: BTreeMap<PathBuf, SystemTime> = node
            .expected_outputs()
            .into_iter()
            .filter_map(|output| fs.modified(&output).map(|time| (output, time)))
            .collect();

        let mut metadata = Self {
            version: METADATA_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            project: node.config_path.clone(),
            config_fingerprint: node.config_fingerprint.clone(),
            build_stamp: String::new(),
            inputs,
            outputs,
            references,
        };
        metadata.build_stamp = metadata.compute_stamp();
        metadata
    }

    fn compute_stamp(&self) -> String {
        let mut signature = String::new();
        signature.push_str(&self.config_fingerprint);
        for (path, time) in self.inputs.iter().chain(self.outputs.iter()) {
            let nanos = time
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|duration| duration.as_nanos())
                .unwrap_or_default();
            signature.push_str(&format!("\n{}={nanos}", path.display()));
        }
        for (path, stamp) in &self.references {
            signature.push_str(&format!("\n{}@{stamp}", path.display()));
        }
        format!("{:016x}", xxh3_64(signature.as_bytes()))
    }

    /// Load the sidecar of `node`, or `None` if there is no usable record.
    pub fn load(fs: &dyn FileSystem, node: &ProjectNode) -> Option<Self> {
        let path = node.metadata_path();
        if !fs.is_file(&path) {
            debug!("{}: no build metadata", node.config_path.display());
            return None;
        }
        let content = match fs.read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("ignoring unreadable build metadata: {e}");
                return None;
            }
        };
        let metadata: Self = match serde_json::from_str(&content) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("ignoring corrupt build metadata {}: {e}", path.display());
                return None;
            }
        };
        if metadata.version != METADATA_VERSION {
            warn!(
                "ignoring build metadata {} with format version {}",
                path.display(),
                metadata.version
            );
            return None;
        }
        if metadata.project != node.config_path {
            warn!(
                "ignoring build metadata {} written for {}",
                path.display(),
                metadata.project.display()
            );
            return None;
        }
        Some(metadata)
    }

    /// Write the sidecar atomically.
    pub fn save(&self, fs: &dyn FileSystem, node: &ProjectNode) -> Result<()> {
        let path = node.metadata_path();
        let json = serde_json::to_vec_pretty(self).map_err(|e| metadata_error(&path, e))?;
        fs.write_atomic(&path, &json)
            .map_err(|e| metadata_error(&path, e))
    }

    /// Remove the sidecar of `node`. Returns whether one existed.
    pub fn invalidate(fs: &dyn FileSystem, node: &ProjectNode) -> Result<bool> {
        let path = node.metadata_path();
        fs.remove_file(&path).map_err(|e| metadata_error(&path, e))
    }

    /// Whether the recorded input set equals `node`'s current input set.
    pub fn has_inputs(&self, inputs: &[PathBuf]) -> bool {
        self.inputs.len() == inputs.len() && inputs.iter().all(|input| self.inputs.contains_key(input))
    }
}

fn metadata_error(path: &Path, error: impl std::fmt::Display) -> Error {
    Error::Metadata {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
