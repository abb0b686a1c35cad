//! Module resolution across reference boundaries.
//!
//! When a project imports a file that lies inside the root directory of a
//! project it references, the import is redirected to the declaration file
//! that project emitted for it. A missing declaration is reported as
//! [`Error::ReferencedProjectNotBuilt`] naming the referenced project, not as
//! a missing module. Only direct references are redirected; files in the
//! importing project's own root directory resolve unchanged.

use std::path::{Path, PathBuf};

use log::trace;

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::graph::{DependencyGraph, NodeIndex};
use crate::path::{is_declaration_file, is_source_file, is_within, normalize};

/// Candidate suffixes tried for an extensionless relative import.
const IMPORT_SUFFIXES: &[&str] = &[
    ".ts",
    ".tsx",
    ".d.ts",
    "/index.ts",
    "/index.tsx",
    "/index.d.ts",
];

/// Where an import ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolved normally.
    Unchanged(PathBuf),
    /// Redirected to a referenced project's declaration output.
    Declaration { path: PathBuf, project: PathBuf },
}

impl Resolution {
    pub fn path(&self) -> &Path {
        match self {
            Resolution::Unchanged(path) => path,
            Resolution::Declaration { path, .. } => path,
        }
    }
}

/// Resolver for imports made by one project of the graph.
#[derive(Debug, Clone, Copy)]
pub struct ModuleResolver<'a> {
    graph: &'a DependencyGraph,
    index: NodeIndex,
    fs: &'a dyn FileSystem,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(graph: &'a DependencyGraph, index: NodeIndex, fs: &'a dyn FileSystem) -> Self {
        Self { graph, index, fs }
    }

    /// Apply the override to a file found by ordinary resolution.
    pub fn resolve(&self, resolved: &Path) -> Result<Resolution> {
        let resolved = normalize(resolved);
        let own = self.graph.node(self.index);
        let own_depth = is_within(&own.root_dir, &resolved).then(|| depth(&own.root_dir));

        let target = self
            .graph
            .dependencies(self.index)
            .iter()
            .copied()
            .filter(|&reference| is_within(&self.graph.node(reference).root_dir, &resolved))
            .max_by_key(|&reference| depth(&self.graph.node(reference).root_dir));

        match target {
            Some(reference)
                if own_depth.map_or(true, |own_depth| {
                    depth(&self.graph.node(reference).root_dir) > own_depth
                }) =>
            {
                self.redirect(reference, resolved)
            }
            _ => Ok(Resolution::Unchanged(resolved)),
        }
    }

    fn redirect(&self, reference: NodeIndex, resolved: PathBuf) -> Result<Resolution> {
        let target = self.graph.node(reference);
        if is_declaration_file(&resolved) {
            return Ok(Resolution::Unchanged(resolved));
        }
        let Some(declaration) = target.declaration_output_for(&resolved) else {
            return Ok(Resolution::Unchanged(resolved));
        };
        if !self.fs.is_file(&declaration) {
            return Err(Error::ReferencedProjectNotBuilt {
                project: target.config_path.clone(),
            });
        }
        trace!(
            "{} -> {}",
            resolved.display(),
            declaration.display()
        );
        Ok(Resolution::Declaration {
            path: declaration,
            project: target.config_path.clone(),
        })
    }

    /// Resolve a relative import written in `importing_file`.
    ///
    /// Returns `Ok(None)` for package imports and for relative imports that
    /// match no file.
    pub fn resolve_import(&self, importing_file: &Path, specifier: &str) -> Result<Option<Resolution>> {
        if !(specifier.starts_with("./") || specifier.starts_with("../")) {
            return Ok(None);
        }
        let base = match importing_file.parent() {
            Some(dir) => normalize(&dir.join(specifier)),
            None => normalize(Path::new(specifier)),
        };

        let mut candidates = Vec::with_capacity(IMPORT_SUFFIXES.len() + 1);
        if is_source_file(&base) {
            candidates.push(base.clone());
        }
        let base = base.to_string_lossy();
        candidates.extend(
            IMPORT_SUFFIXES
                .iter()
                .map(|suffix| PathBuf::from(format!("{base}{suffix}"))),
        );

        match candidates.into_iter().find(|candidate| self.fs.is_file(candidate)) {
            Some(found) => self.resolve(&found).map(Some),
            None => Ok(None),
        }
    }

    /// Confirm that every direct reference has emitted a declaration for
    /// each of its inputs.
    pub fn verify_references(&self) -> Result<()> {
        for &reference in self.graph.dependencies(self.index) {
            for input in &self.graph.node(reference).input_files {
                if !is_declaration_file(input) {
                    self.resolve(input)?;
                }
            }
        }
        Ok(())
    }
}

fn depth(path: &Path) -> usize {
    path.components().count()
}
