//! # Project Graph Loading
//!
//! This module turns one or more root configuration paths into a validated
//! [`DependencyGraph`]. It is the first step of every build and reads
//! configuration files only: input files are discovered by listing
//! directories, never by opening them.
//!
//! ## Process
//!
//! 1.  **Resolution**: every root and every `references[].path` is resolved to
//!     a configuration file. A path naming a directory resolves to the
//!     `tsconfig.json` inside it.
//!
//! 2.  **Depth-First Traversal**: projects are loaded depth-first while a
//!     stack of in-progress configuration paths is kept. Reaching a path that
//!     is still on the stack is a cycle; the error carries the stack slice
//!     from the repeated project back to itself. Nodes are appended in
//!     post-order, so every referenced project gets a smaller index than its
//!     referencers.
//!
//! 3.  **Constraint Validation**: once the closure is known, every project
//!     that is referenced by another must keep declaration output enabled,
//!     must declare a `references` field, and, if it lists `files`, must
//!     list every source file under its root directory.
//!
//! Any failure aborts loading; no partial graph is ever returned.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::{self, LoadedConfig, ProjectConfig};
use crate::defaults::{CONFIG_FILE_NAME, DEFAULT_EXCLUDE, DEFAULT_INCLUDE};
use crate::error::{Constraint, Error, Result};
use crate::filesystem::FileSystem;
use crate::graph::{DependencyGraph, NodeIndex};
use crate::path::{
    absolutize, common_ancestor, is_declaration_file, is_source_file, is_within, normalize,
    replace_source_extension, GlobSet,
};
use crate::project::ProjectNode;

/// Load the transitive closure of `roots` into a validated graph.
pub fn load_graph(fs: &dyn FileSystem, roots: &[PathBuf]) -> Result<DependencyGraph> {
    GraphLoader::new(fs).load(roots)
}

/// Resolve a root or reference path to a configuration file.
///
/// Accepts either the configuration file itself or a directory containing
/// `tsconfig.json`.
pub fn resolve_config_path(fs: &dyn FileSystem, candidate: &Path) -> Option<PathBuf> {
    if fs.is_file(candidate) {
        return Some(candidate.to_path_buf());
    }
    let conventional = candidate.join(CONFIG_FILE_NAME);
    fs.is_file(&conventional).then_some(conventional)
}

/// Depth-first loader state for one invocation.
pub struct GraphLoader<'a> {
    fs: &'a dyn FileSystem,
    nodes: Vec<ProjectNode>,
    edges: Vec<(NodeIndex, NodeIndex)>,
    index: HashMap<PathBuf, NodeIndex>,
    stack: Vec<PathBuf>,
}

impl<'a> GraphLoader<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self {
            fs,
            nodes: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Load every root and its references, then validate the closure.
    pub fn load(mut self, roots: &[PathBuf]) -> Result<DependencyGraph> {
        let mut root_indices = Vec::with_capacity(roots.len());
        for root in roots {
            let candidate = normalize(root);
            let config_path = resolve_config_path(self.fs, &candidate).ok_or_else(|| {
                Error::config(&candidate, format!("cannot find a {CONFIG_FILE_NAME}"))
            })?;
            root_indices.push(self.visit(config_path)?);
        }

        self.validate_referenced()?;

        debug!(
            "loaded {} projects with {} references",
            self.nodes.len(),
            self.edges.len()
        );
        DependencyGraph::new(self.nodes, self.edges, root_indices)
    }

    fn visit(&mut self, config_path: PathBuf) -> Result<NodeIndex> {
        if let Some(&index) = self.index.get(&config_path) {
            return Ok(index);
        }
        if let Some(start) = self.stack.iter().position(|p| *p == config_path) {
            let mut cycle = self.stack[start..].to_vec();
            cycle.push(config_path);
            return Err(Error::CircularReference { cycle });
        }

        debug!("loading project {}", config_path.display());
        let loaded = config::from_file(self.fs, &config_path)?;
        if let Some(base) = &loaded.config.extends {
            warn!(
                "{}: \"extends\": \"{}\" is not followed; only settings in this file are used",
                config_path.display(),
                base
            );
        }

        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut reference_paths: Vec<PathBuf> = Vec::new();
        for reference in loaded.config.references.iter().flatten() {
            let candidate = absolutize(&config_dir, Path::new(&reference.path));
            let target = resolve_config_path(self.fs, &candidate).ok_or_else(|| {
                Error::config(
                    &config_path,
                    format!("referenced project {} does not exist", candidate.display()),
                )
            })?;
            if !reference_paths.contains(&target) {
                reference_paths.push(target);
            }
        }

        self.stack.push(config_path.clone());
        let mut children = Vec::with_capacity(reference_paths.len());
        for target in &reference_paths {
            children.push(self.visit(target.clone())?);
        }
        self.stack.pop();

        let node = self.build_node(loaded, reference_paths)?;
        let index = self.nodes.len();
        self.nodes.push(node);
        self.index.insert(config_path, index);
        self.edges
            .extend(children.into_iter().map(|child| (index, child)));
        Ok(index)
    }

    fn build_node(&self, loaded: LoadedConfig, references: Vec<PathBuf>) -> Result<ProjectNode> {
        let LoadedConfig {
            path,
            config,
            fingerprint,
        } = loaded;
        let root_dir_option = config.compiler_options.root_dir.clone();
        let out_dir_option = config.compiler_options.out_dir.clone();
        let has_references = config.references.is_some();

        let mut node = ProjectNode::new(path, config);
        node.config_fingerprint = fingerprint;
        node.references = references;

        let explicit_out_dir =
            out_dir_option.map(|dir| absolutize(&node.config_dir, Path::new(&dir)));
        node.input_files = self.collect_inputs(
            &node.config_dir,
            &node.config,
            explicit_out_dir.as_deref(),
        )?;

        node.root_dir = match root_dir_option {
            Some(dir) => absolutize(&node.config_dir, Path::new(&dir)),
            None if has_references => node.config_dir.clone(),
            None => common_ancestor(
                node.input_files
                    .iter()
                    .filter(|file| !is_declaration_file(file))
                    .map(PathBuf::as_path),
            )
            .unwrap_or_else(|| node.config_dir.clone()),
        };
        node.out_dir = explicit_out_dir.unwrap_or_else(|| node.root_dir.clone());

        if let Some(outside) = node
            .input_files
            .iter()
            .find(|file| !is_declaration_file(file) && !is_within(&node.root_dir, file))
        {
            return Err(Error::config(
                &node.config_path,
                format!(
                    "file {} is not under rootDir {}",
                    outside.display(),
                    node.root_dir.display()
                ),
            ));
        }

        Ok(node)
    }

    /// Input files from `files` plus `include` matches, sorted.
    fn collect_inputs(
        &self,
        config_dir: &Path,
        config: &ProjectConfig,
        out_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>> {
        let mut inputs = BTreeSet::new();

        for file in config.files.iter().flatten() {
            let path = absolutize(config_dir, Path::new(file));
            if !self.fs.is_file(&path) {
                return Err(Error::config(
                    config_dir.join(CONFIG_FILE_NAME),
                    format!("file {} not found", path.display()),
                ));
            }
            inputs.insert(path);
        }

        let include: Vec<String> = match (&config.include, &config.files) {
            (Some(patterns), _) => patterns.clone(),
            (None, Some(_)) => Vec::new(),
            (None, None) => DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect(),
        };
        if !include.is_empty() {
            let include = GlobSet::new(&include)?;
            let exclude = exclude_globs(config)?;
            let out_dir = out_dir.filter(|out_dir| !config_dir.starts_with(out_dir));
            let prune = |dir: &Path| {
                out_dir.is_some_and(|out_dir| dir == out_dir)
                    || dir
                        .strip_prefix(config_dir)
                        .is_ok_and(|relative| exclude.matches(relative))
            };
            for file in self.fs.list_files(config_dir, &prune)? {
                if !is_source_file(&file) {
                    continue;
                }
                if out_dir.is_some_and(|out_dir| file.starts_with(out_dir)) {
                    continue;
                }
                let Ok(relative) = file.strip_prefix(config_dir) else {
                    continue;
                };
                if include.matches(relative) && !exclude.matches(relative) {
                    inputs.insert(file);
                }
            }
        }

        // A declaration next to its own source is that source's output.
        let generated: Vec<PathBuf> = inputs
            .iter()
            .filter(|file| is_declaration_file(file))
            .filter(|declaration| {
                [".ts", ".tsx"].iter().any(|extension| {
                    replace_source_extension(declaration, extension)
                        .is_some_and(|source| inputs.contains(&source))
                })
            })
            .cloned()
            .collect();
        for declaration in generated {
            inputs.remove(&declaration);
        }

        Ok(inputs.into_iter().collect())
    }

    fn validate_referenced(&mut self) -> Result<()> {
        let mut referenced = vec![false; self.nodes.len()];
        for &(_, to) in &self.edges {
            referenced[to] = true;
        }
        let project_dirs: Vec<PathBuf> = self
            .nodes
            .iter()
            .map(|node| node.config_dir.clone())
            .collect();

        for index in 0..self.nodes.len() {
            if !referenced[index] {
                continue;
            }
            let node = &self.nodes[index];
            if node.config.declaration_disabled() {
                return Err(Error::ConstraintViolation {
                    project: node.config_path.clone(),
                    rule: Constraint::DeclarationDisabled,
                });
            }
            if node.config.references.is_none() {
                return Err(Error::ConstraintViolation {
                    project: node.config_path.clone(),
                    rule: Constraint::MissingReferences,
                });
            }
            if node.config.files.is_some() {
                let missing = self.unlisted_sources(node, &project_dirs)?;
                if !missing.is_empty() {
                    return Err(Error::ConstraintViolation {
                        project: node.config_path.clone(),
                        rule: Constraint::FilesNotExhaustive { missing },
                    });
                }
            }
            self.nodes[index].declaration = true;
        }
        Ok(())
    }

    /// Source files under the node's root that its input list omits.
    /// Ambient declarations, excluded paths, output and other projects'
    /// directories are exempt.
    fn unlisted_sources(&self, node: &ProjectNode, project_dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let exclude = exclude_globs(&node.config)?;
        let nested_projects: Vec<&PathBuf> = project_dirs
            .iter()
            .filter(|dir| {
                **dir != node.config_dir
                    && is_within(&node.root_dir, dir)
                    && !node.config_dir.starts_with(dir)
            })
            .collect();

        let excluded = |path: &Path| {
            path.strip_prefix(&node.config_dir)
                .is_ok_and(|relative| exclude.matches(relative))
        };
        let prune = |dir: &Path| {
            (node.out_dir != node.root_dir && dir == node.out_dir)
                || nested_projects.iter().any(|nested| dir == nested.as_path())
                || excluded(dir)
        };

        let mut missing = Vec::new();
        for file in self.fs.list_files(&node.root_dir, &prune)? {
            if !is_source_file(&file) || is_declaration_file(&file) {
                continue;
            }
            if node.input_files.binary_search(&file).is_ok() {
                continue;
            }
            if node.out_dir != node.root_dir && file.starts_with(&node.out_dir) {
                continue;
            }
            if nested_projects.iter().any(|dir| file.starts_with(dir)) {
                continue;
            }
            if excluded(&file) {
                continue;
            }
            missing.push(file);
        }
        Ok(missing)
    }
}

fn exclude_globs(config: &ProjectConfig) -> Result<GlobSet> {
    match &config.exclude {
        Some(patterns) => GlobSet::new(patterns),
        None => GlobSet::new(DEFAULT_EXCLUDE),
    }
}
