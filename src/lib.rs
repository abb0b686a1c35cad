//! # tsbuild
//!
//! This library builds TypeScript-style "project references" graphs: large
//! codebases split into projects that each compile on their own and consume
//! the declaration output of the projects they reference. It is used by the
//! `tsbuild` command-line tool but every component can be driven directly.
//!
//! ## Quick Example
//!
//! ```
//! use std::path::PathBuf;
//! use tsbuild::filesystem::MemoryFs;
//! use tsbuild::loader::load_graph;
//!
//! let fs = MemoryFs::new();
//! fs.add_file_string(
//!     "/repo/core/tsconfig.json",
//!     r#"{ "compilerOptions": { "composite": true }, "references": [] }"#,
//! );
//! fs.add_file_string("/repo/core/index.ts", "export const answer = 42;");
//! fs.add_file_string(
//!     "/repo/app/tsconfig.json",
//!     r#"{ "references": [{ "path": "../core" }] }"#,
//! );
//! fs.add_file_string("/repo/app/main.ts", "import { answer } from '../core';");
//!
//! let graph = load_graph(&fs, &[PathBuf::from("/repo/app")]).unwrap();
//! let order: Vec<String> = graph.topological_order().iter().map(|p| p.name()).collect();
//! assert_eq!(order, ["core", "app"]);
//! assert_eq!(graph.levels().len(), 2);
//! ```
//!
//! ## Core Concepts
//!
//! - **Projects (`config`, `project`)**: a `tsconfig.json`-style file and the
//!   inputs, root and output directories derived from it.
//! - **Graph (`loader`, `graph`)**: the validated, acyclic reference graph,
//!   with topological order and level partitioning.
//! - **Up-to-date checks (`metadata`, `uptodate`)**: per-project build
//!   records compared against the filesystem, never against a referenced
//!   project's sources.
//! - **Resolution (`resolution`)**: imports into a referenced project are
//!   redirected to its declaration output.
//! - **Scheduling (`session`, `scheduler`, `compiler`, `report`)**: level by
//!   level builds on a bounded worker pool, with failures contained to the
//!   projects that depend on them.
//! - **Filesystem (`filesystem`)**: every disk access goes through an
//!   injectable trait, so tests can run against an instrumented in-memory
//!   filesystem.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: read configuration files from the roots, depth first, and
//!     reject cycles and invalid referenced projects.
//! 2.  **Check**: walk the levels and decide per project whether its output
//!     is still valid.
//! 3.  **Build**: compile stale projects, in parallel within a level, and
//!     record new build metadata on success.
//! 4.  **Report**: one status per project plus every diagnostic collected.

pub mod compiler;
pub mod config;
pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod filesystem;
pub mod graph;
pub mod loader;
pub mod metadata;
pub mod output;
pub mod path;
pub mod project;
pub mod report;
pub mod resolution;
pub mod scheduler;
pub mod session;
pub mod suggestions;
pub mod uptodate;

#[cfg(test)]
mod test_support;
