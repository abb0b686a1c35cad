//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Following CLI recommendations,
//! errors should tell users what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tsbuild::suggestions;
//!
//! let graph = load_graph(&RealFs, &roots).map_err(suggestions::explain)?;
//! ```
//!
//! The original [`Error`] stays in the error chain, so callers can still
//! downcast to pick an exit code.

use std::path::Path;

use crate::error::{Constraint, Error};

/// Attach hints to a library error.
pub fn explain(error: Error) -> anyhow::Error {
    let hints = hints_for(&error);
    if hints.is_empty() {
        return anyhow::Error::new(error);
    }
    let message = format!("{error}\n\n{}", hints.join("\n"));
    anyhow::Error::new(error).context(message)
}

/// A root passed on the command line has no project configuration.
pub fn project_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Project not found: {}\n\n\
         hint: Pass a project's tsconfig.json or the directory containing it\n\
         hint: Run tsbuild from a directory containing tsconfig.json",
        path.display()
    )
}

fn hints_for(error: &Error) -> Vec<String> {
    match error {
        Error::CircularReference { .. } => vec![
            "hint: Remove one of the references listed above to break the cycle".to_string(),
            "hint: Move code shared by these projects into a separate project they all reference"
                .to_string(),
        ],
        Error::ConstraintViolation { project, rule } => constraint_hints(project, rule),
        Error::ReferencedProjectNotBuilt { project } => vec![format!(
            "hint: Build it first with 'tsbuild build {}'",
            project.display()
        )],
        Error::Config { message, .. } if message.starts_with("cannot find") => vec![
            "hint: Pass a project's tsconfig.json or the directory containing it".to_string(),
            "hint: Run tsbuild from a directory containing tsconfig.json".to_string(),
        ],
        Error::Config { .. } => vec![
            "hint: Project files must be strict JSON (no comments or trailing commas)".to_string(),
        ],
        _ => Vec::new(),
    }
}

fn constraint_hints(project: &Path, rule: &Constraint) -> Vec<String> {
    match rule {
        Constraint::DeclarationDisabled => vec![format!(
            "hint: Remove \"declaration\": false from {} or set \"composite\": true",
            project.display()
        )],
        Constraint::MissingReferences => vec![format!(
            "hint: Add \"references\": [] to {}",
            project.display()
        )],
        Constraint::FilesNotExhaustive { .. } => vec![
            "hint: Add the missing files to \"files\"".to_string(),
            "hint: Or replace \"files\" with \"include\" patterns".to_string(),
        ],
    }
}
