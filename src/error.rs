//! # Error Handling
//!
//! This module defines the centralized error type for `tsbuild`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! the orchestrator can report, and a `Result<T>` alias used throughout the
//! crate.
//!
//! Errors fall into two groups:
//!
//! - **Structural** errors (`Config`, `ConstraintViolation`,
//!   `CircularReference`) describe an invalid project graph. They are raised
//!   while the graph is loaded and abort the whole run before any project is
//!   built.
//! - **Per-project** errors (`ReferencedProjectNotBuilt`, `Compile`) are
//!   raised while a single project is compiled. They fail only that project;
//!   its dependents are skipped and unrelated projects keep building.
//!
//! The remaining variants wrap lower-level failures (I/O, JSON, glob patterns,
//! metadata persistence, worker startup) and cancellation.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A restriction that every referenced project must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `compilerOptions.declaration` was explicitly set to `false`.
    DeclarationDisabled,
    /// The project has no `references` field (an empty list is fine).
    MissingReferences,
    /// The project declares `files`, but these source files under its root
    /// directory are not listed.
    FilesNotExhaustive { missing: Vec<PathBuf> },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::DeclarationDisabled => write!(
                f,
                "referenced project must have setting \"declaration\": true"
            ),
            Constraint::MissingReferences => write!(
                f,
                "referenced project must declare a \"references\" field (it may be empty)"
            ),
            Constraint::FilesNotExhaustive { missing } => {
                write!(
                    f,
                    "referenced project's \"files\" list must include every source file; missing:"
                )?;
                for path in missing {
                    write!(f, "\n    {}", path.display())?;
                }
                Ok(())
            }
        }
    }
}

/// Main error type for tsbuild operations
#[derive(Error, Debug)]
pub enum Error {
    /// A project configuration is missing, unreadable or malformed.
    #[error("Invalid project configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// A referenced project violates a restriction placed on referenced projects.
    #[error("Constraint violation in {}: {rule}", project.display())]
    ConstraintViolation { project: PathBuf, rule: Constraint },

    /// The `references` edges form a cycle. The path starts and ends at the
    /// repeated project.
    #[error("{}", format_cycle(cycle))]
    CircularReference { cycle: Vec<PathBuf> },

    /// An import crossed into a referenced project whose declaration output
    /// does not exist yet.
    #[error("Referenced project \"{}\" is not built", project.display())]
    ReferencedProjectNotBuilt { project: PathBuf },

    /// The external compile operation reported a failure.
    #[error("Compilation of {} failed{}", project.display(), format_diagnostics(diagnostics))]
    Compile {
        project: PathBuf,
        diagnostics: Vec<String>,
    },

    /// An I/O error tied to a specific path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Build metadata could not be persisted.
    #[error("Build metadata error at {}: {message}", path.display())]
    Metadata { path: PathBuf, message: String },

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// The worker pool could not be started.
    #[error("Failed to start build workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The run was cancelled before this work started.
    #[error("Build cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` for errors that invalidate the whole project graph.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::ConstraintViolation { .. } | Error::CircularReference { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Render a cycle in the wire format shared with other project-reference tools.
fn format_cycle(cycle: &[PathBuf]) -> String {
    let mut out =
        String::from("Project references may not form a circular graph. Cycle detected:");
    let last = cycle.len().saturating_sub(1);
    for (i, path) in cycle.iter().enumerate() {
        out.push_str("\n    ");
        out.push_str(&path.display().to_string());
        if i != last {
            out.push_str(" ->");
        }
    }
    out
}

fn format_diagnostics(diagnostics: &[String]) -> String {
    if diagnostics.is_empty() {
        return String::new();
    }
    let mut out = String::from(":");
    for line in diagnostics {
        out.push_str("\n  ");
        out.push_str(line);
    }
    out
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_circular_reference() {
        let error = Error::CircularReference {
            cycle: vec![
                PathBuf::from("/repo/core/tsconfig.json"),
                PathBuf::from("/repo/zoo/tsconfig.json"),
                PathBuf::from("/repo/animals/tsconfig.json"),
                PathBuf::from("/repo/core/tsconfig.json"),
            ],
        };

        insta::assert_snapshot!(error.to_string(), @r"
        Project references may not form a circular graph. Cycle detected:
            /repo/core/tsconfig.json ->
            /repo/zoo/tsconfig.json ->
            /repo/animals/tsconfig.json ->
            /repo/core/tsconfig.json
        ");
    }

    #[test]
    fn test_error_display_not_built() {
        let error = Error::ReferencedProjectNotBuilt {
            project: PathBuf::from("/repo/core/tsconfig.json"),
        };
        assert_eq!(
            error.to_string(),
            "Referenced project \"/repo/core/tsconfig.json\" is not built"
        );
    }

    #[test]
    fn test_error_display_constraint() {
        let error = Error::ConstraintViolation {
            project: PathBuf::from("/repo/core/tsconfig.json"),
            rule: Constraint::DeclarationDisabled,
        };
        let display = error.to_string();
        assert!(display.contains("/repo/core/tsconfig.json"));
        assert!(display.contains("\"declaration\": true"));
    }

    #[test]
    fn test_error_display_files_not_exhaustive() {
        let rule = Constraint::FilesNotExhaustive {
            missing: vec![PathBuf::from("/repo/core/extra.ts")],
        };
        assert!(rule.to_string().contains("/repo/core/extra.ts"));
    }

    #[test]
    fn test_error_display_compile_with_diagnostics() {
        let error = Error::Compile {
            project: PathBuf::from("/repo/zoo/tsconfig.json"),
            diagnostics: vec!["zoo.ts(1,1): error TS2304".to_string()],
        };
        let display = error.to_string();
        assert!(display.starts_with("Compilation of /repo/zoo/tsconfig.json failed:"));
        assert!(display.contains("TS2304"));
    }

    #[test]
    fn test_is_structural() {
        assert!(Error::config("/a", "bad").is_structural());
        assert!(Error::CircularReference { cycle: vec![] }.is_structural());
        assert!(!Error::Cancelled.is_structural());
        assert!(!Error::ReferencedProjectNotBuilt {
            project: PathBuf::from("/a")
        }
        .is_structural());
    }
}
