//! Build statuses and the aggregated end-of-run report.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use crate::exit_codes;
use crate::graph::NodeIndex;
use crate::uptodate::UpToDateStatus;

/// Per-node state for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BuildStatus {
    Unknown = 0,
    UpToDate = 1,
    Stale = 2,
    Building = 3,
    Built = 4,
    Failed = 5,
    Skipped = 6,
}

impl BuildStatus {
    /// `UpToDate`, `Built`, `Failed` and `Skipped` never change again in a run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::UpToDate | BuildStatus::Built | BuildStatus::Failed | BuildStatus::Skipped
        )
    }

    /// Whether dependents of a node in this state must not be built.
    pub fn blocks_dependents(self) -> bool {
        matches!(self, BuildStatus::Failed | BuildStatus::Skipped)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => BuildStatus::UpToDate,
            2 => BuildStatus::Stale,
            3 => BuildStatus::Building,
            4 => BuildStatus::Built,
            5 => BuildStatus::Failed,
            6 => BuildStatus::Skipped,
            _ => BuildStatus::Unknown,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuildStatus::Unknown => "unknown",
            BuildStatus::UpToDate => "up to date",
            BuildStatus::Stale => "stale",
            BuildStatus::Building => "building",
            BuildStatus::Built => "built",
            BuildStatus::Failed => "failed",
            BuildStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Index-addressed status table shared between the scheduler and workers.
///
/// Each slot has a single writer, the worker owning that node. Writes use
/// `Release` and reads `Acquire`, so a reader that observes a terminal value
/// also observes everything the writer did before publishing it, including
/// the node's output on disk.
#[derive(Debug)]
pub struct StatusTable {
    slots: Vec<AtomicU8>,
}

impl StatusTable {
    /// A table with every node `Unknown`.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len)
                .map(|_| AtomicU8::new(BuildStatus::Unknown as u8))
                .collect(),
        }
    }

    pub fn get(&self, index: NodeIndex) -> BuildStatus {
        BuildStatus::from_u8(self.slots[index].load(Ordering::Acquire))
    }

    pub fn publish(&self, index: NodeIndex, status: BuildStatus) {
        self.slots[index].store(status as u8, Ordering::Release);
    }

    pub fn snapshot(&self) -> Vec<BuildStatus> {
        (0..self.slots.len()).map(|index| self.get(index)).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A message attributed to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub project: PathBuf,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.project.display(), self.message)
    }
}

/// Final state of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectOutcome {
    pub project: PathBuf,
    pub status: BuildStatus,
    /// Why the project was (or would be) rebuilt, skipped or left alone.
    pub reason: UpToDateStatus,
    /// Zero-based level the project belongs to.
    pub level: usize,
}

/// Result of a build run over a valid graph.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Every project of the graph, in level order.
    pub projects: Vec<ProjectOutcome>,
    /// Number of levels the graph was partitioned into.
    pub levels: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of compile operations started.
    pub compiled: usize,
    pub cancelled: bool,
    pub dry_run: bool,
}

impl BuildReport {
    /// Whether no project ended `Failed` or `Skipped`.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self
                .projects
                .iter()
                .all(|outcome| !outcome.status.blocks_dependents())
    }

    pub fn exit_code(&self) -> u8 {
        if self.cancelled {
            exit_codes::CANCELLED
        } else if self.is_success() {
            exit_codes::SUCCESS
        } else {
            exit_codes::BUILD_FAILURE
        }
    }

    pub fn status_of(&self, project: &Path) -> Option<BuildStatus> {
        self.projects
            .iter()
            .find(|outcome| outcome.project == project)
            .map(|outcome| outcome.status)
    }

    pub fn count(&self, status: BuildStatus) -> usize {
        self.projects
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }

    /// One-line tally of the final statuses.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} projects: {} built, {} up to date, {} failed, {} skipped",
            self.projects.len(),
            self.count(BuildStatus::Built),
            self.count(BuildStatus::UpToDate),
            self.count(BuildStatus::Failed),
            self.count(BuildStatus::Skipped)
        );
        if self.dry_run {
            summary.push_str(&format!(", {} would build", self.count(BuildStatus::Stale)));
        }
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut level = None;
        for outcome in &self.projects {
            if level != Some(outcome.level) {
                writeln!(f, "Level {}:", outcome.level + 1)?;
                level = Some(outcome.level);
            }
            writeln!(
                f,
                "  {} [{}] {}",
                outcome.project.display(),
                outcome.status,
                outcome.reason
            )?;
        }
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        f.write_str(&self.summary())
    }
}

/// Result of a clean run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Files that existed and were removed, sorted.
    pub removed: Vec<PathBuf>,
}
