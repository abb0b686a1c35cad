//! # Build Scheduling
//!
//! This module drives a whole build run:
//!
//! 1.  **Load**: the graph is loaded from the root projects. Any structural
//!     error is returned immediately and nothing is compiled.
//! 2.  **Check**: the projects of a level are checked on the calling thread.
//!     A project whose reference failed or was skipped is `Skipped`; an
//!     up-to-date project is `UpToDate`; everything else is `Stale`.
//! 3.  **Build**: the stale projects of the level are compiled in parallel on
//!     a thread pool bounded by the jobs option. Each worker publishes the
//!     terminal status of its own project.
//! 4.  **Advance**: the next level starts only when every project of the
//!     current level is terminal, so a dependent never sees half-written
//!     output of a reference.
//!
//! Build metadata is removed before a project compiles and rewritten only
//! after the compile succeeds.

use std::collections::BTreeMap;
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::compiler::CompileRequest;
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::graph::{DependencyGraph, NodeIndex};
use crate::loader::load_graph;
use crate::metadata::BuildMetadata;
use crate::report::{BuildReport, BuildStatus, CleanReport, Diagnostic, ProjectOutcome, StatusTable};
use crate::session::{BuildEvent, BuildSession};
use crate::uptodate::{UpToDateChecker, UpToDateStatus};

/// Load the graph for `roots` and build it.
pub fn run(session: &BuildSession, roots: &[PathBuf]) -> Result<BuildReport> {
    let graph = load_graph(session.fs(), roots)?;
    build_graph(session, &graph)
}

/// Build an already loaded graph level by level.
pub fn build_graph(session: &BuildSession, graph: &DependencyGraph) -> Result<BuildReport> {
    let fs = session.fs();
    let options = session.options();
    let cancel = session.cancellation();
    let levels = graph.levels();
    let statuses = StatusTable::new(graph.len());
    let checker = UpToDateChecker::new(fs);
    let mut metadata: Vec<Option<BuildMetadata>> = graph
        .nodes()
        .iter()
        .map(|node| BuildMetadata::load(fs, node))
        .collect();
    let mut reasons = vec![UpToDateStatus::NoPriorBuild; graph.len()];
    let compiled = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .thread_name(|i| format!("tsbuild-worker-{i}"))
        .build()?;

    for (level_index, level) in levels.iter().enumerate() {
        debug!("level {}: {} projects", level_index + 1, level.len());
        let mut stale = Vec::new();

        for &index in level {
            let reason = if cancel.is_cancelled() {
                UpToDateStatus::Cancelled
            } else {
                checker.check(graph, index, &statuses, &metadata)
            };
            let (status, reason) = match reason {
                reason @ (UpToDateStatus::Cancelled | UpToDateStatus::UpstreamBlocked { .. }) => {
                    (BuildStatus::Skipped, reason)
                }
                UpToDateStatus::UpToDate if options.force => {
                    (BuildStatus::Stale, UpToDateStatus::Forced)
                }
                UpToDateStatus::UpToDate => (BuildStatus::UpToDate, UpToDateStatus::UpToDate),
                reason => (BuildStatus::Stale, reason),
            };

            let project = &graph.node(index).config_path;
            debug!("{}: {status} ({reason})", project.display());
            statuses.publish(index, status);
            if status.is_terminal() {
                session.emit(BuildEvent::Finished {
                    project: project.clone(),
                    status,
                });
            } else {
                stale.push(index);
            }
            reasons[index] = reason;
        }

        if options.dry_run || stale.is_empty() {
            continue;
        }

        let records: Vec<(NodeIndex, Option<BuildMetadata>)> = pool.install(|| {
            stale
                .par_iter()
                .map(|&index| {
                    let record = build_node(session, graph, index, &statuses, &metadata, &compiled);
                    (index, record)
                })
                .collect()
        });

        for (index, record) in records {
            if statuses.get(index) == BuildStatus::Skipped {
                reasons[index] = UpToDateStatus::Cancelled;
            }
            if record.is_some() {
                metadata[index] = record;
            }
        }
    }

    let projects = levels
        .iter()
        .enumerate()
        .flat_map(|(level_index, level)| {
            level.iter().map(move |&index| (level_index, index))
        })
        .map(|(level, index)| ProjectOutcome {
            project: graph.node(index).config_path.clone(),
            status: statuses.get(index),
            reason: reasons[index].clone(),
            level,
        })
        .collect();

    let report = BuildReport {
        projects,
        levels: levels.len(),
        diagnostics: session.take_diagnostics(),
        compiled: compiled.load(Ordering::Relaxed),
        cancelled: cancel.is_cancelled(),
        dry_run: options.dry_run,
    };
    info!(
        "{} projects, {} compiled",
        report.projects.len(),
        report.compiled
    );
    Ok(report)
}

/// Compile one stale project and publish its terminal status.
///
/// Returns the new metadata when the project was built.
fn build_node(
    session: &BuildSession,
    graph: &DependencyGraph,
    index: NodeIndex,
    statuses: &StatusTable,
    metadata: &[Option<BuildMetadata>],
    compiled: &AtomicUsize,
) -> Option<BuildMetadata> {
    let fs = session.fs();
    let node = graph.node(index);

    if session.cancellation().is_cancelled() {
        finish(session, statuses, index, &node.config_path, BuildStatus::Skipped);
        return None;
    }

    statuses.publish(index, BuildStatus::Building);
    session.emit(BuildEvent::Started {
        project: node.config_path.clone(),
    });
    info!("building {}", node.config_path.display());

    let result = BuildMetadata::invalidate(fs, node)
        .and_then(|_| {
            compiled.fetch_add(1, Ordering::Relaxed);
            let request = CompileRequest {
                graph,
                index,
                fs,
                cancel: session.cancellation(),
            };
            session.compiler().compile(&request)
        })
        .and_then(|output| {
            for message in output.diagnostics {
                session.push_diagnostic(Diagnostic {
                    project: node.config_path.clone(),
                    message,
                });
            }
            let record = BuildMetadata::record(fs, node, reference_stamps(graph, index, metadata));
            record.save(fs, node)?;
            Ok(record)
        });

    let (status, record) = match result {
        Ok(record) => (BuildStatus::Built, Some(record)),
        Err(Error::Cancelled) => (BuildStatus::Skipped, None),
        Err(Error::Compile {
            project,
            diagnostics,
        }) => {
            warn!("{} failed to build", project.display());
            if diagnostics.is_empty() {
                session.push_diagnostic(Diagnostic {
                    project: project.clone(),
                    message: "compilation failed".to_string(),
                });
            }
            for message in diagnostics {
                session.push_diagnostic(Diagnostic {
                    project: project.clone(),
                    message,
                });
            }
            (BuildStatus::Failed, None)
        }
        Err(e) => {
            warn!("{} failed to build: {e}", node.config_path.display());
            session.push_diagnostic(Diagnostic {
                project: node.config_path.clone(),
                message: e.to_string(),
            });
            (BuildStatus::Failed, None)
        }
    };

    finish(session, statuses, index, &node.config_path, status);
    record
}

fn finish(
    session: &BuildSession,
    statuses: &StatusTable,
    index: NodeIndex,
    project: &Path,
    status: BuildStatus,
) {
    statuses.publish(index, status);
    session.emit(BuildEvent::Finished {
        project: project.to_path_buf(),
        status,
    });
}

/// Build stamps of the direct references of `index`, keyed by project.
fn reference_stamps(
    graph: &DependencyGraph,
    index: NodeIndex,
    metadata: &[Option<BuildMetadata>],
) -> BTreeMap<PathBuf, String> {
    graph
        .dependencies(index)
        .iter()
        .filter_map(|&reference| {
            metadata[reference].as_ref().map(|record| {
                (
                    graph.node(reference).config_path.clone(),
                    record.build_stamp.clone(),
                )
            })
        })
        .collect()
}

/// Remove every expected output and metadata sidecar of the closure of `roots`.
pub fn clean(fs: &dyn FileSystem, roots: &[PathBuf]) -> Result<CleanReport> {
    let graph = load_graph(fs, roots)?;
    let mut removed = Vec::new();
    for node in graph.topological_order() {
        let targets = node
            .expected_outputs()
            .into_iter()
            .chain(iter::once(node.metadata_path()));
        for path in targets {
            if fs.remove_file(&path)? {
                debug!("removed {}", path.display());
                removed.push(path);
            }
        }
    }
    removed.sort();
    Ok(CleanReport { removed })
}
