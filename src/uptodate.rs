//! # Up-to-date Checking
//!
//! Decides whether a project must be rebuilt. The decision uses only:
//!
//! - the project's own [`BuildMetadata`] compared with the current
//!   modification signals of its own inputs and outputs, and
//! - the status already published for each directly referenced project in
//!   this run, plus the build stamp in that project's sidecar.
//!
//! A referenced project's inputs are never examined. Staleness reaches a
//! dependent only through the reference's status or build stamp, so it
//! propagates up the reference edges and never down.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::filesystem::FileSystem;
use crate::graph::{DependencyGraph, NodeIndex};
use crate::metadata::BuildMetadata;
use crate::report::{BuildStatus, StatusTable};

/// Outcome of an up-to-date check, naming the first reason found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpToDateStatus {
    UpToDate,
    /// No usable build metadata: never built, or the last build did not finish.
    NoPriorBuild,
    ConfigChanged,
    /// Inputs were added, removed or renamed since the last build.
    InputSetChanged,
    OutputMissing { output: PathBuf },
    InputNewerThanOutput { input: PathBuf, output: PathBuf },
    /// No outputs were recorded and an input's signal differs from the record.
    InputChanged { input: PathBuf },
    /// A reference is being rebuilt in this run.
    UpstreamRebuilt { project: PathBuf },
    /// A reference was rebuilt since this project's last build.
    UpstreamChanged { project: PathBuf },
    /// A reference failed or was skipped; this project must be skipped.
    UpstreamBlocked { project: PathBuf },
    /// Rebuild requested by the caller.
    Forced,
    /// The run was cancelled before this project started.
    Cancelled,
}

impl UpToDateStatus {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, UpToDateStatus::UpToDate)
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, UpToDateStatus::UpstreamBlocked { .. })
    }
}

impl fmt::Display for UpToDateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpToDateStatus::UpToDate => write!(f, "outputs are newer than inputs"),
            UpToDateStatus::NoPriorBuild => write!(f, "no previous build recorded"),
            UpToDateStatus::ConfigChanged => write!(f, "configuration changed"),
            UpToDateStatus::InputSetChanged => write!(f, "set of input files changed"),
            UpToDateStatus::OutputMissing { output } => {
                write!(f, "output {} is missing", output.display())
            }
            UpToDateStatus::InputNewerThanOutput { input, output } => write!(
                f,
                "input {} is newer than output {}",
                input.display(),
                output.display()
            ),
            UpToDateStatus::InputChanged { input } => {
                write!(f, "input {} changed", input.display())
            }
            UpToDateStatus::UpstreamRebuilt { project } => {
                write!(f, "referenced project {} is rebuilt", project.display())
            }
            UpToDateStatus::UpstreamChanged { project } => write!(
                f,
                "referenced project {} changed since the last build",
                project.display()
            ),
            UpToDateStatus::UpstreamBlocked { project } => write!(
                f,
                "referenced project {} did not build",
                project.display()
            ),
            UpToDateStatus::Forced => write!(f, "rebuild forced"),
            UpToDateStatus::Cancelled => write!(f, "build cancelled"),
        }
    }
}

/// Up-to-date checker bound to one filesystem.
#[derive(Debug, Clone, Copy)]
pub struct UpToDateChecker<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> UpToDateChecker<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Check node `index`.
    ///
    /// `statuses` must already hold a terminal (or `Stale`) value for every
    /// reference of the node; `metadata` is indexed like the graph.
    pub fn check(
        &self,
        graph: &DependencyGraph,
        index: NodeIndex,
        statuses: &StatusTable,
        metadata: &[Option<BuildMetadata>],
    ) -> UpToDateStatus {
        let node = graph.node(index);
        let references = graph.dependencies(index);

        if let Some(&blocked) = references
            .iter()
            .find(|&&reference| statuses.get(reference).blocks_dependents())
        {
            return UpToDateStatus::UpstreamBlocked {
                project: graph.node(blocked).config_path.clone(),
            };
        }

        let Some(recorded) = metadata.get(index).and_then(Option::as_ref) else {
            return UpToDateStatus::NoPriorBuild;
        };
        if recorded.config_fingerprint != node.config_fingerprint {
            return UpToDateStatus::ConfigChanged;
        }
        if !recorded.has_inputs(&node.input_files) {
            return UpToDateStatus::InputSetChanged;
        }

        let mut oldest_output: Option<(&PathBuf, SystemTime)> = None;
        for output in recorded.outputs.keys() {
            let Some(modified) = self.fs.modified(output) else {
                return UpToDateStatus::OutputMissing {
                    output: output.clone(),
                };
            };
            if oldest_output.map_or(true, |(_, oldest)| modified < oldest) {
                oldest_output = Some((output, modified));
            }
        }

        for input in &node.input_files {
            let Some(modified) = self.fs.modified(input) else {
                return UpToDateStatus::InputSetChanged;
            };
            match oldest_output {
                Some((output, oldest)) if modified > oldest => {
                    return UpToDateStatus::InputNewerThanOutput {
                        input: input.clone(),
                        output: output.clone(),
                    };
                }
                Some(_) => {}
                None if recorded.inputs.get(input) != Some(&modified) => {
                    return UpToDateStatus::InputChanged {
                        input: input.clone(),
                    };
                }
                None => {}
            }
        }

        for &reference in references {
            if matches!(
                statuses.get(reference),
                BuildStatus::Stale | BuildStatus::Building | BuildStatus::Built
            ) {
                return UpToDateStatus::UpstreamRebuilt {
                    project: graph.node(reference).config_path.clone(),
                };
            }
        }

        for &reference in references {
            let project = &graph.node(reference).config_path;
            let current = metadata
                .get(reference)
                .and_then(Option::as_ref)
                .map(|reference_metadata| &reference_metadata.build_stamp);
            if recorded.references.get(project) != current {
                return UpToDateStatus::UpstreamChanged {
                    project: project.clone(),
                };
            }
        }

        UpToDateStatus::UpToDate
    }

    /// Whether node `index` can keep its current output.
    pub fn is_up_to_date(
        &self,
        graph: &DependencyGraph,
        index: NodeIndex,
        statuses: &StatusTable,
        metadata: &[Option<BuildMetadata>],
    ) -> bool {
        self.check(graph, index, statuses, metadata).is_up_to_date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFs;
    use crate::loader::load_graph;
    use crate::test_support::{emit_outputs, tsconfig, zoo_fs};

    struct Fixture {
        fs: MemoryFs,
        graph: DependencyGraph,
        statuses: StatusTable,
        metadata: Vec<Option<BuildMetadata>>,
    }

    impl Fixture {
        /// Zoo graph with every project built once.
        fn built() -> Self {
            let fs = zoo_fs();
            let graph = load_graph(&fs, &[tsconfig("zoo")]).unwrap();
            let mut metadata = vec![None; graph.len()];
            for index in graph.topological_indices() {
                emit_outputs(&fs, graph.node(index));
                let references = graph
                    .dependencies(index)
                    .iter()
                    .filter_map(|&d| {
                        metadata[d].as_ref().map(|m: &BuildMetadata| {
                            (graph.node(d).config_path.clone(), m.build_stamp.clone())
                        })
                    })
                    .collect();
                metadata[index] = Some(BuildMetadata::record(&fs, graph.node(index), references));
            }
            let statuses = StatusTable::new(graph.len());
            Self {
                fs,
                graph,
                statuses,
                metadata,
            }
        }

        fn index(&self, name: &str) -> NodeIndex {
            self.graph.index_of(&tsconfig(name)).unwrap()
        }

        fn check(&self, name: &str) -> UpToDateStatus {
            UpToDateChecker::new(&self.fs).check(
                &self.graph,
                self.index(name),
                &self.statuses,
                &self.metadata,
            )
        }
    }

    #[test]
    fn test_no_metadata_is_no_prior_build() {
        let mut fixture = Fixture::built();
        let core = fixture.index("core");
        fixture.metadata[core] = None;
        assert_eq!(fixture.check("core"), UpToDateStatus::NoPriorBuild);
    }

    #[test]
    fn test_fresh_build_is_up_to_date() {
        let fixture = Fixture::built();
        let core = fixture.index("core");
        fixture.statuses.publish(core, BuildStatus::UpToDate);
        let animals = fixture.index("animals");
        fixture.statuses.publish(animals, BuildStatus::UpToDate);

        for name in ["core", "animals", "zoo"] {
            assert_eq!(fixture.check(name), UpToDateStatus::UpToDate, "{name}");
        }
    }

    #[test]
    fn test_touched_input_is_newer_than_output() {
        let fixture = Fixture::built();
        fixture.fs.touch("/repo/core/utilities.ts");
        assert!(matches!(
            fixture.check("core"),
            UpToDateStatus::InputNewerThanOutput { ref input, .. }
                if *input == PathBuf::from("/repo/core/utilities.ts")
        ));
    }

    #[test]
    fn test_deleted_output_is_missing() {
        let fixture = Fixture::built();
        fixture
            .fs
            .remove_file(std::path::Path::new("/repo/core/lib/utilities.js"))
            .unwrap();
        assert_eq!(
            fixture.check("core"),
            UpToDateStatus::OutputMissing {
                output: PathBuf::from("/repo/core/lib/utilities.js")
            }
        );
    }

    #[test]
    fn test_config_edit_is_detected() {
        let mut fixture = Fixture::built();
        fixture.fs.add_file_string(
            "/repo/core/tsconfig.json",
            r#"{ "compilerOptions": { "composite": true, "outDir": "lib", "strict": true }, "references": [] }"#,
        );
        fixture.graph = load_graph(&fixture.fs, &[tsconfig("zoo")]).unwrap();
        assert_eq!(fixture.check("core"), UpToDateStatus::ConfigChanged);
    }

    #[test]
    fn test_added_input_changes_input_set() {
        let mut fixture = Fixture::built();
        fixture.fs.add_file_string("/repo/core/strings.ts", "");
        fixture.graph = load_graph(&fixture.fs, &[tsconfig("zoo")]).unwrap();
        assert_eq!(fixture.check("core"), UpToDateStatus::InputSetChanged);
    }

    #[test]
    fn test_reference_statuses_propagate() {
        let fixture = Fixture::built();
        let core = fixture.index("core");
        let animals = fixture.index("animals");

        fixture.statuses.publish(core, BuildStatus::Built);
        assert_eq!(
            fixture.check("animals"),
            UpToDateStatus::UpstreamRebuilt {
                project: tsconfig("core")
            }
        );

        fixture.statuses.publish(animals, BuildStatus::Failed);
        assert!(fixture.check("zoo").is_blocked());

        fixture.statuses.publish(animals, BuildStatus::Skipped);
        assert_eq!(
            fixture.check("zoo"),
            UpToDateStatus::UpstreamBlocked {
                project: tsconfig("animals")
            }
        );
    }

    #[test]
    fn test_reference_rebuilt_in_earlier_run() {
        let mut fixture = Fixture::built();
        let core = fixture.index("core");
        fixture.statuses.publish(core, BuildStatus::UpToDate);

        // core was rebuilt by a run whose root was core alone
        emit_outputs(&fixture.fs, fixture.graph.node(core));
        fixture.metadata[core] = Some(BuildMetadata::record(
            &fixture.fs,
            fixture.graph.node(core),
            Default::default(),
        ));

        assert_eq!(
            fixture.check("animals"),
            UpToDateStatus::UpstreamChanged {
                project: tsconfig("core")
            }
        );
    }

    #[test]
    fn test_check_reads_no_files() {
        let fixture = Fixture::built();
        fixture.fs.clear_reads();
        for name in ["core", "animals", "zoo"] {
            fixture.check(name);
        }
        assert!(fixture.fs.reads().is_empty());
    }
}
