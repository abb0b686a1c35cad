//! The external "compile project" operation.
//!
//! The orchestrator never type-checks anything itself. It hands one project
//! at a time to a [`ProjectCompiler`]. The binary uses [`CommandCompiler`],
//! which runs an external program (by default `tsc -p <config>`); tests use
//! scripted fakes.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::graph::{DependencyGraph, NodeIndex};
use crate::project::ProjectNode;
use crate::resolution::ModuleResolver;
use crate::session::CancellationToken;

/// Everything a compiler may consult for one project.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub graph: &'a DependencyGraph,
    pub index: NodeIndex,
    pub fs: &'a dyn FileSystem,
    pub cancel: &'a CancellationToken,
}

impl<'a> CompileRequest<'a> {
    pub fn project(&self) -> &'a ProjectNode {
        self.graph.node(self.index)
    }

    /// Resolver applying the reference-boundary override for this project.
    pub fn resolver(&self) -> ModuleResolver<'a> {
        ModuleResolver::new(self.graph, self.index, self.fs)
    }
}

/// Messages produced by a successful compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutput {
    pub diagnostics: Vec<String>,
}

/// Compiles a single project.
///
/// Implementations must only read the project's own inputs and the
/// declaration output of its references, and should return
/// [`Error::Cancelled`] promptly once the request's token is cancelled.
pub trait ProjectCompiler: Send + Sync + fmt::Debug {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput>;
}

/// Runs an external program for each project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// Replaced by the project's configuration path in arguments.
    pub const PROJECT_PLACEHOLDER: &'static str = "{project}";

    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    /// `program -p {project}`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-p".to_string(), Self::PROJECT_PLACEHOLDER.to_string()],
        }
    }

    /// Replace the argument list. An empty list keeps the default.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        if !args.is_empty() {
            self.args = args;
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments for `node`, with the placeholder substituted.
    pub fn arguments_for(&self, node: &ProjectNode) -> Vec<String> {
        let project = node.config_path.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(Self::PROJECT_PLACEHOLDER, &project))
            .collect()
    }
}

impl ProjectCompiler for CommandCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput> {
        let node = request.project();
        if request.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        request.resolver().verify_references()?;

        let args = self.arguments_for(node);
        info!("{} {}", self.program, args.join(" "));
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&node.config_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::io(PathBuf::from(&self.program), e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_lines(stdout));
        let stderr_reader = thread::spawn(move || read_lines(stderr));

        let status = loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| Error::io(PathBuf::from(&self.program), e))?
            {
                break status;
            }
            if request.cancel.is_cancelled() {
                debug!("stopping compile of {}", node.config_path.display());
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Cancelled);
            }
            thread::sleep(Self::POLL_INTERVAL);
        };

        let mut diagnostics = stdout_reader.join().unwrap_or_default();
        diagnostics.extend(stderr_reader.join().unwrap_or_default());

        if status.success() {
            Ok(CompileOutput { diagnostics })
        } else {
            debug!("{} exited with {status}", self.program);
            Err(Error::Compile {
                project: node.config_path.clone(),
                diagnostics,
            })
        }
    }
}

fn read_lines<R: Read>(source: Option<R>) -> Vec<String> {
    match source {
        Some(source) => BufReader::new(source)
            .lines()
            .map_while(std::result::Result::ok)
            .filter(|line| !line.trim().is_empty())
            .collect(),
        None => Vec::new(),
    }
}
