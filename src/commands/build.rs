//! Build command implementation
//!
//! The build command drives a full orchestrator run:
//! 1. Resolve the root projects and load the reference graph
//! 2. Check every project against its recorded build metadata
//! 3. Compile stale projects level by level on a bounded worker pool
//! 4. Print per-project results and the collected diagnostics
//!
//! With `--dry-run` nothing is compiled and the level partition is printed
//! instead. With `--clean` every expected output and metadata file of the
//! graph is removed.

use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use indicatif::ProgressBar;
use log::{info, warn};

use tsbuild::compiler::CommandCompiler;
use tsbuild::defaults::{default_jobs, DEFAULT_COMPILER};
use tsbuild::exit_codes;
use tsbuild::filesystem::{FileSystem, RealFs};
use tsbuild::loader::load_graph;
use tsbuild::output::{self, emoji, status_label, OutputConfig};
use tsbuild::report::{BuildReport, BuildStatus, CleanReport};
use tsbuild::scheduler;
use tsbuild::session::{BuildEvent, BuildOptions, BuildSession, CancellationToken};
use tsbuild::suggestions;

use super::resolve_roots;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Root projects: tsconfig.json files or directories containing one
    /// (defaults to ./tsconfig.json)
    #[arg(value_name = "ROOTS")]
    pub roots: Vec<PathBuf>,

    /// Rebuild every project even when it is up to date
    #[arg(short, long)]
    pub force: bool,

    /// Show the build plan without compiling anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Remove build outputs and metadata instead of building
    #[arg(long, conflicts_with_all = ["force", "dry_run"])]
    pub clean: bool,

    /// Maximum number of projects compiled at once (defaults to the CPU count)
    #[arg(short, long, value_name = "N", env = "TSBUILD_JOBS")]
    pub jobs: Option<NonZeroUsize>,

    /// Program invoked to compile one project
    #[arg(long, value_name = "PROGRAM", env = "TSBUILD_COMPILER", default_value = DEFAULT_COMPILER)]
    pub compiler: String,

    /// Argument passed to the compiler; `{project}` expands to the project's
    /// configuration file (repeatable, defaults to `-p {project}`)
    #[arg(long = "compiler-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub compiler_args: Vec<String>,

    /// Show every project and why it was or was not rebuilt
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Execute the build command
pub fn execute(args: BuildArgs, output: &OutputConfig) -> Result<u8> {
    let start_time = Instant::now();
    let roots = resolve_roots(&RealFs, &args.roots)?;

    if args.clean {
        let report = scheduler::clean(&RealFs, &roots).map_err(suggestions::explain)?;
        if !args.quiet {
            print!("{}", render_clean(&report, output));
        }
        return Ok(exit_codes::SUCCESS);
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFs);
    let graph = load_graph(fs.as_ref(), &roots).map_err(suggestions::explain)?;

    let compiler = CommandCompiler::new(args.compiler.clone()).with_args(args.compiler_args.clone());
    let options = BuildOptions {
        force: args.force,
        dry_run: args.dry_run,
        jobs: args.jobs.map_or_else(default_jobs, NonZeroUsize::get),
    };

    let progress = output::build_progress(graph.len() as u64, !args.quiet && !args.dry_run);
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());
    let session = BuildSession::new(fs, Arc::new(compiler), options)
        .with_cancellation(cancel)
        .on_event(track_progress(progress.clone()));
    let result = scheduler::build_graph(&session, &graph);
    progress.finish_and_clear();
    let report = result.map_err(suggestions::explain)?;

    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
    if !args.quiet {
        print!("{}", render_report(&report, output, args.verbose));
        println!(
            "   finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(report.exit_code())
}

/// Cancel the build when the process receives Ctrl-C.
///
/// The listener runs on its own thread with a single-threaded runtime. A
/// running compiler is killed and every project not yet started is skipped.
fn cancel_on_interrupt(cancel: CancellationToken) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!("Ctrl-C will not cancel the build: {e}");
            return;
        }
    };
    let spawned = thread::Builder::new()
        .name("tsbuild-interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received SIGINT, cancelling the build");
                    cancel.cancel();
                }
            });
        });
    if let Err(e) = spawned {
        warn!("Ctrl-C will not cancel the build: {e}");
    }
}

fn track_progress(progress: ProgressBar) -> impl Fn(&BuildEvent) + Send + Sync + 'static {
    move |event| match event {
        BuildEvent::Started { project } => progress.set_message(project.display().to_string()),
        BuildEvent::Finished { .. } => progress.inc(1),
    }
}

/// Per-project lines followed by a summary.
///
/// Dry runs list every project grouped by level with its reason; otherwise
/// up-to-date projects are listed only in verbose mode.
fn render_report(report: &BuildReport, output: &OutputConfig, verbose: bool) -> String {
    let mut out = String::new();

    if report.dry_run {
        let _ = writeln!(out, "{} Build plan", emoji(output, "🔎", "[PLAN]"));
        let mut level = None;
        for outcome in &report.projects {
            if level != Some(outcome.level) {
                let _ = writeln!(out, "Level {}:", outcome.level + 1);
                level = Some(outcome.level);
            }
            let _ = writeln!(
                out,
                "  {} {} ({})",
                status_label(output, outcome.status),
                outcome.project.display(),
                outcome.reason
            );
        }
    } else {
        for outcome in &report.projects {
            if !verbose && outcome.status == BuildStatus::UpToDate {
                continue;
            }
            let _ = write!(
                out,
                "{} {}",
                status_label(output, outcome.status),
                outcome.project.display()
            );
            if verbose {
                let _ = write!(out, " ({})", outcome.reason);
            }
            out.push('\n');
        }
    }

    let icon = if report.is_success() {
        emoji(output, "✅", "[OK]")
    } else {
        emoji(output, "❌", "[FAILED]")
    };
    let _ = writeln!(out, "{icon} {}", report.summary());
    out
}

fn render_clean(report: &CleanReport, output: &OutputConfig) -> String {
    let mut out = String::new();
    for path in &report.removed {
        let _ = writeln!(out, "removed {}", path.display());
    }
    let _ = writeln!(
        out,
        "{} Removed {} files",
        emoji(output, "🧹", "[CLEAN]"),
        report.removed.len()
    );
    out
}
