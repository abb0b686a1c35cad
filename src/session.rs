//! Per-invocation build state.
//!
//! A [`BuildSession`] bundles everything one run needs: the filesystem and
//! compiler capabilities, the options, the cancellation token and the
//! diagnostics collected so far. It is created by the caller and passed
//! explicitly, so independent runs never share state.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::compiler::ProjectCompiler;
use crate::defaults::default_jobs;
use crate::filesystem::FileSystem;
use crate::report::{BuildStatus, Diagnostic};

/// Options controlling a build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Rebuild every project regardless of up-to-date status.
    pub force: bool,
    /// Compute statuses and levels without compiling anything.
    pub dry_run: bool,
    /// Maximum number of projects compiled at the same time.
    pub jobs: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            jobs: default_jobs(),
        }
    }
}

/// Run-wide cancellation signal. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Progress notification emitted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A compile is about to start.
    Started { project: PathBuf },
    /// A project reached a terminal status.
    Finished {
        project: PathBuf,
        status: BuildStatus,
    },
}

type EventHandler = Box<dyn Fn(&BuildEvent) + Send + Sync>;

/// State of one orchestrator invocation.
pub struct BuildSession {
    fs: Arc<dyn FileSystem>,
    compiler: Arc<dyn ProjectCompiler>,
    options: BuildOptions,
    cancel: CancellationToken,
    diagnostics: Mutex<Vec<Diagnostic>>,
    on_event: Option<EventHandler>,
}

impl BuildSession {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        compiler: Arc<dyn ProjectCompiler>,
        options: BuildOptions,
    ) -> Self {
        Self {
            fs,
            compiler,
            options,
            cancel: CancellationToken::new(),
            diagnostics: Mutex::new(Vec::new()),
            on_event: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Register a callback for build progress events.
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(&BuildEvent) + Send + Sync + 'static,
    {
        self.on_event = Some(Box::new(handler));
        self
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn compiler(&self) -> &dyn ProjectCompiler {
        self.compiler.as_ref()
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn emit(&self, event: BuildEvent) {
        if let Some(handler) = &self.on_event {
            handler(&event);
        }
    }

    pub(crate) fn push_diagnostic(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(diagnostic);
    }

    /// Remove and return the diagnostics collected so far.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildSession")
            .field("fs", &self.fs)
            .field("compiler", &self.compiler)
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
