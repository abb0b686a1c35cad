//! Shared fixtures for unit tests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::compiler::{CompileOutput, CompileRequest, ProjectCompiler};
use crate::error::{Error, Result};
use crate::filesystem::{FileSystem, MemoryFs};
use crate::project::ProjectNode;

pub(crate) fn tsconfig(name: &str) -> PathBuf {
    PathBuf::from(format!("/repo/{name}/tsconfig.json"))
}

/// Three projects: zoo references core and animals, animals references core.
/// Each has one input and emits to `lib`.
pub(crate) fn zoo_fs() -> MemoryFs {
    let fs = MemoryFs::new();
    fs.add_file_string(
        "/repo/core/tsconfig.json",
        r#"{ "compilerOptions": { "composite": true, "outDir": "lib" }, "references": [] }"#,
    );
    fs.add_file_string("/repo/core/utilities.ts", "export function makeRandomName() {}");
    fs.add_file_string(
        "/repo/animals/tsconfig.json",
        r#"{ "compilerOptions": { "composite": true, "outDir": "lib" },
             "references": [{ "path": "../core" }] }"#,
    );
    fs.add_file_string("/repo/animals/dog.ts", "import { makeRandomName } from '../core/utilities';");
    fs.add_file_string(
        "/repo/zoo/tsconfig.json",
        r#"{ "compilerOptions": { "outDir": "lib" },
             "references": [{ "path": "../core" }, { "path": "../animals" }] }"#,
    );
    fs.add_file_string("/repo/zoo/zoo.ts", "import { createDog } from '../animals/dog';");
    fs
}

/// Adds `aquarium`, a project unrelated to the zoo projects.
pub(crate) fn add_aquarium(fs: &MemoryFs) {
    fs.add_file_string(
        "/repo/aquarium/tsconfig.json",
        r#"{ "compilerOptions": { "outDir": "lib" }, "references": [] }"#,
    );
    fs.add_file_string("/repo/aquarium/fish.ts", "export const fish = 1;");
}

/// Write every expected output of `node`.
pub(crate) fn emit_outputs(fs: &dyn FileSystem, node: &ProjectNode) {
    for output in node.expected_outputs() {
        fs.write(&output, b"// emitted").unwrap();
    }
}

/// Compiler that emits outputs through the request's filesystem and records
/// every call. Projects listed in `failing` fail with a compile error.
#[derive(Debug, Default)]
pub(crate) struct FakeCompiler {
    calls: Mutex<Vec<PathBuf>>,
    failing: HashSet<PathBuf>,
}

impl FakeCompiler {
    pub(crate) fn failing(projects: &[PathBuf]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: projects.iter().cloned().collect(),
        }
    }

    pub(crate) fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProjectCompiler for FakeCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput> {
        let node = request.project();
        self.calls.lock().unwrap().push(node.config_path.clone());
        if request.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        request.resolver().verify_references()?;
        if self.failing.contains(&node.config_path) {
            return Err(Error::Compile {
                project: node.config_path.clone(),
                diagnostics: vec![format!("{}: error TS2322", node.name())],
            });
        }
        emit_outputs(request.fs, node);
        Ok(CompileOutput::default())
    }
}
