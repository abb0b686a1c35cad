//! Shared test utilities for E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::zoo();
//!     fixture.command().arg("build").assert().success();
//! }
//! ```

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Project configuration snippets.
#[allow(dead_code)]
pub mod configs {
    /// A composite leaf project.
    pub const LEAF: &str = r#"{ "compilerOptions": { "composite": true, "outDir": "lib" }, "references": [] }"#;

    /// A composite project referencing `../core`.
    pub const ON_CORE: &str = r#"{
  "compilerOptions": { "composite": true, "outDir": "lib" },
  "references": [{ "path": "../core" }]
}"#;

    /// Root project referencing `../core` and `../animals`.
    pub const ZOO: &str = r#"{
  "compilerOptions": { "outDir": "lib" },
  "references": [{ "path": "../core" }, { "path": "../animals" }]
}"#;

    /// Shell script passed to `sh -c` that emits the outputs of every `.ts`
    /// file in the project directory.
    pub const EMIT_SCRIPT: &str =
        "mkdir -p lib && for f in *.ts; do b=${f%.ts}; : > lib/$b.js; : > lib/$b.d.ts; done";
}

/// A temporary workspace of projects.
pub struct TestFixture {
    pub temp: TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    /// `core <- animals <- zoo`, with `zoo` also referencing `core`.
    pub fn zoo() -> Self {
        Self::new()
            .with_project("core", configs::LEAF, &["utilities.ts"])
            .with_project("animals", configs::ON_CORE, &["dog.ts"])
            .with_project("zoo", configs::ZOO, &["zoo.ts"])
    }

    pub fn with_project(self, name: &str, config: &str, sources: &[&str]) -> Self {
        self.temp
            .child(format!("{name}/tsconfig.json"))
            .write_str(config)
            .unwrap();
        for source in sources {
            self.temp
                .child(format!("{name}/{source}"))
                .write_str("export {};\n")
                .unwrap();
        }
        self
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// The binary, run from the workspace root with colors disabled.
    pub fn command(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("tsbuild");
        cmd.current_dir(self.temp.path()).arg("--color").arg("never");
        cmd
    }

    /// A `build` invocation using the shell emitter as the compiler.
    pub fn build(&self, root: &str) -> Command {
        let mut cmd = self.command();
        cmd.arg("build")
            .arg(root)
            .arg("--compiler")
            .arg("sh")
            .arg("--compiler-arg=-c")
            .arg(format!("--compiler-arg={}", configs::EMIT_SCRIPT));
        cmd
    }
}
