//! End-to-end tests for the `tsbuild build` command.
//!
//! The compiler is replaced by a small `sh` script that writes the expected
//! outputs, so these tests exercise scheduling and up-to-date checks without a
//! TypeScript toolchain.

#![cfg(unix)]

#[allow(dead_code)]
mod common;
use common::prelude::*;

use std::fs;
use std::thread;
use std::time::Duration;

#[test]
fn test_build_emits_outputs_and_metadata() {
    let fixture = TestFixture::zoo();

    fixture
        .build("zoo")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 projects: 3 built, 0 up to date, 0 failed, 0 skipped",
        ));

    for output in [
        "core/lib/utilities.js",
        "core/lib/utilities.d.ts",
        "core/lib/tsconfig.tsbuildinfo",
        "animals/lib/dog.d.ts",
        "animals/lib/tsconfig.tsbuildinfo",
        "zoo/lib/zoo.js",
        "zoo/lib/tsconfig.tsbuildinfo",
    ] {
        fixture.temp.child(output).assert(predicate::path::exists());
    }
}

#[test]
fn test_second_build_is_up_to_date() {
    let fixture = TestFixture::zoo();
    fixture.build("zoo").assert().success();

    fixture
        .build("zoo")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "3 projects: 0 built, 3 up to date, 0 failed, 0 skipped",
        ));
}

#[test]
fn test_touching_root_rebuilds_only_root() {
    let fixture = TestFixture::zoo();
    fixture.build("zoo").assert().success();

    thread::sleep(Duration::from_millis(50));
    fixture
        .temp
        .child("zoo/zoo.ts")
        .write_str("export const animals = 3;\n")
        .unwrap();

    fixture
        .build("zoo")
        .arg("--verbose")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 built, 2 up to date"))
        .stdout(predicate::str::contains("is newer than output"));
}

#[test]
fn test_force_rebuilds_everything() {
    let fixture = TestFixture::zoo();
    fixture.build("zoo").assert().success();

    fixture
        .build("zoo")
        .arg("--force")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 built"));
}

#[test]
fn test_dry_run_prints_levels() {
    let fixture = TestFixture::zoo();

    fixture
        .command()
        .arg("build")
        .arg("zoo")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 1:"))
        .stdout(predicate::str::contains("Level 3:"))
        .stdout(predicate::str::contains("no previous build recorded"))
        .stdout(predicate::str::contains("3 would build"));

    fixture
        .temp
        .child("core/lib")
        .assert(predicate::path::missing());
}

#[test]
fn test_quiet_prints_nothing_on_success() {
    let fixture = TestFixture::zoo();

    fixture
        .build("zoo")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_compiler_diagnostics_reach_stderr() {
    let fixture = TestFixture::zoo();

    fixture
        .command()
        .arg("build")
        .arg("zoo")
        .arg("--compiler")
        .arg("sh")
        .arg("--compiler-arg=-c")
        .arg("--compiler-arg=echo 'error TS2322: bad type'; exit 1")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("error TS2322: bad type"));
}

#[test]
fn test_clean_removes_outputs() {
    let fixture = TestFixture::zoo();
    fixture.build("zoo").assert().success();

    fixture
        .command()
        .arg("build")
        .arg("zoo")
        .arg("--clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("core/lib/utilities.d.ts"))
        .stdout(predicate::str::contains("zoo/lib/tsconfig.tsbuildinfo"));

    fixture
        .temp
        .child("core/lib/utilities.js")
        .assert(predicate::path::missing());
    fixture
        .temp
        .child("core/utilities.ts")
        .assert(predicate::path::exists());
    let leftover = fs::read_dir(fixture.path().join("animals/lib")).unwrap().count();
    assert_eq!(leftover, 0);
}

#[test]
fn test_jobs_from_environment() {
    let fixture = TestFixture::zoo();

    fixture
        .build("zoo")
        .env("TSBUILD_JOBS", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 built"));
}
