//! End-to-end tests for interrupting a running build.
//!
//! The compiler is a `sh` script that marks the project as started and then
//! sleeps, so the test can deliver SIGINT while a compile is in flight.

#![cfg(unix)]

#[allow(dead_code)]
mod common;
use common::prelude::*;

use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tsbuild::exit_codes;

#[test]
fn test_interrupt_cancels_build() {
    let fixture = TestFixture::zoo();

    let child = Command::new(env!("CARGO_BIN_EXE_tsbuild"))
        .current_dir(fixture.path())
        .args(["--color", "never", "build", "zoo", "--compiler", "sh"])
        .arg("--compiler-arg=-c")
        .arg("--compiler-arg=: > started; exec sleep 30")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let started = fixture.path().join("core/started");
    let deadline = Instant::now() + Duration::from_secs(10);
    while !started.exists() {
        assert!(Instant::now() < deadline, "core never started compiling");
        thread::sleep(Duration::from_millis(20));
    }

    let sent = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(i32::from(exit_codes::CANCELLED)));
    assert!(
        predicate::str::contains("3 projects: 0 built, 0 up to date, 0 failed, 3 skipped (cancelled)")
            .eval(&stdout),
        "{stdout}"
    );

    fixture
        .temp
        .child("core/lib/tsconfig.tsbuildinfo")
        .assert(predicate::path::missing());
    fixture
        .temp
        .child("animals/started")
        .assert(predicate::path::missing());
}
