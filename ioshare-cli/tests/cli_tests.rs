// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Cross-process tests driving the `ioshare` binary.

use std::io::Write;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;

use ioshare_core::{Capacity, GuardedRegion, MaxReaders, Ownership, ReaderWriterLock};

const BIN: &str = env!("CARGO_BIN_EXE_ioshare");

fn unique(tag: &str) -> String {
    format!("/ioshare-cli-{}-{}", tag, std::process::id())
}

fn ioshare(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .output()
        .expect("Failed to run ioshare")
}

fn spawn(args: &[&str]) -> Child {
    Command::new(BIN)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn ioshare")
}

/// Give a child long enough to finish if nothing holds it back.
fn assert_still_waiting(child: &mut Child, what: &str) {
    std::thread::sleep(Duration::from_millis(300));
    assert!(child.try_wait().unwrap().is_none(), "{}", what);
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Removes a region's objects even if the test fails half way.
struct Cleanup(String);

impl Drop for Cleanup {
    fn drop(&mut self) {
        let _ = ioshare(&["unlink", &self.0]);
    }
}

#[test]
fn test_write_then_read_across_processes() {
    let name = unique("hello");
    let _cleanup = Cleanup(name.clone());

    let written = ioshare(&["write", &name, "Hello, World!!!", "--size", "15"]);
    assert!(written.status.success(), "{:?}", written);

    let read = ioshare(&["read", &name, "--size", "15", "--len", "15"]);
    assert!(read.status.success(), "{:?}", read);
    assert_eq!(stdout(&read).trim_end(), "Hello, World!!!");

    let shared = ioshare(&["read", &name, "--size", "15", "--offset", "7", "--shared"]);
    assert!(shared.status.success(), "{:?}", shared);
    assert_eq!(stdout(&shared).trim_end(), "World!!!");
}

#[test]
fn test_shared_read_and_shared_write_exclude_each_other() {
    let name = unique("rw");
    let _cleanup = Cleanup(name.clone());
    let mut shm = ReaderWriterLock::create_or_attach(
        &name,
        Capacity::new(32).unwrap(),
        MaxReaders::default(),
        Ownership::Attached,
    )
    .unwrap();

    let mut scope = shm.write_lock().unwrap();
    scope.write(b"half-writ").unwrap();
    let reader = {
        let mut reader = spawn(&["read", &name, "--size", "32", "--shared"]);
        assert_still_waiting(&mut reader, "shared read ran during a shared write");
        reader
    };
    scope.seek(0).unwrap();
    scope.write(b"whole write").unwrap();
    scope.exit().unwrap();

    let output = reader.wait_with_output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output).trim_end(), "whole write");

    let held = shm.read_lock().unwrap();
    let mut writer = spawn(&["write", &name, "replaced", "--size", "32", "--shared"]);
    assert_still_waiting(&mut writer, "shared write ran during a shared read");
    held.exit().unwrap();

    let output = writer.wait_with_output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    let read = ioshare(&["read", &name, "--size", "32", "--shared"]);
    assert_eq!(stdout(&read).trim_end(), "replacedite");
}

/// Concurrent writer processes each fill the whole region with one marker
/// byte while reader processes look on. Under the exclusive lock every read
/// sees a single marker, never a mix.
#[test]
fn test_exclusive_writes_land_whole_across_processes() {
    const LEN: usize = 32 * 1024;

    let name = unique("markers");
    let _cleanup = Cleanup(name.clone());
    let size = LEN.to_string();
    let markers = ["A".repeat(LEN), "B".repeat(LEN)];

    let mut writers = Vec::new();
    let mut readers = Vec::new();
    for _ in 0..8 {
        for marker in &markers {
            writers.push(spawn(&["write", &name, marker, "--size", &size]));
        }
        readers.push(spawn(&["read", &name, "--size", &size]));
    }

    for writer in writers {
        let output = writer.wait_with_output().unwrap();
        assert!(output.status.success(), "{:?}", output.status);
    }
    for reader in readers {
        let output = reader.wait_with_output().unwrap();
        assert!(output.status.success(), "{:?}", output.status);
        let text = stdout(&output);
        let body = text.trim_end_matches('\n');
        assert!(
            body.is_empty() || body == markers[0] || body == markers[1],
            "read saw a mix of markers ({} bytes)",
            body.len()
        );
    }
}

#[test]
fn test_oversized_write_fails() {
    let name = unique("oversize");
    let _cleanup = Cleanup(name.clone());

    let written = ioshare(&["write", &name, "far too long", "--size", "4"]);
    assert!(!written.status.success());
    assert!(String::from_utf8_lossy(&written.stderr).contains("CapacityExceeded"));
}

#[test]
fn test_consumer_waits_for_producer() {
    let name = unique("channel");
    let _cleanup = Cleanup(name.clone());

    let mut consumer = spawn(&["consume", &name, "--size", "1K"]);
    assert_still_waiting(&mut consumer, "consumer finished before anything was produced");

    let produced = ioshare(&["produce", &name, "--size", "1K", "--message", "first"]);
    assert!(produced.status.success(), "{:?}", produced);

    let output = consumer.wait_with_output().expect("Consumer did not finish");
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output), "first\n");
}

#[test]
fn test_pingpong_between_processes() {
    let base = unique("pp");
    let _a2b = Cleanup(format!("{}_a2b", base));
    let _b2a = Cleanup(format!("{}_b2a", base));

    let follower = Command::new(BIN)
        .args(["pingpong", &base, "--role", "follower", "--rounds", "20", "--payload-bytes", "128"])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn follower");

    let leader = ioshare(&[
        "pingpong",
        &base,
        "--role",
        "leader",
        "--rounds",
        "20",
        "--payload-bytes",
        "128",
        "--json",
    ]);
    assert!(leader.status.success(), "{:?}", leader);

    let report: serde_json::Value = serde_json::from_slice(&leader.stdout).unwrap();
    assert_eq!(report["rounds"], 20);
    assert_eq!(report["payload_bytes"], 128);

    let output = follower.wait_with_output().expect("Follower did not finish");
    assert!(output.status.success(), "{:?}", output);
}

#[test]
fn test_size_from_config() {
    let name = unique("configured");
    let _cleanup = Cleanup(name.clone());

    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "regions:\n  - name: {}\n    size: 32", name).unwrap();
    let config_path = config.path().to_string_lossy().to_string();

    let written = ioshare(&["-c", &config_path, "write", &name, "configured"]);
    assert!(written.status.success(), "{:?}", written);

    let read = ioshare(&["-c", &config_path, "read", &name]);
    assert!(read.status.success(), "{:?}", read);
    assert_eq!(stdout(&read).trim_end(), "configured");

    let unlisted = ioshare(&["-c", &config_path, "read", &unique("unlisted")]);
    assert!(!unlisted.status.success());
}

#[test]
fn test_validate_reports_errors() {
    let mut good = tempfile::NamedTempFile::new().unwrap();
    writeln!(good, "regions:\n  - name: /r1\n    size: 5M").unwrap();
    let output = ioshare(&["validate", &good.path().to_string_lossy()]);
    assert!(output.status.success(), "{:?}", output);
    assert!(stdout(&output).contains("/r1 (size: 5M"));

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    writeln!(bad, "regions:\n  - name: /r1\n    size: 0").unwrap();
    let output = ioshare(&["validate", &bad.path().to_string_lossy()]);
    assert!(!output.status.success());
}
