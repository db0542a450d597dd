//! End-to-end scenarios, driven through the `symtest-scenarios` binary:
//! run-mode dispatch, outcome classification, corpus saving and replay,
//! abort-on-fail, and test selection.

use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SCENARIOS_BIN: &str = env!("CARGO_BIN_EXE_symtest-scenarios");

/// Scenario units that do not pass on a fresh (zeroed) buffer:
/// `always_fails`, `soft_check_fails`, `aborts_process`,
/// `seed_word_check`, and `drains_entire_buffer`.
const FRESH_FAILURES: i32 = 5;

fn scenarios(args: &[&str]) -> Output {
    Command::new(SCENARIOS_BIN)
        .args(args)
        .env_remove("SYMTEST_INSTRUMENTATION")
        .output()
        .expect("scenario binary runs")
}

fn logs(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn seed_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("seed file written");
    path
}

fn saved_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("output corpus directory exists")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// =========================================================================
// Mode 4: fresh runs
// =========================================================================

#[test]
fn fresh_run_classifies_every_unit() {
    let output = scenarios(&[]);
    assert_eq!(output.status.code(), Some(FRESH_FAILURES));

    let logs = logs(&output);
    assert!(logs.contains("Passed: trivial_pass"), "{logs}");
    assert!(logs.contains("Failed: always_fails"), "{logs}");
    assert!(logs.contains("Failed: soft_check_fails"), "{logs}");
    assert!(logs.contains("Crashed: aborts_process"), "{logs}");
    assert!(logs.contains("Failed: seed_word_check"), "{logs}");
    assert!(logs.contains("Abandoned: drains_entire_buffer"), "{logs}");
}

#[test]
fn fresh_run_saves_inputs_by_outcome() {
    let out_dir = TempDir::new().unwrap();
    let output = scenarios(&["--output-test-dir", out_dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(FRESH_FAILURES));

    let names = saved_names(out_dir.path());
    assert!(
        names
            .iter()
            .any(|n| n.starts_with("trivial_pass_") && n.ends_with(".pass")),
        "{names:?}"
    );
    assert!(
        names
            .iter()
            .any(|n| n.starts_with("always_fails_") && n.ends_with(".fail")),
        "{names:?}"
    );
    assert!(
        names
            .iter()
            .any(|n| n.starts_with("aborts_process_") && n.ends_with(".crash")),
        "{names:?}"
    );
    // Abandoned runs never produce corpus files.
    assert!(
        !names.iter().any(|n| n.starts_with("drains_entire_buffer_")),
        "{names:?}"
    );
    // Saved names carry exactly one dot so they satisfy the first-dot
    // discovery rule.
    for name in &names {
        let dot = name.find('.').unwrap();
        assert!(
            matches!(&name[dot..], ".pass" | ".fail" | ".crash"),
            "{name}"
        );
    }

    // A saved file snapshots the whole buffer.
    let crash = fs::read_dir(out_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| path.extension().is_some_and(|ext| ext == "crash"))
        .unwrap();
    assert_eq!(fs::read(&crash).unwrap().len(), 8192);
}

#[test]
fn fuzz_mode_logs_the_seed_for_reproduction() {
    let output = scenarios(&["--fuzz", "--seed", "42", "--fuzz-runs", "2"]);
    let logs = logs(&output);
    assert!(logs.contains("fuzzing with seed 42"), "{logs}");
    assert_eq!(logs.matches("Passed: trivial_pass").count(), 2, "{logs}");
    assert!(output.status.code().is_some());
}

#[test]
fn external_instrumentation_mode_reaps_all_children() {
    let output = Command::new(SCENARIOS_BIN)
        .env("SYMTEST_INSTRUMENTATION", "/bin/true")
        .output()
        .expect("scenario binary runs");
    assert_eq!(output.status.code(), Some(FRESH_FAILURES));
}

// =========================================================================
// Mode 2: single-file replay
// =========================================================================

#[test]
fn replaying_seed_input_passes_the_seed_check() {
    let dir = TempDir::new().unwrap();
    let seed = seed_file(dir.path(), "seed.bin", &[0xAA; 256]);

    let output = scenarios(&[
        "--input-test-file",
        seed.to_str().unwrap(),
        "--input-which-test",
        "seed_word_check",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(logs(&output).contains("Passed: seed_word_check"));
}

#[test]
fn selector_matches_by_prefix() {
    let dir = TempDir::new().unwrap();
    let seed = seed_file(dir.path(), "seed.bin", &[0xAA; 256]);

    let output = scenarios(&[
        "--input-test-file",
        seed.to_str().unwrap(),
        "--input-which-test",
        "seed",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(logs(&output).contains("Passed: seed_word_check"));
}

#[test]
fn unknown_selector_is_not_a_failure() {
    let dir = TempDir::new().unwrap();
    let seed = seed_file(dir.path(), "seed.bin", &[0xAA; 16]);

    let output = scenarios(&[
        "--input-test-file",
        seed.to_str().unwrap(),
        "--input-which-test",
        "no_such_unit",
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(logs(&output).contains("Could not find matching test"));
}

#[test]
fn oversized_replay_input_abandons_the_run() {
    let dir = TempDir::new().unwrap();
    let seed = seed_file(dir.path(), "huge.bin", &vec![0_u8; 8193]);

    let output = scenarios(&[
        "--input-test-file",
        seed.to_str().unwrap(),
        "--input-which-test",
        "seed_word_check",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(logs(&output).contains("Abandoned: seed_word_check"));
}

#[test]
fn abort_on_fail_kills_the_harness_on_a_non_pass() {
    let dir = TempDir::new().unwrap();
    let seed = seed_file(dir.path(), "breaks.bin", &[0x00; 64]);

    let output = scenarios(&[
        "--input-test-file",
        seed.to_str().unwrap(),
        "--input-which-test",
        "seed_word_check",
        "--abort-on-fail",
    ]);
    assert_eq!(output.status.code(), None, "harness should die to SIGABRT");
    assert_eq!(output.status.signal(), Some(6));
}

// =========================================================================
// Mode 3: directory replay
// =========================================================================

#[test]
fn files_dir_replays_every_regular_file() {
    let dir = TempDir::new().unwrap();
    seed_file(dir.path(), "holds.bin", &[0xAA; 64]);
    seed_file(dir.path(), "breaks.bin", &[0x00; 64]);
    fs::create_dir(dir.path().join("nested")).unwrap();

    let output = scenarios(&[
        "--input-test-files-dir",
        dir.path().to_str().unwrap(),
        "--input-which-test",
        "seed_word_check",
    ]);
    assert_eq!(output.status.code(), Some(1));

    let logs = logs(&output);
    assert_eq!(logs.matches("Passed: seed_word_check").count(), 1, "{logs}");
    assert_eq!(logs.matches("Failed: seed_word_check").count(), 1, "{logs}");
}

// =========================================================================
// Mode 1: per-test corpus replay
// =========================================================================

#[test]
fn per_test_corpus_discovery_filters_by_first_dot_suffix() {
    let root = TempDir::new().unwrap();
    let case_dir = root.path().join("scenarios.rs").join("seed_word_check");
    fs::create_dir_all(&case_dir).unwrap();
    seed_file(&case_dir, "a.pass", &[0xAA; 256]);
    seed_file(&case_dir, "b.fail", &[0x00; 4]);
    seed_file(&case_dir, "c.txt", &[0xAA; 4]);
    // First-dot suffix is `.extra.pass`, so this one is ignored.
    seed_file(&case_dir, "d.extra.pass", &[0x00; 4]);

    let output = scenarios(&["--input-test-dir", root.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let logs = logs(&output);
    assert_eq!(logs.matches("Passed: seed_word_check").count(), 1, "{logs}");
    assert_eq!(logs.matches("Failed: seed_word_check").count(), 1, "{logs}");
    assert!(logs.contains("Skipping test `trivial_pass`"), "{logs}");
}

// =========================================================================
// Replay idempotence and take-over
// =========================================================================

#[test]
fn saved_outcomes_replay_identically() {
    let out_dir = TempDir::new().unwrap();
    let first = scenarios(&["--output-test-dir", out_dir.path().to_str().unwrap()]);
    assert_eq!(first.status.code(), Some(FRESH_FAILURES));

    let names = saved_names(out_dir.path());
    let saved_pass = names
        .iter()
        .find(|n| n.starts_with("trivial_pass_") && n.ends_with(".pass"))
        .expect("a saved passing input");
    let saved_fail = names
        .iter()
        .find(|n| n.starts_with("seed_word_check_") && n.ends_with(".fail"))
        .expect("a saved failing input");

    let replay = scenarios(&[
        "--input-test-file",
        out_dir.path().join(saved_pass).to_str().unwrap(),
        "--input-which-test",
        "trivial_pass",
    ]);
    assert_eq!(replay.status.code(), Some(0));
    assert!(logs(&replay).contains("Passed: trivial_pass"));

    let replay = scenarios(&[
        "--input-test-file",
        out_dir.path().join(saved_fail).to_str().unwrap(),
        "--input-which-test",
        "seed_word_check",
    ]);
    assert_eq!(replay.status.code(), Some(1));
    assert!(logs(&replay).contains("Failed: seed_word_check"));
}

#[test]
fn take_over_returns_the_sentinel_immediately() {
    let output = scenarios(&["--take-over"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(!logs(&output).contains("Passed:"));
}
