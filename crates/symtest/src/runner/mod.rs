#![allow(unsafe_code)] // Lifecycle hook symbols must be externally addressable.
//! Test driver: mode dispatch, forked execution, and outcome reporting.
//!
//! The driver resolves a run mode from the configured flags, runs
//! `setup`/`teardown` once around the whole invocation, and executes each
//! run in a freshly forked child. The parent classifies every run from
//! the child's wait status, logs one outcome line per run, and persists
//! the input buffer when an output corpus directory is configured.
//!
//! Everything here is single-threaded; the only parallelism is the
//! external-fuzzer fresh mode, where children run concurrently under an
//! attached instrumentation binary and the parent reaps them collectively.

mod isolate;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::options::{HarnessOptions, RunMode};
use crate::registry::{Registry, TestUnit};
use crate::verdict::{self, Outcome};
use crate::{corpus, input};

pub use isolate::symtest_begin_external;

/// Environment variable naming an external instrumentation binary. Its
/// presence switches fresh runs to the external-fuzzer protocol.
pub const INSTRUMENTATION_ENV: &str = "SYMTEST_INSTRUMENTATION";

/// Sentinel returned by [`symtest_take_over`] in plain execution.
pub const TAKE_OVER_READY: i32 = 0;

/// Entry point behind [`symtest_main!`](crate::symtest_main): parse the
/// flags, initialize logging, run the registered units, and return the
/// process exit code — the failed-run count saturated to 255.
#[must_use]
pub fn harness_main() -> i32 {
    let options = HarnessOptions::parse();
    init_tracing(&options.log_level);

    if options.take_over {
        info!("entering take-over mode");
        return symtest_take_over();
    }

    let registry = Registry::from_linker();
    let failed = Driver::new(options).run(&registry);
    i32::from(u8::try_from(failed).unwrap_or(u8::MAX))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Drives registered units through the configured run mode.
#[derive(Debug)]
pub struct Driver {
    options: HarnessOptions,
}

impl Driver {
    /// Create a driver over `options`.
    #[must_use]
    pub fn new(options: HarnessOptions) -> Self {
        Self { options }
    }

    /// Run the configured mode over `registry` and return the number of
    /// runs that did not pass.
    #[must_use]
    pub fn run(&self, registry: &Registry) -> u32 {
        symtest_setup();
        let failed = match self.options.mode() {
            RunMode::SavedCorpora(root) => self.run_saved_corpora(registry, root),
            RunMode::SingleFile(file) => self.run_single_file(registry, file),
            RunMode::FilesDir(dir) => self.run_files_dir(registry, dir),
            RunMode::Fresh => self.run_fresh(registry),
        };
        symtest_teardown();
        failed
    }

    /// Mode 1: for every registered unit, replay each saved case under
    /// `root/<source basename>/<unit name>/`.
    fn run_saved_corpora(&self, registry: &Registry, root: &Path) -> u32 {
        let mut failed = 0;
        for unit in registry.units() {
            failed += self.run_corpus_for_unit(unit, root);
        }
        failed
    }

    fn run_corpus_for_unit(&self, unit: &TestUnit, root: &Path) -> u32 {
        let dir = corpus::case_dir(root, unit);
        let Ok(cases) = corpus::discover(&dir) else {
            info!("Skipping test `{}`, no saved test cases", unit.name);
            return 0;
        };

        let mut failed = 0;
        for case in &cases {
            if !self.run_saved_case(unit, case).is_pass() {
                failed += 1;
            }
        }
        failed
    }

    /// Mode 2: replay one file against the selected unit.
    fn run_single_file(&self, registry: &Registry, file: &Path) -> u32 {
        let which = self.options.input_which_test.as_deref();
        let Some(unit) = registry.select(which) else {
            info!(
                "Could not find matching test for {}",
                which.unwrap_or("<first>")
            );
            return 0;
        };
        u32::from(!self.run_saved_case(unit, file).is_pass())
    }

    /// Mode 3: replay every regular file in `dir` against the selected
    /// unit. No suffix filter applies in this mode.
    fn run_files_dir(&self, registry: &Registry, dir: &Path) -> u32 {
        let which = self.options.input_which_test.as_deref();
        let Some(unit) = registry.select(which) else {
            info!(
                "Could not find matching test for {}",
                which.unwrap_or("<first>")
            );
            return 0;
        };

        let Ok(entries) = fs::read_dir(dir) else {
            info!("No tests to run.");
            return 0;
        };
        let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        paths.sort();

        let mut failed = 0;
        for path in &paths {
            let is_regular = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
            if !is_regular {
                continue;
            }
            if !self.run_saved_case(unit, path).is_pass() {
                failed += 1;
            }
        }
        failed
    }

    /// Mode 4: run every registered unit once (or `--fuzz-runs` times
    /// under `--fuzz`) against a zeroed or PRNG-filled buffer.
    fn run_fresh(&self, registry: &Registry) -> u32 {
        if let Ok(exe) = std::env::var(INSTRUMENTATION_ENV) {
            return self.run_fresh_external(registry, &exe);
        }

        let mut rng = if self.options.fuzz {
            let seed = self.options.seed.unwrap_or_else(rand::random::<u64>);
            info!("fuzzing with seed {seed}");
            Some(StdRng::seed_from_u64(seed))
        } else {
            None
        };
        let runs = if self.options.fuzz {
            self.options.fuzz_runs.max(1)
        } else {
            1
        };

        let mut failed = 0;
        for unit in registry.units() {
            for _ in 0..runs {
                begin_run_for(unit);
                match rng.as_mut() {
                    Some(rng) => input::fill_random(rng),
                    None => input::reset(),
                }
                let outcome = isolate::fork_and_run(unit);
                self.report(unit, outcome);
                if !outcome.is_pass() {
                    failed += 1;
                }
            }
        }
        failed
    }

    /// External-fuzzer fresh mode: fork every unit up front, hand each
    /// child to the instrumentation entry, then reap the children
    /// collectively. Completion order is not guaranteed.
    fn run_fresh_external(&self, registry: &Registry, exe: &str) -> u32 {
        info!("external instrumentation enabled via {INSTRUMENTATION_ENV}: {exe}");
        let mut failed = 0;
        for unit in registry.units() {
            begin_run_for(unit);
            input::reset();
            if let Err(err) = isolate::spawn_external(unit) {
                error!("Abandoned: {} (fork failed: {err})", unit.name);
                failed += 1;
            }
        }
        failed + isolate::reap_all()
    }

    /// Replay one saved case: load, fork, classify, report. Load failures
    /// abandon the run without forking; the driver continues with the
    /// next case.
    fn run_saved_case(&self, unit: &TestUnit, path: &Path) -> Outcome {
        if let Err(err) = corpus::load_file(path) {
            error!("Abandoned: {} ({err})", unit.name);
            self.maybe_abort(Outcome::Abandon);
            return Outcome::Abandon;
        }
        begin_run_for(unit);
        let outcome = isolate::fork_and_run(unit);
        self.report(unit, outcome);
        self.maybe_abort(outcome);
        outcome
    }

    /// Log the classification line and persist the input when an output
    /// corpus directory is configured. Abandoned runs are never saved.
    fn report(&self, unit: &TestUnit, outcome: Outcome) {
        match outcome {
            Outcome::Pass => info!("Passed: {}", unit.name),
            Outcome::Fail => error!("Failed: {}", unit.name),
            Outcome::Crash => {
                error!("Crashed: {}", unit.name);
                verdict::symtest_crash();
            },
            Outcome::Abandon => error!("Abandoned: {}", unit.name),
        }

        if outcome.suffix().is_none() {
            return;
        }
        if let Some(dir) = &self.options.output_test_dir {
            match corpus::save(dir, unit, outcome) {
                Ok(path) => debug!(path = %path.display(), "saved input"),
                Err(err) => warn!("unable to save input for {}: {err}", unit.name),
            }
        }
    }

    /// In replay modes, a non-pass run aborts the whole harness when
    /// `--abort-on-fail` is set, so external drivers observe a crashing
    /// test binary.
    fn maybe_abort(&self, outcome: Outcome) {
        if self.options.abort_on_fail && !outcome.is_pass() {
            std::process::abort();
        }
    }
}

/// Reset the run-state flags and rewind the cursor ahead of a fork.
/// Replay callers load the buffer first; the rewind leaves its contents
/// alone.
fn begin_run_for(unit: &TestUnit) {
    info!(
        "Running: {} from {}({})",
        unit.name,
        unit.source_basename(),
        unit.line
    );
    verdict::begin_run();
    input::rewind();
}

/// Harness setup hook, run once before any test. No-op in plain
/// execution; hook target for an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_setup() {
    debug!("harness setup");
}

/// Harness teardown hook, run once after the last test.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_teardown() {
    debug!("harness teardown");
}

/// Take-over entry: hand the already-running process to the harness
/// instead of forking. Returns [`TAKE_OVER_READY`] in plain execution; an
/// attached driver replaces this symbol with its own protocol.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_take_over() -> i32 {
    TAKE_OVER_READY
}
