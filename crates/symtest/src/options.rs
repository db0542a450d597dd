//! Harness configuration flags.
//!
//! Test binaries parse these from the command line through the generated
//! `main`; embedders construct them with the builder. Replay flags take
//! precedence over fresh execution in the order resolved by
//! [`HarnessOptions::mode`].

use std::path::{Path, PathBuf};

use clap::Parser;

/// Configuration for one harness invocation.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "symtest",
    version,
    about = "Forking property-test harness with a symbolic input substrate"
)]
pub struct HarnessOptions {
    /// Replay saved corpora from `<dir>/<source file>/<test name>/`.
    #[arg(long, value_name = "DIR")]
    pub input_test_dir: Option<PathBuf>,

    /// Replay one saved input file against a selected test.
    #[arg(long, value_name = "FILE")]
    pub input_test_file: Option<PathBuf>,

    /// Replay every regular file in a directory against a selected test.
    #[arg(long, value_name = "DIR")]
    pub input_test_files_dir: Option<PathBuf>,

    /// Select the replay target by prefix match on the unit name.
    #[arg(long, value_name = "NAME")]
    pub input_which_test: Option<String>,

    /// Save the input buffer after each run, named by outcome.
    #[arg(long, value_name = "DIR")]
    pub output_test_dir: Option<PathBuf>,

    /// Hand the running process to the harness instead of forking.
    #[arg(long)]
    pub take_over: bool,

    /// Abort the harness as soon as a replayed run does not pass.
    #[arg(long)]
    pub abort_on_fail: bool,

    /// Fill the input buffer from a PRNG on fresh runs instead of leaving
    /// it zeroed.
    #[arg(long)]
    pub fuzz: bool,

    /// Seed for `--fuzz`; an entropy seed is drawn and logged when absent.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Number of PRNG-filled runs per test under `--fuzz`.
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub fuzz_runs: u32,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            input_test_dir: None,
            input_test_file: None,
            input_test_files_dir: None,
            input_which_test: None,
            output_test_dir: None,
            take_over: false,
            abort_on_fail: false,
            fuzz: false,
            seed: None,
            fuzz_runs: 1,
            log_level: String::from("info"),
        }
    }
}

/// Run mode resolved from the flags, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode<'a> {
    /// Mode 1: per-test corpora under a root directory.
    SavedCorpora(&'a Path),

    /// Mode 2: one saved input file against a selected test.
    SingleFile(&'a Path),

    /// Mode 3: every regular file in a directory against a selected test.
    FilesDir(&'a Path),

    /// Mode 4: fresh run of every registered test.
    Fresh,
}

impl HarnessOptions {
    /// Builder for programmatic embedding.
    #[must_use]
    pub fn builder() -> HarnessOptionsBuilder {
        HarnessOptionsBuilder::default()
    }

    /// Resolve the run mode. Replay flags win over fresh execution in the
    /// order: corpus directory, single file, files directory.
    #[must_use]
    pub fn mode(&self) -> RunMode<'_> {
        if let Some(dir) = &self.input_test_dir {
            RunMode::SavedCorpora(dir)
        } else if let Some(file) = &self.input_test_file {
            RunMode::SingleFile(file)
        } else if let Some(dir) = &self.input_test_files_dir {
            RunMode::FilesDir(dir)
        } else {
            RunMode::Fresh
        }
    }
}

/// Builder for [`HarnessOptions`].
#[derive(Debug, Default)]
pub struct HarnessOptionsBuilder {
    options: HarnessOptions,
}

impl HarnessOptionsBuilder {
    /// Enable mode-1 replay from a per-test corpus root.
    #[must_use]
    pub fn input_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.input_test_dir = Some(dir.into());
        self
    }

    /// Enable mode-2 replay of one saved input file.
    #[must_use]
    pub fn input_test_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.options.input_test_file = Some(file.into());
        self
    }

    /// Enable mode-3 replay of every regular file in a directory.
    #[must_use]
    pub fn input_test_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.input_test_files_dir = Some(dir.into());
        self
    }

    /// Select the replay target by name prefix.
    #[must_use]
    pub fn input_which_test(mut self, name: impl Into<String>) -> Self {
        self.options.input_which_test = Some(name.into());
        self
    }

    /// Save inputs by outcome under `dir` after each run.
    #[must_use]
    pub fn output_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.output_test_dir = Some(dir.into());
        self
    }

    /// Enter take-over execution mode.
    #[must_use]
    pub fn take_over(mut self, enabled: bool) -> Self {
        self.options.take_over = enabled;
        self
    }

    /// Abort the harness on the first non-pass replay.
    #[must_use]
    pub fn abort_on_fail(mut self, enabled: bool) -> Self {
        self.options.abort_on_fail = enabled;
        self
    }

    /// PRNG-fill the buffer on fresh runs.
    #[must_use]
    pub fn fuzz(mut self, enabled: bool) -> Self {
        self.options.fuzz = enabled;
        self
    }

    /// Fix the PRNG seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Number of PRNG-filled runs per test.
    #[must_use]
    pub fn fuzz_runs(mut self, runs: u32) -> Self {
        self.options.fuzz_runs = runs;
        self
    }

    /// Log level directive.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.options.log_level = level.into();
        self
    }

    /// Finish the builder.
    #[must_use]
    pub fn build(self) -> HarnessOptions {
        self.options
    }
}
