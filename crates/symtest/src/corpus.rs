//! Corpus discovery, loading, and saving.
//!
//! Saved inputs are flat binary files, loaded verbatim into the input
//! buffer: no header, no framing, length at most
//! [`INPUT_SIZE`](crate::input::INPUT_SIZE) bytes. A file is recognized
//! as a saved case by its suffix, taken from the **first** `.` in the
//! name; only `.pass`, `.fail`, and `.crash` qualify. Per-test corpora
//! live under `<root>/<source basename>/<test name>/`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::{fs, io};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::input::{self, INPUT_SIZE};
use crate::registry::TestUnit;
use crate::verdict::Outcome;

/// File-name suffixes identifying saved cases, matched from the first `.`.
pub const SAVED_CASE_SUFFIXES: [&str; 3] = [".pass", ".fail", ".crash"];

/// Errors from corpus loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Input file exceeds the buffer capacity.
    #[error("input file of {size} bytes exceeds buffer capacity of {max} bytes")]
    TooLarge {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Buffer capacity in bytes.
        max: usize,
    },

    /// Input file could not be read.
    #[error("unable to read {}: {source}", path.display())]
    Unreadable {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Corpus file could not be written.
    #[error("unable to write {}: {source}", path.display())]
    Unwritable {
        /// Path that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The outcome does not produce corpus files.
    #[error("{0} runs do not produce corpus files")]
    NotSavable(Outcome),
}

/// Returns `true` when `name` is a saved test case.
///
/// The suffix is everything from the first `.` to the end of the name and
/// must match one of [`SAVED_CASE_SUFFIXES`] exactly; `x.y.pass` does not
/// qualify because its suffix is `.y.pass`.
#[must_use]
pub fn is_saved_case(name: &str) -> bool {
    name.find('.')
        .is_some_and(|dot| SAVED_CASE_SUFFIXES.contains(&&name[dot..]))
}

/// Directory holding the saved cases for `unit` under `root`:
/// `root/<source basename>/<unit name>`.
#[must_use]
pub fn case_dir(root: &Path, unit: &TestUnit) -> PathBuf {
    root.join(unit.source_basename()).join(unit.name)
}

/// Enumerate the saved cases in `dir`, sorted for deterministic replay.
///
/// # Errors
///
/// Propagates enumeration failures; a missing directory is the common
/// case, and mode-1 replay treats it as "skip this test".
pub fn discover(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_str().is_some_and(is_saved_case) {
            cases.push(entry.path());
        }
    }
    cases.sort();
    Ok(cases)
}

/// Load `path` verbatim into the input buffer.
///
/// # Errors
///
/// Returns [`CorpusError::TooLarge`] for files over the buffer capacity
/// and [`CorpusError::Unreadable`] for files that cannot be read; either
/// way the run is abandoned by the caller.
pub fn load_file(path: &Path) -> Result<(), CorpusError> {
    let metadata = fs::metadata(path).map_err(|source| CorpusError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > INPUT_SIZE as u64 {
        return Err(CorpusError::TooLarge {
            size: metadata.len(),
            max: INPUT_SIZE,
        });
    }
    let bytes = fs::read(path).map_err(|source| CorpusError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    input::load(&bytes).map_err(|_| CorpusError::TooLarge {
        size: bytes.len() as u64,
        max: INPUT_SIZE,
    })?;
    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        "initialized input buffer from file"
    );
    Ok(())
}

/// Persist the input buffer for a completed run.
///
/// The file is written under `dir` as
/// `<unit name>_<digest16>.<pass|fail|crash>`, where `digest16` is the
/// truncated SHA-256 of the buffer contents. Names carry exactly one `.`
/// so saved files satisfy the first-dot discovery rule.
///
/// # Errors
///
/// Returns [`CorpusError::NotSavable`] for abandoned runs and
/// [`CorpusError::Unwritable`] when the directory or file cannot be
/// created.
pub fn save(dir: &Path, unit: &TestUnit, outcome: Outcome) -> Result<PathBuf, CorpusError> {
    let Some(suffix) = outcome.suffix() else {
        return Err(CorpusError::NotSavable(outcome));
    };
    fs::create_dir_all(dir).map_err(|source| CorpusError::Unwritable {
        path: dir.to_path_buf(),
        source,
    })?;

    let data = input::snapshot();
    let digest = Sha256::digest(&data);
    let mut tag = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        let _ = write!(tag, "{byte:02x}");
    }

    let path = dir.join(format!("{}_{tag}.{suffix}", unit.name));
    fs::write(&path, &data).map_err(|source| CorpusError::Unwritable {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "saved {outcome} input");
    Ok(path)
}
