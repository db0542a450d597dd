//! # symtest
//!
//! Forking property-test harness with a symbolic input substrate.
//!
//! Test binaries register named units, and the harness drives each unit
//! against freshly generated input or previously saved corpora. Every run
//! is isolated in a forked child; the child exit status classifies the
//! run as passed, failed, crashed, or abandoned, and notable inputs are
//! persisted to a corpus directory named by outcome.
//!
//! Typed draws consume a bounded process-wide byte buffer. In plain
//! execution the buffer holds file bytes, PRNG bytes, or zeroes; an
//! external symbolic executor may instead intercept the exported hook
//! symbols — the draw primitives, `symtest_assume`, the extremum and
//! symbolicity queries, the verdict entries, and the buffer itself — to
//! explore paths symbolically.
//!
//! ## Example
//!
//! ```rust,ignore
//! use symtest::{draw, sym_assert};
//!
//! symtest::symtest_test! {
//!     fn addition_commutes() {
//!         let a = draw::<u32>();
//!         let b = draw::<u32>();
//!         sym_assert!(a.wrapping_add(b) == b.wrapping_add(a));
//!     }
//! }
//!
//! symtest::symtest_main!();
//! ```
//!
//! ## Corpus layout
//!
//! Saved inputs are raw byte files of at most 8192 bytes, suffixed by
//! outcome (`.pass`, `.fail`, `.crash`). Per-test replay walks
//! `<input_test_dir>/<source basename>/<test name>/`.

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod corpus;
pub mod generate;
pub mod input;
mod macros;
pub mod options;
pub mod registry;
pub mod runner;
pub mod verdict;

#[doc(hidden)]
pub use inventory;

pub use generate::{bytes, c_string, draw, draw_in_range, draw_vec, Draw};
pub use options::HarnessOptions;
pub use registry::{Registry, TestUnit};
pub use runner::Driver;
pub use verdict::{abandon, assert_true, assume, check, fail, pass, soft_fail, Outcome};

/// Prelude for test binaries.
pub mod prelude {
    pub use crate::generate::{bytes, c_string, draw, draw_in_range, draw_vec, Draw};
    pub use crate::options::HarnessOptions;
    pub use crate::registry::{Registry, TestUnit};
    pub use crate::runner::Driver;
    pub use crate::verdict::{
        abandon, assert_true, assume, check, fail, pass, soft_fail, Outcome,
    };
    pub use crate::{maybe, sym_assert, sym_assume, sym_check, symtest_main, symtest_test};
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard};

    static SUBSTRATE: Mutex<()> = Mutex::new(());

    /// Serializes tests that touch the process-wide substrate and verdict
    /// state.
    pub(crate) fn substrate_lock() -> MutexGuard<'static, ()> {
        SUBSTRATE
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
