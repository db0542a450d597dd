//! Scenario units for exercising the harness end to end.
//!
//! Each unit pins one classification path: a trivial pass, a hard
//! assertion failure, a sticky soft check, a signal-delivering crash, a
//! substrate exhaustion, and a replay check that only holds for seeded
//! input. The end-to-end tests drive this binary through every run mode.

use symtest::input::INPUT_SIZE;
use symtest::{draw, sym_assert, sym_check};

symtest::symtest_test! {
    /// Nothing to draw, nothing to fail.
    fn trivial_pass() {
        sym_assert!(1 + 1 == 2);
    }
}

symtest::symtest_test! {
    /// Unconditional hard failure.
    fn always_fails() {
        sym_assert!(2 + 2 == 5);
    }
}

symtest::symtest_test! {
    /// The soft check fails but the unit still returns normally; the run
    /// is upgraded to a failure at classification.
    fn soft_check_fails() {
        sym_check!(1 > 2);
    }
}

symtest::symtest_test! {
    /// Dies to SIGABRT; the parent observes a signal termination.
    fn aborts_process() {
        std::process::abort();
    }
}

symtest::symtest_test! {
    /// Holds only when the buffer was seeded with 0xAA bytes.
    fn seed_word_check() {
        let word = draw::<u32>();
        sym_assert!(word == 0xAAAA_AAAA);
    }
}

symtest::symtest_test! {
    /// Overdraws the substrate by one byte and abandons.
    fn drains_entire_buffer() {
        for _ in 0..=INPUT_SIZE {
            let _ = draw::<u8>();
        }
    }
}

symtest::symtest_main!();
