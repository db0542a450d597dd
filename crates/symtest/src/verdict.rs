#![allow(unsafe_code)] // Hook symbols must be externally addressable.
#![allow(clippy::missing_panics_doc)] // pass/fail/abandon unwind to the run wrapper.
//! Assertion and outcome state for a single test run.
//!
//! A run carries four sticky flags (hard failure, soft failure,
//! abandonment, crash) plus an abandon reason. `pass`, `fail`, and
//! `abandon` return control to the run wrapper through a sentinel unwind:
//! no further test code runs after one of those calls. `check` and
//! `soft_fail` flag the run and keep executing.
//!
//! The flag state is process-wide. The parent resets it before each fork;
//! the child inherits the clean copy, mutates it while the unit runs, and
//! encodes the conclusion in its exit status.

use std::ffi::{c_char, CStr, CString};
use std::panic::panic_any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::{error, warn};

/// Classification of one test run, used in-process and as the child
/// process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The test ran to completion with no failure flagged.
    Pass,

    /// A hard or soft failure was flagged.
    Fail,

    /// The child terminated by signal or with an unknown status.
    Crash,

    /// The harness could not complete the run.
    Abandon,
}

impl Outcome {
    /// Numeric exit code carried from child to parent.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Pass => 0,
            Self::Fail => 1,
            Self::Crash => 2,
            Self::Abandon => 3,
        }
    }

    /// Decode a child exit code; unknown codes classify as [`Outcome::Crash`].
    #[must_use]
    pub const fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Pass,
            1 => Self::Fail,
            3 => Self::Abandon,
            _ => Self::Crash,
        }
    }

    /// Corpus file suffix for this outcome; abandoned runs are never saved.
    #[must_use]
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Self::Pass => Some("pass"),
            Self::Fail => Some("fail"),
            Self::Crash => Some("crash"),
            Self::Abandon => None,
        }
    }

    /// Returns `true` for [`Outcome::Pass`].
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "passed"),
            Self::Fail => write!(f, "failed"),
            Self::Crash => write!(f, "crashed"),
            Self::Abandon => write!(f, "abandoned"),
        }
    }
}

/// Sentinel payload unwound by `pass`/`fail`/`abandon` to return control
/// to the run wrapper without executing further test code.
pub(crate) struct Unwind;

static FAILED: AtomicBool = AtomicBool::new(false);
static SOFT_FAILED: AtomicBool = AtomicBool::new(false);
static ABANDONED: AtomicBool = AtomicBool::new(false);
static CRASHED: AtomicBool = AtomicBool::new(false);
static ABANDON_REASON: Mutex<Option<String>> = Mutex::new(None);

/// Reset the per-run flags. The parent calls this before every fork.
pub fn begin_run() {
    FAILED.store(false, Ordering::SeqCst);
    SOFT_FAILED.store(false, Ordering::SeqCst);
    ABANDONED.store(false, Ordering::SeqCst);
    CRASHED.store(false, Ordering::SeqCst);
    if let Ok(mut slot) = ABANDON_REASON.lock() {
        *slot = None;
    }
}

/// Classify the finished run from the recorded flags.
///
/// Failures, hard or soft, win over abandonment: a soft failure observed
/// before an abandon describes real test behavior and is preserved.
#[must_use]
pub fn conclude() -> Outcome {
    if FAILED.load(Ordering::SeqCst) || SOFT_FAILED.load(Ordering::SeqCst) {
        Outcome::Fail
    } else if ABANDONED.load(Ordering::SeqCst) {
        Outcome::Abandon
    } else {
        Outcome::Pass
    }
}

/// Reason recorded by the last [`abandon`], if any.
#[must_use]
pub fn abandon_reason() -> Option<String> {
    ABANDON_REASON.lock().ok().and_then(|slot| slot.clone())
}

/// Declare the test passed and return to the run wrapper.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_pass() -> ! {
    panic_any(Unwind)
}

/// Declare the test failed and return to the run wrapper.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_fail() -> ! {
    FAILED.store(true, Ordering::SeqCst);
    panic_any(Unwind)
}

/// Flag a failure without interrupting the test.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_soft_fail() {
    SOFT_FAILED.store(true, Ordering::SeqCst);
}

/// Abandon the run for a harness-level problem and return to the run
/// wrapper.
///
/// # Safety
///
/// `reason` must be null or a NUL-terminated string valid for the
/// duration of the call.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C-unwind" fn symtest_abandon(reason: *const c_char) -> ! {
    let text = if reason.is_null() {
        String::from("unspecified")
    } else {
        // SAFETY: non-null per the caller contract.
        unsafe { CStr::from_ptr(reason) }.to_string_lossy().into_owned()
    };
    abandon_impl(text)
}

/// Mark the run as crashed. Fired by the parent after a signal-terminated
/// child; hook target for external drivers.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_crash() {
    CRASHED.store(true, Ordering::SeqCst);
}

/// Record an assumption about a symbolic expression.
///
/// With a backend attached this prunes the execution path. In plain
/// execution an unsatisfied assumption is advisory: it is logged and the
/// run outcome is unaffected.
///
/// # Safety
///
/// `expr` and `file` must each be null or a NUL-terminated string valid
/// for the duration of the call.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C" fn symtest_assume(cond: bool, expr: *const c_char, file: *const c_char, line: u32) {
    if cond {
        return;
    }
    // SAFETY: null-checked inside; NUL-terminated per the caller contract.
    let expr = unsafe { describe(expr) };
    // SAFETY: as above.
    let file = unsafe { describe(file) };
    warn!("unsatisfied assumption `{expr}` at {file}:{line}");
}

unsafe fn describe(text: *const c_char) -> String {
    if text.is_null() {
        String::from("<unknown>")
    } else {
        // SAFETY: non-null and NUL-terminated per the caller contract.
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}

fn abandon_impl(reason: String) -> ! {
    error!("abandoning test: {reason}");
    ABANDONED.store(true, Ordering::SeqCst);
    if let Ok(mut slot) = ABANDON_REASON.lock() {
        *slot = Some(reason);
    }
    panic_any(Unwind)
}

/// Declare the test passed; no further test code runs.
pub fn pass() -> ! {
    symtest_pass()
}

/// Declare the test failed; no further test code runs.
pub fn fail() -> ! {
    symtest_fail()
}

/// Flag a soft failure; the run continues and reports `Fail` at the end.
pub fn soft_fail() {
    symtest_soft_fail();
}

/// Abandon the run with a reason; no further test code runs.
pub fn abandon(reason: impl Into<String>) -> ! {
    let reason = CString::new(reason.into()).unwrap_or_default();
    // SAFETY: `reason` is a live CString for the duration of the call.
    unsafe { symtest_abandon(reason.as_ptr()) }
}

/// Hard-assert `cond`; a false condition fails and aborts the test.
pub fn assert_true(cond: bool) {
    if !cond {
        fail();
    }
}

/// Soft-check `cond`; a false condition flags a failure and continues.
pub fn check(cond: bool) {
    if !cond {
        soft_fail();
    }
}

/// Route an assumption through the backend hook with the caller's
/// source location.
#[track_caller]
pub fn assume(cond: bool, expr: &str) {
    let location = std::panic::Location::caller();
    let expr = CString::new(expr).unwrap_or_default();
    let file = CString::new(location.file()).unwrap_or_default();
    // SAFETY: both strings are live CStrings for the duration of the call.
    unsafe { symtest_assume(cond, expr.as_ptr(), file.as_ptr(), location.line()) }
}

/// Log a failing assertion expression, then fail and abort the test.
/// Used by [`sym_assert!`](crate::sym_assert).
#[track_caller]
pub fn hard_failure(expr: &str) -> ! {
    let location = std::panic::Location::caller();
    error!(
        "assertion failed `{expr}` at {}:{}",
        location.file(),
        location.line()
    );
    fail()
}

/// Log a failing check expression and flag a soft failure.
/// Used by [`sym_check!`](crate::sym_check).
#[track_caller]
pub fn soft_failure(expr: &str) {
    let location = std::panic::Location::caller();
    warn!(
        "check failed `{expr}` at {}:{}",
        location.file(),
        location.line()
    );
    soft_fail();
}

/// Record an escaped panic from the test body as a hard failure.
pub(crate) fn note_panic() {
    error!("panic escaped the test body; treating as a hard failure");
    FAILED.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::test_support::substrate_lock;

    #[test]
    fn exit_codes_round_trip() {
        for outcome in [Outcome::Pass, Outcome::Fail, Outcome::Crash, Outcome::Abandon] {
            assert_eq!(Outcome::from_exit_code(outcome.exit_code()), outcome);
        }
    }

    #[test]
    fn unknown_exit_codes_classify_as_crash() {
        assert_eq!(Outcome::from_exit_code(42), Outcome::Crash);
        assert_eq!(Outcome::from_exit_code(-1), Outcome::Crash);
    }

    #[test]
    fn abandoned_runs_have_no_corpus_suffix() {
        assert_eq!(Outcome::Pass.suffix(), Some("pass"));
        assert_eq!(Outcome::Fail.suffix(), Some("fail"));
        assert_eq!(Outcome::Crash.suffix(), Some("crash"));
        assert_eq!(Outcome::Abandon.suffix(), None);
    }

    #[test]
    fn fresh_run_state_concludes_as_pass() {
        let _guard = substrate_lock();
        begin_run();
        assert_eq!(conclude(), Outcome::Pass);
    }

    #[test]
    fn soft_failure_upgrades_a_normal_return() {
        let _guard = substrate_lock();
        begin_run();
        check(false);
        assert_eq!(conclude(), Outcome::Fail);
    }

    #[test]
    fn hard_failure_unwinds_with_the_sentinel() {
        let _guard = substrate_lock();
        begin_run();
        let unwound = catch_unwind(AssertUnwindSafe(|| assert_true(false)));
        let payload = unwound.expect_err("assert_true(false) must unwind");
        assert!(payload.is::<Unwind>());
        assert_eq!(conclude(), Outcome::Fail);
    }

    #[test]
    fn abandonment_records_the_reason() {
        let _guard = substrate_lock();
        begin_run();
        let unwound = catch_unwind(AssertUnwindSafe(|| -> () { abandon("input exhausted") }));
        assert!(unwound.is_err());
        assert_eq!(conclude(), Outcome::Abandon);
        assert_eq!(abandon_reason().as_deref(), Some("input exhausted"));
    }

    #[test]
    fn failures_win_over_abandonment() {
        let _guard = substrate_lock();
        begin_run();
        soft_fail();
        let unwound = catch_unwind(AssertUnwindSafe(|| -> () { abandon("exhausted") }));
        assert!(unwound.is_err());
        assert_eq!(conclude(), Outcome::Fail);
    }

    #[test]
    fn advisory_assumptions_do_not_alter_the_outcome() {
        let _guard = substrate_lock();
        begin_run();
        assume(false, "low <= value");
        assert_eq!(conclude(), Outcome::Pass);
    }

    #[test]
    fn begin_run_clears_prior_state() {
        let _guard = substrate_lock();
        begin_run();
        soft_fail();
        assert_eq!(conclude(), Outcome::Fail);
        begin_run();
        assert_eq!(conclude(), Outcome::Pass);
        assert_eq!(abandon_reason(), None);
    }
}
