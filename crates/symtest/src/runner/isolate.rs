#![allow(unsafe_code)] // fork() and the exported instrumentation entry.
//! Forked child execution and outcome collection.
//!
//! Each run happens in a freshly forked child. The child installs a panic
//! hook that keeps the harness sentinel quiet, executes the unit body
//! under `catch_unwind`, classifies the run from the verdict flags, and
//! exits with the outcome code. The parent decodes the wait status: a
//! normal exit carries the outcome, a signal termination is a crash.
//!
//! The parent never forks while a child is outstanding (except in
//! external-fuzzer mode, where all children are launched before any is
//! collected), and the child never forks at all.

use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::process;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use tracing::{debug, error, warn};

use crate::registry::TestUnit;
use crate::verdict::{self, Outcome, Unwind};

/// Fork, run `unit` in the child, and classify the run in the parent.
pub(crate) fn fork_and_run(unit: &TestUnit) -> Outcome {
    // SAFETY: the harness is single-threaded by contract, so fork() has
    // only the calling thread to duplicate. The child runs the unit
    // wrapper and exits without returning into harness state.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => child_run(unit),
        Ok(ForkResult::Parent { child }) => reap(child),
        Err(err) => {
            error!("fork failed for {}: {err}", unit.name);
            Outcome::Abandon
        },
    }
}

fn reap(child: Pid) -> Outcome {
    match waitpid(child, None) {
        Ok(WaitStatus::Exited(_, code)) => Outcome::from_exit_code(code),
        Ok(status) => {
            debug!("child ended abnormally: {status:?}");
            Outcome::Crash
        },
        Err(err) => {
            warn!("waitpid failed: {err}");
            Outcome::Crash
        },
    }
}

/// Child side of a run: execute the unit body and exit with the outcome
/// code. A normal return is an implicit pass; an escaped panic is a hard
/// failure, as an escaped exception would be.
pub(crate) fn child_run(unit: &TestUnit) -> ! {
    install_sentinel_hook();
    if let Err(payload) = catch_unwind(AssertUnwindSafe(unit.func)) {
        if !payload.is::<Unwind>() {
            verdict::note_panic();
        }
    }
    process::exit(verdict::conclude().exit_code())
}

/// Replace the panic hook so the sentinel unwind stays silent while real
/// panics from the test body keep the default report.
fn install_sentinel_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if info.payload().downcast_ref::<Unwind>().is_none() {
            default_hook(info);
        }
    }));
}

/// Fork a child that immediately enters the instrumentation hand-off.
/// The parent returns without waiting; collect with [`reap_all`].
pub(crate) fn spawn_external(unit: &TestUnit) -> Result<(), Errno> {
    // SAFETY: as in `fork_and_run`; in external mode the parent launches
    // every child before collecting any of them.
    match unsafe { fork() }? {
        ForkResult::Child => child_run_external(unit),
        ForkResult::Parent { .. } => Ok(()),
    }
}

fn child_run_external(unit: &TestUnit) -> ! {
    // SAFETY: the unit reference is valid for the whole child lifetime.
    unsafe { symtest_begin_external(core::ptr::from_ref(unit)) };
    // Without attached instrumentation the entry returns and the unit
    // runs directly.
    child_run(unit)
}

/// Instrumentation hand-off entry for external-fuzzer fresh runs. An
/// attached driver intercepts this symbol and takes over the child; in
/// plain execution it only logs and the caller runs the unit directly.
///
/// # Safety
///
/// `unit` must be null or point to a [`TestUnit`] valid for the duration
/// of the call.
#[no_mangle]
#[inline(never)]
pub unsafe extern "C-unwind" fn symtest_begin_external(unit: *const TestUnit) {
    if unit.is_null() {
        return;
    }
    // SAFETY: non-null per the caller contract.
    let unit = unsafe { &*unit };
    debug!("external instrumentation entry for {}", unit.name);
}

/// Reap every outstanding child, in whatever order they finish, and count
/// the non-pass exits.
pub(crate) fn reap_all() -> u32 {
    let mut failed = 0;
    loop {
        match waitpid(Pid::from_raw(-1), None) {
            Ok(WaitStatus::Exited(_, code)) => {
                if !Outcome::from_exit_code(code).is_pass() {
                    failed += 1;
                }
            },
            Ok(WaitStatus::Signaled(..)) => failed += 1,
            Ok(status) => debug!("ignoring wait status {status:?}"),
            Err(Errno::ECHILD) => break,
            Err(err) => {
                warn!("waitpid(-1) failed: {err}");
                break;
            },
        }
    }
    failed
}
