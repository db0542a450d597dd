#![allow(unsafe_code)] // The substrate is exported process-wide state for the backend hook ABI.
//! Symbolic input substrate.
//!
//! A fixed 8 KiB byte buffer plus a monotonic consumption cursor, shared
//! process-wide. Value generators draw from it one byte at a time; corpus
//! replay loads saved inputs into it verbatim. The buffer and cursor are
//! exported under stable symbols so an external symbolic executor can
//! intercept them by address; in plain execution they hold file bytes,
//! PRNG bytes, or zeroes.
//!
//! The harness is single-threaded within any one process. The parent
//! mutates the substrate only between runs, and each forked child inherits
//! a copy-on-write snapshot taken at fork time.

use rand::RngCore;

/// Capacity of the symbolic input buffer in bytes.
pub const INPUT_SIZE: usize = 8192;

/// Process-wide symbolic input buffer.
///
/// Loads always start from a zero-filled buffer, so a short corpus file
/// deterministically produces a zero tail. The symbol must stay at a
/// stable address for the process lifetime.
#[no_mangle]
pub static mut SYMTEST_INPUT: [u8; INPUT_SIZE] = [0; INPUT_SIZE];

/// Number of input bytes consumed so far. Never exceeds [`INPUT_SIZE`].
#[no_mangle]
pub static mut SYMTEST_INPUT_INDEX: u32 = 0;

/// Errors raised by the input substrate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// Every byte of the buffer has been consumed.
    #[error("input exhausted")]
    Exhausted,

    /// An input larger than the buffer capacity was offered.
    #[error("input of {size} bytes exceeds buffer capacity of {max} bytes")]
    TooLarge {
        /// Size of the rejected input in bytes.
        size: usize,
        /// Buffer capacity in bytes.
        max: usize,
    },
}

/// Zero the buffer and rewind the cursor.
pub fn reset() {
    // SAFETY: the harness is single-threaded; nothing reads the substrate
    // while the parent rewrites it between runs.
    unsafe {
        core::ptr::write_bytes(
            core::ptr::addr_of_mut!(SYMTEST_INPUT).cast::<u8>(),
            0,
            INPUT_SIZE,
        );
        SYMTEST_INPUT_INDEX = 0;
    }
}

/// Rewind the cursor without touching the buffer contents.
pub fn rewind() {
    // SAFETY: plain store to the process-wide cursor; single-threaded.
    unsafe {
        SYMTEST_INPUT_INDEX = 0;
    }
}

/// Load `bytes` into a freshly zeroed buffer and rewind the cursor.
///
/// # Errors
///
/// Returns [`InputError::TooLarge`] when `bytes` exceeds [`INPUT_SIZE`];
/// the buffer is left untouched in that case.
pub fn load(bytes: &[u8]) -> Result<(), InputError> {
    if bytes.len() > INPUT_SIZE {
        return Err(InputError::TooLarge {
            size: bytes.len(),
            max: INPUT_SIZE,
        });
    }
    reset();
    // SAFETY: length checked above; the source slice cannot alias the
    // buffer because the buffer is never handed out as a slice.
    unsafe {
        core::ptr::copy_nonoverlapping(
            bytes.as_ptr(),
            core::ptr::addr_of_mut!(SYMTEST_INPUT).cast::<u8>(),
            bytes.len(),
        );
    }
    Ok(())
}

/// Consume and return the next byte, advancing the cursor.
///
/// # Errors
///
/// Returns [`InputError::Exhausted`] once all [`INPUT_SIZE`] bytes have
/// been consumed.
pub fn next_byte() -> Result<u8, InputError> {
    // SAFETY: the cursor is bounds-checked before the read; single-threaded.
    unsafe {
        let index = SYMTEST_INPUT_INDEX as usize;
        if index >= INPUT_SIZE {
            return Err(InputError::Exhausted);
        }
        let byte = *core::ptr::addr_of!(SYMTEST_INPUT).cast::<u8>().add(index);
        SYMTEST_INPUT_INDEX += 1;
        Ok(byte)
    }
}

/// Number of bytes consumed so far.
#[must_use]
pub fn cursor() -> u32 {
    // SAFETY: plain load of the process-wide cursor.
    unsafe { SYMTEST_INPUT_INDEX }
}

/// Number of bytes still available for drawing.
#[must_use]
pub fn remaining() -> usize {
    INPUT_SIZE - cursor() as usize
}

/// Copy of the entire buffer, consumed or not.
#[must_use]
pub fn snapshot() -> Vec<u8> {
    // SAFETY: shared read; the parent only snapshots between runs.
    unsafe { (*core::ptr::addr_of!(SYMTEST_INPUT)).to_vec() }
}

/// Fill the whole buffer from `rng` and rewind the cursor.
pub fn fill_random(rng: &mut dyn RngCore) {
    // SAFETY: exclusive access per the single-threaded harness contract.
    unsafe {
        let buffer = core::slice::from_raw_parts_mut(
            core::ptr::addr_of_mut!(SYMTEST_INPUT).cast::<u8>(),
            INPUT_SIZE,
        );
        rng.fill_bytes(buffer);
        SYMTEST_INPUT_INDEX = 0;
    }
}
