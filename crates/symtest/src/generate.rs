#![allow(unsafe_code)] // Hook symbols must be externally addressable.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Narrow wrappers funnel through the 32-bit hooks.
//! Typed value generators over the input substrate.
//!
//! Each primitive draws a fixed number of bytes from the substrate in
//! little-endian order and reinterprets them as the requested type. The
//! primitives are exported, non-inlined symbols: an external symbolic
//! executor intercepts them to supply constrained values, and in plain
//! execution they read whatever the substrate holds. Exhausting the
//! substrate abandons the run.
//!
//! Ranged draws route their bound through the [`symtest_assume`] hook and
//! return the drawn value regardless; an unsatisfied range is advisory
//! when no backend is attached, matching concrete execution semantics.
//!
//! [`symtest_assume`]: crate::verdict::symtest_assume

use std::ffi::{c_char, CString};
use std::mem;

use crate::input;
use crate::verdict;

fn draw_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0_u8; N];
    for slot in &mut out {
        *slot = match input::next_byte() {
            Ok(byte) => byte,
            Err(err) => verdict::abandon(err.to_string()),
        };
    }
    out
}

/// Draw an unconstrained `u8`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_u8() -> u8 {
    u8::from_le_bytes(draw_bytes::<1>())
}

/// Draw an unconstrained `u16`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_u16() -> u16 {
    u16::from_le_bytes(draw_bytes::<2>())
}

/// Draw an unconstrained `u32`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_u32() -> u32 {
    u32::from_le_bytes(draw_bytes::<4>())
}

/// Draw an unconstrained `u64`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_u64() -> u64 {
    u64::from_le_bytes(draw_bytes::<8>())
}

/// Draw an unconstrained `usize`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_usize() -> usize {
    usize::from_le_bytes(draw_bytes::<{ mem::size_of::<usize>() }>())
}

/// Draw an unconstrained `i8`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_i8() -> i8 {
    i8::from_le_bytes(draw_bytes::<1>())
}

/// Draw an unconstrained `i16`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_i16() -> i16 {
    i16::from_le_bytes(draw_bytes::<2>())
}

/// Draw an unconstrained `i32`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_i32() -> i32 {
    i32::from_le_bytes(draw_bytes::<4>())
}

/// Draw an unconstrained `i64`.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_i64() -> i64 {
    i64::from_le_bytes(draw_bytes::<8>())
}

/// Draw a `bool`: one byte, low bit set.
#[no_mangle]
#[inline(never)]
pub extern "C-unwind" fn symtest_bool() -> bool {
    draw_bytes::<1>()[0] & 1 == 1
}

/// Types that can be drawn from the symbolic input substrate.
pub trait Draw: Sized {
    /// Draw an unconstrained value.
    fn draw() -> Self;

    /// Draw a value and assume `lo <= v && v <= hi`.
    ///
    /// The bound is routed through the backend assumption hook. In plain
    /// execution the drawn value is returned unchanged even when it falls
    /// outside the range; the caller owns that case.
    #[track_caller]
    fn draw_in_range(lo: Self, hi: Self) -> Self
    where
        Self: PartialOrd + Copy,
    {
        let value = Self::draw();
        verdict::assume(lo <= value && value <= hi, "lo <= value && value <= hi");
        value
    }
}

macro_rules! impl_draw {
    ($($ty:ty => $hook:path),+ $(,)?) => {
        $(impl Draw for $ty {
            fn draw() -> Self {
                $hook()
            }
        })+
    };
}

impl_draw! {
    u8 => symtest_u8,
    u16 => symtest_u16,
    u32 => symtest_u32,
    u64 => symtest_u64,
    usize => symtest_usize,
    i8 => symtest_i8,
    i16 => symtest_i16,
    i32 => symtest_i32,
    i64 => symtest_i64,
    bool => symtest_bool,
}

/// Draw an unconstrained value of `T`.
pub fn draw<T: Draw>() -> T {
    T::draw()
}

/// Draw a value of `T` and assume it lies in `[lo, hi]`.
#[track_caller]
pub fn draw_in_range<T>(lo: T, hi: T) -> T
where
    T: Draw + PartialOrd + Copy,
{
    T::draw_in_range(lo, hi)
}

/// Draw `n` values of `T` by repeated single-element draws.
#[must_use = "drawing consumes substrate bytes"]
pub fn draw_vec<T: Draw>(n: usize) -> Vec<T> {
    (0..n).map(|_| T::draw()).collect()
}

/// Draw `n` raw bytes.
#[must_use = "drawing consumes substrate bytes"]
pub fn bytes(n: usize) -> Vec<u8> {
    draw_vec::<u8>(n)
}

/// Draw a C string of up to `len` bytes plus a forced NUL terminator.
///
/// An embedded NUL in the drawn bytes ends the string early, as it would
/// for any C consumer; the remaining bytes of the draw are still consumed.
#[must_use = "drawing consumes substrate bytes"]
pub fn c_string(len: usize) -> CString {
    let raw = bytes(len);
    let text: Vec<u8> = raw.into_iter().take_while(|byte| *byte != 0).collect();
    // A NUL-free byte vector always converts.
    CString::new(text).unwrap_or_default()
}

/// Minimum model-satisfiable value of `v` under current path constraints.
/// Identity without an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_min_u32(v: u32) -> u32 {
    v
}

/// Maximum model-satisfiable value of `v` under current path constraints.
/// Identity without an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_max_u32(v: u32) -> u32 {
    v
}

/// Signed counterpart of [`symtest_min_u32`].
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_min_i32(v: i32) -> i32 {
    v
}

/// Signed counterpart of [`symtest_max_u32`].
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_max_i32(v: i32) -> i32 {
    v
}

/// Minimum satisfiable `u16`, through the 32-bit hook.
#[must_use]
pub fn min_u16(v: u16) -> u16 {
    symtest_min_u32(u32::from(v)) as u16
}

/// Maximum satisfiable `u16`, through the 32-bit hook.
#[must_use]
pub fn max_u16(v: u16) -> u16 {
    symtest_max_u32(u32::from(v)) as u16
}

/// Minimum satisfiable `u8`, through the 32-bit hook.
#[must_use]
pub fn min_u8(v: u8) -> u8 {
    symtest_min_u32(u32::from(v)) as u8
}

/// Maximum satisfiable `u8`, through the 32-bit hook.
#[must_use]
pub fn max_u8(v: u8) -> u8 {
    symtest_max_u32(u32::from(v)) as u8
}

/// Minimum satisfiable `i16`, through the 32-bit hook.
#[must_use]
pub fn min_i16(v: i16) -> i16 {
    symtest_min_i32(i32::from(v)) as i16
}

/// Maximum satisfiable `i16`, through the 32-bit hook.
#[must_use]
pub fn max_i16(v: i16) -> i16 {
    symtest_max_i32(i32::from(v)) as i16
}

/// Minimum satisfiable `i8`, through the 32-bit hook.
#[must_use]
pub fn min_i8(v: i8) -> i8 {
    symtest_min_i32(i32::from(v)) as i8
}

/// Maximum satisfiable `i8`, through the 32-bit hook.
#[must_use]
pub fn max_i8(v: i8) -> i8 {
    symtest_max_i32(i32::from(v)) as i8
}

/// Symbolicity predicate for `u32`. Always 0 in plain execution; a backend
/// replaces it to report whether constraints are attached to `v`.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_is_symbolic_u32(_v: u32) -> i32 {
    0
}

/// Whether constraints are attached to `v`. `false` in plain execution.
#[must_use]
pub fn is_symbolic_u32(v: u32) -> bool {
    symtest_is_symbolic_u32(v) != 0
}

/// Whether constraints are attached to `v`, through the 32-bit predicate.
#[must_use]
pub fn is_symbolic_u8(v: u8) -> bool {
    is_symbolic_u32(u32::from(v))
}

/// Whether constraints are attached to `v`, through the 32-bit predicate.
#[must_use]
pub fn is_symbolic_u16(v: u16) -> bool {
    is_symbolic_u32(u32::from(v))
}

/// Whether constraints are attached to either half of `v`.
#[must_use]
pub fn is_symbolic_u64(v: u64) -> bool {
    is_symbolic_u32(v as u32) || is_symbolic_u32((v >> 32) as u32)
}

/// Whether constraints are attached to `v`, through the 32-bit predicate.
#[must_use]
pub fn is_symbolic_i8(v: i8) -> bool {
    is_symbolic_u32(u32::from(v as u8))
}

/// Whether constraints are attached to `v`, through the 32-bit predicate.
#[must_use]
pub fn is_symbolic_i16(v: i16) -> bool {
    is_symbolic_u32(u32::from(v as u16))
}

/// Whether constraints are attached to `v`, through the 32-bit predicate.
#[must_use]
pub fn is_symbolic_i32(v: i32) -> bool {
    is_symbolic_u32(v as u32)
}

/// Whether constraints are attached to `v`, through the 64-bit split.
#[must_use]
pub fn is_symbolic_i64(v: i64) -> bool {
    is_symbolic_u64(v as u64)
}

/// Whether constraints are attached to `v`'s bit pattern.
#[must_use]
pub fn is_symbolic_f32(v: f32) -> bool {
    is_symbolic_u32(v.to_bits())
}

/// Whether constraints are attached to `v`'s bit pattern.
#[must_use]
pub fn is_symbolic_f64(v: f64) -> bool {
    is_symbolic_u64(v.to_bits())
}

/// Whether constraints are attached to `v`.
#[must_use]
pub fn is_symbolic_bool(v: bool) -> bool {
    is_symbolic_u32(u32::from(v))
}

/// Mark the bytes in `[begin, end)` as drawn from the substrate. No-op in
/// plain execution; hook target for an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_symbolize_data(_begin: *mut u8, _end: *mut u8) {}

/// Concretize the bytes in `[begin, end)` and return the start of the
/// concretized region. Identity without an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_concretize_data(begin: *mut u8, _end: *mut u8) -> *mut u8 {
    begin
}

/// Mark the bytes of the NUL-terminated string at `s` as drawn. No-op in
/// plain execution; hook target for an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_symbolize_cstr(_s: *mut c_char) {}

/// Concretize the NUL-terminated string at `s` and return it. Identity
/// without an attached backend.
#[no_mangle]
#[inline(never)]
pub extern "C" fn symtest_concretize_cstr(s: *const c_char) -> *const c_char {
    s
}

/// Mark a byte slice as drawn through the data hook.
pub fn symbolize_slice(data: &mut [u8]) {
    let range = data.as_mut_ptr_range();
    symtest_symbolize_data(range.start, range.end);
}

/// Concretize a byte slice through the data hook.
pub fn concretize_slice(data: &mut [u8]) {
    let range = data.as_mut_ptr_range();
    let _ = symtest_concretize_data(range.start, range.end);
}

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use super::*;
    use crate::test_support::substrate_lock;
    use crate::verdict::{begin_run, conclude, Outcome};

    #[test]
    fn draws_assemble_little_endian() {
        let _guard = substrate_lock();
        input::load(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]).unwrap();
        assert_eq!(draw::<u32>(), 0x0403_0201);
        assert_eq!(draw::<u16>(), 0x0605);
    }

    #[test]
    fn signed_draws_reinterpret_the_same_bytes() {
        let _guard = substrate_lock();
        input::load(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(draw::<i32>(), -1);
    }

    #[test]
    fn bool_draw_tests_the_low_bit() {
        let _guard = substrate_lock();
        input::load(&[0x02, 0x03]).unwrap();
        assert!(!draw::<bool>());
        assert!(draw::<bool>());
    }

    #[test]
    fn ranged_draw_is_advisory_without_a_backend() {
        let _guard = substrate_lock();
        begin_run();
        input::load(&[5, 0, 0, 0]).unwrap();
        // 5 is outside [10, 20]; the drawn value still comes back and the
        // run outcome is untouched.
        assert_eq!(draw_in_range(10_u32, 20), 5);
        assert_eq!(conclude(), Outcome::Pass);
    }

    #[test]
    fn identical_buffers_replay_identically() {
        let _guard = substrate_lock();
        let seed: Vec<u8> = (0_u8..64).collect();

        input::load(&seed).unwrap();
        let first = (draw::<u8>(), draw::<u32>(), draw::<i64>(), draw::<bool>());

        input::load(&seed).unwrap();
        let second = (draw::<u8>(), draw::<u32>(), draw::<i64>(), draw::<bool>());

        assert_eq!(first, second);
    }

    #[test]
    fn vec_draws_consume_elementwise() {
        let _guard = substrate_lock();
        let seed: Vec<u8> = (0_u8..16).collect();
        input::load(&seed).unwrap();
        assert_eq!(draw_vec::<u32>(2), vec![0x0302_0100, 0x0706_0504]);
        assert_eq!(input::cursor(), 8);
    }

    #[test]
    fn c_string_is_nul_terminated() {
        let _guard = substrate_lock();
        input::load(b"abc").unwrap();
        let text = c_string(3);
        assert_eq!(text.as_bytes(), b"abc");
        assert_eq!(text.as_bytes_with_nul(), b"abc\0");
    }

    #[test]
    fn c_string_ends_at_an_embedded_nul() {
        let _guard = substrate_lock();
        input::load(b"ab\0cd").unwrap();
        assert_eq!(c_string(5).as_bytes(), b"ab");
        // The full draw is consumed even though the string ended early.
        assert_eq!(input::cursor(), 5);
    }

    #[test]
    fn exhausting_the_substrate_abandons_the_run() {
        let _guard = substrate_lock();
        begin_run();
        input::reset();
        for _ in 0..input::INPUT_SIZE {
            let _ = draw::<u8>();
        }
        let caught = catch_unwind(|| draw::<u8>());
        assert!(caught.is_err());
        assert_eq!(conclude(), Outcome::Abandon);
    }

    #[test]
    fn extremum_queries_are_identities() {
        assert_eq!(symtest_min_u32(7), 7);
        assert_eq!(symtest_max_u32(7), 7);
        assert_eq!(symtest_min_i32(-7), -7);
        assert_eq!(symtest_max_i32(-7), -7);
        assert_eq!(min_u8(255), 255);
        assert_eq!(max_i16(-300), -300);
    }

    #[test]
    fn nothing_is_symbolic_in_plain_execution() {
        assert!(!is_symbolic_u32(0xDEAD_BEEF));
        assert!(!is_symbolic_u64(u64::MAX));
        assert!(!is_symbolic_i8(-1));
        assert!(!is_symbolic_f32(1.5));
        assert!(!is_symbolic_bool(true));
    }

    #[test]
    fn data_hooks_are_transparent() {
        let mut data = [1_u8, 2, 3];
        symbolize_slice(&mut data);
        concretize_slice(&mut data);
        assert_eq!(data, [1, 2, 3]);
    }
}
