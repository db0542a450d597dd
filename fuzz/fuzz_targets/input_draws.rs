#![no_main]
//! Fuzz target for the substrate draw primitives.
//!
//! Loads arbitrary bytes and draws within the remaining budget. Draws
//! must be deterministic for identical buffers and must never read past
//! the consumption bound.

use libfuzzer_sys::fuzz_target;
use symtest::{draw, input};

fuzz_target!(|data: &[u8]| {
    if data.len() > input::INPUT_SIZE {
        return;
    }

    input::load(data).expect("bounded inputs always load");
    let mut first = Vec::new();
    while input::remaining() >= 8 {
        first.push(draw::<u64>());
    }
    let consumed = input::cursor();

    input::load(data).expect("bounded inputs always load");
    let mut second = Vec::new();
    while input::remaining() >= 8 {
        second.push(draw::<u64>());
    }

    assert_eq!(first, second, "identical buffers must replay identically");
    assert_eq!(consumed, input::cursor());
    assert!(input::cursor() as usize <= input::INPUT_SIZE);
});
