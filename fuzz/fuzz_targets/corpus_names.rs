#![no_main]
//! Fuzz target for the saved-case name filter.
//!
//! The first-dot suffix rule runs over every directory entry during
//! corpus replay, so it must never panic, over-accept, or under-accept
//! on arbitrary names.

use libfuzzer_sys::fuzz_target;
use symtest::corpus::{is_saved_case, SAVED_CASE_SUFFIXES};

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };

    if is_saved_case(name) {
        // An accepted name starts its suffix at the first dot, and the
        // suffix matches a known outcome extension exactly.
        let dot = name.find('.').expect("accepted names contain a dot");
        assert!(SAVED_CASE_SUFFIXES.contains(&&name[dot..]));
    } else if let Some(dot) = name.find('.') {
        // A rejected name must not carry a well-formed suffix.
        assert!(
            !SAVED_CASE_SUFFIXES.contains(&&name[dot..]),
            "rejected a well-formed saved-case name: {name}"
        );
    }
});
