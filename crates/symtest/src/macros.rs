//! Declarative macros: unit registration, the generated `main`, and the
//! assertion, check, and assumption helpers.

/// Define and register a test unit.
///
/// The body becomes a plain function; registration happens before `main`
/// through the linker-section collector, so the generated binary only
/// needs [`symtest_main!`](crate::symtest_main).
///
/// ```rust,ignore
/// symtest::symtest_test! {
///     fn parses_header() {
///         let len = symtest::draw_in_range(0_u32, 64);
///         symtest::sym_assert!(len <= 64);
///     }
/// }
/// ```
#[macro_export]
macro_rules! symtest_test {
    ($(#[$meta:meta])* fn $name:ident() $body:block) => {
        $(#[$meta])*
        fn $name() $body

        $crate::inventory::submit! {
            $crate::TestUnit::new(
                ::core::stringify!($name),
                ::core::file!(),
                ::core::line!(),
                $name,
            )
        }
    };
}

/// Generate `fn main()` for a test binary: flag parsing, logging, the
/// driver, and a saturated failed-count exit status.
#[macro_export]
macro_rules! symtest_main {
    () => {
        fn main() {
            ::std::process::exit($crate::runner::harness_main());
        }
    };
}

/// Hard-assert an expression. A false value fails the test and stops it;
/// no further test code runs.
#[macro_export]
macro_rules! sym_assert {
    ($cond:expr) => {
        if !($cond) {
            $crate::verdict::hard_failure(::core::stringify!($cond));
        }
    };
}

/// Soft-check an expression. A false value flags a failure; the test
/// keeps running and reports `Fail` at the end.
#[macro_export]
macro_rules! sym_check {
    ($cond:expr) => {
        if !($cond) {
            $crate::verdict::soft_failure(::core::stringify!($cond));
        }
    };
}

/// Record an assumption with its expression text and source location.
/// Advisory in plain execution; prunes the path under a backend.
#[macro_export]
macro_rules! sym_assume {
    ($cond:expr) => {{
        // SAFETY: both strings are static and NUL-terminated by
        // construction.
        #[allow(unsafe_code)]
        unsafe {
            $crate::verdict::symtest_assume(
                $cond,
                ::core::concat!(::core::stringify!($cond), "\0").as_ptr().cast(),
                ::core::concat!(::core::file!(), "\0").as_ptr().cast(),
                ::core::line!(),
            );
        }
    }};
}

/// Run the body when a freshly drawn `bool` is true.
#[macro_export]
macro_rules! maybe {
    ($($body:tt)*) => {
        if $crate::draw::<bool>() {
            $($body)*
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::test_support::substrate_lock;
    use crate::verdict::{begin_run, conclude, Outcome};
    use crate::input;

    #[test]
    fn sym_check_flags_without_unwinding() {
        let _guard = substrate_lock();
        begin_run();
        sym_check!(1 > 2);
        sym_check!(2 > 1);
        assert_eq!(conclude(), Outcome::Fail);
    }

    #[test]
    fn sym_assert_unwinds_on_false() {
        let _guard = substrate_lock();
        begin_run();
        let caught = std::panic::catch_unwind(|| {
            sym_assert!(1 + 1 == 3);
        });
        assert!(caught.is_err());
        assert_eq!(conclude(), Outcome::Fail);
    }

    #[test]
    fn sym_assume_is_advisory() {
        let _guard = substrate_lock();
        begin_run();
        sym_assume!(false);
        assert_eq!(conclude(), Outcome::Pass);
    }

    #[test]
    fn maybe_follows_the_drawn_bool() {
        let _guard = substrate_lock();
        input::load(&[1, 0]).unwrap();
        let mut ran = 0;
        maybe! {
            ran += 1;
        }
        maybe! {
            ran += 10;
        }
        assert_eq!(ran, 1);
    }
}
