//! Test unit registry.
//!
//! Units are collected before `main` through linker-section registration
//! and snapshotted into a [`Registry`] when the driver starts. The
//! registry is a stack: registration prepends, iteration yields the most
//! recently registered unit first, and nothing mutates it once the driver
//! begins.

use std::ffi::OsStr;
use std::path::Path;

use tracing::info;

/// A registered test unit: name, source location, and entry point.
#[derive(Debug, Clone, Copy)]
pub struct TestUnit {
    /// Unit name, a bare identifier.
    pub name: &'static str,

    /// Source file that declared the unit.
    pub file: &'static str,

    /// Line of the declaration.
    pub line: u32,

    /// Entry point invoked in the forked child.
    pub func: fn(),
}

inventory::collect!(TestUnit);

impl TestUnit {
    /// Describe a test unit. Registration happens through
    /// [`symtest_test!`](crate::symtest_test).
    #[must_use]
    pub const fn new(name: &'static str, file: &'static str, line: u32, func: fn()) -> Self {
        Self {
            name,
            file,
            line,
            func,
        }
    }

    /// Base name of the declaring source file, used as the per-test corpus
    /// directory component.
    #[must_use]
    pub fn source_basename(&self) -> &'static str {
        Path::new(self.file)
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(self.file)
    }
}

/// Registry of test units in last-registered-first order.
#[derive(Debug, Default)]
pub struct Registry {
    units: Vec<&'static TestUnit>,
}

impl Registry {
    /// Snapshot the linker-registered units.
    ///
    /// The underlying collection is prepend-ordered: within one
    /// translation unit, later declarations iterate first. Ordering across
    /// translation units follows link order, as with C static
    /// initializers.
    #[must_use]
    pub fn from_linker() -> Self {
        Self {
            units: inventory::iter::<TestUnit>.into_iter().collect(),
        }
    }

    /// Build a registry by registering `units` in declaration order.
    #[must_use]
    pub fn from_units(units: &[&'static TestUnit]) -> Self {
        let mut registry = Self::default();
        for unit in units.iter().copied() {
            registry.register(unit);
        }
        registry
    }

    /// Prepend a unit; the most recently registered unit iterates first.
    pub fn register(&mut self, unit: &'static TestUnit) {
        self.units.insert(0, unit);
    }

    /// Iterate units, last registered first.
    pub fn units(&self) -> impl Iterator<Item = &'static TestUnit> + '_ {
        self.units.iter().copied()
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` when no units are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Select a replay target: the first unit in registry order whose
    /// name starts with `which`, or the first unit overall when no
    /// selector is given.
    pub fn select(&self, which: Option<&str>) -> Option<&'static TestUnit> {
        match which {
            Some(prefix) => self.units().find(|unit| unit.name.starts_with(prefix)),
            None => {
                info!("No test specified, defaulting to first test");
                self.units().next()
            },
        }
    }
}
