//! Operators composing cells.

use std::panic::{catch_unwind, AssertUnwindSafe};

pub mod chain;
pub mod combine;
pub mod merge;
pub mod pair;
pub mod transform;

/// Run a user closure, turning a panic into `None`.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Option<R> {
  catch_unwind(AssertUnwindSafe(f)).ok()
}
