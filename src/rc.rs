use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared mutable state for closures that outlive the call that built them.
///
/// Combinator callbacks are registered on several sources at once and each
/// of them needs to update the same bookkeeping, so the state lives behind
/// an `Arc<Mutex<_>>` and every clone points at it.
#[derive(Default)]
pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  /// Lock the state. A poisoned lock is recovered, the state it guards is
  /// plain bookkeeping and stays usable after a panicking callback.
  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> {
    self.0.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Run `f` with the state locked.
  #[inline]
  pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R { f(&mut self.rc_deref_mut()) }

  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}
