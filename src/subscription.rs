//! Handles that tear down an observation.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use tokio::task::AbortHandle;

mod dynamic;
pub use dynamic::DynamicSubscriptions;

/// A handle returned by anything that can be observed, used to stop the
/// observation before the source goes away.
pub trait Subscription {
  /// Stop receiving values. Consumes the handle.
  fn unsubscribe(self);

  fn is_closed(&self) -> bool;
}

impl Subscription for () {
  #[inline]
  fn unsubscribe(self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<S: Subscription> Subscription for Option<S> {
  #[inline]
  fn unsubscribe(self) {
    if let Some(s) = self {
      s.unsubscribe()
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.as_ref().map_or(true, Subscription::is_closed) }
}

// ==================== Boxed ====================

/// Calls `unsubscribe` through a box, `Subscription::unsubscribe` takes
/// `self` by value and needs `Sized`.
pub trait BoxedSubscriptionInner {
  fn boxed_unsubscribe(self: Box<Self>);
  fn boxed_is_closed(&self) -> bool;
}

impl<T: Subscription> BoxedSubscriptionInner for T {
  #[inline]
  fn boxed_unsubscribe(self: Box<Self>) { (*self).unsubscribe() }

  #[inline]
  fn boxed_is_closed(&self) -> bool { self.is_closed() }
}

/// A type-erased subscription that can cross threads. Cells keep their
/// upstream sources and owned teardowns in this form.
pub struct BoxedSubscriptionSend(Box<dyn BoxedSubscriptionInner + Send>);

impl BoxedSubscriptionSend {
  #[inline]
  pub fn new(subscription: impl Subscription + Send + 'static) -> Self {
    Self(Box::new(subscription))
  }
}

impl Subscription for BoxedSubscriptionSend {
  #[inline]
  fn unsubscribe(self) { self.0.boxed_unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.boxed_is_closed() }
}

impl Debug for BoxedSubscriptionSend {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BoxedSubscriptionSend")
      .field("is_closed", &self.is_closed())
      .finish()
  }
}

// ==================== Task ====================

/// Aborts a spawned Tokio task when unsubscribed.
#[derive(Debug, Clone)]
pub struct TaskSubscription(AbortHandle);

impl TaskSubscription {
  pub fn new(handle: AbortHandle) -> Self { Self(handle) }
}

impl Subscription for TaskSubscription {
  #[inline]
  fn unsubscribe(self) { self.0.abort() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_finished() }
}

// ==================== Flag ====================

/// A subscription that only flips a shared flag. Whoever owns the other
/// end checks the flag before doing any work.
#[derive(Debug, Clone, Default)]
pub struct FlagSubscription(Arc<AtomicBool>);

impl FlagSubscription {
  pub fn new() -> Self { Self::default() }

  /// The flag the owner polls, `true` once unsubscribed.
  pub fn flag(&self) -> Arc<AtomicBool> { self.0.clone() }
}

impl Subscription for FlagSubscription {
  #[inline]
  fn unsubscribe(self) { self.0.store(true, Ordering::Release) }

  #[inline]
  fn is_closed(&self) -> bool { self.0.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxresult_macro::test]
  fn unit_subscription_is_always_closed() {
    assert!(().is_closed());
    ().unsubscribe();
  }

  #[rxresult_macro::test]
  fn boxed_flag_subscription() {
    let flag = FlagSubscription::new();
    let closed = flag.flag();
    let boxed = BoxedSubscriptionSend::new(flag);

    assert!(!boxed.is_closed());
    boxed.unsubscribe();
    assert!(closed.load(Ordering::Acquire));
  }

  #[rxresult_macro::test]
  fn optional_subscription() {
    let none: Option<FlagSubscription> = None;
    assert!(none.is_closed());

    let flag = FlagSubscription::new();
    let closed = flag.flag();
    Some(flag).unsubscribe();
    assert!(closed.load(Ordering::Acquire));
  }

  #[rxresult_macro::test]
  async fn task_subscription_aborts() {
    let handle = tokio::spawn(futures::future::pending::<()>());
    let subscription = TaskSubscription::new(handle.abort_handle());
    subscription.unsubscribe();

    let err = handle.await.unwrap_err();
    assert!(err.is_cancelled());
  }
}
