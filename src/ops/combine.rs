//! Pairing two cells.
//!
//! A combined cell starts with the pair of current values as soon as either
//! side is initialized, then emits a new pair on every change of either
//! side. The value each side replays when first observed is already part
//! of that initial pair and is swallowed once.
//!
//! ```
//! use rxresult::prelude::*;
//!
//! let name = ObservableCell::with_value("rx");
//! let version = ObservableCell::<u32>::new();
//! let both = combine(&name, &version);
//! assert_eq!(both.value(), Some((Some("rx"), None)));
//!
//! version.set(1);
//! assert_eq!(both.value(), Some((Some("rx"), Some(1))));
//! assert_eq!(combine_not_null(&name, &version).value(), Some(("rx", 1)));
//! ```

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use futures::StreamExt;

use super::{
  pair::only_with_values,
  transform::{NotNullTransform, NullableTransform},
};
use crate::cell::{CellItem, ObservableCell};

/// A cell holding `select` over the latest values of `a` and `b`. Pairs for
/// which `select` returns `None` are not emitted.
pub(crate) fn combine_by<A, B, X>(
  a: &ObservableCell<A>,
  b: &ObservableCell<B>,
  select: impl Fn(Option<A>, Option<B>) -> Option<X> + Send + Sync + 'static,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let ignore_a = Arc::new(AtomicBool::new(a.is_initialized()));
  let ignore_b = Arc::new(AtomicBool::new(b.is_initialized()));
  let initial = if a.is_initialized() || b.is_initialized() {
    select(a.value(), b.value())
  } else {
    None
  };
  let mediator = match initial {
    Some(value) => ObservableCell::with_value(value),
    None => ObservableCell::new(),
  };

  let select = Arc::new(select);
  let c_select = select.clone();
  let other = b.clone();
  mediator.add_source(a, move |cell, a_value| {
    if ignore_a.swap(false, Ordering::AcqRel) {
      return;
    }
    if let Some(value) = c_select(a_value, other.value()) {
      cell.set(value);
    }
  });
  let other = a.clone();
  mediator.add_source(b, move |cell, b_value| {
    if ignore_b.swap(false, Ordering::AcqRel) {
      return;
    }
    if let Some(value) = select(other.value(), b_value) {
      cell.set(value);
    }
  });
  mediator
}

/// Pairs of the latest values of `a` and `b`, either side possibly absent.
pub fn combine<A: CellItem, B: CellItem>(
  a: &ObservableCell<A>,
  b: &ObservableCell<B>,
) -> ObservableCell<(Option<A>, Option<B>)> {
  combine_by(a, b, |a, b| Some((a, b)))
}

/// Pairs of the latest values of `a` and `b`, only once both are present.
pub fn combine_not_null<A: CellItem, B: CellItem>(
  a: &ObservableCell<A>,
  b: &ObservableCell<B>,
) -> ObservableCell<(A, B)> {
  combine_by(a, b, |a, b| only_with_values((a, b)))
}

/// [`combine`], with every pair handed to `transform` on its dispatcher.
///
/// Pairs are transformed one at a time, in order.
///
/// # Panics
///
/// Outside of a Tokio runtime, like [`tokio::spawn`].
pub fn combine_with<A, B, X>(
  a: &ObservableCell<A>,
  b: &ObservableCell<B>,
  transform: NullableTransform<A, B, X>,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let pairs = combine(a, b).to_stream();
  let transform = Arc::new(transform);
  ObservableCell::from_stream(pairs.filter_map(move |pair| {
    let transform = transform.clone();
    async move {
      let (a, b) = pair?;
      transform.apply(a, b).await
    }
  }))
}

/// [`combine_not_null`], with every pair handed to `transform`.
///
/// # Panics
///
/// Outside of a Tokio runtime, like [`tokio::spawn`].
pub fn combine_not_null_with<A, B, X>(
  a: &ObservableCell<A>,
  b: &ObservableCell<B>,
  transform: NotNullTransform<A, B, X>,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let pairs = combine_not_null(a, b).to_stream();
  let transform = Arc::new(transform);
  ObservableCell::from_stream(pairs.filter_map(move |pair| {
    let transform = transform.clone();
    async move {
      let (a, b) = pair?;
      transform.apply(a, b).await.map(Some)
    }
  }))
}
