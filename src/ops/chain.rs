//! Chaining a secondary cell off a primary one.
//!
//! Every primary value decides, through `condition`, whether a secondary
//! cell should be followed and asks `other` for it. The previous secondary
//! is always dropped before the new one is followed, so pairs never mix a
//! primary value with a stale secondary.
//!
//! Behavior summary:
//! - A secondary that is not initialized yet produces `(a, None)` first.
//! - A rejected primary value, a failing `condition` or a failing `other`
//!   stops following any secondary and emits nothing.
//! - The `_async` variants run on Tokio and transform each pair. A new
//!   primary value aborts the secondary task along with a transformation it
//!   may still be running.
//!
//! Example:
//!
//! ```
//! use rxresult::prelude::*;
//!
//! let user = ObservableCell::with_value(1u32);
//! let posts = chain_with(
//!   &user,
//!   |id| Ok(ObservableCell::with_value(id.unwrap_or_default() * 100)),
//!   |id| id.is_some(),
//! );
//! assert_eq!(posts.value(), Some((Some(1), Some(100))));
//!
//! user.set(2);
//! assert_eq!(posts.value(), Some((Some(2), Some(200))));
//! ```

use std::sync::Arc;

use futures::{future::BoxFuture, StreamExt};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{
  guarded,
  pair::only_with_values,
  transform::{NotNullTransform, NullableTransform},
};
use crate::{
  cell::{CellItem, ObservableCell, WeakCell},
  error::BoxError,
  subscription::TaskSubscription,
};

/// The secondary cell a primary value wants to follow, or `None` when it
/// should not follow any.
fn secondary_for<A, B>(
  a: &Option<A>,
  other: &impl Fn(Option<A>) -> Result<ObservableCell<B>, BoxError>,
  condition: &impl Fn(Option<&A>) -> bool,
) -> Option<ObservableCell<B>>
where
  A: Clone,
{
  if !guarded(|| condition(a.as_ref())).unwrap_or(false) {
    return None;
  }
  match guarded(|| other(a.clone())) {
    Some(Ok(secondary)) => Some(secondary),
    Some(Err(err)) => {
      debug!(error = %err, "secondary source not created");
      None
    }
    None => {
      debug!("secondary source factory panicked");
      None
    }
  }
}

/// A mediator following the secondary of the latest primary value, storing
/// `select` over each pair.
pub(crate) fn chain_by<A, B, X>(
  source: &ObservableCell<A>,
  other: impl Fn(Option<A>) -> Result<ObservableCell<B>, BoxError> + Send + 'static,
  condition: impl Fn(Option<&A>) -> bool + Send + 'static,
  select: impl Fn(Option<A>, Option<B>) -> Option<X> + Send + Sync + 'static,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let mediator = ObservableCell::new();
  let select = Arc::new(select);
  let mut current: Option<usize> = None;
  mediator.add_source(source, move |cell, a: Option<A>| {
    if let Some(id) = current.take() {
      cell.remove_source(id);
    }
    let Some(secondary) = secondary_for(&a, &other, &condition) else {
      return;
    };

    if !secondary.is_initialized() {
      if let Some(value) = select(a.clone(), None) {
        cell.set(value);
      }
    }
    let select = select.clone();
    current = Some(cell.add_source(&secondary, move |cell, b| {
      if let Some(value) = select(a.clone(), b) {
        cell.set(value);
      }
    }));
  });
  mediator
}

/// Pairs of the latest primary value and the latest value of the secondary
/// it chained to.
pub fn chain_with<A, B>(
  source: &ObservableCell<A>,
  other: impl Fn(Option<A>) -> Result<ObservableCell<B>, BoxError> + Send + 'static,
  condition: impl Fn(Option<&A>) -> bool + Send + 'static,
) -> ObservableCell<(Option<A>, Option<B>)>
where
  A: CellItem,
  B: CellItem,
{
  chain_by(source, other, condition, |a, b| Some((a, b)))
}

/// [`chain_with`] over present values only: absent primary values follow
/// nothing and only complete pairs are emitted.
pub fn chain_not_null_with<A, B>(
  source: &ObservableCell<A>,
  other: impl Fn(A) -> Result<ObservableCell<B>, BoxError> + Send + 'static,
  condition: impl Fn(&A) -> bool + Send + 'static,
) -> ObservableCell<(A, B)>
where
  A: CellItem,
  B: CellItem,
{
  chain_by(
    source,
    move |a| match a {
      Some(a) => other(a),
      None => Err("no data to chain from".into()),
    },
    move |a| a.map_or(false, |a| condition(a)),
    |a, b| only_with_values((a, b)),
  )
}

// ============================ Async ============================

type Stage<P, X> = Arc<dyn Fn(P) -> BoxFuture<'static, Option<Option<X>>> + Send + Sync>;

/// Aborts the task following a secondary when dropped.
struct SecondaryTask(JoinHandle<()>);

impl Drop for SecondaryTask {
  fn drop(&mut self) { self.0.abort(); }
}

/// Store the outcome of `stage` in `output`. Returns `false` once the
/// output is gone.
async fn forward<P, X: CellItem>(output: &WeakCell<X>, stage: &Stage<P, X>, pair: P) -> bool {
  let Some(value) = stage(pair).await else {
    return output.upgrade().is_some();
  };
  match output.upgrade() {
    Some(cell) => {
      cell.set_value(value);
      true
    }
    None => false,
  }
}

fn spawn_chain<A, B, P, X>(
  source: &ObservableCell<A>,
  other: impl Fn(Option<A>) -> Result<ObservableCell<B>, BoxError> + Send + Sync + 'static,
  condition: impl Fn(Option<&A>) -> bool + Send + Sync + 'static,
  select: impl Fn(Option<A>, Option<B>) -> Option<P> + Send + Sync + 'static,
  stage: Stage<P, X>,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  P: Send + 'static,
  X: CellItem,
{
  let output = ObservableCell::new();
  let weak = output.downgrade();
  let select = Arc::new(select);
  let mut primary = source.to_stream();

  let driver = tokio::spawn(async move {
    let mut following: Option<SecondaryTask> = None;
    while let Some(a) = primary.next().await {
      drop(following.take());
      let Some(secondary) = secondary_for(&a, &other, &condition) else {
        continue;
      };

      let first = if secondary.is_initialized() { None } else { select(a.clone(), None) };
      let mut values = secondary.to_stream();
      let (select, stage, weak) = (select.clone(), stage.clone(), weak.clone());
      let task = tokio::spawn(async move {
        if let Some(pair) = first {
          if !forward(&weak, &stage, pair).await {
            return;
          }
        }
        while let Some(b) = values.next().await {
          if let Some(pair) = select(a.clone(), b) {
            if !forward(&weak, &stage, pair).await {
              return;
            }
          }
        }
      });
      following = Some(SecondaryTask(task));
    }
  });
  output.own(TaskSubscription::new(driver.abort_handle()));
  output
}

/// [`chain_with`], with every pair handed to `transform` on its dispatcher.
///
/// # Panics
///
/// Outside of a Tokio runtime, like [`tokio::spawn`].
pub fn chain_with_async<A, B, X>(
  source: &ObservableCell<A>,
  other: impl Fn(Option<A>) -> Result<ObservableCell<B>, BoxError> + Send + Sync + 'static,
  condition: impl Fn(Option<&A>) -> bool + Send + Sync + 'static,
  transform: NullableTransform<A, B, X>,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let transform = Arc::new(transform);
  let stage: Stage<(Option<A>, Option<B>), X> = Arc::new(move |(a, b)| {
    let transform = transform.clone();
    Box::pin(async move { transform.apply(a, b).await })
  });
  spawn_chain(source, other, condition, |a, b| Some((a, b)), stage)
}

/// [`chain_not_null_with`], with every pair handed to `transform`.
///
/// # Panics
///
/// Outside of a Tokio runtime, like [`tokio::spawn`].
pub fn chain_not_null_with_async<A, B, X>(
  source: &ObservableCell<A>,
  other: impl Fn(A) -> Result<ObservableCell<B>, BoxError> + Send + Sync + 'static,
  condition: impl Fn(&A) -> bool + Send + Sync + 'static,
  transform: NotNullTransform<A, B, X>,
) -> ObservableCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let transform = Arc::new(transform);
  let stage: Stage<(A, B), X> = Arc::new(move |(a, b)| {
    let transform = transform.clone();
    Box::pin(async move { transform.apply(a, b).await.map(Some) })
  });
  spawn_chain(
    source,
    move |a| match a {
      Some(a) => other(a),
      None => Err("no data to chain from".into()),
    },
    move |a| a.map_or(false, |a| condition(a)),
    |a, b| only_with_values((a, b)),
    stage,
  )
}
