//! Cells of [`DataResult`]s.
//!
//! A [`ResponseCell`] is a plain [`ObservableCell`] holding results, with
//! setters for each status, observation through an [`ObserveWrapper`] and
//! operators that keep the tri-state of the results they combine.

use std::sync::Arc;

use futures::StreamExt;

use crate::{
  cell::{CellItem, ObservableCell},
  error::{BoxError, SharedError},
  ops::{chain::chain_by, combine::combine_by, merge::merge_with, transform::ResponseTransform},
  result::{
    data_result_error, data_result_loading, data_result_none, data_result_success, merge,
    merge_not_null, DataResult, DataResultStatus,
  },
  wrapper::{Attachment, ObserveWrapper},
};

mod emit;
mod swap;
pub use emit::ResponseEmitter;
pub use swap::{ErrorTransformer, OnErrorReturn, SwapResponseCell};

pub type ResponseCell<T> = ObservableCell<DataResult<T>>;

/// Every result of `pairs` handed to `transform`, one at a time and in
/// order, from a task on the current Tokio runtime.
fn transformed<A, B, X>(
  pairs: &ResponseCell<(A, B)>,
  transform: ResponseTransform<A, B, X>,
) -> ResponseCell<X>
where
  A: CellItem,
  B: CellItem,
  X: CellItem,
{
  let transform = Arc::new(transform);
  ObservableCell::from_stream(pairs.to_stream().filter_map(move |result| {
    let transform = transform.clone();
    async move { transform.apply(result?).await.map(Some) }
  }))
}

impl<T: CellItem> ObservableCell<DataResult<T>> {
  /// A response cell starting at [`data_result_none`].
  pub fn new_response() -> Self { Self::with_value(data_result_none()) }

  pub fn set_loading(&self) { self.set(data_result_loading(None, None)) }

  pub fn set_loading_with(&self, data: T) { self.set(data_result_loading(data, None)) }

  pub fn set_error(&self, error: SharedError) { self.set(data_result_error(error, None)) }

  /// An error result that keeps `data`.
  pub fn set_error_with(&self, error: SharedError, data: T) {
    self.set(data_result_error(error, data))
  }

  pub fn set_data(&self, data: T) { self.set(data_result_success(data)) }

  pub fn set_success(&self) { self.set(data_result_success(None)) }

  pub fn set_none(&self) { self.set(data_result_none()) }

  pub fn data(&self) -> Option<T> { self.value().and_then(|r| r.data) }

  pub fn status(&self) -> Option<DataResultStatus> { self.value().map(|r| r.status) }

  pub fn error(&self) -> Option<SharedError> { self.value().and_then(|r| r.error) }

  /// Configure a wrapper and attach it to this cell.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, unless the wrapper was given one.
  pub fn observe(&self, config: impl FnOnce(&mut ObserveWrapper<T>)) -> Attachment {
    let mut wrapper = ObserveWrapper::new();
    config(&mut wrapper);
    wrapper.attach_to(self)
  }

  // ============================ Mapping ============================

  pub fn transform<R: CellItem>(
    &self,
    transformation: impl Fn(DataResult<T>) -> Result<DataResult<R>, BoxError> + Send + 'static,
  ) -> ResponseCell<R> {
    let swap = SwapResponseCell::new();
    swap.swap_source_with(self, transformation);
    swap.into_cell()
  }

  /// Map the data of every result. A failing `f` turns the result into a
  /// transformation error.
  pub fn map<R: CellItem>(
    &self,
    f: impl Fn(T) -> Result<R, BoxError> + Send + 'static,
  ) -> ResponseCell<R> {
    let swap = SwapResponseCell::new();
    swap.swap_source_mapped(self, f, None, None);
    swap.into_cell()
  }

  pub fn map_error(
    &self,
    f: impl Fn(SharedError) -> SharedError + Send + Sync + 'static,
  ) -> ResponseCell<T> {
    let swap = SwapResponseCell::new();
    swap.swap_source_mapped(self, Ok, Some(Box::new(f)), None);
    swap.into_cell()
  }

  /// Recover every error into data. Error results become successes.
  pub fn on_error_return(
    &self,
    f: impl Fn(SharedError) -> T + Send + Sync + 'static,
  ) -> ResponseCell<T> {
    let swap = SwapResponseCell::new();
    swap.swap_source_mapped(self, Ok, None, Some(Box::new(f)));
    swap.into_cell()
  }

  /// Peek at the data of every result before later observers see it.
  pub fn on_next(&self, f: impl Fn(&T) + Send + 'static) -> ResponseCell<T> {
    self.map(move |data| {
      f(&data);
      Ok(data)
    })
  }

  /// Peek at the error of every result before later observers see it.
  pub fn on_error(&self, f: impl Fn(&SharedError) + Send + Sync + 'static) -> ResponseCell<T> {
    self.map_error(move |error| {
      f(&error);
      error
    })
  }

  // ============================ Combining ============================

  /// The merge of the latest results of both cells.
  pub fn combine<R: CellItem>(
    &self,
    other: &ResponseCell<R>,
  ) -> ResponseCell<(Option<T>, Option<R>)> {
    combine_by(self, other, |a, b| Some(merge(a, b)))
  }

  /// Like [`combine`](Self::combine), keeping data only when both sides
  /// have it.
  pub fn combine_not_null<R: CellItem>(&self, other: &ResponseCell<R>) -> ResponseCell<(T, R)> {
    combine_by(self, other, |a, b| Some(merge_not_null(a, b)))
  }

  /// Combine with a plain cell, whose values count as successes.
  pub fn combine_cell<R: CellItem>(
    &self,
    other: &ObservableCell<R>,
  ) -> ResponseCell<(Option<T>, Option<R>)> {
    combine_by(self, other, |a, b: Option<R>| {
      Some(merge(a, b.map(|b| DataResult::new(Some(b), None, DataResultStatus::Success))))
    })
  }

  /// Chain a secondary response off every result of this one and merge
  /// the two. A result that does not meet `condition` drops the secondary
  /// and emits nothing.
  pub fn chain_with<R: CellItem>(
    &self,
    other: impl Fn(Option<DataResult<T>>) -> Result<ResponseCell<R>, BoxError> + Send + 'static,
    condition: impl Fn(Option<&DataResult<T>>) -> bool + Send + 'static,
  ) -> ResponseCell<(Option<T>, Option<R>)> {
    chain_by(self, other, condition, |a, b| Some(merge(a, b)))
  }

  /// Like [`chain_with`](Self::chain_with), over present results only and
  /// keeping data only when both sides have it.
  pub fn chain_not_null_with<R: CellItem>(
    &self,
    other: impl Fn(DataResult<T>) -> Result<ResponseCell<R>, BoxError> + Send + 'static,
    condition: impl Fn(&DataResult<T>) -> bool + Send + 'static,
  ) -> ResponseCell<(T, R)> {
    chain_by(
      self,
      move |a| match a {
        Some(a) => other(a),
        None => Err("no result to chain from".into()),
      },
      move |a| a.map_or(false, |a| condition(a)),
      |a, b| Some(merge_not_null(a, b)),
    )
  }

  // ============================ Async ============================

  /// [`combine`](Self::combine), with every merged result handed to
  /// `transform` on its dispatcher.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn combine_with<R: CellItem, X: CellItem>(
    &self,
    other: &ResponseCell<R>,
    transform: ResponseTransform<Option<T>, Option<R>, X>,
  ) -> ResponseCell<X> {
    transformed(&self.combine(other), transform)
  }

  /// [`combine_not_null`](Self::combine_not_null), with every merged result
  /// handed to `transform`.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn combine_not_null_with<R: CellItem, X: CellItem>(
    &self,
    other: &ResponseCell<R>,
    transform: ResponseTransform<T, R, X>,
  ) -> ResponseCell<X> {
    transformed(&self.combine_not_null(other), transform)
  }

  /// [`chain_with`](Self::chain_with), with every merged result handed to
  /// `transform`. Results are transformed in the order the chain produced
  /// them.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn chain_with_async<R: CellItem, X: CellItem>(
    &self,
    other: impl Fn(Option<DataResult<T>>) -> Result<ResponseCell<R>, BoxError> + Send + 'static,
    condition: impl Fn(Option<&DataResult<T>>) -> bool + Send + 'static,
    transform: ResponseTransform<Option<T>, Option<R>, X>,
  ) -> ResponseCell<X> {
    transformed(&self.chain_with(other, condition), transform)
  }

  /// [`chain_not_null_with`](Self::chain_not_null_with), with every merged
  /// result handed to `transform`.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn chain_not_null_with_async<R: CellItem, X: CellItem>(
    &self,
    other: impl Fn(DataResult<T>) -> Result<ResponseCell<R>, BoxError> + Send + 'static,
    condition: impl Fn(&DataResult<T>) -> bool + Send + 'static,
    transform: ResponseTransform<T, R, X>,
  ) -> ResponseCell<X> {
    transformed(&self.chain_not_null_with(other, condition), transform)
  }

  pub fn merge_with<R: CellItem + PartialEq>(&self, other: &ResponseCell<R>) -> ResponseCell<(T, R)>
  where
    T: PartialEq,
  {
    merge_with(self, other)
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Mutex, time::Duration};

  use super::*;
  use crate::{
    cell::CellStream, error::ObserveError, result::data_result_loading, scheduler::Dispatcher,
  };

  async fn next_result<T>(values: &mut CellStream<DataResult<T>>) -> Option<DataResult<T>> {
    tokio::time::timeout(Duration::from_secs(1), values.next())
      .await
      .ok()
      .flatten()
      .flatten()
  }

  #[rxresult_macro::test]
  fn setters_and_getters() {
    let cell = ResponseCell::new_response();
    assert_eq!(cell.status(), Some(DataResultStatus::None));

    cell.set_loading_with(1);
    assert_eq!(cell.status(), Some(DataResultStatus::Loading));
    assert_eq!(cell.data(), Some(1));

    let err = SharedError::msg("down");
    cell.set_error(err.clone());
    assert_eq!(cell.error(), Some(err.clone()));
    assert_eq!(cell.data(), None);

    cell.set_error_with(err.clone(), 3);
    assert_eq!(cell.value(), Some(data_result_error(err, 3)));

    cell.set_data(2);
    assert_eq!(cell.value(), Some(data_result_success(2)));
    cell.set_success();
    assert_eq!(cell.value(), Some(data_result_success(None)));
    cell.set_loading();
    assert_eq!(cell.value(), Some(data_result_loading(None, None)));
    cell.set_none();
    assert_eq!(cell.value(), Some(data_result_none()));
  }

  #[rxresult_macro::test]
  fn map_and_peek() {
    let source = ResponseCell::new_response();
    let peeked = Arc::new(Mutex::new(vec![]));
    let c_peeked = peeked.clone();
    let mapped = source
      .on_next(move |d: &i32| c_peeked.lock().unwrap().push(*d))
      .map(|d| if d < 0 { Err("negative".into()) } else { Ok(d * 2) });

    source.set_data(2);
    assert_eq!(mapped.data(), Some(4));
    source.set_data(-1);
    assert_eq!(mapped.status(), Some(DataResultStatus::Error));
    assert!(mapped.error().unwrap().is::<ObserveError>());
    assert_eq!(*peeked.lock().unwrap(), vec![2, -1]);
  }

  #[rxresult_macro::test]
  fn error_helpers() {
    let source = ResponseCell::<i32>::new_response();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let renamed = source
      .on_error(move |e| c_seen.lock().unwrap().push(e.to_string()))
      .map_error(|e| SharedError::msg(format!("request failed: {e}")));
    let recovered = renamed.on_error_return(|_| -1);

    source.set_error(SharedError::msg("timeout"));
    assert_eq!(renamed.error().map(|e| e.to_string()), Some("request failed: timeout".into()));
    assert_eq!(renamed.status(), Some(DataResultStatus::Error));
    assert_eq!(recovered.status(), Some(DataResultStatus::Success));
    assert_eq!(recovered.data(), Some(-1));
    assert_eq!(*seen.lock().unwrap(), vec!["timeout".to_string()]);
  }

  #[rxresult_macro::test]
  fn transform_whole_results() {
    let source = ResponseCell::new_response();
    let lengths = source.transform(|r: DataResult<String>| Ok(r.map(|s| s.len())));
    source.set_data("four".to_string());
    assert_eq!(lengths.data(), Some(4));
  }

  #[rxresult_macro::test]
  fn combine_merges_results() {
    let user = ResponseCell::new_response();
    let posts = ResponseCell::new_response();
    let both = user.combine(&posts);
    let complete = user.combine_not_null(&posts);

    user.set_data("ana");
    posts.set_loading();
    assert_eq!(both.status(), Some(DataResultStatus::Success));
    assert_eq!(both.data(), Some((Some("ana"), None)));
    assert_eq!(complete.data(), None);

    posts.set_data(3);
    assert_eq!(complete.data(), Some(("ana", 3)));

    let page = ObservableCell::with_value(7);
    let with_page = user.combine_cell(&page);
    assert_eq!(with_page.value(), Some(data_result_success((Some("ana"), Some(7)))));
  }

  #[rxresult_macro::test]
  fn chain_ignores_rejected_results() {
    let user = ResponseCell::<u32>::new_response();
    let chained = user.chain_with(
      |r| Ok(ObservableCell::with_value(data_result_success(r.and_then(|r| r.data).unwrap_or(0) * 10))),
      |r| r.map_or(false, |r| r.is_success()),
    );
    assert!(!chained.is_initialized());

    user.set_loading();
    assert!(!chained.is_initialized());
    user.set_data(2);
    assert_eq!(chained.data(), Some((Some(2), Some(20))));

    user.set_error(SharedError::msg("gone"));
    assert_eq!(chained.status(), Some(DataResultStatus::Success));
    assert_eq!(chained.data(), Some((Some(2), Some(20))));
  }

  #[rxresult_macro::test]
  fn chain_not_null_needs_both_payloads() {
    let user = ResponseCell::<u32>::new_response();
    let pending = ResponseCell::<u32>::new();
    let c_pending = pending.clone();
    let chained = user.chain_not_null_with(move |_| Ok(c_pending.clone()), |r| r.has_data());

    user.set_data(1);
    assert_eq!(chained.status(), Some(DataResultStatus::Success));
    assert_eq!(chained.data(), None);

    pending.set_data(5);
    assert_eq!(chained.data(), Some((1, 5)));
  }

  #[rxresult_macro::test]
  async fn observe_attaches_a_wrapper() {
    let cell = ResponseCell::new_response();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let attachment = cell.observe(move |w| {
      w.data(move |d: i32| c_seen.lock().unwrap().push(d)).single();
    });

    cell.set_data(1);
    attachment.join().await.unwrap();
    cell.set_data(2);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
  }

  #[rxresult_macro::test]
  async fn combine_with_reports_failures_as_errors() {
    let user = ResponseCell::new_response();
    let posts = ResponseCell::new_response();
    user.set_data("ana".to_string());
    posts.set_data(0u32);
    let summary = user.combine_not_null_with(
      &posts,
      ResponseTransform::status_fail(|r: DataResult<(String, u32)>| match r.data {
        Some((name, n)) if n > 0 => Ok(data_result_success(format!("{name}: {n}"))),
        _ => Err("no posts".into()),
      })
      .on(Dispatcher::Inline),
    );
    let mut values = summary.to_stream();

    let first = next_result(&mut values).await.unwrap();
    assert_eq!(first.status, DataResultStatus::Error);
    assert_eq!(first.error.map(|e| e.to_string()), Some("no posts".to_string()));

    posts.set_data(2);
    assert_eq!(next_result(&mut values).await, Some(data_result_success("ana: 2".to_string())));
  }

  #[rxresult_macro::test]
  async fn combine_with_omits_failures() {
    let user = ResponseCell::new_response();
    let posts = ResponseCell::<u32>::new_response();
    user.set_data("ana");
    let counts = user.combine_with(
      &posts,
      ResponseTransform::omit_fail(|r: DataResult<(Option<&str>, Option<u32>)>| {
        let count = r.data.and_then(|(_, n)| n).ok_or("no posts yet")?;
        Ok(data_result_success(count))
      })
      .on(Dispatcher::Inline),
    );
    let mut values = counts.to_stream();

    posts.set_data(3);
    assert_eq!(next_result(&mut values).await, Some(data_result_success(3)));
  }

  #[rxresult_macro::test]
  async fn chain_async_falls_back() {
    let user = ResponseCell::<u32>::new_response();
    user.set_data(2);
    let totals = user.chain_not_null_with_async(
      |r| Ok(ObservableCell::with_value(data_result_success(r.data.unwrap_or_default() * 10))),
      |r| r.has_data(),
      ResponseTransform::fallback(
        |r: DataResult<(u32, u32)>| {
          let (a, b) = r.data.ok_or("incomplete")?;
          if b > 100 {
            Err("too big".into())
          } else {
            Ok(data_result_success(a + b))
          }
        },
        |_| data_result_success(0),
      )
      .on(Dispatcher::Inline),
    );
    let mut values = totals.to_stream();
    assert_eq!(next_result(&mut values).await, Some(data_result_success(22)));

    user.set_data(20);
    assert_eq!(next_result(&mut values).await, Some(data_result_success(0)));
  }

  #[rxresult_macro::test]
  async fn chain_async_over_nullable_pairs() {
    let user = ResponseCell::<u32>::new_response();
    let pending = ResponseCell::<u32>::new();
    let c_pending = pending.clone();
    let labels = user.chain_with_async(
      move |_| Ok(c_pending.clone()),
      |r| r.map_or(false, |r| r.has_data()),
      ResponseTransform::status_fail(|r: DataResult<(Option<u32>, Option<u32>)>| {
        Ok(r.map(|(a, b)| format!("{:?}/{:?}", a, b)))
      })
      .on(Dispatcher::Inline),
    );
    let mut values = labels.to_stream();

    user.set_data(1);
    let first = next_result(&mut values).await.unwrap();
    assert_eq!(first.data, Some("Some(1)/None".to_string()));

    pending.set_data(5);
    let second = next_result(&mut values).await.unwrap();
    assert_eq!(second.data, Some("Some(1)/Some(5)".to_string()));
  }
}
