use std::ops::Deref;

use tracing::debug;

use super::ResponseCell;
use crate::{
  cell::{CellItem, ObservableCell},
  error::{BoxError, ObserveError, SharedError},
  rc::MutArc,
  result::{DataResult, DataResultStatus},
  scheduler::run_inline,
};

pub type ErrorTransformer = Box<dyn Fn(SharedError) -> SharedError + Send + Sync>;
pub type OnErrorReturn<T> = Box<dyn Fn(SharedError) -> T + Send + Sync>;

type Distinct<T> = fn(&Option<DataResult<T>>, &Option<DataResult<T>>) -> bool;

struct SwapState<T> {
  source: Option<usize>,
  distinct: Option<Distinct<T>>,
}

/// A response cell following one upstream response at a time.
///
/// Each upstream result goes through the transformation given with the
/// source before it is stored. Swapping in a new source stops following the
/// previous one.
pub struct SwapResponseCell<T> {
  cell: ResponseCell<T>,
  state: MutArc<SwapState<T>>,
}

impl<T> Clone for SwapResponseCell<T> {
  fn clone(&self) -> Self { SwapResponseCell { cell: self.cell.clone(), state: self.state.clone() } }
}

impl<T> Deref for SwapResponseCell<T> {
  type Target = ResponseCell<T>;

  fn deref(&self) -> &Self::Target { &self.cell }
}

impl<T: CellItem> Default for SwapResponseCell<T> {
  fn default() -> Self { Self::new() }
}

impl<T: CellItem> SwapResponseCell<T> {
  pub fn new() -> Self { Self::from_cell(ObservableCell::new()) }

  pub fn with_value(value: DataResult<T>) -> Self { Self::from_cell(ObservableCell::with_value(value)) }

  fn from_cell(cell: ResponseCell<T>) -> Self {
    SwapResponseCell { cell, state: MutArc::own(SwapState { source: None, distinct: None }) }
  }

  pub fn cell(&self) -> &ResponseCell<T> { &self.cell }

  pub fn into_cell(self) -> ResponseCell<T> { self.cell }

  pub fn has_data_source(&self) -> bool { self.state.rc_deref_mut().source.is_some() }

  /// No source to follow, or the last result is an error.
  pub fn needs_refresh(&self) -> bool {
    !self.has_data_source() || self.cell.status() == Some(DataResultStatus::Error)
  }

  /// Stop following the current source. The current value is kept.
  pub fn clear_source(&self) {
    let previous = self.state.rc_deref_mut().source.take();
    if let Some(id) = previous {
      self.cell.remove_source(id);
    }
  }

  /// Follow `source` as is. With `discard_after_loading`, the value is
  /// reset right after every result that is not loading.
  pub fn swap_source(&self, source: &ResponseCell<T>, discard_after_loading: bool) {
    self.execute_swap(source, discard_after_loading, Ok)
  }

  /// Follow `source`, storing `transformation` of each of its results.
  pub fn swap_source_with<R: CellItem>(
    &self,
    source: &ResponseCell<R>,
    transformation: impl Fn(DataResult<R>) -> Result<DataResult<T>, BoxError> + Send + 'static,
  ) {
    self.execute_swap(source, false, transformation)
  }

  /// Follow `source`, mapping data and errors separately.
  ///
  /// With `on_error_return`, a result without data gets its data from the
  /// error and an error status turns into a success.
  pub fn swap_source_mapped<R: CellItem>(
    &self,
    source: &ResponseCell<R>,
    data_transformer: impl Fn(R) -> Result<T, BoxError> + Send + 'static,
    error_transformer: Option<ErrorTransformer>,
    on_error_return: Option<OnErrorReturn<T>>,
  ) {
    self.execute_swap(source, false, move |result| {
      let error = match (&error_transformer, result.error) {
        (Some(transform), Some(error)) => Some(transform(error)),
        (_, error) => error,
      };
      let mut data = result.data.map(&data_transformer).transpose()?;
      let mut status = result.status;
      if let Some(fallback) = &on_error_return {
        if data.is_none() {
          data = error.clone().map(fallback);
        }
        if status == DataResultStatus::Error {
          status = DataResultStatus::Success;
        }
      }
      Ok(DataResult::new(data, error, status))
    })
  }

  fn execute_swap<R: CellItem>(
    &self,
    source: &ResponseCell<R>,
    discard_after_loading: bool,
    transformation: impl Fn(DataResult<R>) -> Result<DataResult<T>, BoxError> + Send + 'static,
  ) {
    self.clear_source();
    let state = self.state.clone();
    let id = self.cell.add_source(source, move |cell, result| {
      let next = result.map(|result| match run_inline(|| transformation(result)) {
        Ok(Ok(next)) => next,
        Ok(Err(err)) => swap_failure(SharedError::new(err)),
        Err(panic) => swap_failure(panic),
      });

      let distinct = state.rc_deref_mut().distinct;
      if let Some(same) = distinct {
        if same(&cell.value(), &next) {
          return;
        }
      }
      let loaded = next.as_ref().map_or(true, |r| !r.is_loading());
      cell.set_value(next);
      if discard_after_loading && loaded {
        cell.set_value(None);
      }
    });
    self.state.rc_deref_mut().source = Some(id);
  }
}

impl<T: CellItem + PartialEq> SwapResponseCell<T> {
  /// Skip results equal to the current value.
  pub fn notify_only_on_distinct(&self, enabled: bool) -> &Self {
    self.state.rc_deref_mut().distinct = enabled.then_some(same::<T> as Distinct<T>);
    self
  }
}

fn same<T: PartialEq>(a: &Option<DataResult<T>>, b: &Option<DataResult<T>>) -> bool { a == b }

fn swap_failure<T>(cause: SharedError) -> DataResult<T> {
  debug!(error = %cause, "swap source transformation failed");
  let error = ObserveError::Transformation {
    message: "error performing swap source, check the transformations",
    cause,
  };
  DataResult::new(None, Some(error.into()), DataResultStatus::Error)
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::{
    error::PanicError,
    result::{data_result_error, data_result_loading, data_result_success},
  };

  fn record<T: CellItem>(cell: &ObservableCell<T>) -> Arc<Mutex<Vec<Option<T>>>> {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    cell.own(cell.subscribe(move |v| c_seen.lock().unwrap().push(v)));
    seen
  }

  #[rxresult_macro::test]
  fn swapping_stops_the_previous_source() {
    let swap = SwapResponseCell::new();
    assert!(swap.needs_refresh());

    let first = ObservableCell::with_value(data_result_success(1));
    swap.swap_source(&first, false);
    assert!(swap.has_data_source());
    assert!(!swap.needs_refresh());
    assert_eq!(swap.data(), Some(1));

    let second = ObservableCell::with_value(data_result_loading(None, None));
    swap.swap_source(&second, false);
    assert!(!first.has_observers());
    first.set(data_result_success(10));
    assert_eq!(swap.status(), Some(DataResultStatus::Loading));

    second.set(data_result_error(SharedError::msg("down"), None));
    assert!(swap.needs_refresh());

    swap.clear_source();
    assert!(!swap.has_data_source());
    assert!(!second.has_observers());
    assert_eq!(swap.status(), Some(DataResultStatus::Error));
  }

  #[rxresult_macro::test]
  fn discard_after_loading() {
    let source = ObservableCell::with_value(data_result_loading(None, None));
    let swap = SwapResponseCell::new();
    let seen = record(swap.cell());
    swap.swap_source(&source, true);
    source.set(data_result_success(1));

    assert_eq!(
      *seen.lock().unwrap(),
      vec![Some(data_result_loading(None, None)), Some(data_result_success(1)), None]
    );
  }

  #[rxresult_macro::test]
  fn failing_transformations_post_an_error() {
    let source = ObservableCell::with_value(data_result_success(2));
    let swap = SwapResponseCell::<i32>::new();
    swap.swap_source_with(&source, |result: DataResult<i32>| {
      if result.data == Some(0) {
        return Err("zero".into());
      }
      Ok(result.map(|d| 10 / d))
    });
    assert_eq!(swap.data(), Some(5));

    source.set(data_result_success(0));
    let error = swap.error().unwrap();
    assert_eq!(swap.status(), Some(DataResultStatus::Error));
    assert!(swap.data().is_none());
    let error = error.downcast_ref::<ObserveError>().unwrap();
    assert_eq!(error.cause().map(|c| c.to_string()), Some("zero".to_string()));

    swap.swap_source_with(&source, |_: DataResult<i32>| -> Result<DataResult<i32>, BoxError> {
      panic!("broken")
    });
    let error = swap.error().unwrap();
    let cause = error.downcast_ref::<ObserveError>().and_then(ObserveError::cause).unwrap();
    assert!(cause.is::<PanicError>());
  }

  #[rxresult_macro::test]
  fn mapped_with_fallback() {
    let source = ObservableCell::with_value(data_result_success(2));
    let swap = SwapResponseCell::new();
    swap.swap_source_mapped(
      &source,
      |d: i32| Ok(d.to_string()),
      Some(Box::new(|e: SharedError| SharedError::msg(format!("wrapped {e}")))),
      Some(Box::new(|e: SharedError| format!("fallback after {e}"))),
    );
    assert_eq!(swap.data(), Some("2".to_string()));

    source.set(data_result_error(SharedError::msg("down"), None));
    assert_eq!(swap.status(), Some(DataResultStatus::Success));
    assert_eq!(swap.data(), Some("fallback after wrapped down".to_string()));
    assert_eq!(swap.error().map(|e| e.to_string()), Some("wrapped down".to_string()));
  }

  #[rxresult_macro::test]
  fn mapped_without_fallback_keeps_the_error() {
    let source = ObservableCell::with_value(data_result_error(SharedError::msg("down"), 1));
    let swap = SwapResponseCell::new();
    swap.swap_source_mapped(&source, |d: i32| Ok(d * 2), None, None);
    assert_eq!(swap.status(), Some(DataResultStatus::Error));
    assert_eq!(swap.data(), Some(2));
    assert_eq!(swap.error().map(|e| e.to_string()), Some("down".to_string()));
  }

  #[rxresult_macro::test]
  fn distinct_results_only() {
    let source = ObservableCell::with_value(data_result_success(1));
    let swap = SwapResponseCell::new();
    swap.notify_only_on_distinct(true);
    let seen = record(swap.cell());
    swap.swap_source(&source, false);

    source.set(data_result_success(1));
    source.set(data_result_success(2));
    assert_eq!(*seen.lock().unwrap(), vec![Some(data_result_success(1)), Some(data_result_success(2))]);

    swap.notify_only_on_distinct(false);
    source.set(data_result_success(2));
    assert_eq!(seen.lock().unwrap().len(), 3);
  }
}
