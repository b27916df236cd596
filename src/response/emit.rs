//! Response cells written from async code.

use std::future::Future;

use futures::{Stream, StreamExt};

use crate::{
  cell::{CellItem, ObservableCell, WeakCell},
  error::SharedError,
  result::{data_result_error, data_result_loading, data_result_success, DataResult, DataResultStatus},
  subscription::TaskSubscription,
};

/// Writes results into a cell made by
/// [`ResponseCell::build`](super::ResponseCell). Writes after the cell was
/// dropped are ignored.
#[derive(Clone)]
pub struct ResponseEmitter<T> {
  cell: WeakCell<DataResult<T>>,
}

impl<T: CellItem> ResponseEmitter<T> {
  pub fn emit(&self, value: Option<DataResult<T>>) {
    if let Some(cell) = self.cell.upgrade() {
      cell.set_value(value);
    }
  }

  pub fn emit_data(&self, data: T) { self.emit(Some(data_result_success(data))) }

  pub fn emit_loading(&self) { self.emit(Some(data_result_loading(None, None))) }

  pub fn emit_error(&self, error: SharedError) { self.emit(Some(data_result_error(error, None))) }

  pub fn latest_value(&self) -> Option<DataResult<T>> {
    self.cell.upgrade().and_then(|cell| cell.value())
  }

  pub fn latest_data(&self) -> Option<T> { self.latest_value().and_then(|r| r.data) }

  pub fn latest_status(&self) -> Option<DataResultStatus> { self.latest_value().map(|r| r.status) }

  pub fn latest_error(&self) -> Option<SharedError> { self.latest_value().and_then(|r| r.error) }
}

impl<T: CellItem> ObservableCell<DataResult<T>> {
  /// An uninitialized cell written by `block` from a task on the current
  /// Tokio runtime. The task is aborted when the cell is dropped.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn build<F, Fut>(block: F) -> Self
  where
    F: FnOnce(ResponseEmitter<T>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let cell = ObservableCell::new();
    let handle = tokio::spawn(block(ResponseEmitter { cell: cell.downgrade() }));
    cell.own(TaskSubscription::new(handle.abort_handle()));
    cell
  }

  /// A cell holding every result of `results` in turn.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn from_results(results: impl Stream<Item = DataResult<T>> + Send + 'static) -> Self {
    ObservableCell::from_stream(results.map(Some))
  }
}
