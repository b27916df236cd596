use futures::{Stream, StreamExt};

use super::{CellItem, ObservableCell};
use crate::subscription::TaskSubscription;

impl<T: CellItem> ObservableCell<T> {
  /// A cell fed by `values` from a task on the current Tokio runtime.
  ///
  /// The task stops when the stream ends or when the cell is dropped.
  ///
  /// # Panics
  ///
  /// Outside of a Tokio runtime, like [`tokio::spawn`].
  pub fn from_stream(values: impl Stream<Item = Option<T>> + Send + 'static) -> Self {
    let cell = ObservableCell::new();
    let weak = cell.downgrade();
    let handle = tokio::spawn(async move {
      let mut values = Box::pin(values);
      while let Some(value) = values.next().await {
        match weak.upgrade() {
          Some(cell) => cell.set_value(value),
          None => break,
        }
      }
    });
    cell.own(TaskSubscription::new(handle.abort_handle()));
    cell
  }
}
