use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{channel::mpsc, Stream};
use pin_project_lite::pin_project;

use super::{CellItem, CellSubscription, ObservableCell};
use crate::subscription::Subscription;

pin_project! {
  /// The values of a cell as a [`Stream`], starting with the current one.
  ///
  /// The stream keeps its cell alive and never ends on its own; dropping it
  /// unsubscribes.
  pub struct CellStream<T> {
    #[pin]
    receiver: mpsc::UnboundedReceiver<Option<T>>,
    guard: StreamGuard,
    cell: ObservableCell<T>,
  }
}

struct StreamGuard(Option<CellSubscription>);

impl Drop for StreamGuard {
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe();
    }
  }
}

impl<T> CellStream<T> {
  pub fn cell(&self) -> &ObservableCell<T> { &self.cell }
}

impl<T> Stream for CellStream<T> {
  type Item = Option<T>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.project().receiver.poll_next(cx)
  }
}

impl<T: CellItem> ObservableCell<T> {
  pub fn to_stream(&self) -> CellStream<T> {
    let (tx, receiver) = mpsc::unbounded();
    let subscription = self.subscribe(move |value| {
      let _ = tx.unbounded_send(value);
    });
    CellStream { receiver, guard: StreamGuard(Some(subscription)), cell: self.clone() }
  }
}

#[cfg(test)]
mod tests {
  use futures::StreamExt;

  use super::*;

  #[rxresult_macro::test]
  async fn streams_current_and_later_values() {
    let cell = ObservableCell::with_value(1);
    let mut values = cell.to_stream();
    cell.set(2);
    cell.set_value(None);

    assert_eq!(values.next().await, Some(Some(1)));
    assert_eq!(values.next().await, Some(Some(2)));
    assert_eq!(values.next().await, Some(None));
  }

  #[rxresult_macro::test]
  fn dropping_unsubscribes() {
    let cell = ObservableCell::with_value(1);
    let values = cell.to_stream();
    assert!(cell.has_observers());
    assert!(values.cell().ptr_eq(&cell));

    drop(values);
    assert!(!cell.has_observers());
  }
}
