use std::{
  any::Any,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use futures::{channel::mpsc, stream, Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{log_fatal, ObserveWrapper};
use crate::{
  cell::{CellItem, ObservableCell},
  error::ObserveError,
  result::DataResult,
  subscription::{BoxedSubscriptionSend, Subscription},
};

/// A wrapper observing a source from a spawned task.
///
/// Results are dispatched one at a time in the order the source produced
/// them. The task ends when the source ends, when every event was consumed
/// by single-shot handling, when it is detached, or on a failure the wrapper
/// could not recover from.
///
/// An observed cell is kept alive by the attachment, not by its task.
/// Dropping the attachment lets the task run for as long as someone else
/// still holds the cell; once the cell is gone the task ends on its own.
///
/// A failure the wrapper could not recover from does not bring the process
/// down. It is logged at `error` level and ends the task, and
/// [`join`](Attachment::join) returns it, so a caller that wants to crash
/// on unhandled failures does so on the result of `join`.
pub struct Attachment {
  active: Arc<AtomicBool>,
  handle: JoinHandle<Result<(), ObserveError>>,
  keep_alive: Option<Box<dyn Any + Send + Sync>>,
}

impl Attachment {
  /// Stop dispatching. A result already being dispatched is not
  /// interrupted before its next observer.
  pub fn detach(&self) {
    self.active.store(false, Ordering::Release);
    self.handle.abort();
  }

  pub fn is_attached(&self) -> bool {
    self.active.load(Ordering::Acquire) && !self.handle.is_finished()
  }

  /// Wait for the task to end and report how it ended. A detached
  /// attachment ends with `Ok`.
  pub async fn join(self) -> Result<(), ObserveError> {
    let Attachment { handle, keep_alive, .. } = self;
    let outcome = handle.await;
    drop(keep_alive);
    match outcome {
      Ok(outcome) => outcome,
      Err(err) if err.is_cancelled() => Ok(()),
      Err(err) => Err(ObserveError::Detached(err.to_string())),
    }
  }
}

impl Subscription for Attachment {
  fn unsubscribe(self) { self.detach() }

  fn is_closed(&self) -> bool { !self.is_attached() }
}

/// Unsubscribes the source however the task ends, abort included.
struct SourceGuard(Option<BoxedSubscriptionSend>);

impl Drop for SourceGuard {
  fn drop(&mut self) {
    if let Some(subscription) = self.0.take() {
      subscription.unsubscribe();
    }
  }
}

impl<T: CellItem> ObserveWrapper<T> {
  /// Observe a response cell until detached or until no event is left.
  pub fn attach_to(self, cell: &ObservableCell<DataResult<T>>) -> Attachment {
    let (tx, rx) = mpsc::unbounded();
    let subscription = cell.subscribe(move |value| {
      let _ = tx.unbounded_send(value);
    });
    let mut attachment = self.spawn_driver(rx, Some(BoxedSubscriptionSend::new(subscription)));
    attachment.keep_alive = Some(Box::new(cell.clone()));
    attachment
  }

  /// Observe every result of `results`.
  pub fn attach_to_stream(
    self,
    results: impl Stream<Item = DataResult<T>> + Send + 'static,
  ) -> Attachment {
    self.spawn_driver(results.map(Some), None)
  }

  /// Dispatch a single result from a spawned task.
  pub fn attach_to_result(self, result: DataResult<T>) -> Attachment {
    self.attach_to_stream(stream::once(async move { result }))
  }

  fn spawn_driver(
    mut self,
    values: impl Stream<Item = Option<DataResult<T>>> + Send + 'static,
    source: Option<BoxedSubscriptionSend>,
  ) -> Attachment {
    let active = Arc::new(AtomicBool::new(true));
    let c_active = active.clone();
    let runtime = self.runtime.clone();

    let task = async move {
      let _source = SourceGuard(source);
      let gate = move || c_active.load(Ordering::Acquire);
      let mut values = Box::pin(values);
      while let Some(value) = values.next().await {
        if !gate() {
          break;
        }
        if let Some(result) = value {
          if let Err(err) = self.dispatch_gated(&result, &gate).await {
            log_fatal(&err);
            return Err(err);
          }
        }
        if self.is_empty() {
          debug!("every event consumed, detaching");
          break;
        }
      }
      Ok(())
    };

    let handle = match runtime {
      Some(runtime) => runtime.spawn(task),
      None => tokio::spawn(task),
    };
    debug!("observer attached");
    Attachment { active, handle, keep_alive: None }
  }
}
