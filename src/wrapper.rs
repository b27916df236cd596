//! Declarative multi-event observation of [`DataResult`]s.
//!
//! An [`ObserveWrapper`] collects events, each a callback with a filter, and
//! offers every incoming result to all of them in registration order:
//!
//! ```rust
//! use rxresult::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let outcome = data_result_success(vec![1, 2, 3])
//!   .unwrap(|w| {
//!     w.show_loading(|| println!("spinner on"))
//!       .hide_loading(|| println!("spinner off"))
//!       .data(|items| println!("got {items:?}"))
//!       .many_items(|| println!("more than one"))
//!       .error(|e| println!("failed: {e}"))
//!       .single();
//!   })
//!   .await;
//! assert!(outcome.is_ok());
//! # });
//! ```

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::{debug, error, trace, warn};

use crate::{
  error::{classify_panic, BoxError, Caught, ObserveError, SharedError},
  observer::{Gate, WrapObserver},
  result::{data_result_error, DataResult, DataResultStatus, ItemShape},
  scheduler::Dispatcher,
};

mod attach;
mod event;
pub use attach::Attachment;
use event::{EventKind, Shape};
pub use event::{EventDataStatus, ObserveEvent};

const NO_ERROR_EVENT: &str = "no error event registered, add an error observer to retry the failure";
const RETRY_FAILED: &str = "error retried but without any success";

/// A set of events dispatched together.
pub struct ObserveWrapper<T> {
  events: Vec<ObserveEvent<T>>,
  transform_dispatcher: Dispatcher,
  runtime: Option<Handle>,
}

impl<T> Default for ObserveWrapper<T> {
  fn default() -> Self { Self::new() }
}

impl<T> ObserveWrapper<T> {
  pub fn new() -> Self {
    ObserveWrapper { events: vec![], transform_dispatcher: Dispatcher::default(), runtime: None }
  }

  /// Where transformations of `*_map` events run.
  pub fn transform_dispatcher(&mut self, dispatcher: Dispatcher) -> &mut Self {
    self.transform_dispatcher = dispatcher;
    self
  }

  /// The runtime an attachment spawns its task on, the current one by
  /// default.
  pub fn runtime(&mut self, handle: Handle) -> &mut Self {
    self.runtime = Some(handle);
    self
  }

  #[inline]
  pub fn event_count(&self) -> usize { self.events.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn events(&self) -> impl Iterator<Item = &ObserveEvent<T>> { self.events.iter() }

  /// Remove the most recently registered event once it handled a result.
  pub fn single(&mut self) -> &mut Self {
    if let Some(event) = self.events.last_mut() {
      event.single = true;
    }
    self
  }

  /// Filter the most recently registered event by the presence of data.
  pub fn data_status(&mut self, status: EventDataStatus) -> &mut Self {
    if let Some(event) = self.events.last_mut() {
      event.data_status = status;
    }
    self
  }

  fn push(&mut self, kind: EventKind<T>) -> &mut Self {
    self.events.push(ObserveEvent::new(kind));
    self
  }
}

// ============================ Registration ============================

impl<T: Send + 'static> ObserveWrapper<T> {
  /// Receives `true` while loading and `false` for any other status.
  pub fn loading(&mut self, observer: impl FnMut(bool) + Send + 'static) -> &mut Self {
    self.push(EventKind::Loading(WrapObserver::direct(observer)))
  }

  pub fn show_loading(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push(EventKind::ShowLoading(WrapObserver::empty(observer)))
  }

  pub fn hide_loading(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push(EventKind::HideLoading(WrapObserver::empty(observer)))
  }

  /// Receives the error of error results that carry one.
  pub fn error(&mut self, observer: impl FnMut(SharedError) + Send + 'static) -> &mut Self {
    self.push(EventKind::Error(WrapObserver::direct(observer)))
  }

  /// Fires for every error result, with or without an error value.
  pub fn error_signal(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push(EventKind::Error(WrapObserver::empty(observer)))
  }

  pub fn error_map<R: Send + 'static>(
    &mut self,
    transformer: impl Fn(SharedError) -> Result<R, BoxError> + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> &mut Self {
    self.push(EventKind::Error(WrapObserver::transform(transformer, observer)))
  }

  pub fn success(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push(EventKind::Success(WrapObserver::empty(observer)))
  }

  /// Receives the data of any result that carries some, whatever its status.
  pub fn data(&mut self, observer: impl FnMut(T) + Send + 'static) -> &mut Self {
    self.push(EventKind::Data(WrapObserver::direct(observer)))
  }

  pub fn data_map<R: Send + 'static>(
    &mut self,
    transformer: impl Fn(T) -> Result<R, BoxError> + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> &mut Self {
    self.push(EventKind::Data(WrapObserver::transform(transformer, observer)))
  }

  /// Like [`data_map`](Self::data_map), a failing transformation hands
  /// `on_error_return`'s value to the observer instead of failing.
  pub fn data_map_or<R: Send + 'static>(
    &mut self,
    transformer: impl Fn(T) -> Result<R, BoxError> + Send + Sync + 'static,
    on_error_return: impl Fn(SharedError) -> R + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> &mut Self {
    self.push(EventKind::Data(WrapObserver::transform_or(transformer, on_error_return, observer)))
  }

  pub fn result(&mut self, observer: impl FnMut(DataResult<T>) + Send + 'static) -> &mut Self {
    self.push(EventKind::Result(WrapObserver::direct(observer)))
  }

  pub fn result_map<R: Send + 'static>(
    &mut self,
    transformer: impl Fn(DataResult<T>) -> Result<R, BoxError> + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> &mut Self {
    self.push(EventKind::Result(WrapObserver::transform(transformer, observer)))
  }

  pub fn status(&mut self, observer: impl FnMut(DataResultStatus) + Send + 'static) -> &mut Self {
    self.push(EventKind::Status(WrapObserver::direct(observer)))
  }

  pub fn status_map<R: Send + 'static>(
    &mut self,
    transformer: impl Fn(DataResultStatus) -> Result<R, BoxError> + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> &mut Self {
    self.push(EventKind::Status(WrapObserver::transform(transformer, observer)))
  }

  /// Fires for results whose status is `None`, and only those.
  pub fn none(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push(EventKind::None(WrapObserver::empty(observer)))
  }
}

impl<T: ItemShape + Send + 'static> ObserveWrapper<T> {
  pub fn empty(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push_shape(Shape::Empty, observer)
  }

  pub fn not_empty(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push_shape(Shape::NotEmpty, observer)
  }

  pub fn one_item(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push_shape(Shape::OneItem, observer)
  }

  pub fn many_items(&mut self, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push_shape(Shape::ManyItems, observer)
  }

  fn push_shape(&mut self, shape: Shape, observer: impl FnMut() + Send + 'static) -> &mut Self {
    self.push(EventKind::Shape(shape, T::item_count, WrapObserver::empty(observer)))
  }
}

// ============================ Dispatch ============================

impl<T: Clone + Send + 'static> ObserveWrapper<T> {
  /// Offer `result` to every registered event.
  ///
  /// A panicking observer is retried once by replaying an error result
  /// through the error events. The returned error means the failure could
  /// not be handled: no error event exists, the retry failed too, or a
  /// transformation failed.
  pub async fn dispatch(&mut self, result: &DataResult<T>) -> Result<(), ObserveError> {
    self.dispatch_gated(result, &|| true).await
  }

  pub(crate) async fn dispatch_gated(
    &mut self,
    result: &DataResult<T>,
    gate: Gate<'_>,
  ) -> Result<(), ObserveError> {
    trace!(status = ?result.status, events = self.events.len(), "dispatching result");
    let outcome = AssertUnwindSafe(self.handle_result(result, gate))
      .catch_unwind()
      .await;
    match outcome {
      Ok(Ok(())) => Ok(()),
      Ok(Err(err)) => Err(err),
      Err(payload) => match classify_panic(payload) {
        Caught::Fatal(err) => Err(err),
        Caught::Panic(cause) => self.recover(cause, gate).await,
      },
    }
  }

  async fn recover(&mut self, cause: SharedError, gate: Gate<'_>) -> Result<(), ObserveError> {
    if !self.events.iter().any(ObserveEvent::is_error) {
      return Err(ObserveError::unhandled(NO_ERROR_EVENT, cause));
    }

    warn!(error = %cause, "observer failed, retrying through the error events");
    let retry = data_result_error(cause.clone(), None);
    match AssertUnwindSafe(self.handle_result(&retry, gate))
      .catch_unwind()
      .await
    {
      Ok(Ok(())) => Ok(()),
      Ok(Err(err)) => {
        debug!(error = %err, "retry failed");
        Err(ObserveError::unhandled(RETRY_FAILED, cause))
      }
      Err(_) => Err(ObserveError::unhandled(RETRY_FAILED, cause)),
    }
  }

  async fn handle_result(
    &mut self,
    result: &DataResult<T>,
    gate: Gate<'_>,
  ) -> Result<(), ObserveError> {
    let mut index = 0;
    while index < self.events.len() {
      let event = &mut self.events[index];
      let handled = event.data_status.consider_event(result)
        && event.handle(result, &self.transform_dispatcher, gate).await?;
      if handled && event.single {
        let event = self.events.remove(index);
        debug!(event = event.name(), "single event handled, removed");
      } else {
        index += 1;
      }
    }
    Ok(())
  }
}

pub(crate) fn log_fatal(err: &ObserveError) {
  error!(error = %err, cause = ?err.cause(), "observer failed without recovery");
}
