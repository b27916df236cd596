//! The single-callback unit every event is built on.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
  error::{BoxError, ObserveError, SharedError},
  scheduler::Dispatcher,
};

/// Evaluated before an observer runs; a closed gate skips the observer.
pub type Gate<'a> = &'a (dyn Fn() -> bool + Send + Sync);

type Transformer<V, R> = Arc<dyn Fn(V) -> Result<R, BoxError> + Send + Sync>;
type Fallback<R> = Arc<dyn Fn(SharedError) -> R + Send + Sync>;

/// One callback, in one of three shapes.
///
/// Exactly one callback fires per [`handle`](WrapObserver::handle) call, or
/// none: a closed gate skips everything, and the data-taking shapes skip
/// when there is no data.
pub enum WrapObserver<V> {
  /// Ignores the data and always fires.
  Empty(Box<dyn FnMut() + Send>),
  /// Receives the data.
  Direct(Box<dyn FnMut(V) + Send>),
  /// Transforms the data on a dispatcher, then hands the output on.
  Transform(Box<dyn TransformStage<V> + Send>),
}

/// Type-erased transform-then-observe step, hiding the output type.
pub trait TransformStage<V> {
  fn run<'a>(
    &'a mut self,
    data: V,
    dispatcher: &'a Dispatcher,
    gate: Gate<'a>,
  ) -> BoxFuture<'a, Result<bool, ObserveError>>;
}

struct TransformThen<V, R> {
  transformer: Transformer<V, R>,
  on_error_return: Option<Fallback<R>>,
  observer: Box<dyn FnMut(R) + Send>,
}

impl<V: Send + 'static, R: Send + 'static> TransformStage<V> for TransformThen<V, R> {
  fn run<'a>(
    &'a mut self,
    data: V,
    dispatcher: &'a Dispatcher,
    gate: Gate<'a>,
  ) -> BoxFuture<'a, Result<bool, ObserveError>> {
    let transformer = self.transformer.clone();
    Box::pin(async move {
      let outcome = match dispatcher.run(move || transformer(data)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(SharedError::new(err)),
        Err(panic) => Err(panic),
      };

      // the transformation may have outlived the observer's interest
      if !gate() {
        return Ok(false);
      }

      let value = match (outcome, &self.on_error_return) {
        (Ok(value), _) => value,
        (Err(err), Some(fallback)) => fallback(err),
        (Err(err), None) => return Err(ObserveError::transformation(err)),
      };
      (self.observer)(value);
      Ok(true)
    })
  }
}

impl<V: Send + 'static> WrapObserver<V> {
  pub fn empty(observer: impl FnMut() + Send + 'static) -> Self {
    WrapObserver::Empty(Box::new(observer))
  }

  pub fn direct(observer: impl FnMut(V) + Send + 'static) -> Self {
    WrapObserver::Direct(Box::new(observer))
  }

  pub fn transform<R: Send + 'static>(
    transformer: impl Fn(V) -> Result<R, BoxError> + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> Self {
    WrapObserver::Transform(Box::new(TransformThen {
      transformer: Arc::new(transformer),
      on_error_return: None,
      observer: Box::new(observer),
    }))
  }

  /// Like [`transform`](Self::transform), a failing transformation feeds
  /// `on_error_return` instead of failing the dispatch.
  pub fn transform_or<R: Send + 'static>(
    transformer: impl Fn(V) -> Result<R, BoxError> + Send + Sync + 'static,
    on_error_return: impl Fn(SharedError) -> R + Send + Sync + 'static,
    observer: impl FnMut(R) + Send + 'static,
  ) -> Self {
    WrapObserver::Transform(Box::new(TransformThen {
      transformer: Arc::new(transformer),
      on_error_return: Some(Arc::new(on_error_return)),
      observer: Box::new(observer),
    }))
  }

  /// Run the callback for `data`, returning whether it ran.
  pub async fn handle(
    &mut self,
    data: Option<V>,
    dispatcher: &Dispatcher,
    gate: Gate<'_>,
  ) -> Result<bool, ObserveError> {
    if !gate() {
      return Ok(false);
    }
    match (self, data) {
      (WrapObserver::Empty(observer), _) => {
        observer();
        Ok(true)
      }
      (WrapObserver::Direct(observer), Some(data)) => {
        observer(data);
        Ok(true)
      }
      (WrapObserver::Transform(stage), Some(data)) => stage.run(data, dispatcher, gate).await,
      _ => Ok(false),
    }
  }
}
