//! Transformations applied to the pairs produced by the async combinators.

use std::sync::Arc;

use tracing::debug;

use crate::{
  error::{BoxError, SharedError},
  result::{data_result_error, DataResult},
  scheduler::Dispatcher,
};

/// What to emit when a transformation fails and no fallback rescued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
  /// Drop the emission.
  OmitWhenFail,
  /// Emit an absent value.
  NullWhenFail,
}

type NullableFn<A, B, X> = dyn Fn(Option<A>, Option<B>) -> Result<Option<X>, BoxError> + Send + Sync;
type NotNullFn<A, B, X> = dyn Fn(A, B) -> Result<X, BoxError> + Send + Sync;

/// Transformation over a pair whose sides may be absent.
pub struct NullableTransform<A, B, X> {
  dispatcher: Dispatcher,
  fail_mode: FailMode,
  func: Arc<NullableFn<A, B, X>>,
  on_error_return: Option<Arc<dyn Fn(SharedError) -> Option<X> + Send + Sync>>,
}

/// Transformation over a complete pair. Failures are always dropped unless
/// a fallback produces a value.
pub struct NotNullTransform<A, B, X> {
  dispatcher: Dispatcher,
  func: Arc<NotNullFn<A, B, X>>,
  on_error_return: Option<Arc<dyn Fn(SharedError) -> X + Send + Sync>>,
}

impl<A, B, X> Clone for NullableTransform<A, B, X> {
  fn clone(&self) -> Self {
    NullableTransform {
      dispatcher: self.dispatcher.clone(),
      fail_mode: self.fail_mode,
      func: self.func.clone(),
      on_error_return: self.on_error_return.clone(),
    }
  }
}

impl<A, B, X> Clone for NotNullTransform<A, B, X> {
  fn clone(&self) -> Self {
    NotNullTransform {
      dispatcher: self.dispatcher.clone(),
      func: self.func.clone(),
      on_error_return: self.on_error_return.clone(),
    }
  }
}

impl<A, B, X> NullableTransform<A, B, X>
where
  A: Send + 'static,
  B: Send + 'static,
  X: Send + 'static,
{
  pub fn omit_fail(
    func: impl Fn(Option<A>, Option<B>) -> Result<Option<X>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    Self::custom(FailMode::OmitWhenFail, func, None)
  }

  pub fn null_fail(
    func: impl Fn(Option<A>, Option<B>) -> Result<Option<X>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    Self::custom(FailMode::NullWhenFail, func, None)
  }

  pub fn fallback(
    func: impl Fn(Option<A>, Option<B>) -> Result<Option<X>, BoxError> + Send + Sync + 'static,
    on_error_return: impl Fn(SharedError) -> Option<X> + Send + Sync + 'static,
  ) -> Self {
    Self::custom(FailMode::OmitWhenFail, func, Some(Arc::new(on_error_return)))
  }

  pub fn custom(
    fail_mode: FailMode,
    func: impl Fn(Option<A>, Option<B>) -> Result<Option<X>, BoxError> + Send + Sync + 'static,
    on_error_return: Option<Arc<dyn Fn(SharedError) -> Option<X> + Send + Sync>>,
  ) -> Self {
    NullableTransform {
      dispatcher: Dispatcher::default(),
      fail_mode,
      func: Arc::new(func),
      on_error_return,
    }
  }

  /// Run on `dispatcher` instead of the default one.
  pub fn on(mut self, dispatcher: Dispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  #[inline]
  pub fn fail_mode(&self) -> FailMode { self.fail_mode }

  /// `None` drops the emission, `Some(value)` emits `value`.
  pub async fn apply(&self, a: Option<A>, b: Option<B>) -> Option<Option<X>> {
    let func = self.func.clone();
    let outcome = run(&self.dispatcher, move || func(a, b), self.on_error_return.clone()).await;
    match outcome {
      Ok(value) => Some(value),
      Err(err) => {
        debug!(error = %err, mode = ?self.fail_mode, "pair transformation failed");
        match self.fail_mode {
          FailMode::OmitWhenFail => None,
          FailMode::NullWhenFail => Some(None),
        }
      }
    }
  }
}

impl<A, B, X> NotNullTransform<A, B, X>
where
  A: Send + 'static,
  B: Send + 'static,
  X: Send + 'static,
{
  pub fn omit_fail(func: impl Fn(A, B) -> Result<X, BoxError> + Send + Sync + 'static) -> Self {
    NotNullTransform { dispatcher: Dispatcher::default(), func: Arc::new(func), on_error_return: None }
  }

  pub fn fallback(
    func: impl Fn(A, B) -> Result<X, BoxError> + Send + Sync + 'static,
    on_error_return: impl Fn(SharedError) -> X + Send + Sync + 'static,
  ) -> Self {
    NotNullTransform {
      dispatcher: Dispatcher::default(),
      func: Arc::new(func),
      on_error_return: Some(Arc::new(on_error_return)),
    }
  }

  pub fn on(mut self, dispatcher: Dispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  pub async fn apply(&self, a: A, b: B) -> Option<X> {
    let func = self.func.clone();
    match run(&self.dispatcher, move || func(a, b), self.on_error_return.clone()).await {
      Ok(value) => Some(value),
      Err(err) => {
        debug!(error = %err, "pair transformation failed, dropped");
        None
      }
    }
  }
}

// ============================ Responses ============================

/// What a [`ResponseTransform`] emits when it fails and no fallback
/// rescued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFailMode {
  /// Drop the emission.
  OmitWhenFail,
  /// Emit an error result carrying the failure.
  ErrorStatusWhenFail,
}

type ResponseFn<T, R, X> = dyn Fn(DataResult<(T, R)>) -> Result<DataResult<X>, BoxError> + Send + Sync;
type ResponseFallback<X> = Arc<dyn Fn(SharedError) -> DataResult<X> + Send + Sync>;

/// Transformation over the merged result of a response combinator.
pub struct ResponseTransform<T, R, X> {
  dispatcher: Dispatcher,
  fail_mode: ResponseFailMode,
  func: Arc<ResponseFn<T, R, X>>,
  on_error_return: Option<ResponseFallback<X>>,
}

impl<T, R, X> Clone for ResponseTransform<T, R, X> {
  fn clone(&self) -> Self {
    ResponseTransform {
      dispatcher: self.dispatcher.clone(),
      fail_mode: self.fail_mode,
      func: self.func.clone(),
      on_error_return: self.on_error_return.clone(),
    }
  }
}

impl<T, R, X> ResponseTransform<T, R, X>
where
  T: Send + 'static,
  R: Send + 'static,
  X: Send + 'static,
{
  /// Failures become error results.
  pub fn status_fail(
    func: impl Fn(DataResult<(T, R)>) -> Result<DataResult<X>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    Self::custom(ResponseFailMode::ErrorStatusWhenFail, func, None)
  }

  /// Failures are dropped.
  pub fn omit_fail(
    func: impl Fn(DataResult<(T, R)>) -> Result<DataResult<X>, BoxError> + Send + Sync + 'static,
  ) -> Self {
    Self::custom(ResponseFailMode::OmitWhenFail, func, None)
  }

  /// Failures are handed to `on_error_return`. A failing fallback becomes
  /// an error result.
  pub fn fallback(
    func: impl Fn(DataResult<(T, R)>) -> Result<DataResult<X>, BoxError> + Send + Sync + 'static,
    on_error_return: impl Fn(SharedError) -> DataResult<X> + Send + Sync + 'static,
  ) -> Self {
    Self::custom(ResponseFailMode::ErrorStatusWhenFail, func, Some(Arc::new(on_error_return)))
  }

  pub fn custom(
    fail_mode: ResponseFailMode,
    func: impl Fn(DataResult<(T, R)>) -> Result<DataResult<X>, BoxError> + Send + Sync + 'static,
    on_error_return: Option<ResponseFallback<X>>,
  ) -> Self {
    ResponseTransform {
      dispatcher: Dispatcher::default(),
      fail_mode,
      func: Arc::new(func),
      on_error_return,
    }
  }

  pub fn on(mut self, dispatcher: Dispatcher) -> Self {
    self.dispatcher = dispatcher;
    self
  }

  #[inline]
  pub fn fail_mode(&self) -> ResponseFailMode { self.fail_mode }

  /// `None` drops the emission.
  pub async fn apply(&self, result: DataResult<(T, R)>) -> Option<DataResult<X>> {
    let func = self.func.clone();
    match run(&self.dispatcher, move || func(result), self.on_error_return.clone()).await {
      Ok(value) => Some(value),
      Err(err) => {
        debug!(error = %err, mode = ?self.fail_mode, "response transformation failed");
        match self.fail_mode {
          ResponseFailMode::OmitWhenFail => None,
          ResponseFailMode::ErrorStatusWhenFail => Some(data_result_error(err, None)),
        }
      }
    }
  }
}

/// Run `job` on `dispatcher`; on failure, hand the error to `fallback`.
async fn run<X: Send + 'static>(
  dispatcher: &Dispatcher,
  job: impl FnOnce() -> Result<X, BoxError> + Send + 'static,
  fallback: Option<Arc<dyn Fn(SharedError) -> X + Send + Sync>>,
) -> Result<X, SharedError> {
  let err = match dispatcher.run(job).await {
    Ok(Ok(value)) => return Ok(value),
    Ok(Err(err)) => SharedError::new(err),
    Err(panic) => panic,
  };
  match fallback {
    Some(fallback) => Dispatcher::Inline.run(move || fallback(err)).await,
    None => Err(err),
  }
}
