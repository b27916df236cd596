//! Where transformations run.
//!
//! Observer callbacks always run on the task that dispatches the result.
//! Transformations attached to events, combinators and swap sources are
//! handed to a [`Dispatcher`] instead, so heavy mapping work can leave the
//! dispatching task.

use std::{
  panic::{catch_unwind, AssertUnwindSafe},
  sync::RwLock,
};

use once_cell::sync::Lazy;
use tokio::{runtime::Handle, task::JoinError};

use crate::error::{classify_panic, Caught, SharedError};

static DEFAULT_DISPATCHER: Lazy<RwLock<Dispatcher>> =
  Lazy::new(|| RwLock::new(Dispatcher::Blocking));

/// Replace the dispatcher used by everything created without an explicit
/// one afterwards.
pub fn set_default_dispatcher(dispatcher: Dispatcher) {
  *DEFAULT_DISPATCHER
    .write()
    .unwrap_or_else(|e| e.into_inner()) = dispatcher;
}

/// The current process-wide dispatcher, [`Dispatcher::Blocking`] unless
/// replaced.
pub fn default_dispatcher() -> Dispatcher {
  DEFAULT_DISPATCHER
    .read()
    .unwrap_or_else(|e| e.into_inner())
    .clone()
}

#[derive(Clone, Debug)]
pub enum Dispatcher {
  /// Run on the calling task.
  Inline,
  /// Run on the blocking pool of the current Tokio runtime. Falls back to
  /// [`Inline`](Dispatcher::Inline) when no runtime is entered.
  Blocking,
  /// Run on the blocking pool of the given runtime.
  Runtime(Handle),
}

impl Default for Dispatcher {
  fn default() -> Self { default_dispatcher() }
}

impl Dispatcher {
  /// Run `job` and wait for it. A panic inside `job` is returned as a
  /// failure of the job.
  pub async fn run<F, R>(&self, job: F) -> Result<R, SharedError>
  where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
  {
    match self {
      Dispatcher::Inline => run_inline(job),
      Dispatcher::Blocking => match Handle::try_current() {
        Ok(handle) => handle.spawn_blocking(job).await.map_err(join_failure),
        Err(_) => run_inline(job),
      },
      Dispatcher::Runtime(handle) => handle.spawn_blocking(job).await.map_err(join_failure),
    }
  }

  #[inline]
  pub fn is_inline(&self) -> bool { matches!(self, Dispatcher::Inline) }
}

pub(crate) fn run_inline<R>(job: impl FnOnce() -> R) -> Result<R, SharedError> {
  catch_unwind(AssertUnwindSafe(job)).map_err(|payload| match classify_panic(payload) {
    Caught::Fatal(err) => err.into(),
    Caught::Panic(err) => err,
  })
}

fn join_failure(err: JoinError) -> SharedError {
  match err.try_into_panic() {
    Ok(payload) => match classify_panic(payload) {
      Caught::Fatal(err) => err.into(),
      Caught::Panic(err) => err,
    },
    Err(err) => SharedError::new(err),
  }
}
