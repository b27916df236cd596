//! Error types
//!
//! Failures travel through a [`DataResult`](crate::result::DataResult) as a
//! [`SharedError`]: a cheaply clonable, type-erased error. Failures of the
//! observation machinery itself are reported as [`ObserveError`].

use std::{
  any::Any,
  error::Error,
  fmt::{Debug, Display, Formatter},
  sync::Arc,
};

use thiserror::Error;

/// Boxed error accepted from user transformations.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A type-erased error that can be cloned into every event that needs it.
///
/// Two `SharedError`s are equal only when they point at the same error
/// instance.
#[derive(Clone)]
pub struct SharedError(Arc<dyn Error + Send + Sync + 'static>);

impl SharedError {
  pub fn new(err: impl Into<BoxError>) -> Self { SharedError(Arc::from(err.into())) }

  /// Build an error from a plain message.
  pub fn msg(message: impl Into<String>) -> Self {
    let message: String = message.into();
    SharedError::new(message)
  }

  pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> { self.0.downcast_ref::<E>() }

  pub fn is<E: Error + 'static>(&self) -> bool { self.0.is::<E>() }
}

impl Debug for SharedError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(&*self.0, f) }
}

impl Display for SharedError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Display::fmt(&*self.0, f) }
}

impl Error for SharedError {
  fn source(&self) -> Option<&(dyn Error + 'static)> { self.0.source() }
}

impl PartialEq for SharedError {
  fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl From<ObserveError> for SharedError {
  fn from(err: ObserveError) -> Self { SharedError::new(err) }
}

impl From<PanicError> for SharedError {
  fn from(err: PanicError) -> Self { SharedError::new(err) }
}

/// A panic raised by an observer callback or a dispatched job.
#[derive(Debug, Clone, Error)]
#[error("observer panicked: {0}")]
pub struct PanicError(pub String);

/// Failures of the observation machinery.
#[derive(Debug, Clone, Error)]
pub enum ObserveError {
  /// An observer failed and nothing could handle it.
  #[error("{message}")]
  Unhandled {
    message: &'static str,
    #[source]
    cause: SharedError,
  },

  /// A transformation attached to an event or a source failed.
  #[error("{message}")]
  Transformation {
    message: &'static str,
    #[source]
    cause: SharedError,
  },

  /// The task driving an attachment ended without reporting an outcome.
  #[error("observer task terminated unexpectedly: {0}")]
  Detached(String),
}

impl ObserveError {
  pub(crate) fn unhandled(message: &'static str, cause: SharedError) -> Self {
    ObserveError::Unhandled { message, cause }
  }

  pub(crate) fn transformation(cause: SharedError) -> Self {
    ObserveError::Transformation { message: "error performing transformation", cause }
  }

  /// The error that caused this one.
  pub fn cause(&self) -> Option<&SharedError> {
    match self {
      ObserveError::Unhandled { cause, .. } | ObserveError::Transformation { cause, .. } => {
        Some(cause)
      }
      ObserveError::Detached(_) => None,
    }
  }
}

/// What a caught panic turned out to be.
pub(crate) enum Caught {
  /// The payload was an [`ObserveError`] raised on purpose.
  Fatal(ObserveError),
  /// Anything else.
  Panic(SharedError),
}

pub(crate) fn classify_panic(payload: Box<dyn Any + Send>) -> Caught {
  let payload = match payload.downcast::<ObserveError>() {
    Ok(err) => return Caught::Fatal(*err),
    Err(payload) => payload,
  };
  let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  };
  Caught::Panic(PanicError(message).into())
}
