//! The tri-state result: optional data, optional error, mandatory status.

use std::fmt::Debug;

use crate::{
  error::{BoxError, ObserveError, SharedError},
  wrapper::ObserveWrapper,
};

mod merge;
mod shape;
pub use merge::{merge, merge_all, merge_not_null};
pub use shape::ItemShape;

/// Lifecycle of a [`DataResult`].
///
/// The declaration order is the merge priority: merging two results keeps
/// the status declared last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataResultStatus {
  Loading,
  Success,
  Error,
  None,
}

/// An immutable snapshot of an operation: what it produced so far, what
/// went wrong, and where it stands.
///
/// Any combination of data and error is allowed with any status; a loading
/// result may already carry cached data and an error result may keep the
/// last good data.
#[derive(Debug, Clone, PartialEq)]
pub struct DataResult<T> {
  pub data: Option<T>,
  pub error: Option<SharedError>,
  pub status: DataResultStatus,
}

pub fn data_result_success<T>(data: impl Into<Option<T>>) -> DataResult<T> {
  DataResult::new(data.into(), None, DataResultStatus::Success)
}

pub fn data_result_loading<T>(
  data: impl Into<Option<T>>,
  error: Option<SharedError>,
) -> DataResult<T> {
  DataResult::new(data.into(), error, DataResultStatus::Loading)
}

pub fn data_result_error<T>(
  error: impl Into<Option<SharedError>>,
  data: impl Into<Option<T>>,
) -> DataResult<T> {
  DataResult::new(data.into(), error.into(), DataResultStatus::Error)
}

pub fn data_result_none<T>() -> DataResult<T> { DataResult::new(None, None, DataResultStatus::None) }

impl<T> DataResult<T> {
  pub fn new(data: Option<T>, error: Option<SharedError>, status: DataResultStatus) -> Self {
    DataResult { data, error, status }
  }

  #[inline]
  pub fn has_data(&self) -> bool { self.data.is_some() }

  #[inline]
  pub fn has_error(&self) -> bool { self.error.is_some() }

  #[inline]
  pub fn is_loading(&self) -> bool { self.status == DataResultStatus::Loading }

  #[inline]
  pub fn is_error(&self) -> bool { self.status == DataResultStatus::Error }

  #[inline]
  pub fn is_success(&self) -> bool { self.status == DataResultStatus::Success }

  #[inline]
  pub fn is_none(&self) -> bool { self.status == DataResultStatus::None }

  pub fn as_ref(&self) -> DataResult<&T> {
    DataResult::new(self.data.as_ref(), self.error.clone(), self.status)
  }

  /// Map the data, keeping error and status.
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> DataResult<R> {
    DataResult::new(self.data.map(f), self.error, self.status)
  }

  /// Map the data with a fallible function.
  ///
  /// A failure drops the data and replaces the error with the failure; the
  /// status is kept. Without data the error and status pass through and `f`
  /// is not called.
  pub fn transform<R>(self, f: impl FnOnce(T) -> Result<R, BoxError>) -> DataResult<R> {
    let DataResult { data, error, status } = self;
    match data.map(f) {
      Some(Ok(data)) => DataResult::new(Some(data), error, status),
      Some(Err(failure)) => DataResult::new(None, Some(SharedError::new(failure)), status),
      None => DataResult::new(None, error, status),
    }
  }
}

impl<T: ItemShape> DataResult<T> {
  fn item_count(&self) -> Option<usize> { self.data.as_ref().and_then(ItemShape::item_count) }

  /// Whether the data is a collection or map.
  pub fn is_list_type(&self) -> bool { self.item_count().is_some() }

  pub fn is_empty(&self) -> bool { self.item_count() == Some(0) }

  pub fn is_not_empty(&self) -> bool { self.item_count().map_or(false, |n| n > 0) }

  pub fn has_one_item(&self) -> bool { self.item_count() == Some(1) }

  pub fn has_many_items(&self) -> bool { self.item_count().map_or(false, |n| n > 1) }
}

impl<T: Clone + Send + 'static> DataResult<T> {
  /// Dispatch this result once through a wrapper built by `config`.
  pub async fn unwrap(
    &self,
    config: impl FnOnce(&mut ObserveWrapper<T>),
  ) -> Result<(), ObserveError> {
    let mut wrapper = ObserveWrapper::new();
    config(&mut wrapper);
    wrapper.dispatch(self).await
  }

  pub async fn on_data(&self, f: impl FnMut(T) + Send + 'static) -> Result<(), ObserveError> {
    self.unwrap(|w| {
      w.data(f);
    })
    .await
  }

  pub async fn on_loading(
    &self,
    f: impl FnMut(bool) + Send + 'static,
  ) -> Result<(), ObserveError> {
    self.unwrap(|w| {
      w.loading(f);
    })
    .await
  }

  pub async fn on_error(
    &self,
    f: impl FnMut(SharedError) + Send + 'static,
  ) -> Result<(), ObserveError> {
    self.unwrap(|w| {
      w.error(f);
    })
    .await
  }
}

impl<T> Default for DataResult<T> {
  fn default() -> Self { data_result_none() }
}
