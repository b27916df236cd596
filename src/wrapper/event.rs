use crate::{
  error::{ObserveError, SharedError},
  observer::{Gate, WrapObserver},
  result::{DataResult, DataResultStatus},
  scheduler::Dispatcher,
};

/// Filter applied to a result before an event looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventDataStatus {
  /// Only results carrying data.
  WithData,
  /// Only results without data.
  WithoutData,
  #[default]
  DoesNotMatter,
}

impl EventDataStatus {
  pub fn consider_event<T>(&self, result: &DataResult<T>) -> bool {
    match self {
      EventDataStatus::WithData => result.has_data(),
      EventDataStatus::WithoutData => !result.has_data(),
      EventDataStatus::DoesNotMatter => true,
    }
  }
}

pub(crate) type ItemCount<T> = fn(&T) -> Option<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
  Empty,
  NotEmpty,
  OneItem,
  ManyItems,
}

impl Shape {
  fn matches(self, count: usize) -> bool {
    match self {
      Shape::Empty => count == 0,
      Shape::NotEmpty => count > 0,
      Shape::OneItem => count == 1,
      Shape::ManyItems => count > 1,
    }
  }
}

pub(crate) enum EventKind<T> {
  Loading(WrapObserver<bool>),
  ShowLoading(WrapObserver<bool>),
  HideLoading(WrapObserver<bool>),
  Error(WrapObserver<SharedError>),
  Success(WrapObserver<()>),
  Data(WrapObserver<T>),
  Result(WrapObserver<DataResult<T>>),
  Status(WrapObserver<DataResultStatus>),
  Shape(Shape, ItemCount<T>, WrapObserver<()>),
  None(WrapObserver<()>),
}

/// A registered subscription of an [`ObserveWrapper`](super::ObserveWrapper).
pub struct ObserveEvent<T> {
  pub(crate) kind: EventKind<T>,
  pub(crate) single: bool,
  pub(crate) data_status: EventDataStatus,
}

impl<T> ObserveEvent<T> {
  pub(crate) fn new(kind: EventKind<T>) -> Self {
    ObserveEvent { kind, single: false, data_status: EventDataStatus::DoesNotMatter }
  }

  #[inline]
  pub fn is_single(&self) -> bool { self.single }

  #[inline]
  pub fn data_status(&self) -> EventDataStatus { self.data_status }

  #[inline]
  pub fn is_error(&self) -> bool { matches!(self.kind, EventKind::Error(_)) }

  pub fn name(&self) -> &'static str {
    match &self.kind {
      EventKind::Loading(_) => "loading",
      EventKind::ShowLoading(_) => "show_loading",
      EventKind::HideLoading(_) => "hide_loading",
      EventKind::Error(_) => "error",
      EventKind::Success(_) => "success",
      EventKind::Data(_) => "data",
      EventKind::Result(_) => "result",
      EventKind::Status(_) => "status",
      EventKind::Shape(Shape::Empty, ..) => "empty",
      EventKind::Shape(Shape::NotEmpty, ..) => "not_empty",
      EventKind::Shape(Shape::OneItem, ..) => "one_item",
      EventKind::Shape(Shape::ManyItems, ..) => "many_items",
      EventKind::None(_) => "none",
    }
  }
}

impl<T: Clone + Send + 'static> ObserveEvent<T> {
  /// Offer `result` to this event, returning whether it was handled.
  ///
  /// A `None` result only reaches `none` events. Loading events count as
  /// handled once loading is over and data events once data arrived, so a
  /// single-shot registration of either waits for that.
  pub(crate) async fn handle(
    &mut self,
    result: &DataResult<T>,
    dispatcher: &Dispatcher,
    gate: Gate<'_>,
  ) -> Result<bool, ObserveError> {
    if result.is_none() {
      return match &mut self.kind {
        EventKind::None(observer) => observer.handle(None, dispatcher, gate).await,
        _ => Ok(false),
      };
    }

    let loading = result.is_loading();
    match &mut self.kind {
      EventKind::Loading(observer) => {
        Ok(observer.handle(Some(loading), dispatcher, gate).await? && !loading)
      }
      EventKind::ShowLoading(observer) if loading => {
        observer.handle(Some(true), dispatcher, gate).await
      }
      EventKind::HideLoading(observer) if !loading => {
        observer.handle(Some(false), dispatcher, gate).await
      }
      EventKind::Error(observer) if result.is_error() => {
        observer.handle(result.error.clone(), dispatcher, gate).await
      }
      EventKind::Success(observer) if result.is_success() => {
        observer.handle(None, dispatcher, gate).await
      }
      EventKind::Data(observer) => {
        Ok(observer.handle(result.data.clone(), dispatcher, gate).await? && result.has_data())
      }
      EventKind::Shape(shape, count, observer) => {
        match result.data.as_ref().and_then(|data| count(data)) {
          Some(n) if shape.matches(n) => observer.handle(None, dispatcher, gate).await,
          _ => Ok(false),
        }
      }
      EventKind::Result(observer) => observer.handle(Some(result.clone()), dispatcher, gate).await,
      EventKind::Status(observer) => observer.handle(Some(result.status), dispatcher, gate).await,
      _ => Ok(false),
    }
  }
}
