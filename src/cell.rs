//! A last-value push container.
//!
//! An [`ObservableCell`] holds an optional current value and pushes every
//! new value to its observers. A cell can also act as a mediator: it
//! subscribes to other cells as sources and decides what to store when they
//! change, which is how every combinator of this crate is built.
//!
//! Writes made while observers are being notified, from a callback or from
//! another thread, are conflated: observers always end up seeing the latest
//! value and never see the same write twice.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex, MutexGuard, PoisonError, Weak,
};

use crate::subscription::{BoxedSubscriptionSend, DynamicSubscriptions, Subscription};

mod stream;
mod task;
pub use stream::CellStream;

/// What a cell can hold.
pub trait CellItem: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> CellItem for T {}

type Callback<T> = Box<dyn FnMut(Option<T>) + Send>;

struct ObserverSlot<T> {
  id: usize,
  active: Arc<AtomicBool>,
  inner: Mutex<SlotInner<T>>,
}

struct SlotInner<T> {
  last_version: u64,
  callback: Callback<T>,
}

impl<T: CellItem> ObserverSlot<T> {
  fn consider_notify(&self, version: u64, value: &Option<T>) {
    if !self.active.load(Ordering::Acquire) {
      return;
    }
    let mut inner = lock(&self.inner);
    if inner.last_version >= version {
      return;
    }
    inner.last_version = version;
    (inner.callback)(value.clone());
  }
}

struct CellState<T> {
  value: Option<T>,
  // 0 while uninitialized
  version: u64,
  dispatching: bool,
  invalidated: bool,
  next_observer: usize,
  observers: Vec<Arc<ObserverSlot<T>>>,
}

struct CellShared<T> {
  state: Mutex<CellState<T>>,
  sources: Mutex<DynamicSubscriptions<BoxedSubscriptionSend>>,
}

impl<T> Drop for CellShared<T> {
  fn drop(&mut self) {
    let sources = lock(&self.sources).take_all();
    for source in sources {
      source.unsubscribe();
    }
  }
}

trait ObserverRegistry: Send + Sync {
  fn remove_observer(&self, id: usize);
}

impl<T: CellItem> ObserverRegistry for CellShared<T> {
  fn remove_observer(&self, id: usize) {
    let removed = {
      let mut state = lock(&self.state);
      state
        .observers
        .iter()
        .position(|slot| slot.id == id)
        .map(|pos| state.observers.remove(pos))
    };
    // the callback may own cells, release it outside the lock
    drop(removed);
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stops one observer of a cell. Clones control the same observer.
#[derive(Clone)]
pub struct CellSubscription {
  id: usize,
  active: Arc<AtomicBool>,
  registry: Weak<dyn ObserverRegistry>,
}

impl Subscription for CellSubscription {
  fn unsubscribe(self) {
    self.active.store(false, Ordering::Release);
    if let Some(registry) = self.registry.upgrade() {
      registry.remove_observer(self.id);
    }
  }

  fn is_closed(&self) -> bool { !self.active.load(Ordering::Acquire) }
}

/// A subscription that also keeps the observed cell alive.
pub(crate) struct SourceLink<S> {
  subscription: CellSubscription,
  _source: ObservableCell<S>,
}

impl<S> Subscription for SourceLink<S> {
  fn unsubscribe(self) { self.subscription.unsubscribe() }

  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}

/// Resets the dispatch flag if an observer panics mid-dispatch.
struct DispatchGuard<'a, T: CellItem>(&'a CellShared<T>);

impl<T: CellItem> Drop for DispatchGuard<'_, T> {
  fn drop(&mut self) {
    if std::thread::panicking() {
      let mut state = lock(&self.0.state);
      state.dispatching = false;
      state.invalidated = false;
    }
  }
}

pub struct ObservableCell<T> {
  shared: Arc<CellShared<T>>,
}

impl<T> Clone for ObservableCell<T> {
  fn clone(&self) -> Self { ObservableCell { shared: self.shared.clone() } }
}

/// A handle that does not keep the cell alive.
pub struct WeakCell<T>(Weak<CellShared<T>>);

impl<T> Clone for WeakCell<T> {
  fn clone(&self) -> Self { WeakCell(self.0.clone()) }
}

impl<T> WeakCell<T> {
  pub fn upgrade(&self) -> Option<ObservableCell<T>> {
    self.0.upgrade().map(|shared| ObservableCell { shared })
  }
}

impl<T: CellItem> Default for ObservableCell<T> {
  fn default() -> Self { Self::new() }
}

impl<T: CellItem> ObservableCell<T> {
  /// An uninitialized cell. Observers hear nothing until the first write.
  pub fn new() -> Self { Self::from_state(None, 0) }

  pub fn with_value(value: T) -> Self { Self::from_state(Some(value), 1) }

  fn from_state(value: Option<T>, version: u64) -> Self {
    let state = CellState {
      value,
      version,
      dispatching: false,
      invalidated: false,
      next_observer: 0,
      observers: vec![],
    };
    ObservableCell {
      shared: Arc::new(CellShared {
        state: Mutex::new(state),
        sources: Mutex::new(DynamicSubscriptions::default()),
      }),
    }
  }

  /// The current value, `None` when uninitialized or set to nothing.
  pub fn value(&self) -> Option<T> { lock(&self.shared.state).value.clone() }

  pub fn is_initialized(&self) -> bool { lock(&self.shared.state).version > 0 }

  pub fn has_observers(&self) -> bool { !lock(&self.shared.state).observers.is_empty() }

  pub fn set(&self, value: T) { self.set_value(Some(value)) }

  /// Store `value` and notify every observer, initializing the cell.
  pub fn set_value(&self, value: Option<T>) {
    {
      let mut state = lock(&self.shared.state);
      state.value = value;
      state.version += 1;
    }
    self.dispatch(None);
  }

  /// Observe every value from now on, starting with the current one when
  /// the cell is initialized.
  pub fn subscribe(&self, callback: impl FnMut(Option<T>) + Send + 'static) -> CellSubscription {
    let active = Arc::new(AtomicBool::new(true));
    let slot = {
      let mut state = lock(&self.shared.state);
      let id = state.next_observer;
      state.next_observer += 1;
      let slot = Arc::new(ObserverSlot {
        id,
        active: active.clone(),
        inner: Mutex::new(SlotInner { last_version: 0, callback: Box::new(callback) }),
      });
      state.observers.push(slot.clone());
      slot
    };

    let id = slot.id;
    self.dispatch(Some(slot));
    let registry: Weak<CellShared<T>> = Arc::downgrade(&self.shared);
    CellSubscription { id, active, registry }
  }

  /// Like [`subscribe`](Self::subscribe), holding on to this cell until
  /// unsubscribed.
  pub(crate) fn link(&self, callback: impl FnMut(Option<T>) + Send + 'static) -> SourceLink<T> {
    SourceLink { subscription: self.subscribe(callback), _source: self.clone() }
  }

  /// Notify the observers of the current version, or only `initiator`.
  fn dispatch(&self, mut initiator: Option<Arc<ObserverSlot<T>>>) {
    {
      let mut state = lock(&self.shared.state);
      if state.dispatching {
        state.invalidated = true;
        return;
      }
      state.dispatching = true;
    }

    let _guard = DispatchGuard(&self.shared);
    loop {
      let (value, version, targets) = {
        let mut state = lock(&self.shared.state);
        state.invalidated = false;
        let targets = match initiator.take() {
          Some(slot) => vec![slot],
          None => state.observers.clone(),
        };
        (state.value.clone(), state.version, targets)
      };

      if version > 0 {
        for slot in targets {
          slot.consider_notify(version, &value);
          if lock(&self.shared.state).invalidated {
            break;
          }
        }
      }

      let mut state = lock(&self.shared.state);
      if !state.invalidated {
        state.dispatching = false;
        return;
      }
    }
  }

  // ============================ Mediator ============================

  /// Subscribe to `source` on behalf of this cell, calling `on_change`
  /// with this cell and each source value.
  ///
  /// This cell keeps `source` alive and follows it until dropped or until
  /// [`remove_source`](Self::remove_source) is called with the returned
  /// id. The callback only holds a weak handle to this cell.
  pub fn add_source<S: CellItem>(
    &self,
    source: &ObservableCell<S>,
    mut on_change: impl FnMut(&ObservableCell<T>, Option<S>) + Send + 'static,
  ) -> usize {
    let weak = self.downgrade();
    let link = source.link(move |value| {
      if let Some(cell) = weak.upgrade() {
        on_change(&cell, value);
      }
    });
    self.own(link)
  }

  /// Stop following a source added with [`add_source`](Self::add_source).
  pub fn remove_source(&self, id: usize) -> bool {
    let removed = lock(&self.shared.sources).remove(id);
    match removed {
      Some(subscription) => {
        subscription.unsubscribe();
        true
      }
      None => false,
    }
  }

  pub fn source_count(&self) -> usize { lock(&self.shared.sources).len() }

  /// Keep `subscription` until this cell is dropped. Returns an id for
  /// [`remove_source`](Self::remove_source).
  pub fn own(&self, subscription: impl Subscription + Send + 'static) -> usize {
    lock(&self.shared.sources).add(BoxedSubscriptionSend::new(subscription))
  }

  pub fn downgrade(&self) -> WeakCell<T> { WeakCell(Arc::downgrade(&self.shared)) }

  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.shared, &other.shared) }
}
