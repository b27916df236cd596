use smallvec::SmallVec;

use super::Subscription;

/// Id-addressed storage for the upstream subscriptions of a cell.
///
/// A mediator cell usually tracks one or two sources, so the entries live
/// inline in a `SmallVec` until more are added. Ids are never reused, a
/// stale id handed back to [`remove`](Self::remove) finds nothing.
///
/// ```rust
/// use rxresult::subscription::{DynamicSubscriptions, FlagSubscription};
///
/// let mut sources = DynamicSubscriptions::default();
/// let first = sources.add(FlagSubscription::new());
/// let second = sources.add(FlagSubscription::new());
///
/// assert!(sources.remove(first).is_some());
/// assert!(sources.remove(first).is_none());
/// assert!(sources.contains(second));
/// sources.unsubscribe_all();
/// assert!(sources.is_empty());
/// ```
pub struct DynamicSubscriptions<U> {
  next_id: usize,
  items: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for DynamicSubscriptions<U> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<U> DynamicSubscriptions<U> {
  /// Store `item` and return the id that removes it again.
  pub fn add(&mut self, item: U) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, item));
    id
  }

  pub fn remove(&mut self, id: usize) -> Option<U> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn contains(&self, id: usize) -> bool { self.items.iter().any(|(i, _)| *i == id) }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Take every entry out, oldest first.
  pub fn take_all(&mut self) -> Vec<U> { self.items.drain(..).map(|(_, item)| item).collect() }
}

impl<U: Subscription> DynamicSubscriptions<U> {
  /// Unsubscribe every entry and leave the container empty.
  pub fn unsubscribe_all(&mut self) {
    for item in self.take_all() {
      item.unsubscribe();
    }
  }
}
