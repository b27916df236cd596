use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, LinkedList, VecDeque};

/// How list-shape predicates see a payload.
///
/// Collections and maps report their length; every other payload reports
/// `None` and never matches an empty, not-empty, one-item or many-items
/// check.
pub trait ItemShape {
  fn item_count(&self) -> Option<usize>;
}

macro_rules! collection_shape {
  ($($t:ty),* $(,)?) => {
    $(
      impl<T> ItemShape for $t {
        #[inline]
        fn item_count(&self) -> Option<usize> { Some(self.len()) }
      }
    )*
  };
}

collection_shape!(Vec<T>, VecDeque<T>, LinkedList<T>, HashSet<T>, BTreeSet<T>);

impl<T, const N: usize> ItemShape for [T; N] {
  #[inline]
  fn item_count(&self) -> Option<usize> { Some(N) }
}

impl<K, V> ItemShape for HashMap<K, V> {
  #[inline]
  fn item_count(&self) -> Option<usize> { Some(self.len()) }
}

impl<K, V> ItemShape for BTreeMap<K, V> {
  #[inline]
  fn item_count(&self) -> Option<usize> { Some(self.len()) }
}

macro_rules! scalar_shape {
  ($($t:ty),* $(,)?) => {
    $(
      impl ItemShape for $t {
        #[inline]
        fn item_count(&self) -> Option<usize> { None }
      }
    )*
  };
}

scalar_shape!(
  (),
  bool,
  char,
  String,
  &'static str,
  i8,
  i16,
  i32,
  i64,
  i128,
  isize,
  u8,
  u16,
  u32,
  u64,
  u128,
  usize,
  f32,
  f64,
);

impl<T: ItemShape> ItemShape for Box<T> {
  #[inline]
  fn item_count(&self) -> Option<usize> { (**self).item_count() }
}

impl<T: ItemShape> ItemShape for std::sync::Arc<T> {
  #[inline]
  fn item_count(&self) -> Option<usize> { (**self).item_count() }
}
