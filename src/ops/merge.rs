//! Merging response cells into one response.

use std::{collections::HashMap, sync::Arc};

use crate::{
  cell::{CellItem, ObservableCell},
  response::ResponseCell,
  result::{merge_all as merge_results, merge_not_null, DataResult},
};

fn set_distinct<T: CellItem + PartialEq>(cell: &ObservableCell<T>, value: T) {
  if cell.value().as_ref() != Some(&value) {
    cell.set(value);
  }
}

/// A response merging the latest results of `first` and `second`, carrying
/// data only while both have data. Equal consecutive merges are skipped.
pub fn merge_with<A, B>(first: &ResponseCell<A>, second: &ResponseCell<B>) -> ResponseCell<(A, B)>
where
  A: CellItem + PartialEq,
  B: CellItem + PartialEq,
{
  let merged = ObservableCell::with_value(merge_not_null(first.value(), second.value()));
  let other = second.clone();
  merged.add_source(first, move |cell, a| set_distinct(cell, merge_not_null(a, other.value())));
  let other = first.clone();
  merged.add_source(second, move |cell, b| set_distinct(cell, merge_not_null(other.value(), b)));
  merged
}

/// A response merging the latest results of every keyed source. See
/// [`merge_all`](crate::result::merge_all) for how results combine.
pub fn merge_all<V>(sources: Vec<(String, ResponseCell<V>)>) -> ResponseCell<HashMap<String, Option<V>>>
where
  V: CellItem + PartialEq,
{
  let sources = Arc::new(sources);
  let merge = {
    let sources = sources.clone();
    move || -> DataResult<HashMap<String, Option<V>>> {
      merge_results(sources.iter().map(|(key, cell)| (key.clone(), cell.value())))
    }
  };
  let merge = Arc::new(merge);

  let merged = ObservableCell::with_value(merge());
  for (_, source) in sources.iter() {
    let merge = merge.clone();
    merged.add_source(source, move |cell, _| set_distinct(cell, merge()));
  }
  merged
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::{
    error::SharedError,
    result::{data_result_error, data_result_none, data_result_success, DataResultStatus},
  };

  #[rxresult_macro::test]
  fn merge_with_tracks_both_sides() {
    let first = ResponseCell::new_response();
    let second = ResponseCell::new_response();
    let merged = merge_with(&first, &second);
    assert_eq!(merged.value(), Some(data_result_none()));

    // an untouched side keeps the merge at `None`
    first.set_data(1);
    assert_eq!(merged.status(), Some(DataResultStatus::None));

    second.set_loading();
    assert_eq!(merged.status(), Some(DataResultStatus::Success));
    assert_eq!(merged.data(), None);
    second.set_data("b");
    assert_eq!(merged.data(), Some((1, "b")));
  }

  #[rxresult_macro::test]
  fn merge_with_skips_equal_merges() {
    let first = ObservableCell::with_value(data_result_success(1));
    let second = ObservableCell::with_value(data_result_success(2));
    let merged = merge_with(&first, &second);
    let count = Arc::new(Mutex::new(0));
    let c_count = count.clone();
    merged.own(merged.subscribe(move |_| *c_count.lock().unwrap() += 1));

    first.set(data_result_success(1));
    second.set(data_result_success(2));
    assert_eq!(*count.lock().unwrap(), 1);

    second.set(data_result_success(3));
    assert_eq!(*count.lock().unwrap(), 2);
    assert_eq!(merged.data(), Some((1, 3)));
  }

  #[rxresult_macro::test]
  fn merge_all_by_key() {
    let users = ObservableCell::with_value(data_result_success(1));
    let posts = ObservableCell::with_value(data_result_error(SharedError::msg("offline"), None));
    let merged = merge_all(vec![("users".into(), users.clone()), ("posts".into(), posts.clone())]);
    assert_eq!(merged.status(), Some(DataResultStatus::Error));
    assert_eq!(merged.data().unwrap().get("posts"), Some(&None));

    posts.set(data_result_success(2));
    let data = merged.data().unwrap();
    assert_eq!(merged.status(), Some(DataResultStatus::Success));
    assert_eq!(data.get("users"), Some(&Some(1)));
    assert_eq!(data.get("posts"), Some(&Some(2)));
  }

  #[rxresult_macro::test]
  fn merge_all_of_nothing_is_none() {
    let merged = merge_all::<i32>(vec![]);
    assert_eq!(merged.value(), Some(data_result_none()));
  }
}
