use std::{collections::HashMap, ops::Add};

use super::{data_result_none, DataResult, DataResultStatus};

/// Merge two results into one carrying both payloads.
///
/// With one side absent the present side decides error and status. When
/// both are `None` the merge is `None`; otherwise the status is the higher
/// priority of the two and the error is the first one found. Data is kept
/// as a pair whenever at least one side has data.
pub fn merge<T, R>(
  first: Option<DataResult<T>>,
  second: Option<DataResult<R>>,
) -> DataResult<(Option<T>, Option<R>)> {
  match (first, second) {
    (Some(a), Some(b)) => {
      if a.is_none() && b.is_none() {
        return data_result_none();
      }
      let status = a.status.max(b.status);
      let error = a.error.or(b.error);
      DataResult::new(pair(a.data, b.data), error, status)
    }
    (a, b) => {
      let status = a
        .as_ref()
        .map(|a| a.status)
        .or_else(|| b.as_ref().map(|b| b.status))
        .unwrap_or(DataResultStatus::None);
      let (a_data, a_error) = a.map_or((None, None), |a| (a.data, a.error));
      let (b_data, b_error) = b.map_or((None, None), |b| (b.data, b.error));
      DataResult::new(pair(a_data, b_data), a_error.or(b_error), status)
    }
  }
}

/// Like [`merge`], but data is only kept when both sides carry data.
pub fn merge_not_null<T, R>(
  first: Option<DataResult<T>>,
  second: Option<DataResult<R>>,
) -> DataResult<(T, R)> {
  let merged = merge(first, second);
  let data = match merged.data {
    Some((Some(a), Some(b))) => Some((a, b)),
    _ => None,
  };
  DataResult::new(data, merged.error, merged.status)
}

/// Merge keyed results into one result over a map of their data.
///
/// The status is the highest priority among the entries, an absent entry
/// counting as `None`; if that is `None` the whole merge is `None`. The map
/// is only present when at least one entry has data, and the error is the
/// first one in iteration order.
pub fn merge_all<V>(
  entries: impl IntoIterator<Item = (String, Option<DataResult<V>>)>,
) -> DataResult<HashMap<String, Option<V>>> {
  let entries: Vec<_> = entries.into_iter().collect();
  let status = entries
    .iter()
    .map(|(_, r)| r.as_ref().map_or(DataResultStatus::None, |r| r.status))
    .max()
    .unwrap_or(DataResultStatus::None);
  if status == DataResultStatus::None {
    return data_result_none();
  }

  let mut error = None;
  let mut any_data = false;
  let mut data = HashMap::with_capacity(entries.len());
  for (key, result) in entries {
    let (value, err) = result.map_or((None, None), |r| (r.data, r.error));
    any_data |= value.is_some();
    if error.is_none() {
      error = err;
    }
    data.insert(key, value);
  }
  DataResult::new(any_data.then_some(data), error, status)
}

fn pair<T, R>(a: Option<T>, b: Option<R>) -> Option<(Option<T>, Option<R>)> {
  (a.is_some() || b.is_some()).then_some((a, b))
}

impl<T, R> Add<DataResult<R>> for DataResult<T> {
  type Output = DataResult<(Option<T>, Option<R>)>;

  fn add(self, rhs: DataResult<R>) -> Self::Output { merge(Some(self), Some(rhs)) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    error::SharedError,
    result::{data_result_error, data_result_loading, data_result_success},
  };

  #[rxresult_macro::test]
  fn one_side_absent() {
    let merged = merge::<i32, i32>(Some(data_result_loading(1, None)), None);
    assert_eq!(merged.data, Some((Some(1), None)));
    assert!(merged.is_loading());

    let err = SharedError::msg("b");
    let merged = merge::<i32, i32>(None, Some(data_result_error(err.clone(), None)));
    assert_eq!(merged.data, None);
    assert_eq!(merged.error, Some(err));
    assert!(merged.is_error());

    assert!(merge::<i32, i32>(None, None).is_none());
  }

  #[rxresult_macro::test]
  fn both_none_is_none() {
    let merged = merge(
      Some(DataResult::new(Some(1), None, DataResultStatus::None)),
      Some(data_result_none::<i32>()),
    );
    assert_eq!(merged, data_result_none());
  }

  #[rxresult_macro::test]
  fn highest_priority_status_wins() {
    let first_err = SharedError::msg("first");
    let second_err = SharedError::msg("second");
    let merged = data_result_loading(1, Some(first_err.clone()))
      + data_result_error(second_err, "b".to_string());

    assert!(merged.is_error());
    assert_eq!(merged.error, Some(first_err));
    assert_eq!(merged.data, Some((Some(1), Some("b".to_string()))));

    let merged = data_result_success(1) + data_result_none::<i32>();
    assert!(merged.is_none());
    assert_eq!(merged.data, Some((Some(1), None)));
  }

  #[rxresult_macro::test]
  fn not_null_needs_both_values() {
    let merged = merge_not_null(Some(data_result_success(1)), Some(data_result_success::<i32>(None)));
    assert_eq!(merged.data, None);
    assert!(merged.is_success());

    let merged = merge_not_null(Some(data_result_success(1)), Some(data_result_success(2)));
    assert_eq!(merged.data, Some((1, 2)));
  }

  #[rxresult_macro::test]
  fn merge_all_keyed() {
    let err = SharedError::msg("second");
    let merged = merge_all(vec![
      ("a".to_string(), Some(data_result_success(1))),
      ("b".to_string(), Some(data_result_error(err.clone(), None))),
      ("c".to_string(), Some(data_result_loading(3, None))),
    ]);

    assert!(merged.is_error());
    assert_eq!(merged.error, Some(err));
    let data = merged.data.unwrap();
    assert_eq!(data["a"], Some(1));
    assert_eq!(data["b"], None);
    assert_eq!(data["c"], Some(3));
  }

  #[rxresult_macro::test]
  fn merge_all_short_circuits_on_none() {
    let merged = merge_all(vec![
      ("a".to_string(), Some(data_result_success(1))),
      ("b".to_string(), None),
    ]);
    assert_eq!(merged, data_result_none());

    assert!(merge_all::<i32>(vec![]).is_none());
  }

  #[rxresult_macro::test]
  fn merge_all_without_data() {
    let merged = merge_all(vec![
      ("a".to_string(), Some(data_result_success::<i32>(None))),
      ("b".to_string(), Some(data_result_loading(None, None))),
    ]);
    assert!(merged.is_success());
    assert_eq!(merged.data, None);
  }
}
