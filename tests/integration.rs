use std::{
  sync::{Arc, Mutex, Once},
  time::Duration,
};

use futures::StreamExt;
use rxresult::prelude::*;

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
  static INIT: Once = Once::new();
  INIT.call_once(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  });
}

fn push(log: &Log, entry: impl Into<String>) { log.lock().unwrap().push(entry.into()); }

async fn settle() {
  for _ in 0..20 {
    tokio::task::yield_now().await;
  }
}

#[rxresult_macro::test]
async fn response_pipeline_drives_a_wrapper() {
  init_tracing();
  let log: Log = Default::default();
  let users = ResponseCell::<Vec<&'static str>>::new_response();

  let l = log.clone();
  let attachment = users.map(|names| Ok(names.len())).observe(move |w| {
    let (a, b, c, d) = (l.clone(), l.clone(), l.clone(), l.clone());
    w.transform_dispatcher(Dispatcher::Inline)
      .show_loading(move || push(&a, "show loading"))
      .hide_loading(move || push(&b, "hide loading"))
      .data(move |n| push(&c, format!("{n} users")))
      .error(move |e| push(&d, format!("error {e}")));
  });
  settle().await;

  users.set_loading();
  settle().await;
  users.set_data(vec!["ana", "bo"]);
  settle().await;
  users.set_error(SharedError::msg("offline"));
  settle().await;

  assert_eq!(
    *log.lock().unwrap(),
    vec![
      "show loading",
      "hide loading",
      "2 users",
      "hide loading",
      "error offline",
    ]
  );
  attachment.detach();
}

#[rxresult_macro::test]
async fn panicking_observer_is_retried_through_the_error_event() {
  init_tracing();
  let log: Log = Default::default();
  let cell = ResponseCell::<i32>::new();

  let mut w = ObserveWrapper::new();
  let l = log.clone();
  w.data(|_| panic!("render failed"));
  w.error(move |e| push(&l, e.to_string()));
  let attachment = w.attach_to(&cell);

  cell.set_data(1);
  settle().await;
  assert_eq!(*log.lock().unwrap(), vec!["observer panicked: render failed"]);
  assert!(attachment.is_attached());

  attachment.detach();
  assert!(attachment.join().await.is_ok());
}

#[rxresult_macro::test(shared)]
async fn combine_with_runs_on_the_blocking_pool() {
  init_tracing();
  let width = ObservableCell::with_value(3);
  let height = ObservableCell::with_value(4);
  let area = combine_not_null_with(
    &width,
    &height,
    NotNullTransform::omit_fail(|w: i32, h: i32| Ok(w * h)).on(Dispatcher::Blocking),
  );

  let mut values = area.to_stream();
  let first = tokio::time::timeout(Duration::from_secs(1), values.next()).await;
  assert_eq!(first.ok().flatten(), Some(Some(12)));

  height.set(5);
  let second = tokio::time::timeout(Duration::from_secs(1), values.next()).await;
  assert_eq!(second.ok().flatten(), Some(Some(15)));
}

#[rxresult_macro::test]
async fn chain_follows_the_selected_account() {
  init_tracing();
  let accounts: Vec<ResponseCell<u32>> =
    (0..2).map(|i| ObservableCell::with_value(data_result_success(i * 100))).collect();
  let selected = ResponseCell::new_response();

  let c_accounts = accounts.clone();
  let balance = selected.chain_not_null_with(
    move |r: DataResult<usize>| {
      let index = r.data.ok_or("no selection")?;
      c_accounts.get(index).cloned().ok_or_else(|| "unknown account".into())
    },
    |r| r.is_success(),
  );

  selected.set_data(1);
  assert_eq!(balance.data(), Some((1, 100)));
  accounts[1].set_data(150);
  assert_eq!(balance.data(), Some((1, 150)));

  selected.set_data(0);
  accounts[1].set_data(175);
  assert_eq!(balance.data(), Some((0, 0)));

  let attachment = balance.observe(|w| {
    w.data(|(index, amount)| assert_eq!((index, amount), (0, 0))).single();
  });
  assert!(attachment.join().await.is_ok());
}

#[rxresult_macro::test]
async fn swap_cell_refreshes_after_errors() {
  init_tracing();
  let swap = SwapResponseCell::<String>::new();
  assert!(swap.needs_refresh());

  let failing = ResponseCell::<String>::new_response();
  swap.swap_source(&failing, false);
  failing.set_error(SharedError::msg("timeout"));
  assert!(swap.needs_refresh());

  let retry = ResponseCell::<u32>::new_response();
  swap.swap_source_with(&retry, |r| Ok(r.map(|n| format!("#{n}"))));
  retry.set_data(7);
  assert!(!swap.needs_refresh());
  assert_eq!(swap.data(), Some("#7".to_string()));

  let merged = merge_with(swap.cell(), &retry);
  assert_eq!(merged.data(), Some(("#7".to_string(), 7)));
  let all = merge_all_cells(vec![("label".into(), swap.cell().clone())]);
  assert_eq!(all.data().and_then(|m| m.get("label").cloned().flatten()), Some("#7".to_string()));
}
