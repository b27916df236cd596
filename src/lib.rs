//! # rxresult: tri-state results and reactive cells
//!
//! A [`DataResult`] carries optional data, an optional error and a status.
//! Results flow through [`ObservableCell`]s, and an [`ObserveWrapper`] splits
//! each result into as many filtered, optionally single-shot callbacks as
//! needed.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxresult::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let users = ResponseCell::<Vec<String>>::new_response();
//! let attachment = users.observe(|w| {
//!   w.show_loading(|| println!("loading"))
//!     .data(|names| println!("{} users", names.len()))
//!     .error(|e| println!("failed: {e}"));
//! });
//!
//! users.set_loading();
//! users.set_data(vec!["ana".into(), "bo".into()]);
//! # attachment.detach();
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DataResult`] | Data, error and status of one outcome |
//! | [`ObserveWrapper`] | Events dispatched for every result |
//! | [`ObservableCell`] | Last-value container pushing to its observers |
//! | [`ResponseCell`] | A cell of results with setters and operators |
//! | [`Dispatcher`] | Where transformations run |
//!
//! Combinators live in [`ops`]: [`combine`](ops::combine::combine),
//! [`chain_with`](ops::chain::chain_with) and their variants pair cells
//! while keeping track of absent and uninitialized values.
//!
//! [`DataResult`]: result::DataResult
//! [`ObserveWrapper`]: wrapper::ObserveWrapper
//! [`ObservableCell`]: cell::ObservableCell
//! [`ResponseCell`]: response::ResponseCell
//! [`Dispatcher`]: scheduler::Dispatcher

pub mod cell;
pub mod error;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod response;
pub mod result;
pub mod scheduler;
pub mod subscription;
pub mod wrapper;

pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
