//! Prelude module for convenient imports

// Cells
pub use crate::cell::{CellItem, CellStream, CellSubscription, ObservableCell, WeakCell};
// Errors
pub use crate::error::{BoxError, ObserveError, PanicError, SharedError};
// Operators
pub use crate::ops::{
  chain::{chain_not_null_with, chain_not_null_with_async, chain_with, chain_with_async},
  combine::{combine, combine_not_null, combine_not_null_with, combine_with},
  merge::{merge_all as merge_all_cells, merge_with},
  pair::only_with_values,
  transform::{FailMode, NotNullTransform, NullableTransform, ResponseFailMode, ResponseTransform},
};
// Responses
pub use crate::response::{
  ErrorTransformer, OnErrorReturn, ResponseCell, ResponseEmitter, SwapResponseCell,
};
// Results
pub use crate::result::{
  data_result_error, data_result_loading, data_result_none, data_result_success, merge, merge_all,
  merge_not_null, DataResult, DataResultStatus, ItemShape,
};
// Dispatching
pub use crate::scheduler::{default_dispatcher, set_default_dispatcher, Dispatcher};
// Subscription
pub use crate::subscription::Subscription;
// Observation
pub use crate::{
  observer::WrapObserver,
  wrapper::{Attachment, EventDataStatus, ObserveEvent, ObserveWrapper},
};
