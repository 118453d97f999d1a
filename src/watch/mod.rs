//! Filesystem change notification and batch normalization.
//!
//! ```text
//! notify watcher -> FsNotifier worker (batch window) -> sink
//!                                                        |
//!                                       normalize(batch) -> ReconciliationEngine
//! ```

mod event;
mod normalize;
mod notifier;

pub use event::{ChangeAction, ChangeEvent};
pub use normalize::normalize;
pub use notifier::{
    convert_event, BatchSink, ChangeNotifier, FsNotifier, NotifierHandle, NotifierSignal,
    DEFAULT_BATCH_WINDOW_MS,
};
