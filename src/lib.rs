//! Lesion: Live Configuration From a Directory Tree
//!
//! Every file below a root directory that a [`resolver::Resolver`] understands
//! becomes a [`fragment::Fragment`]: a value placed at a key derived from the
//! file's relative path (`config/db.json` lands at `config.db`). A
//! [`store::Store`] keeps the fragments in memory, assembles them into one
//! nested JSON value, and reconciles filesystem changes into per-fragment
//! diffs delivered to subscribers.
//!
//! ```no_run
//! use lesion::store::{Store, StoreOptions};
//!
//! let store = Store::open("./settings", StoreOptions::default())?;
//! println!("{}", store.value());
//! let _sub = store.on_change(|diff| println!("{:?}", diff));
//! # Ok::<(), lesion::error::StoreError>(())
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod logging;
pub mod resolver;
pub mod store;
pub mod subscription;
pub mod tree;
pub mod watch;

pub use error::{ResolutionError, StoreError, StoreFault, WatchError};
pub use fragment::{assemble, Fragment, FragmentDiff, FragmentKey};
pub use resolver::{Resolver, ResolverSet};
pub use store::{fetch, Store, StoreOptions};
pub use subscription::Subscription;
