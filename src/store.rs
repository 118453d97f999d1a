//! Store Facade
//!
//! A [`Store`] seeds its fragment cache from a full walk of the root, then
//! starts a [`ChangeNotifier`] and reconciles each delivered batch against
//! the cache. Readers always get copies; subscribers get every diff in the
//! order the cache was mutated.
//!
//! A batch is applied one file at a time: each diff is published right after
//! its own cache mutation and before the next one, so a subscriber reading
//! the store sees the state that diff describes. Batches never interleave,
//! and once [`Store::close`] returns no further diff or fault is published,
//! even when it was called from inside a callback.

use crate::config::LesionConfig;
use crate::engine::{EngineEvent, ReconciliationEngine};
use crate::error::{StoreError, StoreFault, WatchError};
use crate::fragment::{assemble, resolve_fragment, Fragment, FragmentDiff, FragmentKey};
use crate::resolver::ResolverSet;
use crate::subscription::{Registry, Subscription};
use crate::tree::path::canonicalize_path;
use crate::tree::walker::{Walker, WalkerConfig};
use crate::watch::{
    normalize, BatchSink, ChangeEvent, ChangeNotifier, FsNotifier, NotifierHandle, NotifierSignal,
};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Construction options for a [`Store`]
#[derive(Clone)]
pub struct StoreOptions {
    /// Resolvers, in priority order
    pub resolvers: ResolverSet,
    /// Walk configuration (ignore patterns, symlinks, depth)
    pub walker: WalkerConfig,
    /// Source of change batches
    pub notifier: Arc<dyn ChangeNotifier>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::new(ResolverSet::builtin())
    }
}

impl StoreOptions {
    pub fn new(resolvers: ResolverSet) -> Self {
        Self {
            resolvers,
            walker: WalkerConfig::default(),
            notifier: Arc::new(FsNotifier::default()),
        }
    }

    /// Options derived from loaded configuration.
    pub fn from_config(config: &LesionConfig, resolvers: ResolverSet) -> Self {
        Self {
            resolvers,
            walker: config.watch.walker_config(),
            notifier: Arc::new(FsNotifier::new(Duration::from_millis(
                config.watch.batch_window_ms,
            ))),
        }
    }

    pub fn with_walker_config(mut self, walker: WalkerConfig) -> Self {
        self.walker = walker;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

struct Shared {
    root: PathBuf,
    engine: RwLock<ReconciliationEngine>,
    // Held for a whole batch; reentrant so subscribers may call `close`.
    reconcile: ReentrantMutex<()>,
    closed: AtomicBool,
    failure: Mutex<Option<String>>,
    changes: Registry<FragmentDiff>,
    faults: Registry<StoreFault>,
}

impl Shared {
    fn handle_signal(&self, signal: NotifierSignal) {
        match signal {
            NotifierSignal::Batch(raw) => self.reconcile_batch(raw),
            NotifierSignal::Failed(error) => self.fail(error),
        }
    }

    fn is_active(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.failure.lock().is_none()
    }

    fn reconcile_batch(&self, raw: Vec<ChangeEvent>) {
        let _guard = self.reconcile.lock();
        if !self.is_active() {
            return;
        }

        let raw_count = raw.len();
        let raw: Vec<ChangeEvent> = {
            let engine = self.engine.read();
            let walker = engine.walker();
            raw.into_iter()
                .filter(|event| !event.paths().all(|p| walker.is_ignored(p)))
                .collect()
        };
        let events = normalize(&raw);
        if events.is_empty() {
            debug!(raw = raw_count, "Batch normalized to nothing");
            return;
        }
        debug!(raw = raw_count, normalized = events.len(), "Reconciling change batch");

        let mut diff_count = 0;
        for event in &events {
            let steps = self.engine.read().plan(event);
            for step in &steps {
                // Closing mid-batch cancels the steps not yet applied.
                if self.closed.load(Ordering::Acquire) {
                    debug!("Store closed during reconciliation");
                    return;
                }

                let mut outputs = Vec::new();
                self.engine.write().step(step, &mut |out| outputs.push(out));

                // A subscriber may close the store from inside a callback.
                let open = || !self.closed.load(Ordering::Acquire);
                for output in outputs {
                    match output {
                        EngineEvent::Diff(diff) => {
                            diff_count += 1;
                            self.changes.publish_while(&diff, open);
                        }
                        EngineEvent::ResolutionFailed(e) => {
                            self.faults.publish_while(&StoreFault::Resolution(e), open);
                        }
                    }
                }
            }
        }

        info!(
            event_count = events.len(),
            diff_count, "Processed change events"
        );
    }

    fn fail(&self, error: WatchError) {
        let _guard = self.reconcile.lock();
        if !self.is_active() {
            return;
        }
        error!(
            root = %self.root.display(),
            error = %error,
            "Store watch failed, close and reopen the store"
        );
        *self.failure.lock() = Some(error.to_string());
        self.faults.publish(&StoreFault::Watch(error));
    }
}

/// Live, filesystem-backed store.
///
/// Dropping the store closes it.
pub struct Store {
    shared: Arc<Shared>,
    handle: Mutex<Option<Box<dyn NotifierHandle>>>,
}

impl Store {
    /// Walk and resolve `root`, then start watching it.
    ///
    /// Returns only once the initial fragments are cached and the notifier
    /// is running.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StoreError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(StoreError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "Store root is not a directory: {:?}",
                root
            )));
        }
        let root = canonicalize_path(root)?;

        let walker = Walker::with_config(root.clone(), options.walker);
        let mut engine = ReconciliationEngine::new(root.clone(), options.resolvers, walker);
        let failures = engine.seed();
        info!(
            fragments = engine.len(),
            failures = failures.len(),
            "Initial store load complete"
        );

        let shared = Arc::new(Shared {
            root: root.clone(),
            engine: RwLock::new(engine),
            reconcile: ReentrantMutex::new(()),
            closed: AtomicBool::new(false),
            failure: Mutex::new(None),
            changes: Registry::new(),
            faults: Registry::new(),
        });

        let sink: BatchSink = {
            let shared: Weak<Shared> = Arc::downgrade(&shared);
            Arc::new(move |signal: NotifierSignal| {
                if let Some(shared) = shared.upgrade() {
                    shared.handle_signal(signal);
                }
            })
        };
        let handle = options.notifier.start(&root, sink)?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// [`Store::open`] on tokio's blocking pool.
    pub async fn open_async(
        root: impl Into<PathBuf>,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::task::spawn_blocking(move || Store::open(root, options))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Canonical store root
    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// Every file currently below the root, resolvable or not.
    pub fn walk(&self) -> Vec<PathBuf> {
        let walker = self.shared.engine.read().walker().clone();
        walker.walk()
    }

    /// Copy of all current fragments, ordered by file path.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.shared.engine.read().fragments()
    }

    /// Assemble the current fragments into one nested value.
    pub fn value(&self) -> Value {
        assemble(&self.fragments())
    }

    /// Fragment with exactly this key, if any.
    ///
    /// A string argument goes through [`FragmentKey::parse`]; keys with a dot
    /// inside a segment must be passed as segments, e.g. `["v1.2", "app"]`.
    pub fn get(&self, key: impl Into<FragmentKey>) -> Option<Fragment> {
        let key = key.into();
        self.shared.engine.read().get(&key).cloned()
    }

    pub fn has(&self, key: impl Into<FragmentKey>) -> bool {
        let key = key.into();
        self.shared.engine.read().get(&key).is_some()
    }

    /// Call `callback` with every diff as it is produced.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FragmentDiff) + Send + Sync + 'static,
    {
        self.shared.changes.subscribe(callback)
    }

    /// Call `callback` with per-file resolution errors and watch failures.
    pub fn on_error<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StoreFault) + Send + Sync + 'static,
    {
        self.shared.faults.subscribe(callback)
    }

    /// Terminal watch failure, if the notifier died.
    pub fn failure(&self) -> Option<String> {
        self.shared.failure.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Stop watching. Waits for an in-flight batch; no diffs follow.
    pub fn close(&self) {
        let first = !self.shared.closed.swap(true, Ordering::AcqRel);
        drop(self.shared.reconcile.lock());

        if let Some(mut handle) = self.handle.lock().take() {
            handle.stop();
        }
        if first {
            info!(root = %self.shared.root.display(), "Store closed");
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.shared.root)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One-shot walk, resolve and assemble of `root` without watching.
///
/// Files that fail to resolve are logged and left out.
pub fn fetch(root: impl AsRef<Path>, resolvers: &ResolverSet) -> Result<Value, StoreError> {
    fetch_with_config(root, resolvers, WalkerConfig::default())
}

/// [`fetch`] with explicit walk settings.
pub fn fetch_with_config(
    root: impl AsRef<Path>,
    resolvers: &ResolverSet,
    walker: WalkerConfig,
) -> Result<Value, StoreError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(StoreError::RootNotFound(root.to_path_buf()));
    }
    let root = canonicalize_path(root)?;

    let mut fragments = Vec::new();
    for file in Walker::with_config(root.clone(), walker).walk() {
        match resolve_fragment(&root, resolvers, &file) {
            Ok(Some(fragment)) => fragments.push(fragment),
            Ok(None) => {}
            Err(e) => warn!(path = %file.display(), error = %e, "Failed to resolve file"),
        }
    }

    Ok(assemble(&fragments))
}
