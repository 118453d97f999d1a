//! Shared test utilities for integration tests
//!
//! Provides an in-process notifier that delivers hand-built batches, subscriber
//! recorders, and isolated XDG environments for configuration tests.

use lesion::error::WatchError;
use lesion::fragment::FragmentDiff;
use lesion::resolver::ResolverSet;
use lesion::store::{Store, StoreOptions};
use lesion::subscription::Subscription;
use lesion::watch::{BatchSink, ChangeEvent, ChangeNotifier, NotifierHandle, NotifierSignal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[derive(Default)]
struct ManualState {
    root: Option<PathBuf>,
    sink: Option<BatchSink>,
    stopped: bool,
}

/// Notifier whose batches are pushed by the test itself.
#[derive(Clone, Default)]
pub struct ManualNotifier {
    state: Arc<Mutex<ManualState>>,
}

struct ManualHandle {
    state: Arc<Mutex<ManualState>>,
}

impl NotifierHandle for ManualHandle {
    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.stopped = true;
        state.sink = None;
    }
}

impl ChangeNotifier for ManualNotifier {
    fn start(&self, root: &Path, sink: BatchSink) -> Result<Box<dyn NotifierHandle>, WatchError> {
        let mut state = self.state.lock().unwrap();
        state.root = Some(root.to_path_buf());
        state.sink = Some(sink);
        state.stopped = false;
        Ok(Box::new(ManualHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

impl ManualNotifier {
    /// Deliver one raw batch. Returns false once the handle was stopped.
    pub fn deliver(&self, events: Vec<ChangeEvent>) -> bool {
        self.signal(NotifierSignal::Batch(events))
    }

    pub fn fail(&self, details: &str) -> bool {
        self.signal(NotifierSignal::Failed(WatchError::EventError {
            details: details.to_string(),
        }))
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }

    pub fn watched_root(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().root.clone()
    }

    fn signal(&self, signal: NotifierSignal) -> bool {
        // The sink may stop the handle, which needs the lock.
        let sink = self.state.lock().unwrap().sink.clone();
        match sink {
            Some(sink) => {
                sink(signal);
                true
            }
            None => false,
        }
    }
}

/// A store over a temp dir, fed by a [`ManualNotifier`].
pub struct Fixture {
    pub store: Store,
    pub notifier: ManualNotifier,
    pub dir: TempDir,
}

impl Fixture {
    /// Write `files` (relative path, contents), then open the store.
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self::with_resolvers(files, ResolverSet::builtin())
    }

    pub fn with_resolvers(files: &[(&str, &str)], resolvers: ResolverSet) -> Self {
        let dir = TempDir::new().unwrap();
        for (relative, contents) in files {
            write_file(dir.path(), relative, contents);
        }
        let notifier = ManualNotifier::default();
        let options = StoreOptions::new(resolvers).with_notifier(Arc::new(notifier.clone()));
        let store = Store::open(dir.path(), options).unwrap();
        Self {
            store,
            notifier,
            dir,
        }
    }

    /// Absolute path below the canonical store root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.store.root().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        write_file(self.store.root(), relative, contents)
    }
}

pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

/// Record every diff the store emits.
pub fn record_changes(store: &Store) -> (Subscription, Arc<Mutex<Vec<FragmentDiff>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sub = {
        let seen = Arc::clone(&seen);
        store.on_change(move |diff| seen.lock().unwrap().push(diff.clone()))
    };
    (sub, seen)
}

/// Record every fault as (message, is_terminal).
pub fn record_faults(store: &Store) -> (Subscription, Arc<Mutex<Vec<(String, bool)>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sub = {
        let seen = Arc::clone(&seen);
        store.on_error(move |fault| {
            seen.lock()
                .unwrap()
                .push((fault.to_string(), fault.is_terminal()))
        })
    };
    (sub, seen)
}

/// Environment variable state to restore after test
struct EnvState {
    vars: Vec<(String, Option<String>)>,
}

impl EnvState {
    fn capture(names: &[&str]) -> Self {
        Self {
            vars: names
                .iter()
                .map(|name| (name.to_string(), std::env::var(name).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.vars {
            match value {
                Some(orig) => std::env::set_var(&name, orig),
                None => std::env::remove_var(&name),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`, plus the
/// given extra variables set.
///
/// The global configuration file lives at `test_dir/lesion/config.toml`.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, extra: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut names = vec!["HOME", "XDG_CONFIG_HOME"];
    names.extend(extra.iter().map(|(name, _)| *name));
    let env_state = EnvState::capture(&names);

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());
    for (name, value) in extra {
        std::env::set_var(name, value);
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    env_state.restore();

    match result {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
