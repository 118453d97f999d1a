//! Change notifiers: sources of raw change batches
//!
//! [`FsNotifier`] wraps `notify`'s recommended watcher. A worker thread
//! converts raw notify events into [`ChangeEvent`]s and groups everything
//! that arrives within one batch window into a single delivery.

use super::event::ChangeEvent;
use crate::error::WatchError;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

/// Default batch window in milliseconds
pub const DEFAULT_BATCH_WINDOW_MS: u64 = 50;

// How long the worker sleeps between stop checks while idle.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// What a notifier delivers to its sink
#[derive(Debug)]
pub enum NotifierSignal {
    /// Raw events of one coalesced filesystem flush
    Batch(Vec<ChangeEvent>),
    /// The watch is dead; no further signals follow.
    Failed(WatchError),
}

/// Receiver of notifier signals.
pub type BatchSink = Arc<dyn Fn(NotifierSignal) + Send + Sync>;

/// Source of raw change batches for a root directory.
pub trait ChangeNotifier: Send + Sync {
    /// Start watching `root` recursively, delivering signals to `sink`.
    fn start(&self, root: &Path, sink: BatchSink) -> Result<Box<dyn NotifierHandle>, WatchError>;
}

/// Running watch returned by [`ChangeNotifier::start`].
pub trait NotifierHandle: Send {
    /// Cease delivery and release watch resources. Must be idempotent.
    fn stop(&mut self);
}

/// Native filesystem notifier
#[derive(Debug, Clone)]
pub struct FsNotifier {
    batch_window: Duration,
}

impl Default for FsNotifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_BATCH_WINDOW_MS))
    }
}

impl FsNotifier {
    pub fn new(batch_window: Duration) -> Self {
        Self { batch_window }
    }

    pub fn batch_window(&self) -> Duration {
        self.batch_window
    }
}

impl ChangeNotifier for FsNotifier {
    fn start(&self, root: &Path, sink: BatchSink) -> Result<Box<dyn NotifierHandle>, WatchError> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            // The receiver is gone once the handle is stopped.
            let _ = tx.send(res);
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        let stopped = Arc::new(AtomicBool::new(false));
        let worker = {
            let stopped = Arc::clone(&stopped);
            let batch_window = self.batch_window;
            std::thread::Builder::new()
                .name("lesion-notifier".to_string())
                .spawn(move || batch_loop(rx, batch_window, sink, stopped))
                .map_err(|e| WatchError::InitFailed {
                    reason: format!("Failed to spawn notifier worker: {}", e),
                })?
        };

        info!(root = %root.display(), batch_window_ms = self.batch_window.as_millis() as u64, "Watching store root");

        Ok(Box::new(FsNotifierHandle {
            watcher: Some(watcher),
            worker: Some(worker),
            stopped,
        }))
    }
}

struct FsNotifierHandle {
    watcher: Option<notify::RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
    stopped: Arc<AtomicBool>,
}

impl NotifierHandle for FsNotifierHandle {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        // Dropping the watcher disconnects the worker's channel.
        self.watcher.take();

        if let Some(worker) = self.worker.take() {
            // A subscriber may stop the store from inside a delivery.
            if worker.thread().id() == std::thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                error!("Notifier worker panicked");
            }
        }
        debug!("Notifier stopped");
    }
}

impl Drop for FsNotifierHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn batch_loop(
    rx: mpsc::Receiver<notify::Result<Event>>,
    batch_window: Duration,
    sink: BatchSink,
    stopped: Arc<AtomicBool>,
) {
    let mut pending: Vec<ChangeEvent> = Vec::new();
    let mut batch_started: Option<Instant> = None;

    loop {
        if stopped.load(Ordering::Acquire) {
            break;
        }

        let timeout = match batch_started {
            Some(started) => batch_window.saturating_sub(started.elapsed()),
            None => IDLE_POLL,
        };

        match rx.recv_timeout(timeout) {
            Ok(Ok(event)) => {
                let converted = convert_event(event);
                if !converted.is_empty() {
                    batch_started.get_or_insert_with(Instant::now);
                    pending.extend(converted);
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Watch error, stopping notifier");
                sink(NotifierSignal::Failed(WatchError::EventError {
                    details: e.to_string(),
                }));
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                debug!("Watcher channel disconnected");
                break;
            }
        }

        let window_elapsed = batch_started.is_some_and(|started| started.elapsed() >= batch_window);
        if window_elapsed && !stopped.load(Ordering::Acquire) {
            batch_started = None;
            let batch = std::mem::take(&mut pending);
            trace!(event_count = batch.len(), "Delivering raw batch");
            sink(NotifierSignal::Batch(batch));
        }
    }
}

/// Convert a notify event into zero or more change events.
pub fn convert_event(event: Event) -> Vec<ChangeEvent> {
    let paths = event.paths;
    match event.kind {
        EventKind::Create(_) => paths.into_iter().map(ChangeEvent::created).collect(),
        EventKind::Remove(_) => paths.into_iter().map(ChangeEvent::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both if paths.len() >= 2 => {
                vec![ChangeEvent::renamed(paths[0].clone(), paths[1].clone())]
            }
            RenameMode::From => paths.into_iter().map(ChangeEvent::deleted).collect(),
            RenameMode::To => paths.into_iter().map(ChangeEvent::created).collect(),
            // Backends that cannot tell the side apart report only the path.
            _ => paths
                .into_iter()
                .map(|p| {
                    if p.exists() {
                        ChangeEvent::created(p)
                    } else {
                        ChangeEvent::deleted(p)
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Any => {
            paths.into_iter().map(ChangeEvent::modified).collect()
        }
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}
