//! Reconciliation Engine
//!
//! Owns the fragment cache (absolute file path -> fragment) and applies
//! normalized change events to it. Each event is planned as a list of
//! per-file [`Step`]s; every step mutates at most one cache entry and reports
//! it through an [`EngineEvent`] callback immediately after it happens, so
//! observers see mutations in exactly the order they were applied.
//!
//! Matching of `deleted`/`modified` paths against cached entries is by whole
//! path components (see [`is_within`]): deleting `/root/foo` never touches
//! `/root/foobar`.
//!
//! When a file that is cached can no longer be resolved (gone, no longer
//! matched by a resolver, or failing to deserialize) its entry is removed and
//! a deletion diff is emitted. Deserialization failures are reported as
//! [`EngineEvent::ResolutionFailed`] as well.

use crate::error::ResolutionError;
use crate::fragment::{resolve_fragment, Fragment, FragmentDiff, FragmentKey};
use crate::resolver::ResolverSet;
use crate::tree::path::{is_within, rebase};
use crate::tree::walker::Walker;
use crate::watch::{ChangeAction, ChangeEvent};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Output of a reconciliation step
#[derive(Debug)]
pub enum EngineEvent {
    Diff(FragmentDiff),
    ResolutionFailed(ResolutionError),
}

/// One cache mutation planned from a change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Re-resolve `target`, replacing whatever was cached at `source`.
    Refresh { source: PathBuf, target: PathBuf },
    /// Drop the entry cached for this file.
    Remove(PathBuf),
    /// Carry the entry at `from` over to the renamed file `to`.
    Move { from: PathBuf, to: PathBuf },
}

/// Single-writer owner of the fragment cache.
pub struct ReconciliationEngine {
    root: PathBuf,
    resolvers: ResolverSet,
    walker: Walker,
    cache: BTreeMap<PathBuf, Fragment>,
}

impl ReconciliationEngine {
    /// Create an engine with an empty cache. `walker` must be rooted at `root`.
    pub fn new(root: PathBuf, resolvers: ResolverSet, walker: Walker) -> Self {
        Self {
            root,
            resolvers,
            walker,
            cache: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn walker(&self) -> &Walker {
        &self.walker
    }

    /// Populate the cache from a full walk of the root.
    ///
    /// Returns the files that failed to resolve; they are left out.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn seed(&mut self) -> Vec<ResolutionError> {
        let mut failures = Vec::new();
        for file in self.walker.walk() {
            match resolve_fragment(&self.root, &self.resolvers, &file) {
                Ok(Some(fragment)) => {
                    self.cache.insert(file, fragment);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Failed to resolve file");
                    failures.push(e);
                }
            }
        }
        debug!(fragments = self.cache.len(), failures = failures.len(), "Seeded fragment cache");
        failures
    }

    /// Apply a normalized batch in order.
    pub fn apply_batch<F>(&mut self, events: &[ChangeEvent], emit: &mut F)
    where
        F: FnMut(EngineEvent),
    {
        for event in events {
            self.apply(event, emit);
        }
    }

    /// Apply one normalized event.
    pub fn apply<F>(&mut self, event: &ChangeEvent, emit: &mut F)
    where
        F: FnMut(EngineEvent),
    {
        for step in self.plan(event) {
            self.step(&step, emit);
        }
    }

    /// Apply a batch and collect everything it produced.
    pub fn apply_collect(&mut self, events: &[ChangeEvent]) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        self.apply_batch(events, &mut |e| out.push(e));
        out
    }

    /// Break `event` into per-file steps against the current cache.
    ///
    /// The steps must be applied in order, and before any other event is
    /// planned.
    pub fn plan(&self, event: &ChangeEvent) -> Vec<Step> {
        match (event.action, event.old_file(), event.new_file()) {
            (ChangeAction::Created, _, Some(new_file)) => self
                .walker
                .walk_path(new_file)
                .into_iter()
                .map(|file| Step::Refresh {
                    source: file.clone(),
                    target: file,
                })
                .collect(),
            (ChangeAction::Deleted, Some(old_file), _) => self
                .cached_within(old_file)
                .into_iter()
                .map(Step::Remove)
                .collect(),
            (ChangeAction::Modified, Some(old_file), Some(new_file)) => {
                self.plan_modified(old_file, new_file)
            }
            (ChangeAction::Renamed, Some(old_file), Some(new_file)) => {
                self.plan_renamed(old_file, new_file)
            }
            _ => {
                debug!(event = %event, "Ignoring malformed change event");
                Vec::new()
            }
        }
    }

    fn plan_modified(&self, old_file: &Path, new_file: &Path) -> Vec<Step> {
        let affected = self.cached_within(old_file);
        if affected.is_empty() {
            // Not cached yet, e.g. a file that failed to resolve earlier.
            return self
                .walker
                .walk_path(new_file)
                .into_iter()
                .map(|file| Step::Refresh {
                    source: file.clone(),
                    target: file,
                })
                .collect();
        }

        affected
            .into_iter()
            .map(|file| {
                let target = rebase(&file, old_file, new_file).unwrap_or_else(|| file.clone());
                Step::Refresh {
                    source: file,
                    target,
                }
            })
            .collect()
    }

    fn plan_renamed(&self, old_file: &Path, new_file: &Path) -> Vec<Step> {
        let mut steps: Vec<Step> = self
            .walker
            .walk_path(new_file)
            .into_iter()
            .filter_map(|file| {
                rebase(&file, new_file, old_file).map(|from| Step::Move { from, to: file })
            })
            .collect();

        // Entries under the old path the new tree does not account for. Those
        // a move already took are gone by the time these run.
        steps.extend(
            self.cached_within(old_file)
                .into_iter()
                .filter(|p| !is_within(p, new_file))
                .map(Step::Remove),
        );
        steps
    }

    /// Apply one planned step: at most one fragment changes hands, plus a
    /// displaced destination entry for a move.
    pub fn step<F>(&mut self, step: &Step, emit: &mut F)
    where
        F: FnMut(EngineEvent),
    {
        match step {
            Step::Refresh { source, target } => self.refresh(source, target, emit),
            Step::Remove(file) => {
                if let Some(fragment) = self.cache.remove(file) {
                    emit(EngineEvent::Diff(FragmentDiff::deleted(fragment)));
                }
            }
            Step::Move { from, to } => self.move_entry(from, to, emit),
        }
    }

    fn move_entry<F>(&mut self, from: &Path, to: &Path, emit: &mut F)
    where
        F: FnMut(EngineEvent),
    {
        let next = self.resolve(to, emit);
        // An entry already cached at the destination is overwritten by the rename.
        let displaced = if from != to { self.cache.remove(to) } else { None };
        let previous = match (self.cache.remove(from), displaced) {
            (Some(previous), Some(displaced)) => {
                emit(EngineEvent::Diff(FragmentDiff::deleted(displaced)));
                Some(previous)
            }
            (previous, displaced) => previous.or(displaced),
        };

        if let Some(fragment) = &next {
            self.cache.insert(to.to_path_buf(), fragment.clone());
        }
        if previous.is_some() || next.is_some() {
            emit(EngineEvent::Diff(FragmentDiff {
                old: previous,
                new: next,
            }));
        }
    }

    /// Re-resolve `source` (read from `target`) and store the result at `target`.
    fn refresh<F>(&mut self, source: &Path, target: &Path, emit: &mut F)
    where
        F: FnMut(EngineEvent),
    {
        let next = self.resolve(target, emit);
        let mut previous = self.cache.remove(source);
        if let Some(fragment) = &next {
            let replaced = self.cache.insert(target.to_path_buf(), fragment.clone());
            previous = previous.or(replaced);
        }
        if previous.is_some() || next.is_some() {
            emit(EngineEvent::Diff(FragmentDiff {
                old: previous,
                new: next,
            }));
        }
    }

    fn resolve<F>(&self, file: &Path, emit: &mut F) -> Option<Fragment>
    where
        F: FnMut(EngineEvent),
    {
        match resolve_fragment(&self.root, &self.resolvers, file) {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Failed to resolve file");
                emit(EngineEvent::ResolutionFailed(e));
                None
            }
        }
    }

    fn cached_within(&self, base: &Path) -> Vec<PathBuf> {
        self.cache
            .keys()
            .filter(|path| is_within(path, base))
            .cloned()
            .collect()
    }

    /// Copy of every cached fragment, ordered by file path.
    pub fn fragments(&self) -> Vec<Fragment> {
        self.cache.values().cloned().collect()
    }

    /// First cached fragment whose key equals `key`, in file path order.
    pub fn get(&self, key: &FragmentKey) -> Option<&Fragment> {
        self.cache.values().find(|f| &f.key == key)
    }

    pub fn get_by_file(&self, file: &Path) -> Option<&Fragment> {
        self.cache.get(file)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
