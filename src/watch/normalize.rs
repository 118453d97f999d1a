//! Batch normalization
//!
//! Raw notifications for a single filesystem flush often describe the same
//! change several times: a rename also shows up as a delete of the source and
//! a create of the target, and writes to a fresh file add modify events on
//! top of the create. [`normalize`] drops every event another event in the
//! same batch already accounts for.

use super::event::{ChangeAction, ChangeEvent};
use std::collections::HashSet;
use std::path::Path;

/// Collapse a raw batch into its semantically distinct events.
///
/// Output keeps input order minus the dropped entries.
pub fn normalize(raw: &[ChangeEvent]) -> Vec<ChangeEvent> {
    let index = BatchIndex::new(raw);
    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(raw.len());

    for event in raw {
        if index.is_redundant(event) {
            continue;
        }
        if seen.insert(event) {
            events.push(event.clone());
        }
    }

    events
}

/// Endpoints of the batch's created/deleted/renamed events.
struct BatchIndex<'a> {
    created: HashSet<&'a Path>,
    deleted: HashSet<&'a Path>,
    renamed_from: HashSet<&'a Path>,
    renamed_to: HashSet<&'a Path>,
}

impl<'a> BatchIndex<'a> {
    fn new(raw: &'a [ChangeEvent]) -> Self {
        let mut index = Self {
            created: HashSet::new(),
            deleted: HashSet::new(),
            renamed_from: HashSet::new(),
            renamed_to: HashSet::new(),
        };

        for event in raw {
            match event.action {
                ChangeAction::Created => index.created.extend(event.new_file()),
                ChangeAction::Deleted => index.deleted.extend(event.old_file()),
                ChangeAction::Renamed => {
                    index.renamed_from.extend(event.old_file());
                    index.renamed_to.extend(event.new_file());
                }
                ChangeAction::Modified => {}
            }
        }

        index
    }

    fn is_redundant(&self, event: &ChangeEvent) -> bool {
        match event.action {
            ChangeAction::Created => event
                .new_file()
                .is_some_and(|path| self.renamed_to.contains(path)),
            ChangeAction::Deleted => event
                .old_file()
                .is_some_and(|path| self.renamed_from.contains(path)),
            ChangeAction::Modified => {
                event.new_file().is_some_and(|path| {
                    self.created.contains(path) || self.renamed_to.contains(path)
                }) || event
                    .old_file()
                    .is_some_and(|path| self.deleted.contains(path))
            }
            ChangeAction::Renamed => false,
        }
    }
}
