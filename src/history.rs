//! Ordered record of played (or playable) items with a traversal pointer.
//!
//! Every entry carries the sequence index it was inserted at. Traversal under a
//! type filter compares candidates against the pointer's sequence index rather
//! than against positions inside the filtered view, so changing the filter
//! mid-session resumes from where the current item actually sits.

use crate::model::{FileType, Item};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub sequence: usize,
    pub item: Item,
    /// Set when the entry was appended and cleared once traversal revisits it.
    pub fresh: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackHistory {
    entries: Vec<HistoryEntry>,
    pointer: Option<usize>,
}

impl PlaybackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence index of the current entry; `None` sits before the first entry.
    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        self.pointer.and_then(|pointer| self.entries.get(pointer))
    }

    pub fn current(&self) -> Option<&Item> {
        self.current_entry().map(|entry| &entry.item)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pointer = None;
    }

    /// Appends `item` after the pointer, dropping any entries beyond it.
    pub fn add(&mut self, item: Item) {
        let keep = self.pointer.map_or(0, |pointer| pointer + 1);
        self.entries.truncate(keep);

        let sequence = self.entries.len();
        self.entries.push(HistoryEntry {
            sequence,
            item,
            fresh: true,
        });
        self.pointer = Some(sequence);
    }

    pub fn load(&mut self, items: impl IntoIterator<Item = Item>) {
        self.clear();
        for item in items {
            self.add(item);
        }
    }

    pub fn remove(&mut self, item: &Item) -> Option<Item> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.item.path == item.path)?;
        let removed = self.entries.remove(position);

        for (sequence, entry) in self.entries.iter_mut().enumerate().skip(position) {
            entry.sequence = sequence;
        }

        if let Some(pointer) = self.pointer
            && position <= pointer
        {
            self.pointer = pointer.checked_sub(1);
        }

        Some(removed.item)
    }

    pub fn find(&self, path: &str) -> Option<&Item> {
        self.items().find(|item| item.path == path)
    }

    /// Points at the entry holding `item`'s path. The pointer is left alone
    /// when the path is unknown.
    pub fn set_current(&mut self, item: &Item) -> Option<usize> {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.item.path == item.path)?;
        self.pointer = Some(self.entries[position].sequence);
        self.pointer
    }

    /// First entry matching `filter` whose sequence index lies after the
    /// pointer, optionally wrapping to the first match.
    pub fn next(&mut self, wrap_around: bool, filter: &[FileType]) -> Option<Item> {
        let pointer = self.pointer;
        let position = self
            .entries
            .iter()
            .position(|entry| {
                entry.item.matches(filter) && pointer.is_none_or(|p| entry.sequence > p)
            })
            .or_else(|| {
                wrap_around
                    .then(|| {
                        self.entries
                            .iter()
                            .position(|entry| entry.item.matches(filter))
                    })
                    .flatten()
            })?;
        Some(self.move_to(position))
    }

    /// Last entry matching `filter` whose sequence index lies before the
    /// pointer, optionally wrapping to the last match.
    pub fn previous(&mut self, wrap_around: bool, filter: &[FileType]) -> Option<Item> {
        let pointer = self.pointer;
        let position = self
            .entries
            .iter()
            .rposition(|entry| {
                entry.item.matches(filter) && pointer.is_some_and(|p| entry.sequence < p)
            })
            .or_else(|| {
                wrap_around
                    .then(|| {
                        self.entries
                            .iter()
                            .rposition(|entry| entry.item.matches(filter))
                    })
                    .flatten()
            })?;
        Some(self.move_to(position))
    }

    pub fn has_compatible_items(&self) -> bool {
        self.items().any(|item| item.is_compatible)
    }

    pub fn has_compatible_items_in(&self, filter: &[FileType]) -> bool {
        self.items()
            .any(|item| item.is_compatible && item.matches(filter))
    }

    /// Mirrors a cache-side ban onto the held copy. Returns whether the path
    /// was present.
    pub fn mark_incompatible(&mut self, path: &str) -> bool {
        let mut found = false;
        for entry in self.entries.iter_mut().filter(|entry| entry.item.path == path) {
            entry.item.is_compatible = false;
            found = true;
        }
        found
    }

    fn move_to(&mut self, position: usize) -> Item {
        let entry = &mut self.entries[position];
        entry.fresh = false;
        self.pointer = Some(entry.sequence);
        entry.item.clone()
    }
}
