//! Line markers (bookmarks, breakpoints, diff gutters and the like).
//!
//! A marker is a number in `0..=MARKER_MAX` attached to a line. Each attachment gets a
//! [`MarkerHandle`] that keeps identifying it while edits move the line around. When a
//! line is removed its markers move to the line before, so a bookmark survives the
//! line being joined into its predecessor.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::per_line::{LinePolicy, LineVec, PerLine};

/// Highest valid marker number.
pub const MARKER_MAX: u32 = 31;

// 64 bits so handles never wrap and alias a live attachment.
static NEXT_MARKER_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Stable identity of one marker attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    fn allocate() -> Self {
        Self(NEXT_MARKER_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw handle value.
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerEntry {
    handle: MarkerHandle,
    number: u32,
}

/// The markers attached to one line, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerHandleSet {
    entries: Vec<MarkerEntry>,
}

impl MarkerHandleSet {
    /// Number of attachments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bit mask with bit `n` set for every attached marker number `n`.
    pub fn mark_value(&self) -> u32 {
        self.entries
            .iter()
            .fold(0, |mask, entry| mask | (1 << entry.number))
    }

    /// Returns `true` if `handle` is attached here.
    pub fn contains(&self, handle: MarkerHandle) -> bool {
        self.entries.iter().any(|entry| entry.handle == handle)
    }

    /// Marker number of the attachment at `which` (0 = most recent).
    pub fn number_from_index(&self, which: usize) -> Option<u32> {
        self.entries.get(which).map(|entry| entry.number)
    }

    /// Handle of the attachment at `which` (0 = most recent).
    pub fn handle_from_index(&self, which: usize) -> Option<MarkerHandle> {
        self.entries.get(which).map(|entry| entry.handle)
    }

    fn insert_handle(&mut self, handle: MarkerHandle, number: u32) {
        self.entries.insert(0, MarkerEntry { handle, number });
    }

    fn remove_handle(&mut self, handle: MarkerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    fn remove_number(&mut self, number: u32, all: bool) -> bool {
        let mut removed = false;
        self.entries.retain(|entry| {
            if entry.number == number && (all || !removed) {
                removed = true;
                false
            } else {
                true
            }
        });
        removed
    }

    fn combine_with(&mut self, other: MarkerHandleSet) {
        self.entries.extend(other.entries);
    }
}

/// A removed line hands its markers to the line before.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeIntoPrevious;

impl LinePolicy<MarkerHandleSet> for MergeIntoPrevious {
    fn inserted(_displaced: Option<&MarkerHandleSet>) -> MarkerHandleSet {
        MarkerHandleSet::default()
    }

    fn removed(
        removed: MarkerHandleSet,
        previous: Option<&mut MarkerHandleSet>,
        _now_last: bool,
    ) {
        if let Some(previous) = previous {
            previous.combine_with(removed);
        }
    }
}

/// Marker storage.
pub trait MarkerStore: PerLine {
    /// Attach marker `number` to `line`. `None` if the line or number is out of range.
    fn add_mark(&mut self, line: usize, number: u32) -> Option<MarkerHandle>;
    /// Bit mask of the markers on `line`; 0 if out of range.
    fn mark_value(&self, line: usize) -> u32;
    /// First line at or after `line_start` carrying a marker in `mask`.
    fn marker_next(&self, line_start: usize, mask: u32) -> Option<usize>;
    /// Move the markers of `line + 1` onto `line`.
    fn merge_markers(&mut self, line: usize);
    /// Remove marker `number` (or every marker, for `None`) from `line`. With `all` unset
    /// only the most recent attachment of `number` goes. Returns `true` if anything changed.
    fn delete_mark(&mut self, line: usize, number: Option<u32>, all: bool) -> bool;
    /// Remove the attachment identified by `handle`, wherever it is.
    /// Finds the line with [`line_from_handle`](Self::line_from_handle).
    fn delete_mark_from_handle(&mut self, handle: MarkerHandle) -> bool;
    /// Line currently carrying `handle`.
    ///
    /// Handles are not indexed, so this walks every line's markers: linear in the
    /// number of lines plus attachments.
    fn line_from_handle(&self, handle: MarkerHandle) -> Option<usize>;
    /// Handle of the `which`-th attachment on `line` (0 = most recent).
    fn handle_from_line(&self, line: usize, which: usize) -> Option<MarkerHandle>;
    /// Number of the `which`-th attachment on `line` (0 = most recent).
    fn number_from_line(&self, line: usize, which: usize) -> Option<u32>;
}

/// Standard [`MarkerStore`].
pub type LineMarkers = LineVec<MarkerHandleSet, MergeIntoPrevious>;

impl MarkerStore for LineMarkers {
    fn add_mark(&mut self, line: usize, number: u32) -> Option<MarkerHandle> {
        if number > MARKER_MAX {
            return None;
        }
        let set = self.get_mut(line)?;
        let handle = MarkerHandle::allocate();
        set.insert_handle(handle, number);
        Some(handle)
    }

    fn mark_value(&self, line: usize) -> u32 {
        self.get(line).map_or(0, MarkerHandleSet::mark_value)
    }

    fn marker_next(&self, line_start: usize, mask: u32) -> Option<usize> {
        self.iter()
            .enumerate()
            .skip(line_start)
            .find(|(_, set)| set.mark_value() & mask != 0)
            .map(|(line, _)| line)
    }

    fn merge_markers(&mut self, line: usize) {
        let Some(next) = self.get_mut(line + 1).map(std::mem::take) else {
            return;
        };
        if let Some(set) = self.get_mut(line) {
            set.combine_with(next);
        }
    }

    fn delete_mark(&mut self, line: usize, number: Option<u32>, all: bool) -> bool {
        let Some(set) = self.get_mut(line) else {
            return false;
        };
        match number {
            None => {
                let changed = !set.is_empty();
                *set = MarkerHandleSet::default();
                changed
            }
            Some(number) => set.remove_number(number, all),
        }
    }

    fn delete_mark_from_handle(&mut self, handle: MarkerHandle) -> bool {
        let Some(line) = self.line_from_handle(handle) else {
            return false;
        };
        self.get_mut(line)
            .is_some_and(|set| set.remove_handle(handle))
    }

    fn line_from_handle(&self, handle: MarkerHandle) -> Option<usize> {
        self.iter().position(|set| set.contains(handle))
    }

    fn handle_from_line(&self, line: usize, which: usize) -> Option<MarkerHandle> {
        self.get(line)?.handle_from_index(which)
    }

    fn number_from_line(&self, line: usize, which: usize) -> Option<u32> {
        self.get(line)?.number_from_index(which)
    }
}
