//! Per-line auxiliary data.
//!
//! Every store here keeps exactly one entry per document line and is told about each
//! inserted or removed line through [`PerLine`]. The stores are thin wrappers around
//! one generic container, [`LineVec`], parameterized by a [`LinePolicy`] that decides
//! what a freshly inserted line holds and what happens to the value of a removed line.
//!
//! Markers live in [`crate::markers`] and annotations in [`crate::annotation`]; fold
//! levels, lexer line state and tab stops are here.

use std::marker::PhantomData;

use crate::split_vector::SplitVector;

/// Receiver of line insertions and removals.
///
/// After any call returns, [`PerLine::lines`] equals the document's line count.
pub trait PerLine {
    /// Drop all data and track a single empty line.
    fn init(&mut self);
    /// A line was inserted at `line`; later entries move down by one.
    fn insert_line(&mut self, line: usize);
    /// The line at `line` was removed; later entries move up by one.
    fn remove_line(&mut self, line: usize);
    /// Number of lines tracked.
    fn lines(&self) -> usize;
}

/// Decides the value of an inserted line and the fate of a removed line's value.
pub trait LinePolicy<T> {
    /// Value for a line inserted in front of `displaced` (the entry currently at that index).
    fn inserted(displaced: Option<&T>) -> T;

    /// Called after `removed` has been taken out. `previous` is the entry before it, and
    /// `now_last` is set when the entry that took its index is the final line.
    fn removed(removed: T, previous: Option<&mut T>, now_last: bool) {
        let _ = (removed, previous, now_last);
    }
}

/// New lines start with `T::default()`; removed values are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blank;

impl<T: Default> LinePolicy<T> for Blank {
    fn inserted(_displaced: Option<&T>) -> T {
        T::default()
    }
}

/// New lines copy the value of the line they push down.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyDisplaced;

impl<T: Default + Clone> LinePolicy<T> for CopyDisplaced {
    fn inserted(displaced: Option<&T>) -> T {
        displaced.cloned().unwrap_or_default()
    }
}

/// One value per line, kept in a gap buffer.
#[derive(Debug, Clone)]
pub struct LineVec<T, P> {
    values: SplitVector<T>,
    _policy: PhantomData<P>,
}

impl<T: Default + Clone, P: LinePolicy<T>> LineVec<T, P> {
    /// A store tracking one line.
    pub fn new() -> Self {
        let mut values = SplitVector::new();
        values.insert(0, T::default());
        Self {
            values,
            _policy: PhantomData,
        }
    }

    /// Entry for `line`.
    pub fn get(&self, line: usize) -> Option<&T> {
        self.values.get(line)
    }

    /// Mutable entry for `line`.
    pub fn get_mut(&mut self, line: usize) -> Option<&mut T> {
        self.values.get_mut(line)
    }

    /// Entry for `line`, or the default when out of range.
    pub fn value_at(&self, line: usize) -> T {
        self.values.value_at(line)
    }

    /// Replace the entry for `line`, returning the previous one. Out-of-range lines are
    /// ignored.
    pub fn replace(&mut self, line: usize, value: T) -> Option<T> {
        self.values
            .get_mut(line)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Iterate over the entries in line order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Grow with default entries until `len` lines are tracked.
    pub fn ensure_length(&mut self, len: usize) {
        self.values.ensure_length(len);
    }

    /// Apply `f` to every entry.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for line in 0..self.values.len() {
            if let Some(value) = self.values.get_mut(line) {
                f(value);
            }
        }
    }
}

impl<T: Default + Clone, P: LinePolicy<T>> Default for LineVec<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Clone, P: LinePolicy<T>> PerLine for LineVec<T, P> {
    fn init(&mut self) {
        self.values.delete_all();
        self.values.insert(0, T::default());
    }

    fn insert_line(&mut self, line: usize) {
        let value = P::inserted(self.values.get(line));
        self.values.insert(line.min(self.values.len()), value);
    }

    fn remove_line(&mut self, line: usize) {
        let Some(removed) = self.values.remove(line) else {
            return;
        };
        let now_last = line + 1 == self.values.len();
        let previous = match line {
            0 => None,
            _ => self.values.get_mut(line - 1),
        };
        P::removed(removed, previous, now_last);
    }

    fn lines(&self) -> usize {
        self.values.len()
    }
}

/// A fold level: a nesting number plus header/white-space flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FoldLevel(pub u32);

impl FoldLevel {
    /// Level of top-level text.
    pub const BASE: Self = Self(0x400);
    /// Line is blank.
    pub const WHITE_FLAG: u32 = 0x1000;
    /// Line starts a fold.
    pub const HEADER_FLAG: u32 = 0x2000;
    /// Bits holding the nesting number.
    pub const NUMBER_MASK: u32 = 0x0FFF;

    /// Level with the given nesting number and no flags.
    pub fn new(number: u32) -> Self {
        Self(number & Self::NUMBER_MASK)
    }

    /// Nesting number without flags.
    pub fn number(self) -> u32 {
        self.0 & Self::NUMBER_MASK
    }

    /// Returns `true` for fold header lines.
    pub fn is_header(self) -> bool {
        self.0 & Self::HEADER_FLAG != 0
    }

    /// Returns `true` for blank lines.
    pub fn is_white(self) -> bool {
        self.0 & Self::WHITE_FLAG != 0
    }

    /// Copy with the header flag set or cleared.
    pub fn with_header(self, header: bool) -> Self {
        if header {
            Self(self.0 | Self::HEADER_FLAG)
        } else {
            Self(self.0 & !Self::HEADER_FLAG)
        }
    }

    /// Copy with the white flag set or cleared.
    pub fn with_white(self, white: bool) -> Self {
        if white {
            Self(self.0 | Self::WHITE_FLAG)
        } else {
            Self(self.0 & !Self::WHITE_FLAG)
        }
    }
}

impl Default for FoldLevel {
    fn default() -> Self {
        Self::BASE
    }
}

/// Inserted lines inherit the displaced level. A removed header hands its flag to the
/// line before, so a join never makes a fold vanish for a moment; the line before the
/// final line cannot be a header.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelPolicy;

impl LinePolicy<FoldLevel> for LevelPolicy {
    fn inserted(displaced: Option<&FoldLevel>) -> FoldLevel {
        displaced.copied().unwrap_or_default()
    }

    fn removed(removed: FoldLevel, previous: Option<&mut FoldLevel>, now_last: bool) {
        if let Some(previous) = previous {
            *previous = if now_last {
                previous.with_header(false)
            } else {
                FoldLevel(previous.0 | (removed.0 & FoldLevel::HEADER_FLAG))
            };
        }
    }
}

/// Fold level storage, written by a lexer.
pub trait LevelStore: PerLine {
    /// Grow to at least `size` lines, new lines at [`FoldLevel::BASE`].
    fn expand_levels(&mut self, size: usize);
    /// Reset every line to [`FoldLevel::BASE`].
    fn clear_levels(&mut self);
    /// Set the level of `line`, returning the previous level; `None` if out of range.
    fn set_level(&mut self, line: usize, level: FoldLevel) -> Option<FoldLevel>;
    /// Level of `line`; [`FoldLevel::BASE`] if out of range.
    fn get_level(&self, line: usize) -> FoldLevel;
}

/// Standard [`LevelStore`].
pub type LineLevels = LineVec<FoldLevel, LevelPolicy>;

impl LevelStore for LineLevels {
    fn expand_levels(&mut self, size: usize) {
        self.ensure_length(size);
    }

    fn clear_levels(&mut self) {
        self.for_each_mut(|level| *level = FoldLevel::BASE);
    }

    fn set_level(&mut self, line: usize, level: FoldLevel) -> Option<FoldLevel> {
        self.replace(line, level)
    }

    fn get_level(&self, line: usize) -> FoldLevel {
        self.value_at(line)
    }
}

/// Opaque per-line integer kept for a lexer between runs.
pub trait StateStore: PerLine {
    /// Set the state of `line`, returning the previous state (0 if out of range).
    fn set_line_state(&mut self, line: usize, state: i32) -> i32;
    /// State of `line`; 0 if out of range.
    fn get_line_state(&self, line: usize) -> i32;
    /// One past the last line holding a non-zero state.
    fn max_line_state(&self) -> usize;
}

/// Standard [`StateStore`]. Inserted lines copy the state of the line they push down.
pub type LineState = LineVec<i32, CopyDisplaced>;

impl StateStore for LineState {
    fn set_line_state(&mut self, line: usize, state: i32) -> i32 {
        self.replace(line, state).unwrap_or(0)
    }

    fn get_line_state(&self, line: usize) -> i32 {
        self.value_at(line)
    }

    fn max_line_state(&self) -> usize {
        self.iter()
            .enumerate()
            .filter(|(_, state)| **state != 0)
            .last()
            .map_or(0, |(line, _)| line + 1)
    }
}

/// Explicit tab stop positions per line.
pub trait TabstopStore: PerLine {
    /// Remove every tab stop on `line`. Returns `true` if the line had any.
    fn clear_tabstops(&mut self, line: usize) -> bool;
    /// Add a tab stop at `x`. Returns `false` if it already existed or `line` is out of range.
    fn add_tabstop(&mut self, line: usize, x: i32) -> bool;
    /// First tab stop strictly after `x`.
    fn get_next_tabstop(&self, line: usize, x: i32) -> Option<i32>;
}

/// Standard [`TabstopStore`]. The sorted list is only allocated on first use.
pub type LineTabstops = LineVec<Option<Vec<i32>>, Blank>;

impl TabstopStore for LineTabstops {
    fn clear_tabstops(&mut self, line: usize) -> bool {
        self.get_mut(line)
            .and_then(Option::take)
            .is_some_and(|stops| !stops.is_empty())
    }

    fn add_tabstop(&mut self, line: usize, x: i32) -> bool {
        let Some(slot) = self.get_mut(line) else {
            return false;
        };
        let stops = slot.get_or_insert_with(Vec::new);
        match stops.binary_search(&x) {
            Ok(_) => false,
            Err(index) => {
                stops.insert(index, x);
                true
            }
        }
    }

    fn get_next_tabstop(&self, line: usize, x: i32) -> Option<i32> {
        self.get(line)?
            .as_ref()?
            .iter()
            .copied()
            .find(|&stop| stop > x)
    }
}
