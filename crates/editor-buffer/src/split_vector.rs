//! Gap buffer storage.
//!
//! Every growable per-index array in this crate (text bytes, style bytes, line starts,
//! per-line records) is a [`SplitVector`]: a single `Vec<T>` with a movable unused region
//! (the *gap*). Edits move the gap to the edit site first, so runs of edits in one
//! neighbourhood only shuffle the elements between the old and new gap positions.
//!
//! ```text
//!  [ part 1 | gap (default values) | part 2 ]
//!    0..part1_len                     part1_len + gap_len..body.len()
//! ```

use std::mem;

const DEFAULT_GROW_SIZE: usize = 8;

/// A gap buffer of `T`.
///
/// Slots inside the gap always hold `T::default()`, so the buffer never needs `unsafe`
/// to move elements around: moving the gap swaps each element it passes with a gap slot.
#[derive(Debug, Clone)]
pub struct SplitVector<T> {
    body: Vec<T>,
    part1_len: usize,
    gap_len: usize,
    grow_size: usize,
}

impl<T: Default> SplitVector<T> {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty vector whose gap can already hold `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut body = Vec::with_capacity(capacity);
        body.resize_with(capacity, T::default);
        Self {
            body,
            part1_len: 0,
            gap_len: capacity,
            grow_size: DEFAULT_GROW_SIZE,
        }
    }

    /// Number of elements (excluding the gap).
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len() - self.gap_len
    }

    /// Returns `true` if there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical index where the gap currently sits.
    #[inline]
    pub fn gap_position(&self) -> usize {
        self.part1_len
    }

    #[inline]
    fn physical(&self, index: usize) -> usize {
        if index < self.part1_len {
            index
        } else {
            index + self.gap_len
        }
    }

    /// Move the gap so that it starts at logical `position`.
    ///
    /// Costs one swap per element between the old and new gap start, whatever the
    /// size of the gap.
    fn gap_to(&mut self, position: usize) {
        if position == self.part1_len {
            return;
        }
        if self.gap_len > 0 {
            let gap_len = self.gap_len;
            if position < self.part1_len {
                // [position, part1_len) moves behind the gap, last element first.
                for i in (position..self.part1_len).rev() {
                    self.body.swap(i, i + gap_len);
                }
            } else {
                // [part1_len + gap, position + gap) moves in front of the gap.
                for i in self.part1_len..position {
                    self.body.swap(i, i + gap_len);
                }
            }
        }
        self.part1_len = position;
    }

    /// Make sure the gap can absorb `needed` more elements.
    fn room_for(&mut self, needed: usize) {
        if self.gap_len >= needed {
            return;
        }
        while self.grow_size < self.body.len() / 6 {
            self.grow_size *= 2;
        }
        let extra = needed - self.gap_len + self.grow_size;
        let len = self.len();
        self.gap_to(len);
        self.body.resize_with(self.body.len() + extra, T::default);
        self.gap_len += extra;
    }

    /// Grow the backing storage to hold at least `capacity` elements without reallocating.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity <= self.body.len() {
            return;
        }
        let len = self.len();
        self.gap_to(len);
        self.gap_len += capacity - self.body.len();
        self.body.resize_with(capacity, T::default);
    }

    /// Element at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len() {
            Some(&self.body[self.physical(index)])
        } else {
            None
        }
    }

    /// Mutable element at `index`, if any.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len() {
            let physical = self.physical(index);
            Some(&mut self.body[physical])
        } else {
            None
        }
    }

    /// Replace the element at `index`. Out-of-range indices are ignored.
    pub fn set_value_at(&mut self, index: usize, value: T) {
        debug_assert!(index < self.len(), "set_value_at: {index} >= {}", self.len());
        if let Some(slot) = self.get_mut(index) {
            *slot = value;
        }
    }

    /// Insert one element before `index`.
    pub fn insert(&mut self, index: usize, value: T) {
        debug_assert!(index <= self.len(), "insert: {index} > {}", self.len());
        if index > self.len() {
            return;
        }
        self.room_for(1);
        self.gap_to(index);
        self.body[self.part1_len] = value;
        self.part1_len += 1;
        self.gap_len -= 1;
    }

    /// Remove and return the element at `index`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len() {
            return None;
        }
        self.gap_to(index);
        let value = mem::take(&mut self.body[self.part1_len + self.gap_len]);
        self.gap_len += 1;
        Some(value)
    }

    /// Remove `count` elements starting at `position`.
    pub fn delete_range(&mut self, position: usize, count: usize) {
        debug_assert!(position + count <= self.len());
        if count == 0 || position + count > self.len() {
            return;
        }
        if position == 0 && count == self.len() {
            self.delete_all();
            return;
        }
        self.gap_to(position);
        let start = self.part1_len + self.gap_len;
        for slot in &mut self.body[start..start + count] {
            *slot = T::default();
        }
        self.gap_len += count;
    }

    /// Remove every element and release the backing storage.
    pub fn delete_all(&mut self) {
        self.body = Vec::new();
        self.part1_len = 0;
        self.gap_len = 0;
        self.grow_size = DEFAULT_GROW_SIZE;
    }

    /// Iterate over the elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.body[..self.part1_len]
            .iter()
            .chain(self.body[self.part1_len + self.gap_len..].iter())
    }

    /// Contiguous view of all elements. Moves the gap to the end.
    pub fn buffer_pointer(&mut self) -> &[T] {
        let len = self.len();
        self.gap_to(len);
        &self.body[..len]
    }

    /// Contiguous view of `[position, position + count)`, moving the gap out of the way if it
    /// splits the range. The range is clamped to the buffer.
    pub fn range_pointer(&mut self, position: usize, count: usize) -> &[T] {
        let position = position.min(self.len());
        let count = count.min(self.len() - position);
        if position < self.part1_len && position + count > self.part1_len {
            self.gap_to(position);
        }
        let start = self.physical(position);
        &self.body[start..start + count]
    }
}

impl<T: Default + Clone> SplitVector<T> {
    /// Element at `index`, or `T::default()` when out of range.
    pub fn value_at(&self, index: usize) -> T {
        self.get(index).cloned().unwrap_or_default()
    }

    /// Insert `count` copies of `value` before `index`.
    pub fn insert_value(&mut self, index: usize, count: usize, value: T) {
        debug_assert!(index <= self.len());
        if count == 0 || index > self.len() {
            return;
        }
        self.room_for(count);
        self.gap_to(index);
        for slot in &mut self.body[self.part1_len..self.part1_len + count] {
            *slot = value.clone();
        }
        self.part1_len += count;
        self.gap_len -= count;
    }

    /// Insert a copy of `values` before `index`.
    pub fn insert_from_slice(&mut self, index: usize, values: &[T]) {
        debug_assert!(index <= self.len());
        if values.is_empty() || index > self.len() {
            return;
        }
        self.room_for(values.len());
        self.gap_to(index);
        self.body[self.part1_len..self.part1_len + values.len()].clone_from_slice(values);
        self.part1_len += values.len();
        self.gap_len -= values.len();
    }

    /// Grow with default values until there are at least `len` elements.
    pub fn ensure_length(&mut self, len: usize) {
        let current = self.len();
        if len > current {
            self.insert_value(current, len - current, T::default());
        }
    }

    /// Copy `[position, position + dest.len())` into `dest`; slots past the end get defaults.
    pub fn get_range(&self, dest: &mut [T], position: usize) {
        for (offset, slot) in dest.iter_mut().enumerate() {
            *slot = self.value_at(position + offset);
        }
    }
}

impl SplitVector<usize> {
    /// Add `delta` to every element in `[start, end)`.
    pub fn range_add_delta(&mut self, start: usize, end: usize, delta: isize) {
        let end = end.min(self.len());
        for index in start..end {
            let physical = self.physical(index);
            self.body[physical] = self.body[physical].wrapping_add_signed(delta);
        }
    }
}

impl<T: Default> Default for SplitVector<T> {
    fn default() -> Self {
        Self::new()
    }
}
