//! Partitioning index.
//!
//! Maps partition numbers `0..N` to monotonically increasing start positions, with
//! `N + 1` boundaries in total (the last boundary is the end of the last partition).
//! The cell buffer uses one for line starts (partition = line, position = byte offset)
//! and the contraction state uses one for display rows (partition = document line,
//! position = first display row).
//!
//! Shifting every later boundary after an edit would be O(N). Instead one pending
//! "step" is kept: boundaries after `step_partition` are stored without the last
//! `step_length` added, and the step is only applied when an edit happens elsewhere.
//! Typing in one place therefore costs O(1) per keystroke and lookups stay O(log N).

use crate::error::BufferError;
use crate::split_vector::SplitVector;

/// Ordered partition boundaries with lazy shifting.
#[derive(Debug, Clone)]
pub struct Partitioning {
    body: SplitVector<usize>,
    /// Boundaries with an index greater than this still need `step_length` added.
    step_partition: usize,
    step_length: isize,
}

impl Partitioning {
    /// Create an index holding a single empty partition `[0, 0)`.
    pub fn new() -> Self {
        let mut body = SplitVector::with_capacity(8);
        body.insert(0, 0);
        body.insert(1, 0);
        Self {
            body,
            step_partition: 0,
            step_length: 0,
        }
    }

    /// Number of partitions (one less than the number of boundaries).
    pub fn partitions(&self) -> usize {
        self.body.len() - 1
    }

    fn apply_step(&mut self, partition_up_to: usize) {
        if self.step_length != 0 {
            self.body
                .range_add_delta(self.step_partition + 1, partition_up_to + 1, self.step_length);
        }
        self.step_partition = partition_up_to;
        if self.step_partition >= self.body.len() - 1 {
            self.step_partition = self.body.len() - 1;
            self.step_length = 0;
        }
    }

    fn back_step(&mut self, partition_down_to: usize) {
        if self.step_length != 0 {
            self.body.range_add_delta(
                partition_down_to + 1,
                self.step_partition + 1,
                -self.step_length,
            );
        }
        self.step_partition = partition_down_to;
    }

    /// Grow (or shrink, for negative `delta`) `partition` by `delta`, shifting every later
    /// boundary.
    pub fn insert_text(&mut self, partition: usize, delta: isize) {
        if self.step_length != 0 {
            if partition >= self.step_partition {
                self.apply_step(partition);
                self.step_length += delta;
            } else if partition + self.body.len() / 10 >= self.step_partition {
                // Close behind the step: cheaper to walk it back.
                self.back_step(partition);
                self.step_length += delta;
            } else {
                self.apply_step(self.body.len() - 1);
                self.step_partition = partition;
                self.step_length = delta;
            }
        } else {
            self.step_partition = partition;
            self.step_length = delta;
        }
    }

    /// Insert a boundary at `position`, making it the start of a new partition numbered
    /// `partition`. Total extent is unchanged.
    pub fn insert_boundary(&mut self, partition: usize, position: usize) {
        if self.step_partition < partition {
            self.apply_step(partition);
        }
        self.body.insert(partition, position);
        self.step_partition += 1;
    }

    /// Move the start of `partition` to `position`.
    pub fn set_partition_start(&mut self, partition: usize, position: usize) {
        self.apply_step(partition + 1);
        if partition >= self.body.len() {
            return;
        }
        self.body.set_value_at(partition, position);
    }

    /// Remove the boundary that starts `partition`, merging it into the partition before.
    /// Total extent is unchanged. Boundary 0 is never removed.
    pub fn remove_boundary(&mut self, partition: usize) {
        debug_assert!(partition > 0 && partition < self.body.len() - 1);
        if partition == 0 || partition >= self.body.len() - 1 {
            return;
        }
        if partition > self.step_partition {
            self.apply_step(partition);
        }
        self.step_partition -= 1;
        self.body.remove(partition);
    }

    /// Insert a new partition of `width` before `index`; later positions move up by `width`.
    pub fn insert_partition(&mut self, index: usize, width: usize) -> Result<(), BufferError> {
        let partitions = self.partitions();
        if index > partitions {
            return Err(BufferError::PartitionOutOfRange { index, partitions });
        }
        // A zero-width partition at the old start, then grown to `width`. When appending,
        // the old end boundary becomes the new partition's start.
        let start = self.position_from_partition(index);
        self.insert_boundary(index, start);
        self.insert_text(index, width as isize);
        Ok(())
    }

    /// Remove partition `index`; later positions move down by its width.
    pub fn remove_partition(&mut self, index: usize) -> Result<(), BufferError> {
        let partitions = self.partitions();
        if index >= partitions || partitions == 1 {
            return Err(BufferError::PartitionOutOfRange { index, partitions });
        }
        let width = self.partition_width(index);
        self.insert_text(index, -(width as isize));
        // Now zero width: dropping the boundary after it leaves neighbours untouched.
        if index + 1 < partitions {
            self.remove_boundary(index + 1);
        } else {
            self.remove_boundary(index);
        }
        Ok(())
    }

    /// Width of `partition`.
    pub fn partition_width(&self, partition: usize) -> usize {
        self.position_from_partition(partition + 1) - self.position_from_partition(partition)
    }

    /// Start of `partition`; `position_from_partition(partitions())` is the total extent.
    /// Out-of-range partitions return 0.
    pub fn position_from_partition(&self, partition: usize) -> usize {
        debug_assert!(partition < self.body.len());
        if partition >= self.body.len() {
            return 0;
        }
        let position = self.body.value_at(partition);
        if partition > self.step_partition {
            position.wrapping_add_signed(self.step_length)
        } else {
            position
        }
    }

    /// Partition containing `position`.
    ///
    /// A boundary belongs to the partition that starts there; when several empty
    /// partitions share that start, the last of them wins. Positions at or beyond the end
    /// belong to the last partition.
    pub fn partition_from_position(&self, position: usize) -> usize {
        if self.body.len() <= 1 {
            return 0;
        }
        if position >= self.position_from_partition(self.body.len() - 1) {
            return self.body.len() - 2;
        }
        let mut lower = 0;
        let mut upper = self.body.len() - 1;
        while lower < upper {
            let middle = (upper + lower).div_ceil(2);
            if position < self.position_from_partition(middle) {
                upper = middle - 1;
            } else {
                lower = middle;
            }
        }
        lower
    }

    /// Reset to a single empty partition.
    pub fn delete_all(&mut self) {
        *self = Self::new();
    }

    /// Debug check: boundary 0 is 0 and boundaries never decrease.
    pub fn check(&self) {
        debug_assert_eq!(self.position_from_partition(0), 0);
        for partition in 0..self.partitions() {
            debug_assert!(
                self.position_from_partition(partition)
                    <= self.position_from_partition(partition + 1),
                "partition {partition} ends before it starts"
            );
        }
    }
}

impl Default for Partitioning {
    fn default() -> Self {
        Self::new()
    }
}
