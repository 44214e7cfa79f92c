//! Document line to display line mapping.
//!
//! Each document line has a visibility flag, an expanded flag, a height in display rows
//! and optional text shown in place of a collapsed fold. While every line is visible,
//! expanded and one row high the mapping is the identity and only the line count is
//! kept. The first non-default write materializes one record per line plus a
//! [`Partitioning`] whose partition widths are the display rows of each line (0 for
//! hidden lines). [`Contraction::show_all`] goes back to the identity.
//!
//! The line count is not tied to any buffer: whoever owns a contraction state must call
//! [`Contraction::insert_lines`] / [`Contraction::delete_lines`] for every line count
//! change of the document, in order.

use tracing::debug;

use crate::partitioning::Partitioning;
use crate::split_vector::SplitVector;

/// Display mapping contract.
pub trait Contraction {
    /// Reset to a single visible line.
    fn clear(&mut self);
    /// Number of document lines tracked (at least 1).
    fn lines_in_doc(&self) -> usize;
    /// Number of display rows.
    fn lines_displayed(&self) -> usize;
    /// First display row of `line_doc`. Lines past the end map to [`lines_displayed`].
    ///
    /// [`lines_displayed`]: Contraction::lines_displayed
    fn display_from_doc(&self, line_doc: usize) -> usize;
    /// Last display row of `line_doc`.
    fn display_last_from_doc(&self, line_doc: usize) -> usize;
    /// Document line shown on `line_display`. Rows past the end map to the last shown line.
    fn doc_from_display(&self, line_display: usize) -> usize;
    /// `count` visible lines were inserted before `line_doc`.
    fn insert_lines(&mut self, line_doc: usize, count: usize);
    /// `count` lines starting at `line_doc` were removed.
    fn delete_lines(&mut self, line_doc: usize, count: usize);
    /// Visibility of `line_doc`; lines past the end are visible.
    fn get_visible(&self, line_doc: usize) -> bool;
    /// Show or hide lines `[start, end)`. Returns `true` if any line changed.
    /// Line 0 is never hidden, so at least one display row always remains.
    fn set_visible(&mut self, start: usize, end: usize, visible: bool) -> bool;
    /// Returns `true` if any line is hidden.
    fn hidden_lines(&self) -> bool;
    /// Text shown in place of the fold starting at `line_doc`.
    fn get_fold_display_text(&self, line_doc: usize) -> Option<&str>;
    /// Set or clear the fold text of `line_doc`. Returns `true` if it changed.
    fn set_fold_display_text(&mut self, line_doc: usize, text: Option<&str>) -> bool;
    /// Expanded flag of `line_doc`.
    fn get_expanded(&self, line_doc: usize) -> bool;
    /// Set the expanded flag of `line_doc`. Child visibility is not touched.
    fn set_expanded(&mut self, line_doc: usize, expanded: bool) -> bool;
    /// Returns `true` if `line_doc` is visible, collapsed and has non-empty fold text.
    fn get_fold_display_text_shown(&self, line_doc: usize) -> bool;
    /// First collapsed line at or after `line_doc_start`.
    ///
    /// Scans line records one by one, so the cost is linear in the number of
    /// lines after `line_doc_start`.
    fn contracted_next(&self, line_doc_start: usize) -> Option<usize>;
    /// Display rows of `line_doc` when visible.
    fn get_height(&self, line_doc: usize) -> usize;
    /// Set the display rows of `line_doc`. A height of 0 is rejected.
    fn set_height(&mut self, line_doc: usize, height: usize) -> bool;
    /// Make every line visible, expanded and one row high.
    fn show_all(&mut self);
    /// Debug check of the display mapping.
    fn check(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineRecord {
    visible: bool,
    expanded: bool,
    height: usize,
    fold_display_text: Option<String>,
}

impl Default for LineRecord {
    fn default() -> Self {
        Self {
            visible: true,
            expanded: true,
            height: 1,
            fold_display_text: None,
        }
    }
}

impl LineRecord {
    fn display_rows(&self) -> usize {
        if self.visible { self.height } else { 0 }
    }
}

#[derive(Debug, Clone)]
enum Repr {
    /// Identity mapping over `lines` lines.
    Flat { lines: usize },
    /// One record per line, and a partition per line whose width is its display rows.
    Materialized {
        records: SplitVector<LineRecord>,
        display_lines: Partitioning,
        hidden: usize,
    },
}

/// Standard [`Contraction`].
#[derive(Debug, Clone)]
pub struct ContractionState {
    repr: Repr,
}

impl ContractionState {
    /// A single visible line.
    pub fn new() -> Self {
        Self::with_lines(1)
    }

    /// `lines` visible lines.
    pub fn with_lines(lines: usize) -> Self {
        Self {
            repr: Repr::Flat {
                lines: lines.max(1),
            },
        }
    }

    /// Returns `true` while the mapping is the identity.
    pub fn is_one_to_one(&self) -> bool {
        matches!(self.repr, Repr::Flat { .. })
    }

    fn ensure_data(&mut self) {
        if let Repr::Flat { lines } = self.repr {
            debug!(lines, "materializing contraction state");
            let mut records = SplitVector::with_capacity(lines);
            records.insert_value(0, lines, LineRecord::default());
            let mut display_lines = Partitioning::new();
            display_lines.insert_text(0, 1);
            for line in 1..lines {
                let result = display_lines.insert_partition(line, 1);
                debug_assert!(result.is_ok(), "display partition {line} out of range");
            }
            self.repr = Repr::Materialized {
                records,
                display_lines,
                hidden: 0,
            };
        }
    }

    fn record(&self, line_doc: usize) -> Option<&LineRecord> {
        match &self.repr {
            Repr::Flat { .. } => None,
            Repr::Materialized { records, .. } => records.get(line_doc),
        }
    }

    /// Change the display rows of `line_doc` from `old_rows` to `new_rows`.
    fn resize_rows(
        display_lines: &mut Partitioning,
        line_doc: usize,
        old_rows: usize,
        new_rows: usize,
    ) {
        if new_rows != old_rows {
            display_lines.insert_text(line_doc, new_rows as isize - old_rows as isize);
        }
    }
}

impl Default for ContractionState {
    fn default() -> Self {
        Self::new()
    }
}

impl Contraction for ContractionState {
    fn clear(&mut self) {
        *self = Self::new();
    }

    fn lines_in_doc(&self) -> usize {
        match &self.repr {
            Repr::Flat { lines } => *lines,
            Repr::Materialized { records, .. } => records.len(),
        }
    }

    fn lines_displayed(&self) -> usize {
        match &self.repr {
            Repr::Flat { lines } => *lines,
            Repr::Materialized { display_lines, .. } => {
                display_lines.position_from_partition(display_lines.partitions())
            }
        }
    }

    fn display_from_doc(&self, line_doc: usize) -> usize {
        match &self.repr {
            Repr::Flat { lines } => line_doc.min(*lines),
            Repr::Materialized { display_lines, .. } => {
                display_lines.position_from_partition(line_doc.min(display_lines.partitions()))
            }
        }
    }

    fn display_last_from_doc(&self, line_doc: usize) -> usize {
        (self.display_from_doc(line_doc) + self.get_height(line_doc)).saturating_sub(1)
    }

    fn doc_from_display(&self, line_display: usize) -> usize {
        match &self.repr {
            Repr::Flat { lines } => line_display.min(lines - 1),
            Repr::Materialized { display_lines, .. } => {
                let displayed = self.lines_displayed();
                if displayed == 0 {
                    return 0;
                }
                display_lines.partition_from_position(line_display.min(displayed - 1))
            }
        }
    }

    fn insert_lines(&mut self, line_doc: usize, count: usize) {
        match &mut self.repr {
            Repr::Flat { lines } => *lines += count,
            Repr::Materialized {
                records,
                display_lines,
                ..
            } => {
                let line_doc = line_doc.min(records.len());
                records.insert_value(line_doc, count, LineRecord::default());
                for offset in 0..count {
                    let result = display_lines.insert_partition(line_doc + offset, 1);
                    debug_assert!(result.is_ok(), "display partition out of range");
                }
            }
        }
    }

    fn delete_lines(&mut self, line_doc: usize, count: usize) {
        let available = self.lines_in_doc().saturating_sub(line_doc);
        // The last line is never removed.
        let count = count.min(available).min(self.lines_in_doc() - 1);
        match &mut self.repr {
            Repr::Flat { lines } => *lines -= count,
            Repr::Materialized {
                records,
                display_lines,
                hidden,
            } => {
                for _ in 0..count {
                    if let Some(record) = records.remove(line_doc) {
                        if !record.visible {
                            *hidden -= 1;
                        }
                    }
                    let result = display_lines.remove_partition(line_doc);
                    debug_assert!(result.is_ok(), "display partition {line_doc} missing");
                }
            }
        }
    }

    fn get_visible(&self, line_doc: usize) -> bool {
        self.record(line_doc).is_none_or(|record| record.visible)
    }

    fn set_visible(&mut self, start: usize, end: usize, visible: bool) -> bool {
        if self.is_one_to_one() && visible {
            return false;
        }
        let start = if visible { start } else { start.max(1) };
        if start >= end || end > self.lines_in_doc() {
            return false;
        }
        self.ensure_data();
        let Repr::Materialized {
            records,
            display_lines,
            hidden,
        } = &mut self.repr
        else {
            return false;
        };
        let mut changed = false;
        for line in start..end {
            let Some(record) = records.get_mut(line) else {
                break;
            };
            if record.visible != visible {
                let old_rows = record.display_rows();
                record.visible = visible;
                Self::resize_rows(display_lines, line, old_rows, record.display_rows());
                if visible {
                    *hidden -= 1;
                } else {
                    *hidden += 1;
                }
                changed = true;
            }
        }
        changed
    }

    fn hidden_lines(&self) -> bool {
        match &self.repr {
            Repr::Flat { .. } => false,
            Repr::Materialized { hidden, .. } => *hidden > 0,
        }
    }

    fn get_fold_display_text(&self, line_doc: usize) -> Option<&str> {
        self.record(line_doc)?.fold_display_text.as_deref()
    }

    fn set_fold_display_text(&mut self, line_doc: usize, text: Option<&str>) -> bool {
        if line_doc >= self.lines_in_doc() || (self.is_one_to_one() && text.is_none()) {
            return false;
        }
        if self.get_fold_display_text(line_doc) == text {
            return false;
        }
        self.ensure_data();
        if let Repr::Materialized { records, .. } = &mut self.repr {
            if let Some(record) = records.get_mut(line_doc) {
                record.fold_display_text = text.map(str::to_owned);
            }
        }
        true
    }

    fn get_expanded(&self, line_doc: usize) -> bool {
        self.record(line_doc).is_none_or(|record| record.expanded)
    }

    fn set_expanded(&mut self, line_doc: usize, expanded: bool) -> bool {
        if line_doc >= self.lines_in_doc() || (self.is_one_to_one() && expanded) {
            return false;
        }
        if self.get_expanded(line_doc) == expanded {
            return false;
        }
        self.ensure_data();
        if let Repr::Materialized { records, .. } = &mut self.repr {
            if let Some(record) = records.get_mut(line_doc) {
                record.expanded = expanded;
            }
        }
        true
    }

    fn get_fold_display_text_shown(&self, line_doc: usize) -> bool {
        self.record(line_doc).is_some_and(|record| {
            record.visible
                && !record.expanded
                && record
                    .fold_display_text
                    .as_deref()
                    .is_some_and(|text| !text.is_empty())
        })
    }

    fn contracted_next(&self, line_doc_start: usize) -> Option<usize> {
        match &self.repr {
            Repr::Flat { .. } => None,
            Repr::Materialized { records, .. } => records
                .iter()
                .enumerate()
                .skip(line_doc_start)
                .find(|(_, record)| !record.expanded)
                .map(|(line, _)| line),
        }
    }

    fn get_height(&self, line_doc: usize) -> usize {
        self.record(line_doc).map_or(1, |record| record.height)
    }

    fn set_height(&mut self, line_doc: usize, height: usize) -> bool {
        if height == 0 || line_doc >= self.lines_in_doc() {
            return false;
        }
        if self.get_height(line_doc) == height {
            return false;
        }
        self.ensure_data();
        let Repr::Materialized {
            records,
            display_lines,
            ..
        } = &mut self.repr
        else {
            return false;
        };
        if let Some(record) = records.get_mut(line_doc) {
            let old_rows = record.display_rows();
            record.height = height;
            Self::resize_rows(display_lines, line_doc, old_rows, record.display_rows());
        }
        true
    }

    fn show_all(&mut self) {
        let lines = self.lines_in_doc();
        self.repr = Repr::Flat { lines };
    }

    fn check(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let Repr::Materialized {
            records,
            display_lines,
            hidden,
        } = &self.repr
        else {
            return;
        };
        debug_assert_eq!(display_lines.partitions(), records.len());
        debug_assert_eq!(
            *hidden,
            records.iter().filter(|record| !record.visible).count()
        );
        for (line, record) in records.iter().enumerate() {
            debug_assert!(record.height >= 1);
            debug_assert_eq!(
                display_lines.partition_width(line),
                record.display_rows(),
                "display rows of line {line}"
            );
        }
        display_lines.check();
    }
}
