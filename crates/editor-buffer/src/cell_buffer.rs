//! Cell buffer: text bytes, style bytes, line starts and undo history.
//!
//! Text and styles are two gap buffers of equal length. Line starts live in a
//! [`Partitioning`] (partition = line, position = byte offset) that is patched
//! incrementally from the bytes of each edit rather than rescanned.
//!
//! Line data stored outside the buffer (markers, fold levels, ...) is passed into every
//! structural call as a [`PerLine`] and receives one `insert_line` / `remove_line` per
//! line boundary created or destroyed.

use tracing::{debug, trace};

use crate::error::BufferError;
use crate::line_end::{LineEndTypes, contains_line_end, is_nel, is_separator, is_trail_byte};
use crate::partitioning::Partitioning;
use crate::per_line::PerLine;
use crate::split_vector::SplitVector;
use crate::undo::{Action, ActionKind, UndoHistory};

/// Result of a successful insertion or deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// The edit was not merged into the previous undo step.
    pub start_sequence: bool,
    /// Bytes inserted or removed.
    pub data: Vec<u8>,
}

/// Text storage contract used by [`Document`](crate::Document).
///
/// Reads outside the buffer return 0 (or zero-fill). Writes validate their range and
/// fail with [`BufferError`] instead of touching anything.
pub trait TextBuffer {
    /// Byte at `position`; 0 outside the buffer.
    fn char_at(&self, position: usize) -> u8;
    /// Copy `[position, position + buffer.len())` into `buffer`.
    fn get_char_range(&self, buffer: &mut [u8], position: usize);
    /// Style at `position`; 0 outside the buffer.
    fn style_at(&self, position: usize) -> u8;
    /// Copy styles of `[position, position + buffer.len())` into `buffer`.
    fn get_style_range(&self, buffer: &mut [u8], position: usize);
    /// The whole text as one contiguous slice.
    fn buffer_pointer(&mut self) -> &[u8];
    /// Contiguous slice of `[position, position + length)`, clamped to the buffer.
    fn range_pointer(&mut self, position: usize, length: usize) -> &[u8];
    /// Where the gap currently is.
    fn gap_position(&self) -> usize;

    /// Length in bytes.
    fn length(&self) -> usize;
    /// Reserve room for `new_size` bytes.
    fn allocate(&mut self, new_size: usize);
    /// Active line-end mode.
    fn line_end_types(&self) -> LineEndTypes;
    /// Switch line-end mode, recomputing every line start if it changed.
    fn set_line_end_types(&mut self, types: LineEndTypes, per_line: &mut dyn PerLine);
    /// Returns `true` if `text` would end a line under the active mode.
    fn contains_line_end(&self, text: &[u8]) -> bool;
    /// Number of lines (at least 1).
    fn lines(&self) -> usize;
    /// First byte of `line`; the buffer length for `line >= lines()`.
    fn line_start(&self, line: usize) -> usize;
    /// Line containing `position`.
    fn line_from_position(&self, position: usize) -> usize;

    /// Insert `text` at `position`.
    fn insert_string(
        &mut self,
        position: usize,
        text: &[u8],
        per_line: &mut dyn PerLine,
    ) -> Result<EditOutcome, BufferError>;
    /// Remove `length` bytes at `position`.
    fn delete_chars(
        &mut self,
        position: usize,
        length: usize,
        per_line: &mut dyn PerLine,
    ) -> Result<EditOutcome, BufferError>;
    /// Set one style byte; returns `true` if it changed.
    fn set_style_at(&mut self, position: usize, style: u8) -> bool;
    /// Set `length` style bytes; returns `true` if any changed.
    fn set_style_for(&mut self, position: usize, length: usize, style: u8) -> bool;

    /// Read-only flag.
    fn is_read_only(&self) -> bool;
    /// Set the read-only flag.
    fn set_read_only(&mut self, read_only: bool);

    /// Mark the current history position as saved.
    fn set_save_point(&mut self);
    /// Returns `true` at the saved history position.
    fn is_save_point(&self) -> bool;

    /// Begin a provisional run of edits.
    fn tentative_start(&mut self);
    /// Keep the provisional edits.
    fn tentative_commit(&mut self);
    /// Returns `true` while a provisional run is open.
    fn tentative_active(&self) -> bool;
    /// Actions recorded since the provisional run began.
    fn tentative_steps(&mut self) -> Option<usize>;

    /// Turn undo recording on or off; returns the new state.
    fn set_undo_collection(&mut self, collect_undo: bool) -> bool;
    /// Undo recording state.
    fn is_collecting_undo(&self) -> bool;
    /// Open an undo bracket.
    fn begin_undo_action(&mut self);
    /// Close an undo bracket.
    fn end_undo_action(&mut self);
    /// Record an opaque host marker in the history.
    fn add_undo_action(&mut self, token: usize, may_coalesce: bool);
    /// Drop the whole history.
    fn delete_undo_history(&mut self);

    /// Returns `true` if a step can be undone.
    fn can_undo(&self) -> bool;
    /// Begin undoing one step; returns its action count.
    fn start_undo(&mut self) -> usize;
    /// Next action to undo.
    fn get_undo_step(&self) -> &Action;
    /// Reverse the action returned by [`TextBuffer::get_undo_step`].
    fn perform_undo_step(&mut self, per_line: &mut dyn PerLine);
    /// Returns `true` if a step can be redone.
    fn can_redo(&self) -> bool;
    /// Begin redoing one step; returns its action count.
    fn start_redo(&mut self) -> usize;
    /// Next action to redo.
    fn get_redo_step(&self) -> &Action;
    /// Reapply the action returned by [`TextBuffer::get_redo_step`].
    fn perform_redo_step(&mut self, per_line: &mut dyn PerLine);
}

/// Standard [`TextBuffer`] built on gap buffers.
#[derive(Debug, Clone)]
pub struct CellBuffer {
    substance: SplitVector<u8>,
    style: SplitVector<u8>,
    starts: Partitioning,
    line_end_types: LineEndTypes,
    read_only: bool,
    collecting_undo: bool,
    history: UndoHistory,
}

impl CellBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            substance: SplitVector::with_capacity(capacity),
            style: SplitVector::with_capacity(capacity),
            starts: Partitioning::new(),
            line_end_types: LineEndTypes::Default,
            read_only: false,
            collecting_undo: true,
            history: UndoHistory::new(),
        }
    }

    /// Byte at `position - back`, or 0 before the start.
    fn byte_before(&self, position: usize, back: usize) -> u8 {
        position
            .checked_sub(back)
            .map_or(0, |p| self.substance.value_at(p))
    }

    /// Returns `true` if a multi-byte line end covers the byte boundary at `position`.
    fn utf8_line_end_overlaps(&self, position: usize) -> bool {
        let bytes = [
            self.byte_before(position, 2),
            self.byte_before(position, 1),
            self.substance.value_at(position),
            self.substance.value_at(position + 1),
        ];
        is_separator([bytes[0], bytes[1], bytes[2]])
            || is_separator([bytes[1], bytes[2], bytes[3]])
            || is_nel([bytes[1], bytes[2]])
    }

    /// Add a line starting at `position`. At a line start the per-line entry goes in front
    /// of the old line so its data follows the text that moved down.
    fn insert_line(
        &mut self,
        per_line: &mut dyn PerLine,
        line: usize,
        position: usize,
        line_start: bool,
    ) {
        self.starts.insert_boundary(line, position);
        let data_line = if line > 0 && line_start { line - 1 } else { line };
        per_line.insert_line(data_line);
    }

    fn remove_line(&mut self, per_line: &mut dyn PerLine, line: usize) {
        self.starts.remove_boundary(line);
        per_line.remove_line(line);
    }

    fn basic_insert_string(&mut self, position: usize, text: &[u8], per_line: &mut dyn PerLine) {
        if text.is_empty() {
            return;
        }
        let unicode = self.line_end_types.allows_unicode();
        let ch_after = self.substance.value_at(position);
        let breaking_utf8_line_end =
            unicode && is_trail_byte(ch_after) && self.utf8_line_end_overlaps(position);

        self.substance.insert_from_slice(position, text);
        self.style.insert_value(position, text.len(), 0);

        let mut line_insert = self.starts.partition_from_position(position) + 1;
        let at_line_start = self.starts.position_from_partition(line_insert - 1) == position;
        self.starts.insert_text(line_insert - 1, text.len() as isize);

        let mut ch_before_prev = self.byte_before(position, 2);
        let mut ch_prev = self.byte_before(position, 1);
        if ch_prev == b'\r' && ch_after == b'\n' {
            // Splitting a CRLF pair.
            self.insert_line(per_line, line_insert, position, false);
            line_insert += 1;
        }
        if breaking_utf8_line_end {
            self.remove_line(per_line, line_insert);
        }

        let mut ch = b' ';
        for (i, &byte) in text.iter().enumerate() {
            ch = byte;
            let next_start = position + i + 1;
            match ch {
                b'\r' => {
                    self.insert_line(per_line, line_insert, next_start, at_line_start);
                    line_insert += 1;
                }
                b'\n' if ch_prev == b'\r' => {
                    // CR already ended the line; the line now starts after the LF.
                    self.starts.set_partition_start(line_insert - 1, next_start);
                }
                b'\n' => {
                    self.insert_line(per_line, line_insert, next_start, at_line_start);
                    line_insert += 1;
                }
                _ if unicode
                    && (is_separator([ch_before_prev, ch_prev, ch]) || is_nel([ch_prev, ch])) =>
                {
                    self.insert_line(per_line, line_insert, next_start, at_line_start);
                    line_insert += 1;
                }
                _ => {}
            }
            ch_before_prev = ch_prev;
            ch_prev = ch;
        }

        if ch_after == b'\n' {
            if ch == b'\r' {
                // The inserted CR joins the LF that follows: one line end, not two.
                self.remove_line(per_line, line_insert - 1);
            }
        } else if unicode && !ch_after.is_ascii() {
            // A separator may start in the insertion and end in the old text.
            let end = position + text.len();
            for j in 0..2 {
                let ch_at = self.substance.value_at(end + j);
                if is_separator([ch_before_prev, ch_prev, ch_at]) {
                    self.insert_line(per_line, line_insert, end + j + 1, at_line_start);
                    line_insert += 1;
                }
                if j == 0 && is_nel([ch_prev, ch_at]) {
                    self.insert_line(per_line, line_insert, end + j + 1, at_line_start);
                    line_insert += 1;
                }
                ch_before_prev = ch_prev;
                ch_prev = ch_at;
            }
        }
    }

    fn basic_delete_chars(&mut self, position: usize, length: usize, per_line: &mut dyn PerLine) {
        if length == 0 {
            return;
        }
        if position == 0 && length == self.substance.len() {
            self.starts.delete_all();
            per_line.init();
        } else {
            // Line starts are fixed up before the bytes go, since the bytes decide which
            // lines disappear.
            let unicode = self.line_end_types.allows_unicode();
            let mut line_remove = self.starts.partition_from_position(position) + 1;
            self.starts.insert_text(line_remove - 1, -(length as isize));
            let ch_before = self.byte_before(position, 1);
            let mut ch_next = self.substance.value_at(position);
            let mut ignore_nl = false;
            if ch_before == b'\r' && ch_next == b'\n' {
                // Deleting from the middle of a CRLF: the LF is not a real line end.
                self.starts.set_partition_start(line_remove, position);
                line_remove += 1;
                ignore_nl = true;
            }
            if unicode && is_trail_byte(ch_next) && self.utf8_line_end_overlaps(position) {
                self.remove_line(per_line, line_remove);
            }

            let mut ch = ch_next;
            for i in 0..length {
                ch_next = self.substance.value_at(position + i + 1);
                match ch {
                    b'\r' => {
                        if ch_next != b'\n' {
                            self.remove_line(per_line, line_remove);
                        }
                    }
                    b'\n' => {
                        if ignore_nl {
                            ignore_nl = false;
                        } else {
                            self.remove_line(per_line, line_remove);
                        }
                    }
                    _ if unicode && !ch.is_ascii() => {
                        let next3 = [ch, ch_next, self.substance.value_at(position + i + 2)];
                        if is_separator(next3) || is_nel([ch, ch_next]) {
                            self.remove_line(per_line, line_remove);
                        }
                    }
                    _ => {}
                }
                ch = ch_next;
            }

            // The deletion may bring a CR next to an LF.
            let ch_after = self.substance.value_at(position + length);
            if ch_before == b'\r' && ch_after == b'\n' {
                self.remove_line(per_line, line_remove - 1);
                self.starts.set_partition_start(line_remove - 1, position + 1);
            }
        }
        self.substance.delete_range(position, length);
        self.style.delete_range(position, length);
    }

    /// Rebuild every line start from the text. Line data is reset.
    fn reset_line_ends(&mut self, per_line: &mut dyn PerLine) {
        self.starts.delete_all();
        per_line.init();

        let unicode = self.line_end_types.allows_unicode();
        let length = self.substance.len();
        let mut line_insert = 1;
        self.starts.insert_text(0, length as isize);
        let mut ch_before_prev = 0;
        let mut ch_prev = 0;
        for i in 0..length {
            let ch = self.substance.value_at(i);
            match ch {
                b'\r' => {
                    self.insert_line(per_line, line_insert, i + 1, true);
                    line_insert += 1;
                }
                b'\n' if ch_prev == b'\r' => {
                    self.starts.set_partition_start(line_insert - 1, i + 1);
                }
                b'\n' => {
                    self.insert_line(per_line, line_insert, i + 1, true);
                    line_insert += 1;
                }
                _ if unicode
                    && (is_separator([ch_before_prev, ch_prev, ch]) || is_nel([ch_prev, ch])) =>
                {
                    self.insert_line(per_line, line_insert, i + 1, true);
                    line_insert += 1;
                }
                _ => {}
            }
            ch_before_prev = ch_prev;
            ch_prev = ch;
        }
        debug!(lines = self.lines(), mode = ?self.line_end_types, "line ends reset");
    }

    fn check_writable(&self) -> Result<(), BufferError> {
        if self.read_only {
            Err(BufferError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Debug check: text and styles have equal length and line starts cover the text.
    pub fn check(&self) {
        debug_assert_eq!(self.substance.len(), self.style.len());
        debug_assert_eq!(
            self.starts.position_from_partition(self.starts.partitions()),
            self.substance.len()
        );
        self.starts.check();
    }
}

impl Default for CellBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBuffer for CellBuffer {
    fn char_at(&self, position: usize) -> u8 {
        self.substance.value_at(position)
    }

    fn get_char_range(&self, buffer: &mut [u8], position: usize) {
        self.substance.get_range(buffer, position);
    }

    fn style_at(&self, position: usize) -> u8 {
        self.style.value_at(position)
    }

    fn get_style_range(&self, buffer: &mut [u8], position: usize) {
        self.style.get_range(buffer, position);
    }

    fn buffer_pointer(&mut self) -> &[u8] {
        self.substance.buffer_pointer()
    }

    fn range_pointer(&mut self, position: usize, length: usize) -> &[u8] {
        self.substance.range_pointer(position, length)
    }

    fn gap_position(&self) -> usize {
        self.substance.gap_position()
    }

    fn length(&self) -> usize {
        self.substance.len()
    }

    fn allocate(&mut self, new_size: usize) {
        self.substance.reserve(new_size);
        self.style.reserve(new_size);
    }

    fn line_end_types(&self) -> LineEndTypes {
        self.line_end_types
    }

    fn set_line_end_types(&mut self, types: LineEndTypes, per_line: &mut dyn PerLine) {
        if types != self.line_end_types {
            self.line_end_types = types;
            self.reset_line_ends(per_line);
        }
    }

    fn contains_line_end(&self, text: &[u8]) -> bool {
        contains_line_end(text, self.line_end_types)
    }

    fn lines(&self) -> usize {
        self.starts.partitions()
    }

    fn line_start(&self, line: usize) -> usize {
        if line >= self.lines() {
            self.length()
        } else {
            self.starts.position_from_partition(line)
        }
    }

    fn line_from_position(&self, position: usize) -> usize {
        self.starts.partition_from_position(position)
    }

    fn insert_string(
        &mut self,
        position: usize,
        text: &[u8],
        per_line: &mut dyn PerLine,
    ) -> Result<EditOutcome, BufferError> {
        self.check_writable()?;
        let length = self.length();
        if position > length {
            return Err(BufferError::PositionOutOfRange { position, length });
        }
        if text.is_empty() {
            return Ok(EditOutcome::default());
        }
        let start_sequence = self.collecting_undo
            && self
                .history
                .append_action(ActionKind::Insert, position, text, true);
        self.basic_insert_string(position, text, per_line);
        trace!(position, len = text.len(), lines = self.lines(), "insert");
        Ok(EditOutcome {
            start_sequence,
            data: text.to_vec(),
        })
    }

    fn delete_chars(
        &mut self,
        position: usize,
        length: usize,
        per_line: &mut dyn PerLine,
    ) -> Result<EditOutcome, BufferError> {
        self.check_writable()?;
        let buffer_length = self.length();
        if position.checked_add(length).is_none_or(|end| end > buffer_length) {
            return Err(BufferError::RangeOutOfBounds {
                position,
                length,
                buffer_length,
            });
        }
        if length == 0 {
            return Ok(EditOutcome::default());
        }
        let data = self.substance.range_pointer(position, length).to_vec();
        let start_sequence = self.collecting_undo
            && self
                .history
                .append_action(ActionKind::Remove, position, &data, true);
        self.basic_delete_chars(position, length, per_line);
        trace!(position, len = length, lines = self.lines(), "delete");
        Ok(EditOutcome {
            start_sequence,
            data,
        })
    }

    fn set_style_at(&mut self, position: usize, style: u8) -> bool {
        match self.style.get_mut(position) {
            Some(current) if *current != style => {
                *current = style;
                true
            }
            _ => false,
        }
    }

    fn set_style_for(&mut self, position: usize, length: usize, style: u8) -> bool {
        let mut changed = false;
        for offset in 0..length {
            changed |= self.set_style_at(position + offset, style);
        }
        changed
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn set_save_point(&mut self) {
        self.history.set_save_point();
    }

    fn is_save_point(&self) -> bool {
        self.history.is_save_point()
    }

    fn tentative_start(&mut self) {
        self.history.tentative_start();
    }

    fn tentative_commit(&mut self) {
        self.history.tentative_commit();
    }

    fn tentative_active(&self) -> bool {
        self.history.tentative_active()
    }

    fn tentative_steps(&mut self) -> Option<usize> {
        self.history.tentative_steps()
    }

    fn set_undo_collection(&mut self, collect_undo: bool) -> bool {
        self.collecting_undo = collect_undo;
        self.history.drop_undo_sequence();
        self.collecting_undo
    }

    fn is_collecting_undo(&self) -> bool {
        self.collecting_undo
    }

    fn begin_undo_action(&mut self) {
        self.history.begin_undo_action();
    }

    fn end_undo_action(&mut self) {
        self.history.end_undo_action();
    }

    fn add_undo_action(&mut self, token: usize, may_coalesce: bool) {
        if self.collecting_undo {
            self.history
                .append_action(ActionKind::Container, token, &[], may_coalesce);
        }
    }

    fn delete_undo_history(&mut self) {
        self.history.delete_undo_history();
    }

    fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    fn start_undo(&mut self) -> usize {
        self.history.start_undo()
    }

    fn get_undo_step(&self) -> &Action {
        self.history.get_undo_step()
    }

    fn perform_undo_step(&mut self, per_line: &mut dyn PerLine) {
        let action = self.history.get_undo_step().clone();
        match action.kind {
            ActionKind::Insert => {
                debug_assert!(action.position + action.len() <= self.length());
                self.basic_delete_chars(action.position, action.len(), per_line);
            }
            ActionKind::Remove => {
                self.basic_insert_string(action.position, &action.data, per_line);
            }
            ActionKind::Start | ActionKind::Container => {}
        }
        trace!(kind = ?action.kind, position = action.position, len = action.len(), "undo step");
        self.history.completed_undo_step();
    }

    fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn start_redo(&mut self) -> usize {
        self.history.start_redo()
    }

    fn get_redo_step(&self) -> &Action {
        self.history.get_redo_step()
    }

    fn perform_redo_step(&mut self, per_line: &mut dyn PerLine) {
        let action = self.history.get_redo_step().clone();
        match action.kind {
            ActionKind::Insert => {
                self.basic_insert_string(action.position, &action.data, per_line);
            }
            ActionKind::Remove => {
                self.basic_delete_chars(action.position, action.len(), per_line);
            }
            ActionKind::Start | ActionKind::Container => {}
        }
        trace!(kind = ?action.kind, position = action.position, len = action.len(), "redo step");
        self.history.completed_redo_step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::per_line::{LineState, StateStore};

    struct Fixture {
        buffer: CellBuffer,
        lines: LineState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                buffer: CellBuffer::new(),
                lines: LineState::new(),
            }
        }

        fn unicode() -> Self {
            let mut fixture = Self::new();
            fixture
                .buffer
                .set_line_end_types(LineEndTypes::Unicode, &mut fixture.lines);
            fixture
        }

        fn insert(&mut self, position: usize, text: &[u8]) -> bool {
            self.buffer
                .insert_string(position, text, &mut self.lines)
                .unwrap()
                .start_sequence
        }

        fn delete(&mut self, position: usize, length: usize) -> Vec<u8> {
            self.buffer
                .delete_chars(position, length, &mut self.lines)
                .unwrap()
                .data
        }

        fn undo(&mut self) {
            let steps = self.buffer.start_undo();
            for _ in 0..steps {
                self.buffer.perform_undo_step(&mut self.lines);
            }
        }

        fn redo(&mut self) {
            let steps = self.buffer.start_redo();
            for _ in 0..steps {
                self.buffer.perform_redo_step(&mut self.lines);
            }
        }

        fn text(&mut self) -> Vec<u8> {
            self.buffer.buffer_pointer().to_vec()
        }

        fn starts(&self) -> Vec<usize> {
            (0..self.buffer.lines())
                .map(|line| self.buffer.line_start(line))
                .collect()
        }

        fn check(&self) {
            self.buffer.check();
            assert_eq!(self.lines.lines(), self.buffer.lines());
        }
    }

    #[test]
    fn test_insert_delete_undo_scenario() {
        let mut f = Fixture::new();
        assert_eq!(f.buffer.lines(), 1);
        assert_eq!(f.buffer.length(), 0);

        f.insert(0, b"ab\ncd");
        assert_eq!(f.buffer.lines(), 2);
        assert_eq!(f.buffer.line_start(1), 3);
        assert_eq!(f.buffer.char_at(0), b'a');

        assert_eq!(f.delete(0, 3), b"ab\n");
        assert_eq!(f.buffer.lines(), 1);
        assert_eq!(f.text(), b"cd");

        f.undo();
        assert_eq!(f.text(), b"ab\ncd");
        assert_eq!(f.buffer.lines(), 2);
        f.check();
    }

    #[test]
    fn test_reads_outside_buffer_are_zero() {
        let mut f = Fixture::new();
        f.insert(0, b"xyz");
        assert_eq!(f.buffer.char_at(3), 0);
        assert_eq!(f.buffer.style_at(100), 0);
        let mut range = [9u8; 5];
        f.buffer.get_char_range(&mut range, 1);
        assert_eq!(range, [b'y', b'z', 0, 0, 0]);
        assert_eq!(f.buffer.line_start(7), 3);
    }

    #[test]
    fn test_line_lookup_all_terminators() {
        let mut f = Fixture::new();
        f.insert(0, b"a\nbb\r\nccc\rd");
        assert_eq!(f.starts(), vec![0, 2, 6, 10]);
        for line in 0..f.buffer.lines() {
            assert_eq!(f.buffer.line_from_position(f.buffer.line_start(line)), line);
        }
        assert_eq!(f.buffer.line_from_position(4), 1);
        assert_eq!(f.buffer.line_from_position(5), 1);
        f.check();
    }

    #[test]
    fn test_split_and_rejoin_crlf() {
        let mut f = Fixture::new();
        f.insert(0, b"a\r\nb");
        assert_eq!(f.starts(), vec![0, 3]);

        f.insert(2, b"x");
        assert_eq!(f.text(), b"a\rx\nb");
        assert_eq!(f.starts(), vec![0, 2, 4]);
        f.check();

        f.delete(2, 1);
        assert_eq!(f.starts(), vec![0, 3]);
        f.check();
    }

    #[test]
    fn test_inserting_cr_before_lf_makes_one_line_end() {
        let mut f = Fixture::new();
        f.insert(0, b"a\nb");
        f.insert(1, b"\r");
        assert_eq!(f.text(), b"a\r\nb");
        assert_eq!(f.starts(), vec![0, 3]);

        f.insert(4, b"\r");
        f.insert(5, b"\n");
        assert_eq!(f.starts(), vec![0, 3, 6]);
        f.check();
    }

    #[test]
    fn test_deleting_lf_of_crlf_keeps_line() {
        let mut f = Fixture::new();
        f.insert(0, b"a\r\nb");
        f.delete(2, 1);
        assert_eq!(f.text(), b"a\rb");
        assert_eq!(f.starts(), vec![0, 2]);
        f.check();
    }

    #[test]
    fn test_unicode_line_ends_depend_on_mode() {
        let mut f = Fixture::new();
        f.insert(0, "a\u{2028}b\u{85}c".as_bytes());
        assert_eq!(f.buffer.lines(), 1);

        f.buffer
            .set_line_end_types(LineEndTypes::Unicode, &mut f.lines);
        assert_eq!(f.starts(), vec![0, 4, 7]);
        assert!(f.buffer.contains_line_end("\u{2029}".as_bytes()));
        f.check();

        f.buffer
            .set_line_end_types(LineEndTypes::Default, &mut f.lines);
        assert_eq!(f.buffer.lines(), 1);
        assert!(!f.buffer.contains_line_end("\u{2029}".as_bytes()));
        f.check();
    }

    #[test]
    fn test_separator_split_across_edits() {
        let mut f = Fixture::unicode();
        f.insert(0, "a\u{2028}b".as_bytes());
        assert_eq!(f.starts(), vec![0, 4]);

        // Breaking the separator in the middle removes the line end.
        f.delete(2, 1);
        assert_eq!(f.buffer.lines(), 1);
        f.check();

        // Restoring the missing byte completes it again.
        f.insert(2, &[0x80]);
        assert_eq!(f.starts(), vec![0, 4]);
        f.check();

        // Inserting inside a complete separator breaks it.
        f.insert(2, b"z");
        assert_eq!(f.buffer.lines(), 1);
        f.check();
    }

    #[test]
    fn test_delete_everything_reinitializes_lines() {
        let mut f = Fixture::new();
        f.insert(0, b"1\n2\n3\n");
        f.lines.set_line_state(2, 5);
        f.delete(0, 6);
        assert_eq!(f.buffer.lines(), 1);
        assert_eq!(f.lines.lines(), 1);
        assert_eq!(f.lines.get_line_state(0), 0);
        f.check();
    }

    #[test]
    fn test_line_data_moves_with_text_inserted_at_line_start() {
        let mut f = Fixture::new();
        f.insert(0, b"one\ntwo\nthree");
        f.lines.set_line_state(1, 22);
        f.insert(4, b"new\n");
        assert_eq!(f.lines.get_line_state(2), 22);
        f.check();
    }

    #[test]
    fn test_styles_never_recorded() {
        let mut f = Fixture::new();
        f.insert(0, b"abcdef");
        assert!(f.buffer.set_style_for(1, 3, 7));
        assert!(!f.buffer.set_style_for(1, 3, 7));
        assert!(!f.buffer.set_style_at(50, 1));
        let mut styles = [0u8; 6];
        f.buffer.get_style_range(&mut styles, 0);
        assert_eq!(styles, [0, 7, 7, 7, 0, 0]);

        // Only the text insertion is in the history.
        assert_eq!(f.buffer.start_undo(), 1);
    }

    #[test]
    fn test_undo_redo_restores_styles_and_lines() {
        let mut f = Fixture::new();
        f.insert(0, b"ab\ncd\nef");
        f.buffer.set_style_for(0, 8, 3);
        f.delete(1, 4);
        assert_eq!(f.text(), b"a\nef");
        f.undo();
        assert_eq!(f.text(), b"ab\ncd\nef");
        assert_eq!(f.buffer.lines(), 3);
        f.redo();
        assert_eq!(f.text(), b"a\nef");
        assert_eq!(f.buffer.lines(), 2);
        assert_eq!(f.buffer.style_at(0), 3);
        assert_eq!(f.buffer.style_at(1), 3);
        f.check();
    }

    #[test]
    fn test_typing_coalesces_into_one_step() {
        let mut f = Fixture::new();
        let starts: Vec<bool> = (0..5).map(|i| f.insert(i, b"x")).collect();
        assert_eq!(starts, vec![true, false, false, false, false]);
        assert!(f.insert(1, b"y"));
        f.undo();
        assert_eq!(f.text(), b"xxxxx");
        f.undo();
        assert_eq!(f.text(), b"");
        assert!(!f.buffer.can_undo());
    }

    #[test]
    fn test_save_point_follows_history() {
        let mut f = Fixture::new();
        f.insert(0, b"saved");
        f.buffer.set_save_point();
        assert!(f.buffer.is_save_point());
        f.undo();
        assert!(!f.buffer.is_save_point());
        f.redo();
        assert!(f.buffer.is_save_point());
    }

    #[test]
    fn test_read_only_rejects_edits() {
        let mut f = Fixture::new();
        f.insert(0, b"text");
        f.buffer.set_read_only(true);
        assert_eq!(
            f.buffer.insert_string(0, b"x", &mut f.lines),
            Err(BufferError::ReadOnly)
        );
        assert_eq!(
            f.buffer.delete_chars(0, 1, &mut f.lines),
            Err(BufferError::ReadOnly)
        );
        assert_eq!(f.text(), b"text");
    }

    #[test]
    fn test_out_of_range_writes_are_rejected() {
        let mut f = Fixture::new();
        f.insert(0, b"abc");
        assert_eq!(
            f.buffer.insert_string(4, b"x", &mut f.lines),
            Err(BufferError::PositionOutOfRange {
                position: 4,
                length: 3
            })
        );
        assert!(matches!(
            f.buffer.delete_chars(2, 2, &mut f.lines),
            Err(BufferError::RangeOutOfBounds { .. })
        ));
        assert!(f.buffer.delete_chars(usize::MAX, 2, &mut f.lines).is_err());
        assert_eq!(f.text(), b"abc");
        assert_eq!(f.buffer.start_undo(), 1);
    }

    #[test]
    fn test_undo_collection_off_records_nothing() {
        let mut f = Fixture::new();
        assert!(!f.buffer.set_undo_collection(false));
        f.insert(0, b"abc");
        assert!(!f.buffer.can_undo());
        f.buffer.set_undo_collection(true);
        f.insert(3, b"d");
        f.undo();
        assert_eq!(f.text(), b"abc");
    }

    #[test]
    fn test_allocate_keeps_content() {
        let mut f = Fixture::new();
        f.insert(0, b"hello");
        f.buffer.allocate(1000);
        assert_eq!(f.text(), b"hello");
        f.insert(5, b"!");
        assert_eq!(f.text(), b"hello!");
    }
}
