//! Document construction options.

use crate::line_end::LineEndTypes;

/// Options applied when a [`Document`](crate::Document) is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Which line terminators split lines.
    pub line_end_types: LineEndTypes,
    /// Record edits in the undo history.
    pub collect_undo: bool,
    /// Start out read-only.
    pub read_only: bool,
    /// Bytes to reserve for text and styles up front.
    pub initial_capacity: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            line_end_types: LineEndTypes::Default,
            collect_undo: true,
            read_only: false,
            initial_capacity: 0,
        }
    }
}

impl DocumentConfig {
    /// Set the line terminator mode.
    pub fn with_line_end_types(mut self, line_end_types: LineEndTypes) -> Self {
        self.line_end_types = line_end_types;
        self
    }

    /// Enable or disable undo collection.
    pub fn with_collect_undo(mut self, collect_undo: bool) -> Self {
        self.collect_undo = collect_undo;
        self
    }

    /// Start read-only or writable.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Reserve room for `initial_capacity` bytes.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}
