//! Change notifications sent by [`Document`](crate::Document) to its subscribers.

use bitflags::bitflags;

use crate::document::Document;
use crate::per_line::FoldLevel;

bitflags! {
    /// What a [`DocModification`] describes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModificationFlags: u32 {
        /// Text was inserted.
        const INSERT_TEXT = 1 << 0;
        /// Text was removed.
        const DELETE_TEXT = 1 << 1;
        /// A line's fold level changed.
        const CHANGE_FOLD = 1 << 3;
        /// The change came from an ordinary edit.
        const PERFORMED_USER = 1 << 4;
        /// The change came from undo.
        const PERFORMED_UNDO = 1 << 5;
        /// The change came from redo.
        const PERFORMED_REDO = 1 << 6;
        /// Part of an undo or redo step with more than one action.
        const MULTI_STEP_UNDO_REDO = 1 << 7;
        /// Final action of an undo or redo step.
        const LAST_STEP_IN_UNDO_REDO = 1 << 8;
        /// A line's markers changed.
        const CHANGE_MARKER = 1 << 9;
        /// Text is about to be inserted.
        const BEFORE_INSERT = 1 << 10;
        /// Text is about to be removed.
        const BEFORE_DELETE = 1 << 11;
        /// An undo or redo step changed the line count.
        const MULTILINE_UNDO_REDO = 1 << 12;
        /// First action of a new undo step.
        const START_ACTION = 1 << 13;
        /// A line's margin text or style changed.
        const CHANGE_MARGIN = 1 << 16;
        /// A line's annotation changed.
        const CHANGE_ANNOTATION = 1 << 17;
        /// A host marker was undone or redone.
        const CONTAINER = 1 << 18;
        /// The document returned to its save point.
        const SAVE_POINT_REACHED = 1 << 24;
        /// The document left its save point.
        const SAVE_POINT_LEFT = 1 << 25;
    }
}

impl ModificationFlags {
    /// Flags that mean the text itself changed.
    pub const TEXT_CHANGED: Self = Self::INSERT_TEXT.union(Self::DELETE_TEXT);
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocModification {
    /// What happened.
    pub flags: ModificationFlags,
    /// Byte position of the change. For container notifications this is 0.
    pub position: usize,
    /// Byte length of the inserted or removed text.
    pub length: usize,
    /// Net change in the line count (after-notifications only).
    pub lines_added: isize,
    /// The inserted or removed bytes, when known.
    pub text: Option<Vec<u8>>,
    /// Host token of a container action.
    pub token: usize,
    /// Line a marker or fold change applies to.
    pub line: Option<usize>,
    /// Fold level after a [`ModificationFlags::CHANGE_FOLD`].
    pub fold_level_now: Option<FoldLevel>,
    /// Fold level before a [`ModificationFlags::CHANGE_FOLD`].
    pub fold_level_prev: Option<FoldLevel>,
}

impl DocModification {
    /// A notification with only flags, position and length set.
    pub fn new(flags: ModificationFlags, position: usize, length: usize) -> Self {
        Self {
            flags,
            position,
            length,
            lines_added: 0,
            text: None,
            token: 0,
            line: None,
            fold_level_now: None,
            fold_level_prev: None,
        }
    }

    /// Attach the affected bytes.
    pub fn with_text(mut self, text: Vec<u8>) -> Self {
        self.text = Some(text);
        self
    }

    /// Attach the net line delta.
    pub fn with_lines_added(mut self, lines_added: isize) -> Self {
        self.lines_added = lines_added;
        self
    }

    /// Attach the line a marker or fold change applies to.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Returns `true` if the text changed.
    pub fn is_text_change(&self) -> bool {
        self.flags.intersects(ModificationFlags::TEXT_CHANGED)
    }
}

/// Subscriber callback.
///
/// The callback may read the document and change per-line data, but text edits and
/// undo/redo started from inside a callback are rejected with
/// [`BufferError::Reentrant`](crate::BufferError::Reentrant).
pub type ModificationCallback = Box<dyn FnMut(&mut Document, &DocModification)>;
