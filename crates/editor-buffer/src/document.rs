//! The document: text buffer, per-line stores and change notifications in one place.
//!
//! [`Document`] is the only type most hosts touch. Every text edit goes through it so
//! that:
//!
//! - the per-line stores see each inserted or removed line,
//! - an attached [`Contraction`] learns the net line delta before anyone else,
//! - subscribers get a `BEFORE_*` notification, then the edit, then the result.
//!
//! Undo and redo replay the history one action at a time with the same protocol, so
//! a subscriber never has to special-case them beyond looking at the flags.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::annotation::AnnotationStore;
use crate::cell_buffer::TextBuffer;
use crate::config::DocumentConfig;
use crate::content::{ContentProvider, StdContent};
use crate::contraction::Contraction;
use crate::error::BufferError;
use crate::line_end::{LineEndTypes, is_nel, is_separator};
use crate::markers::{MarkerHandle, MarkerStore};
use crate::modification::{DocModification, ModificationCallback, ModificationFlags};
use crate::per_line::{FoldLevel, LevelStore, PerLine, StateStore, TabstopStore};
use crate::undo::ActionKind;

/// Every per-line store of a document, kept in step as one [`PerLine`].
struct LineStores {
    markers: Box<dyn MarkerStore>,
    levels: Box<dyn LevelStore>,
    state: Box<dyn StateStore>,
    margin: Box<dyn AnnotationStore>,
    annotation: Box<dyn AnnotationStore>,
    tabstops: Box<dyn TabstopStore>,
}

impl LineStores {
    fn from_content(content: &dyn ContentProvider) -> Self {
        Self {
            markers: content.line_markers(),
            levels: content.line_levels(),
            state: content.line_state(),
            margin: content.line_margin(),
            annotation: content.line_annotation(),
            tabstops: content.line_tabstops(),
        }
    }

    fn each(&mut self) -> [&mut dyn PerLine; 6] {
        [
            self.markers.as_mut(),
            self.levels.as_mut(),
            self.state.as_mut(),
            self.margin.as_mut(),
            self.annotation.as_mut(),
            self.tabstops.as_mut(),
        ]
    }

    /// Append lines until there are `lines`.
    fn extend_to(&mut self, lines: usize) {
        while self.lines() < lines {
            let line = self.lines();
            self.insert_line(line);
        }
    }
}

impl PerLine for LineStores {
    fn init(&mut self) {
        for store in self.each() {
            store.init();
        }
    }

    fn insert_line(&mut self, line: usize) {
        for store in self.each() {
            store.insert_line(line);
        }
    }

    fn remove_line(&mut self, line: usize) {
        for store in self.each() {
            store.remove_line(line);
        }
    }

    fn lines(&self) -> usize {
        self.markers.lines()
    }
}

/// Which way the history is being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Undo,
    Redo,
}

impl Replay {
    fn performed(self) -> ModificationFlags {
        match self {
            Self::Undo => ModificationFlags::PERFORMED_UNDO,
            Self::Redo => ModificationFlags::PERFORMED_REDO,
        }
    }
}

/// Caret placement after undoing a run of removals.
///
/// Undoing a backspace run re-inserts text right to left, a forward-delete run left to
/// right; either way the caret ends after the whole restored block.
#[derive(Debug, Default)]
struct CoalescedRemove {
    block: Option<(usize, usize)>,
    previous: Option<(usize, usize)>,
}

impl CoalescedRemove {
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record a re-inserted removal and return the caret after it.
    fn reinserted(&mut self, position: usize, len: usize) -> usize {
        let adjacent = self
            .previous
            .is_some_and(|(prev, prev_len)| position == prev || position == prev + prev_len);
        let caret = match self.block {
            Some((start, block_len)) if adjacent => {
                self.block = Some((start, block_len + len));
                start + block_len + len
            }
            _ => {
                self.block = Some((position, len));
                position + len
            }
        };
        self.previous = Some((position, len));
        caret
    }
}

/// An editable document.
///
/// Positions are byte offsets. Lines are split by the terminators selected with
/// [`LineEndTypes`].
pub struct Document {
    content: Rc<dyn ContentProvider>,
    buffer: Box<dyn TextBuffer>,
    stores: LineStores,
    contraction: Option<Weak<RefCell<dyn Contraction>>>,
    entered_modification: usize,
    callbacks: Vec<ModificationCallback>,
}

impl Document {
    /// Create an empty document backed by [`StdContent`].
    pub fn new(config: DocumentConfig) -> Self {
        Self::with_content(Rc::new(StdContent), config)
    }

    /// Create a document whose storage comes from `content`.
    ///
    /// If the provider hands out a buffer that already holds text, the per-line stores
    /// are sized to match. A contraction offered by the provider is attached.
    pub fn with_content(content: Rc<dyn ContentProvider>, config: DocumentConfig) -> Self {
        let (buffer, stores) = Self::build_storage(content.as_ref(), &config);
        let contraction = content.contraction_state();
        let mut document = Self {
            content,
            buffer,
            stores,
            contraction: None,
            entered_modification: 0,
            callbacks: Vec::new(),
        };
        if let Some(contraction) = contraction {
            document.attach_contraction(&contraction);
        }
        document
    }

    fn build_storage(
        content: &dyn ContentProvider,
        config: &DocumentConfig,
    ) -> (Box<dyn TextBuffer>, LineStores) {
        let mut buffer = content.cell_buffer(config);
        let mut stores = LineStores::from_content(content);
        buffer.allocate(config.initial_capacity);
        buffer.set_line_end_types(config.line_end_types, &mut stores);
        buffer.set_undo_collection(config.collect_undo);
        buffer.set_read_only(config.read_only);
        stores.extend_to(buffer.lines());
        (buffer, stores)
    }

    /// The provider this document's storage came from.
    pub fn content(&self) -> &Rc<dyn ContentProvider> {
        &self.content
    }

    /// Replace the storage with fresh storage from `content`.
    ///
    /// The old text, history and line data are dropped in one step. Subscribers see the
    /// old text deleted and the new text inserted, both at position 0.
    pub fn swap_content(&mut self, content: Rc<dyn ContentProvider>) -> Result<(), BufferError> {
        self.check_not_entered("swap content")?;
        let config = DocumentConfig {
            line_end_types: self.buffer.line_end_types(),
            collect_undo: self.buffer.is_collecting_undo(),
            read_only: self.buffer.is_read_only(),
            initial_capacity: 0,
        };
        let (buffer, stores) = Self::build_storage(content.as_ref(), &config);
        let old_lines = self.lines_total();
        let old_length = self.length();
        if let Some(contraction) = content.contraction_state() {
            self.contraction = Some(Rc::downgrade(&contraction));
            self.reset_contraction();
        }
        self.content = content;
        self.buffer = buffer;
        self.stores = stores;
        debug!(
            old_length,
            length = self.length(),
            lines = self.lines_total(),
            "content swapped"
        );
        self.announce_replacement(old_lines, old_length, self.length());
        Ok(())
    }

    /// Tell the document that its provider changed the text behind its back.
    ///
    /// `deleted` bytes were removed and then `inserted` bytes were inserted, both
    /// starting at 0. Line data is reset and subscribers are notified.
    pub fn content_changed(&mut self, deleted: usize, inserted: usize) -> Result<(), BufferError> {
        self.check_not_entered("content change")?;
        let old_lines = self.stores.lines();
        self.stores.init();
        self.stores.extend_to(self.buffer.lines());
        self.announce_replacement(old_lines, deleted, inserted);
        Ok(())
    }

    fn announce_replacement(&mut self, old_lines: usize, deleted: usize, inserted: usize) {
        self.entered_modification += 1;
        if deleted != 0 {
            self.notify(&DocModification::new(
                ModificationFlags::BEFORE_DELETE | ModificationFlags::PERFORMED_USER,
                0,
                deleted,
            ));
            let lines_added = -(old_lines.saturating_sub(1) as isize);
            self.forward_line_delta(0, lines_added);
            self.notify(
                &DocModification::new(
                    ModificationFlags::DELETE_TEXT | ModificationFlags::PERFORMED_USER,
                    0,
                    deleted,
                )
                .with_lines_added(lines_added),
            );
        }
        if inserted != 0 {
            self.notify(&DocModification::new(
                ModificationFlags::BEFORE_INSERT | ModificationFlags::PERFORMED_USER,
                0,
                inserted,
            ));
            let lines_added = (self.lines_total() - 1) as isize;
            self.forward_line_delta(0, lines_added);
            self.notify(
                &DocModification::new(
                    ModificationFlags::INSERT_TEXT | ModificationFlags::PERFORMED_USER,
                    0,
                    inserted,
                )
                .with_lines_added(lines_added),
            );
        }
        self.entered_modification -= 1;
    }

    /// Register a callback invoked for every [`DocModification`].
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&mut Document, &DocModification) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    fn notify(&mut self, modification: &DocModification) {
        let mut callbacks = mem::take(&mut self.callbacks);
        for callback in &mut callbacks {
            callback(self, modification);
        }
        // Keep subscriptions made from inside a callback.
        callbacks.append(&mut self.callbacks);
        self.callbacks = callbacks;
    }

    fn notify_save_point(&mut self, reached: bool) {
        let flags = if reached {
            ModificationFlags::SAVE_POINT_REACHED
        } else {
            ModificationFlags::SAVE_POINT_LEFT
        };
        self.notify(&DocModification::new(flags, 0, 0));
    }

    /// Attach a display line mapping. It is reset to one visible row per line.
    ///
    /// Only a weak reference is kept; dropping the last strong reference detaches it.
    pub fn attach_contraction(&mut self, contraction: &Rc<RefCell<dyn Contraction>>) {
        self.contraction = Some(Rc::downgrade(contraction));
        self.reset_contraction();
    }

    /// Stop forwarding line changes.
    pub fn detach_contraction(&mut self) {
        self.contraction = None;
    }

    /// The attached display line mapping, if it is still alive.
    pub fn contraction(&self) -> Option<Rc<RefCell<dyn Contraction>>> {
        self.contraction.as_ref().and_then(Weak::upgrade)
    }

    fn reset_contraction(&mut self) {
        let lines = self.lines_total();
        if let Some(contraction) = self.contraction() {
            match contraction.try_borrow_mut() {
                Ok(mut contraction) => {
                    contraction.clear();
                    contraction.insert_lines(1, lines - 1);
                }
                Err(_) => warn!(lines, "contraction busy; not reset"),
            }
        }
    }

    fn forward_line_delta(&mut self, position: usize, lines_added: isize) {
        if lines_added == 0 {
            return;
        }
        let Some(contraction) = self.contraction() else {
            return;
        };
        let Ok(mut contraction) = contraction.try_borrow_mut() else {
            warn!(position, lines_added, "contraction busy; line change not forwarded");
            return;
        };
        let mut line = self.buffer.line_from_position(position);
        if position > self.buffer.line_start(line) {
            line += 1;
        }
        if lines_added > 0 {
            contraction.insert_lines(line, lines_added.unsigned_abs());
        } else {
            contraction.delete_lines(line, lines_added.unsigned_abs());
        }
    }

    fn check_not_entered(&self, operation: &'static str) -> Result<(), BufferError> {
        if self.entered_modification != 0 {
            warn!(operation, "rejected: modification in progress");
            return Err(BufferError::Reentrant);
        }
        Ok(())
    }

    fn check_writable(&self, operation: &'static str) -> Result<(), BufferError> {
        self.check_not_entered(operation)?;
        if self.buffer.is_read_only() {
            warn!(operation, "rejected: document is read-only");
            return Err(BufferError::ReadOnly);
        }
        Ok(())
    }

    /// Insert `text` at `position`. Returns the number of bytes inserted.
    pub fn insert_string(&mut self, position: usize, text: &[u8]) -> Result<usize, BufferError> {
        self.check_writable("insert")?;
        let length = self.length();
        if position > length {
            return Err(BufferError::PositionOutOfRange { position, length });
        }
        if text.is_empty() {
            return Ok(0);
        }
        self.entered_modification += 1;
        let result = self.apply_insert(position, text);
        self.entered_modification -= 1;
        result
    }

    /// Insert a string slice at `position`.
    pub fn insert_str(&mut self, position: usize, text: &str) -> Result<usize, BufferError> {
        self.insert_string(position, text.as_bytes())
    }

    fn apply_insert(&mut self, position: usize, text: &[u8]) -> Result<usize, BufferError> {
        self.notify(
            &DocModification::new(
                ModificationFlags::BEFORE_INSERT | ModificationFlags::PERFORMED_USER,
                position,
                text.len(),
            )
            .with_text(text.to_vec()),
        );
        let prev_lines = self.lines_total();
        let start_save_point = self.buffer.is_save_point();
        let outcome = self.buffer.insert_string(position, text, &mut self.stores)?;
        if start_save_point && self.buffer.is_collecting_undo() {
            self.notify_save_point(false);
        }
        let lines_added = self.lines_total() as isize - prev_lines as isize;
        self.forward_line_delta(position, lines_added);
        let mut flags = ModificationFlags::INSERT_TEXT | ModificationFlags::PERFORMED_USER;
        flags.set(ModificationFlags::START_ACTION, outcome.start_sequence);
        self.notify(
            &DocModification::new(flags, position, text.len())
                .with_lines_added(lines_added)
                .with_text(outcome.data),
        );
        Ok(text.len())
    }

    /// Delete `length` bytes at `position`. Returns the number of bytes deleted.
    pub fn delete_chars(&mut self, position: usize, length: usize) -> Result<usize, BufferError> {
        self.check_writable("delete")?;
        let buffer_length = self.length();
        if position.checked_add(length).is_none_or(|end| end > buffer_length) {
            return Err(BufferError::RangeOutOfBounds {
                position,
                length,
                buffer_length,
            });
        }
        if length == 0 {
            return Ok(0);
        }
        self.entered_modification += 1;
        let result = self.apply_delete(position, length);
        self.entered_modification -= 1;
        result
    }

    fn apply_delete(&mut self, position: usize, length: usize) -> Result<usize, BufferError> {
        self.notify(&DocModification::new(
            ModificationFlags::BEFORE_DELETE | ModificationFlags::PERFORMED_USER,
            position,
            length,
        ));
        let prev_lines = self.lines_total();
        let start_save_point = self.buffer.is_save_point();
        let outcome = self.buffer.delete_chars(position, length, &mut self.stores)?;
        if start_save_point && self.buffer.is_collecting_undo() {
            self.notify_save_point(false);
        }
        let lines_added = self.lines_total() as isize - prev_lines as isize;
        self.forward_line_delta(position, lines_added);
        let mut flags = ModificationFlags::DELETE_TEXT | ModificationFlags::PERFORMED_USER;
        flags.set(ModificationFlags::START_ACTION, outcome.start_sequence);
        self.notify(
            &DocModification::new(flags, position, length)
                .with_lines_added(lines_added)
                .with_text(outcome.data),
        );
        Ok(length)
    }

    fn check_replay(&self, operation: &'static str) -> bool {
        self.check_writable(operation).is_ok()
    }

    /// Undo one step. Returns where the caret belongs afterwards, or `None` if the step
    /// moved no text.
    pub fn undo(&mut self) -> Option<usize> {
        if !self.check_replay("undo") || !self.buffer.can_undo() {
            return None;
        }
        self.entered_modification += 1;
        let steps = self.buffer.start_undo();
        let caret = self.replay(Replay::Undo, steps);
        self.entered_modification -= 1;
        caret
    }

    /// Redo one step. Returns where the caret belongs afterwards, or `None` if the step
    /// moved no text.
    pub fn redo(&mut self) -> Option<usize> {
        if !self.check_replay("redo") || !self.buffer.can_redo() {
            return None;
        }
        self.entered_modification += 1;
        let steps = self.buffer.start_redo();
        let caret = self.replay(Replay::Redo, steps);
        self.entered_modification -= 1;
        caret
    }

    /// Undo everything since [`tentative_start`](Self::tentative_start) and end the
    /// tentative run.
    pub fn tentative_undo(&mut self) {
        if !self.buffer.tentative_active() || !self.check_replay("tentative undo") {
            return;
        }
        self.entered_modification += 1;
        if let Some(steps) = self.buffer.tentative_steps() {
            self.replay(Replay::Undo, steps);
        }
        self.buffer.tentative_commit();
        self.entered_modification -= 1;
    }

    /// Apply `steps` actions from the history, notifying around each one.
    fn replay(&mut self, direction: Replay, steps: usize) -> Option<usize> {
        let start_save_point = self.buffer.is_save_point();
        let mut caret = None;
        let mut multi_line = false;
        let mut coalesced = CoalescedRemove::default();
        for step in 0..steps {
            let action = match direction {
                Replay::Undo => self.buffer.get_undo_step().clone(),
                Replay::Redo => self.buffer.get_redo_step().clone(),
            };
            // Undoing a removal inserts; undoing an insertion removes.
            let inserts = matches!(
                (direction, action.kind),
                (Replay::Undo, ActionKind::Remove) | (Replay::Redo, ActionKind::Insert)
            );
            let is_text = matches!(action.kind, ActionKind::Insert | ActionKind::Remove);
            if is_text {
                let before = if inserts {
                    ModificationFlags::BEFORE_INSERT
                } else {
                    ModificationFlags::BEFORE_DELETE
                };
                self.notify(
                    &DocModification::new(
                        before | direction.performed(),
                        action.position,
                        action.len(),
                    )
                    .with_text(action.data.clone()),
                );
            }

            let prev_lines = self.lines_total();
            match direction {
                Replay::Undo => self.buffer.perform_undo_step(&mut self.stores),
                Replay::Redo => self.buffer.perform_redo_step(&mut self.stores),
            }
            let lines_added = self.lines_total() as isize - prev_lines as isize;
            multi_line |= lines_added != 0;

            let mut flags = direction.performed();
            flags.set(ModificationFlags::MULTI_STEP_UNDO_REDO, steps > 1);
            if step + 1 == steps {
                flags |= ModificationFlags::LAST_STEP_IN_UNDO_REDO;
                flags.set(ModificationFlags::MULTILINE_UNDO_REDO, multi_line);
            }

            if !is_text {
                if action.kind == ActionKind::Container {
                    if !action.may_coalesce {
                        coalesced.reset();
                    }
                    let mut modification =
                        DocModification::new(flags | ModificationFlags::CONTAINER, 0, 0);
                    modification.token = action.position;
                    self.notify(&modification);
                }
                continue;
            }

            if inserts {
                flags |= ModificationFlags::INSERT_TEXT;
                caret = Some(match direction {
                    Replay::Undo => coalesced.reinserted(action.position, action.len()),
                    Replay::Redo => action.position + action.len(),
                });
            } else {
                flags |= ModificationFlags::DELETE_TEXT;
                coalesced.reset();
                caret = Some(action.position);
            }
            self.forward_line_delta(action.position, lines_added);
            self.notify(
                &DocModification::new(flags, action.position, action.len())
                    .with_lines_added(lines_added)
                    .with_text(action.data),
            );
        }

        let end_save_point = self.buffer.is_save_point();
        if start_save_point != end_save_point {
            self.notify_save_point(end_save_point);
        }
        caret
    }

    /// Returns `true` if [`undo`](Self::undo) would do something.
    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }

    /// Returns `true` if [`redo`](Self::redo) would do something.
    pub fn can_redo(&self) -> bool {
        self.buffer.can_redo()
    }

    /// Open an undo group; nested groups join the outermost one.
    ///
    /// The history methods below are ignored, with a warning, when called from a
    /// modification callback.
    pub fn begin_undo_action(&mut self) {
        if self.check_not_entered("begin undo action").is_ok() {
            self.buffer.begin_undo_action();
        }
    }

    /// Close an undo group.
    pub fn end_undo_action(&mut self) {
        if self.check_not_entered("end undo action").is_ok() {
            self.buffer.end_undo_action();
        }
    }

    /// Record an opaque host action in the history.
    pub fn add_undo_action(&mut self, token: usize, may_coalesce: bool) {
        if self.check_not_entered("add undo action").is_ok() {
            self.buffer.add_undo_action(token, may_coalesce);
        }
    }

    /// Turn undo collection on or off. Returns the new setting, which is left
    /// unchanged inside a modification callback.
    pub fn set_undo_collection(&mut self, collect_undo: bool) -> bool {
        if self.check_not_entered("set undo collection").is_err() {
            return self.buffer.is_collecting_undo();
        }
        self.buffer.set_undo_collection(collect_undo)
    }

    /// Returns `true` while edits are recorded.
    pub fn is_collecting_undo(&self) -> bool {
        self.buffer.is_collecting_undo()
    }

    /// Forget every recorded action.
    pub fn delete_undo_history(&mut self) {
        if self.check_not_entered("delete undo history").is_ok() {
            self.buffer.delete_undo_history();
        }
    }

    /// Mark the current state as saved.
    pub fn set_save_point(&mut self) {
        if self.check_not_entered("set save point").is_err() {
            return;
        }
        self.buffer.set_save_point();
        self.notify_save_point(true);
    }

    /// Returns `true` if the document is in its saved state.
    pub fn is_save_point(&self) -> bool {
        self.buffer.is_save_point()
    }

    /// Start a run of edits that may be rolled back with
    /// [`tentative_undo`](Self::tentative_undo).
    pub fn tentative_start(&mut self) {
        if self.check_not_entered("tentative start").is_ok() {
            self.buffer.tentative_start();
        }
    }

    /// Keep the tentative edits.
    pub fn tentative_commit(&mut self) {
        if self.check_not_entered("tentative commit").is_ok() {
            self.buffer.tentative_commit();
        }
    }

    /// Returns `true` during a tentative run.
    pub fn tentative_active(&self) -> bool {
        self.buffer.tentative_active()
    }

    /// Returns `true` if edits are rejected.
    pub fn is_read_only(&self) -> bool {
        self.buffer.is_read_only()
    }

    /// Allow or reject edits.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.buffer.set_read_only(read_only);
    }

    /// Active line terminator mode.
    pub fn line_end_types(&self) -> LineEndTypes {
        self.buffer.line_end_types()
    }

    /// Switch line terminator mode. Lines are rebuilt from the text and line data is
    /// reset. Returns `true` if the mode changed; always `false` inside a modification
    /// callback.
    pub fn set_line_end_types(&mut self, types: LineEndTypes) -> bool {
        if types == self.buffer.line_end_types() {
            return false;
        }
        if self.check_not_entered("set line end types").is_err() {
            return false;
        }
        self.buffer.set_line_end_types(types, &mut self.stores);
        self.reset_contraction();
        true
    }

    /// Length in bytes.
    pub fn length(&self) -> usize {
        self.buffer.length()
    }

    /// Number of lines; an empty document has one.
    pub fn lines_total(&self) -> usize {
        self.buffer.lines()
    }

    /// Position where `line` starts; [`length`](Self::length) past the last line.
    pub fn line_start(&self, line: usize) -> usize {
        self.buffer.line_start(line)
    }

    /// Position of the terminator ending `line`, or the document end for the last line.
    pub fn line_end(&self, line: usize) -> usize {
        if line + 1 >= self.lines_total() {
            return self.length();
        }
        let mut position = self.line_start(line + 1);
        if self.line_end_types().allows_unicode() {
            let byte = |back: usize| position.checked_sub(back).map_or(0, |p| self.char_at(p));
            if is_separator([byte(3), byte(2), byte(1)]) {
                return position - 3;
            }
            if is_nel([byte(2), byte(1)]) {
                return position - 2;
            }
        }
        position -= 1;
        if position > self.line_start(line) && self.char_at(position - 1) == b'\r' {
            position -= 1;
        }
        position
    }

    /// Line containing `position`.
    pub fn line_from_position(&self, position: usize) -> usize {
        self.buffer.line_from_position(position)
    }

    /// Byte at `position`; 0 outside the document.
    pub fn char_at(&self, position: usize) -> u8 {
        self.buffer.char_at(position)
    }

    /// Style byte at `position`; 0 outside the document.
    pub fn style_at(&self, position: usize) -> u8 {
        self.buffer.style_at(position)
    }

    /// Copy text starting at `position` into `buffer`, zero-filling past the end.
    pub fn get_char_range(&self, buffer: &mut [u8], position: usize) {
        self.buffer.get_char_range(buffer, position);
    }

    /// Copy styles starting at `position` into `buffer`, zero-filling past the end.
    pub fn get_style_range(&self, buffer: &mut [u8], position: usize) {
        self.buffer.get_style_range(buffer, position);
    }

    /// The bytes of `[position, position + length)`, clamped to the document.
    pub fn text_range(&self, position: usize, length: usize) -> Vec<u8> {
        let position = position.min(self.length());
        let mut text = vec![0; length.min(self.length() - position)];
        self.buffer.get_char_range(&mut text, position);
        text
    }

    /// The whole text as a contiguous slice.
    pub fn buffer_pointer(&mut self) -> &[u8] {
        self.buffer.buffer_pointer()
    }

    /// `[position, position + length)` as a contiguous slice, clamped to the document.
    pub fn range_pointer(&mut self, position: usize, length: usize) -> &[u8] {
        self.buffer.range_pointer(position, length)
    }

    /// Where the text buffer's gap currently sits.
    pub fn gap_position(&self) -> usize {
        self.buffer.gap_position()
    }

    /// Reserve room for `new_size` bytes.
    pub fn allocate(&mut self, new_size: usize) {
        self.buffer.allocate(new_size);
    }

    /// Set one style byte. Returns `true` if it changed.
    pub fn set_style_at(&mut self, position: usize, style: u8) -> bool {
        self.buffer.set_style_at(position, style)
    }

    /// Set `length` style bytes. Returns `true` if any changed.
    pub fn set_style_for(&mut self, position: usize, length: usize, style: u8) -> bool {
        self.buffer.set_style_for(position, length, style)
    }

    /// Add marker `number` to `line`.
    pub fn add_mark(&mut self, line: usize, number: u32) -> Option<MarkerHandle> {
        let handle = self.stores.markers.add_mark(line, number)?;
        self.notify_marker_change(line);
        Some(handle)
    }

    /// Add every marker whose bit is set in `value_set` to `line`.
    pub fn add_mark_set(&mut self, line: usize, value_set: u32) {
        let mut added = false;
        for number in (0..32).filter(|bit| value_set & (1 << bit) != 0) {
            added |= self.stores.markers.add_mark(line, number).is_some();
        }
        if added {
            self.notify_marker_change(line);
        }
    }

    /// Remove one instance of marker `number` from `line`.
    pub fn delete_mark(&mut self, line: usize, number: u32) -> bool {
        let changed = self.stores.markers.delete_mark(line, Some(number), false);
        if changed {
            self.notify_marker_change(line);
        }
        changed
    }

    /// Remove every instance of marker `number`, or with `None` every marker, from
    /// every line.
    pub fn delete_all_marks(&mut self, number: Option<u32>) {
        let mut changed = false;
        for line in 0..self.lines_total() {
            changed |= self.stores.markers.delete_mark(line, number, true);
        }
        if changed {
            self.notify(&DocModification::new(ModificationFlags::CHANGE_MARKER, 0, 0));
        }
    }

    /// Remove the marker with `handle`.
    pub fn delete_mark_from_handle(&mut self, handle: MarkerHandle) -> bool {
        let Some(line) = self.stores.markers.line_from_handle(handle) else {
            return false;
        };
        let changed = self.stores.markers.delete_mark_from_handle(handle);
        if changed {
            self.notify_marker_change(line);
        }
        changed
    }

    fn notify_marker_change(&mut self, line: usize) {
        self.notify(
            &DocModification::new(ModificationFlags::CHANGE_MARKER, self.line_start(line), 0)
                .with_line(line),
        );
    }

    /// Line carrying the marker with `handle`.
    pub fn line_from_handle(&self, handle: MarkerHandle) -> Option<usize> {
        self.stores.markers.line_from_handle(handle)
    }

    /// The `which`-th marker handle on `line`, most recent first.
    pub fn handle_from_line(&self, line: usize, which: usize) -> Option<MarkerHandle> {
        self.stores.markers.handle_from_line(line, which)
    }

    /// The marker number of the `which`-th marker on `line`.
    pub fn number_from_line(&self, line: usize, which: usize) -> Option<u32> {
        self.stores.markers.number_from_line(line, which)
    }

    /// Bit set of the markers on `line`.
    pub fn mark_value(&self, line: usize) -> u32 {
        self.stores.markers.mark_value(line)
    }

    /// First line at or after `line_start` carrying a marker in `mask`.
    pub fn marker_next(&self, line_start: usize, mask: u32) -> Option<usize> {
        self.stores.markers.marker_next(line_start, mask)
    }

    /// Set the fold level of `line`, returning the previous one.
    pub fn set_level(&mut self, line: usize, level: FoldLevel) -> Option<FoldLevel> {
        let prev = self.stores.levels.set_level(line, level)?;
        if prev != level {
            let mut modification = DocModification::new(
                ModificationFlags::CHANGE_FOLD | ModificationFlags::CHANGE_MARKER,
                self.line_start(line),
                0,
            )
            .with_line(line);
            modification.fold_level_now = Some(level);
            modification.fold_level_prev = Some(prev);
            self.notify(&modification);
        }
        Some(prev)
    }

    /// Fold level of `line`.
    pub fn get_level(&self, line: usize) -> FoldLevel {
        self.stores.levels.get_level(line)
    }

    /// Reset every fold level to [`FoldLevel::BASE`].
    pub fn clear_levels(&mut self) {
        self.stores.levels.clear_levels();
    }

    /// Set the lexer state of `line`, returning the previous state.
    pub fn set_line_state(&mut self, line: usize, state: i32) -> i32 {
        self.stores.state.set_line_state(line, state)
    }

    /// Lexer state of `line`.
    pub fn get_line_state(&self, line: usize) -> i32 {
        self.stores.state.get_line_state(line)
    }

    /// One past the last line with a non-zero lexer state.
    pub fn max_line_state(&self) -> usize {
        self.stores.state.max_line_state()
    }

    /// Margin text of `line`.
    pub fn margin_text(&self, line: usize) -> Option<&str> {
        self.stores.margin.text(line)
    }

    /// Set or clear the margin text of `line`.
    pub fn set_margin_text(&mut self, line: usize, text: Option<&str>) {
        self.stores.margin.set_text(line, text);
        self.notify_line_change(ModificationFlags::CHANGE_MARGIN, line);
    }

    /// Uniform margin style of `line`.
    pub fn margin_style(&self, line: usize) -> u8 {
        self.stores.margin.style(line)
    }

    /// Give the margin text of `line` one style.
    pub fn set_margin_style(&mut self, line: usize, style: u8) {
        self.stores.margin.set_style(line, style);
        self.notify_line_change(ModificationFlags::CHANGE_MARGIN, line);
    }

    /// Style each byte of the margin text of `line`.
    pub fn set_margin_styles(&mut self, line: usize, styles: &[u8]) {
        self.stores.margin.set_styles(line, styles);
        self.notify_line_change(ModificationFlags::CHANGE_MARGIN, line);
    }

    /// Per-byte margin styles of `line`.
    pub fn margin_styles(&self, line: usize) -> Option<&[u8]> {
        self.stores.margin.styles(line)
    }

    /// Remove all margin text.
    pub fn margin_clear_all(&mut self) {
        self.stores.margin.clear_all();
    }

    /// Annotation text of `line`.
    pub fn annotation_text(&self, line: usize) -> Option<&str> {
        self.stores.annotation.text(line)
    }

    /// Set or clear the annotation of `line`.
    pub fn set_annotation_text(&mut self, line: usize, text: Option<&str>) {
        self.stores.annotation.set_text(line, text);
        self.notify_line_change(ModificationFlags::CHANGE_ANNOTATION, line);
    }

    /// Uniform annotation style of `line`.
    pub fn annotation_style(&self, line: usize) -> u8 {
        self.stores.annotation.style(line)
    }

    /// Give the annotation of `line` one style.
    pub fn set_annotation_style(&mut self, line: usize, style: u8) {
        self.stores.annotation.set_style(line, style);
        self.notify_line_change(ModificationFlags::CHANGE_ANNOTATION, line);
    }

    /// Style each byte of the annotation of `line`.
    pub fn set_annotation_styles(&mut self, line: usize, styles: &[u8]) {
        self.stores.annotation.set_styles(line, styles);
        self.notify_line_change(ModificationFlags::CHANGE_ANNOTATION, line);
    }

    /// Per-byte annotation styles of `line`.
    pub fn annotation_styles(&self, line: usize) -> Option<&[u8]> {
        self.stores.annotation.styles(line)
    }

    /// Display rows taken by the annotation of `line`.
    pub fn annotation_lines(&self, line: usize) -> usize {
        self.stores.annotation.annotation_lines(line)
    }

    /// Remove every annotation.
    pub fn annotation_clear_all(&mut self) {
        self.stores.annotation.clear_all();
    }

    fn notify_line_change(&mut self, flags: ModificationFlags, line: usize) {
        if line < self.lines_total() {
            self.notify(&DocModification::new(flags, self.line_start(line), 0).with_line(line));
        }
    }

    /// Remove the tab stops of `line`.
    pub fn clear_tabstops(&mut self, line: usize) -> bool {
        self.stores.tabstops.clear_tabstops(line)
    }

    /// Add a tab stop at `x` on `line`.
    pub fn add_tabstop(&mut self, line: usize, x: i32) -> bool {
        self.stores.tabstops.add_tabstop(line, x)
    }

    /// First tab stop on `line` after `x`.
    pub fn get_next_tabstop(&self, line: usize, x: i32) -> Option<i32> {
        self.stores.tabstops.get_next_tabstop(line, x)
    }

    /// Debug check: every store and the contraction track the same number of lines.
    pub fn check(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let lines = self.lines_total();
        let stores = [
            self.stores.markers.lines(),
            self.stores.levels.lines(),
            self.stores.state.lines(),
            self.stores.margin.lines(),
            self.stores.annotation.lines(),
            self.stores.tabstops.lines(),
        ];
        debug_assert!(
            stores.iter().all(|&n| n == lines),
            "per-line stores {stores:?} out of step with {lines} lines"
        );
        if let Some(contraction) = self.contraction() {
            if let Ok(contraction) = contraction.try_borrow() {
                debug_assert_eq!(contraction.lines_in_doc(), lines);
                contraction.check();
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocumentConfig::default())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("length", &self.length())
            .field("lines", &self.lines_total())
            .field("read_only", &self.is_read_only())
            .field("entered_modification", &self.entered_modification)
            .field("subscribers", &self.callbacks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contraction::ContractionState;

    type Log = Rc<RefCell<Vec<DocModification>>>;

    fn logged(document: &mut Document) -> Log {
        let log: Log = Rc::default();
        let sink = Rc::clone(&log);
        document.subscribe(move |_, m| sink.borrow_mut().push(m.clone()));
        log
    }

    fn flags(log: &Log) -> Vec<ModificationFlags> {
        log.borrow().iter().map(|m| m.flags).collect()
    }

    fn text(document: &mut Document) -> String {
        String::from_utf8_lossy(document.buffer_pointer()).into_owned()
    }

    #[test]
    fn test_insert_notifies_before_and_after() {
        let mut doc = Document::default();
        let log = logged(&mut doc);
        assert_eq!(doc.insert_str(0, "ab\ncd"), Ok(5));
        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(
            log[0].flags,
            ModificationFlags::BEFORE_INSERT | ModificationFlags::PERFORMED_USER
        );
        assert_eq!(log[1].flags, ModificationFlags::SAVE_POINT_LEFT);
        assert_eq!(
            log[2].flags,
            ModificationFlags::INSERT_TEXT
                | ModificationFlags::PERFORMED_USER
                | ModificationFlags::START_ACTION
        );
        assert_eq!(log[2].lines_added, 1);
        assert_eq!(log[2].text.as_deref(), Some(&b"ab\ncd"[..]));
        doc.check();
    }

    #[test]
    fn test_delete_reports_removed_lines() {
        let mut doc = Document::default();
        doc.insert_str(0, "one\ntwo\nthree").unwrap();
        let log = logged(&mut doc);
        assert_eq!(doc.delete_chars(2, 6), Ok(6));
        assert_eq!(text(&mut doc), "onthree");
        let last = log.borrow().last().cloned().unwrap();
        assert!(last.flags.contains(ModificationFlags::DELETE_TEXT));
        assert_eq!(last.lines_added, -2);
        assert_eq!(last.text.as_deref(), Some(&b"e\ntwo\n"[..]));
        doc.check();
    }

    #[test]
    fn test_rejected_edits_leave_document_untouched() {
        let mut doc = Document::new(DocumentConfig::default().with_read_only(true));
        let log = logged(&mut doc);
        assert_eq!(doc.insert_str(0, "x"), Err(BufferError::ReadOnly));
        doc.set_read_only(false);
        doc.insert_str(0, "abc").unwrap();
        assert_eq!(
            doc.insert_str(9, "x"),
            Err(BufferError::PositionOutOfRange {
                position: 9,
                length: 3
            })
        );
        assert_eq!(
            doc.delete_chars(2, 5),
            Err(BufferError::RangeOutOfBounds {
                position: 2,
                length: 5,
                buffer_length: 3
            })
        );
        assert_eq!(doc.length(), 3);
        // Only the successful insert was announced.
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_edit_from_callback_is_reentrant_error() {
        let mut doc = Document::default();
        let results: Rc<RefCell<Vec<Result<usize, BufferError>>>> = Rc::default();
        let sink = Rc::clone(&results);
        doc.subscribe(move |doc, m| {
            if m.flags.contains(ModificationFlags::INSERT_TEXT) {
                sink.borrow_mut().push(doc.insert_str(0, "nested"));
                assert_eq!(doc.undo(), None);
            }
        });
        doc.insert_str(0, "outer").unwrap();
        assert_eq!(*results.borrow(), vec![Err(BufferError::Reentrant)]);
        assert_eq!(text(&mut doc), "outer");
    }

    #[test]
    fn test_callback_may_set_levels() {
        let mut doc = Document::default();
        doc.subscribe(|doc, m| {
            if m.flags.contains(ModificationFlags::INSERT_TEXT) {
                doc.set_level(0, FoldLevel::BASE.with_header(true));
            }
        });
        doc.insert_str(0, "fn main() {\n}").unwrap();
        assert!(doc.get_level(0).is_header());
    }

    #[test]
    fn test_undo_redo_flags_and_caret() {
        let mut doc = Document::default();
        doc.insert_str(0, "hello").unwrap();
        doc.begin_undo_action();
        doc.insert_str(5, "\nworld").unwrap();
        doc.delete_chars(0, 1).unwrap();
        doc.end_undo_action();
        assert_eq!(text(&mut doc), "ello\nworld");

        let log = logged(&mut doc);
        assert_eq!(doc.undo(), Some(5));
        assert_eq!(text(&mut doc), "hello");
        let after: Vec<_> = flags(&log)
            .into_iter()
            .filter(|f| f.intersects(ModificationFlags::TEXT_CHANGED))
            .collect();
        assert_eq!(
            after,
            vec![
                ModificationFlags::INSERT_TEXT
                    | ModificationFlags::PERFORMED_UNDO
                    | ModificationFlags::MULTI_STEP_UNDO_REDO,
                ModificationFlags::DELETE_TEXT
                    | ModificationFlags::PERFORMED_UNDO
                    | ModificationFlags::MULTI_STEP_UNDO_REDO
                    | ModificationFlags::LAST_STEP_IN_UNDO_REDO
                    | ModificationFlags::MULTILINE_UNDO_REDO,
            ]
        );

        log.borrow_mut().clear();
        assert_eq!(doc.redo(), Some(0));
        assert_eq!(text(&mut doc), "ello\nworld");
        assert!(
            flags(&log)
                .iter()
                .all(|f| !f.contains(ModificationFlags::PERFORMED_UNDO))
        );
        doc.check();
    }

    #[test]
    fn test_undo_of_backspace_run_puts_caret_after_block() {
        let mut doc = Document::default();
        doc.insert_str(0, "abcdef").unwrap();
        doc.set_save_point();
        doc.delete_chars(5, 1).unwrap();
        doc.delete_chars(4, 1).unwrap();
        doc.delete_chars(3, 1).unwrap();
        assert_eq!(text(&mut doc), "abc");
        assert_eq!(doc.undo(), Some(6));
        assert_eq!(text(&mut doc), "abcdef");
        assert!(doc.is_save_point());
    }

    #[test]
    fn test_save_point_notifications() {
        let mut doc = Document::default();
        let log = logged(&mut doc);
        doc.set_save_point();
        doc.insert_str(0, "x").unwrap();
        doc.insert_str(1, "y").unwrap();
        doc.undo();
        let save_flags: Vec<_> = flags(&log)
            .into_iter()
            .filter(|f| {
                f.intersects(
                    ModificationFlags::SAVE_POINT_REACHED | ModificationFlags::SAVE_POINT_LEFT,
                )
            })
            .collect();
        assert_eq!(
            save_flags,
            vec![
                ModificationFlags::SAVE_POINT_REACHED,
                ModificationFlags::SAVE_POINT_LEFT,
                ModificationFlags::SAVE_POINT_REACHED,
            ]
        );
    }

    #[test]
    fn test_container_actions_replay_with_token() {
        let mut doc = Document::default();
        doc.insert_str(0, "a").unwrap();
        doc.add_undo_action(42, false);
        let log = logged(&mut doc);
        assert_eq!(doc.undo(), None);
        let container = log.borrow()[0].clone();
        assert!(container.flags.contains(ModificationFlags::CONTAINER));
        assert_eq!(container.token, 42);
        assert_eq!(text(&mut doc), "a");
        assert_eq!(doc.undo(), Some(0));
        assert_eq!(doc.length(), 0);
    }

    #[test]
    fn test_tentative_undo_rolls_back_composition() {
        let mut doc = Document::default();
        doc.insert_str(0, "ok ").unwrap();
        doc.tentative_start();
        doc.insert_str(3, "k").unwrap();
        doc.insert_str(4, "a").unwrap();
        assert!(doc.tentative_active());
        doc.tentative_undo();
        assert!(!doc.tentative_active());
        assert_eq!(text(&mut doc), "ok ");
    }

    #[test]
    fn test_line_end_skips_terminators() {
        let config = DocumentConfig::default().with_line_end_types(LineEndTypes::Unicode);
        let mut doc = Document::new(config);
        doc.insert_str(0, "ab\r\ncd\u{2028}ef\u{85}gh\n").unwrap();
        assert_eq!(doc.lines_total(), 5);
        assert_eq!(doc.line_end(0), 2);
        assert_eq!(doc.line_end(1), 6);
        assert_eq!(doc.line_end(2), 11);
        assert_eq!(doc.line_end(3), 15);
        assert_eq!(doc.line_end(4), doc.length());
        assert!(doc.set_line_end_types(LineEndTypes::Default));
        assert_eq!(doc.lines_total(), 3);
        doc.check();
    }

    #[test]
    fn test_markers_follow_edits_and_notify() {
        let mut doc = Document::default();
        doc.insert_str(0, "a\nb\nc").unwrap();
        let log = logged(&mut doc);
        let handle = doc.add_mark(2, 4).unwrap();
        assert_eq!(log.borrow()[0].line, Some(2));
        assert_eq!(log.borrow()[0].position, 4);
        doc.insert_str(0, "top\n").unwrap();
        assert_eq!(doc.line_from_handle(handle), Some(3));
        doc.delete_chars(1, doc.length() - 1).unwrap();
        assert_eq!(doc.line_from_handle(handle), Some(0));
        assert!(doc.delete_mark_from_handle(handle));
        assert_eq!(doc.mark_value(0), 0);
        assert_eq!(doc.add_mark(7, 1), None);
    }

    #[test]
    fn test_contraction_receives_line_deltas() {
        let contraction: Rc<RefCell<dyn Contraction>> =
            Rc::new(RefCell::new(ContractionState::new()));
        let mut doc = Document::default();
        doc.insert_str(0, "0\n1\n2\n3\n").unwrap();
        doc.attach_contraction(&contraction);
        assert_eq!(contraction.borrow().lines_in_doc(), 5);

        contraction.borrow_mut().set_visible(2, 3, false);
        doc.insert_str(doc.line_start(3), "x\ny\n").unwrap();
        assert_eq!(contraction.borrow().lines_in_doc(), 7);
        assert!(!contraction.borrow().get_visible(2));
        assert!(contraction.borrow().get_visible(3));

        doc.undo();
        assert_eq!(contraction.borrow().lines_in_doc(), 5);
        assert!(!contraction.borrow().get_visible(2));
        doc.check();

        drop(contraction);
        assert!(doc.contraction().is_none());
        doc.insert_str(0, "\n").unwrap();
    }

    #[test]
    fn test_line_data_accessors() {
        let mut doc = Document::default();
        doc.insert_str(0, "a\nb").unwrap();
        doc.set_line_state(1, 7);
        assert_eq!(doc.get_line_state(1), 7);
        assert_eq!(doc.max_line_state(), 2);
        doc.set_margin_text(0, Some("1"));
        doc.set_annotation_text(1, Some("note\nmore"));
        assert_eq!(doc.margin_text(0), Some("1"));
        assert_eq!(doc.annotation_lines(1), 2);
        assert!(doc.add_tabstop(0, 8));
        assert_eq!(doc.get_next_tabstop(0, 0), Some(8));
        doc.delete_chars(1, 1).unwrap();
        assert_eq!(doc.annotation_text(0), None);
        assert_eq!(doc.lines_total(), 1);
        doc.check();
    }
}
