//! Action log backing undo and redo.
//!
//! The history is a flat list of [`Action`]s. `Start` actions separate user-visible undo
//! steps: everything between two separators is undone or redone together. The list
//! always ends in a separator, and `current_action` always points at a separator
//! between operations:
//!
//! ```text
//!   S  ins ins ins  S  del  S  ins  S
//!   0   1   2   3   4   5   6   7   8
//!                   ^ current (steps 5..=7 can be redone)
//! ```
//!
//! A new action either overwrites the trailing separator (it joins the step in front of
//! it) or is placed after it (it starts a new step); [`UndoHistory::append_action`]
//! reports which happened.

use tracing::debug;

/// What an [`Action`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Text was inserted.
    Insert,
    /// Text was removed.
    Remove,
    /// Step separator.
    Start,
    /// Opaque marker added by the host; its token is stored in `position`.
    Container,
}

/// One reversible edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Kind of edit.
    pub kind: ActionKind,
    /// Byte position of the edit, or the host token for [`ActionKind::Container`].
    pub position: usize,
    /// The inserted or removed bytes.
    pub data: Vec<u8>,
    /// Whether a following action may join this one's step.
    pub may_coalesce: bool,
}

impl Action {
    fn start() -> Self {
        Self {
            kind: ActionKind::Start,
            position: 0,
            data: Vec::new(),
            may_coalesce: true,
        }
    }

    /// Length of the recorded text.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no text is recorded.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Linear undo history with a cursor, a save point and a tentative point.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    /// Always `max_action + 1` entries, the last being a separator.
    actions: Vec<Action>,
    max_action: usize,
    current_action: usize,
    undo_sequence_depth: usize,
    save_point: Option<usize>,
    tentative_point: Option<usize>,
}

impl UndoHistory {
    /// Empty history, at the save point.
    pub fn new() -> Self {
        Self {
            actions: vec![Action::start()],
            max_action: 0,
            current_action: 0,
            undo_sequence_depth: 0,
            save_point: Some(0),
            tentative_point: None,
        }
    }

    /// Whether an action at the cursor may join the step in front of it.
    fn joins_current_step(
        &self,
        kind: ActionKind,
        position: usize,
        len: usize,
        may_coalesce: bool,
    ) -> bool {
        let current = &self.actions[self.current_action];
        if self.undo_sequence_depth > 0 {
            return current.may_coalesce;
        }

        // Coalescible container actions pass the previous action's state through.
        let mut previous_index = self.current_action - 1;
        while previous_index > 0
            && self.actions[previous_index].kind == ActionKind::Container
            && self.actions[previous_index].may_coalesce
        {
            previous_index -= 1;
        }
        let previous = &self.actions[previous_index];

        if Some(self.current_action) == self.save_point
            || Some(self.current_action) == self.tentative_point
        {
            return false;
        }
        if !current.may_coalesce || !may_coalesce || !previous.may_coalesce {
            return false;
        }
        if kind == ActionKind::Container || current.kind == ActionKind::Container {
            return true;
        }
        if kind != previous.kind && previous.kind != ActionKind::Start {
            return false;
        }
        match kind {
            ActionKind::Insert => position == previous.position + previous.len(),
            // Backspace or forward delete of one character (two bytes for CRLF).
            ActionKind::Remove => {
                (len == 1 || len == 2)
                    && (position + len == previous.position || position == previous.position)
            }
            ActionKind::Start | ActionKind::Container => true,
        }
    }

    /// Record an action. Returns `true` if it starts a new undo step.
    pub fn append_action(
        &mut self,
        kind: ActionKind,
        position: usize,
        data: &[u8],
        may_coalesce: bool,
    ) -> bool {
        if self.current_action < self.max_action {
            debug!(
                discarded = self.max_action - self.current_action,
                "truncating redo history"
            );
        }
        if self.save_point.is_some_and(|save| self.current_action < save) {
            self.save_point = None;
        }

        let joins = self.current_action > 0
            && self.joins_current_step(kind, position, data.len(), may_coalesce);
        if !joins {
            self.current_action += 1;
        }

        self.actions.truncate(self.current_action);
        self.actions.push(Action {
            kind,
            position,
            data: data.to_vec(),
            may_coalesce,
        });
        self.actions.push(Action::start());
        self.current_action += 1;
        self.max_action = self.current_action;
        !joins
    }

    /// Place a non-coalescing separator at the cursor unless one is already there.
    fn close_step(&mut self) {
        if self.actions[self.current_action].kind != ActionKind::Start {
            self.current_action += 1;
            self.actions.truncate(self.current_action);
            self.actions.push(Action::start());
            self.max_action = self.current_action;
        }
        self.actions[self.current_action].may_coalesce = false;
    }

    /// Open a bracket; everything until the matching [`end_undo_action`] forms one step.
    /// Brackets nest and only the outermost pair has an effect.
    ///
    /// [`end_undo_action`]: Self::end_undo_action
    pub fn begin_undo_action(&mut self) {
        if self.undo_sequence_depth == 0 {
            self.close_step();
        }
        self.undo_sequence_depth += 1;
    }

    /// Close a bracket opened by [`begin_undo_action`](Self::begin_undo_action).
    pub fn end_undo_action(&mut self) {
        debug_assert!(self.undo_sequence_depth > 0, "unbalanced end_undo_action");
        if self.undo_sequence_depth == 0 {
            return;
        }
        self.undo_sequence_depth -= 1;
        if self.undo_sequence_depth == 0 {
            self.close_step();
        }
    }

    /// Forget any open brackets.
    pub fn drop_undo_sequence(&mut self) {
        self.undo_sequence_depth = 0;
    }

    /// Current bracket nesting depth.
    pub fn undo_sequence_depth(&self) -> usize {
        self.undo_sequence_depth
    }

    /// Drop every action. The empty history is the save point.
    pub fn delete_undo_history(&mut self) {
        debug!(actions = self.max_action, "deleting undo history");
        self.actions.clear();
        self.actions.push(Action::start());
        self.max_action = 0;
        self.current_action = 0;
        self.save_point = Some(0);
        self.tentative_point = None;
    }

    /// Mark the cursor position as matching the saved file.
    pub fn set_save_point(&mut self) {
        self.save_point = Some(self.current_action);
    }

    /// Returns `true` if the cursor is on the save point.
    pub fn is_save_point(&self) -> bool {
        self.save_point == Some(self.current_action)
    }

    /// Start a provisional run of edits that may later be rolled back.
    pub fn tentative_start(&mut self) {
        self.tentative_point = Some(self.current_action);
    }

    /// Keep the provisional edits.
    pub fn tentative_commit(&mut self) {
        self.tentative_point = None;
        self.max_action = self.current_action;
        self.actions.truncate(self.max_action + 1);
    }

    /// Returns `true` between [`tentative_start`](Self::tentative_start) and a commit.
    pub fn tentative_active(&self) -> bool {
        self.tentative_point.is_some()
    }

    /// Number of actions recorded since the tentative start, ready to be undone one at a
    /// time with [`get_undo_step`](Self::get_undo_step).
    pub fn tentative_steps(&mut self) -> Option<usize> {
        self.drop_trailing_start();
        self.tentative_point
            .map(|point| self.current_action.saturating_sub(point))
    }

    fn drop_trailing_start(&mut self) {
        if self.current_action > 0 && self.actions[self.current_action].kind == ActionKind::Start
        {
            self.current_action -= 1;
        }
    }

    /// Returns `true` if there is a step to undo.
    pub fn can_undo(&self) -> bool {
        self.current_action > 0 && self.max_action > 0
    }

    /// Prepare to undo one step; returns the number of actions in it.
    pub fn start_undo(&mut self) -> usize {
        self.drop_trailing_start();
        let mut act = self.current_action;
        while act > 0 && self.actions[act].kind != ActionKind::Start {
            act -= 1;
        }
        self.current_action - act
    }

    /// Next action to undo.
    pub fn get_undo_step(&self) -> &Action {
        &self.actions[self.current_action]
    }

    /// Move the cursor back over the action returned by [`get_undo_step`](Self::get_undo_step).
    pub fn completed_undo_step(&mut self) {
        self.current_action = self.current_action.saturating_sub(1);
    }

    /// Returns `true` if there is a step to redo.
    pub fn can_redo(&self) -> bool {
        self.max_action > self.current_action
    }

    /// Prepare to redo one step; returns the number of actions in it.
    pub fn start_redo(&mut self) -> usize {
        if self.current_action < self.max_action
            && self.actions[self.current_action].kind == ActionKind::Start
        {
            self.current_action += 1;
        }
        let mut act = self.current_action;
        while act < self.max_action && self.actions[act].kind != ActionKind::Start {
            act += 1;
        }
        act - self.current_action
    }

    /// Next action to redo.
    pub fn get_redo_step(&self) -> &Action {
        &self.actions[self.current_action]
    }

    /// Move the cursor forward over the action returned by
    /// [`get_redo_step`](Self::get_redo_step).
    pub fn completed_redo_step(&mut self) {
        if self.current_action < self.max_action {
            self.current_action += 1;
        }
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_chars(history: &mut UndoHistory, start: usize, text: &str) -> Vec<bool> {
        text.bytes()
            .enumerate()
            .map(|(i, b)| history.append_action(ActionKind::Insert, start + i, &[b], true))
            .collect()
    }

    fn undo_step(history: &mut UndoHistory) -> Vec<Action> {
        let steps = history.start_undo();
        let mut undone = Vec::new();
        for _ in 0..steps {
            undone.push(history.get_undo_step().clone());
            history.completed_undo_step();
        }
        undone
    }

    fn redo_step(history: &mut UndoHistory) -> Vec<Action> {
        let steps = history.start_redo();
        let mut redone = Vec::new();
        for _ in 0..steps {
            redone.push(history.get_redo_step().clone());
            history.completed_redo_step();
        }
        redone
    }

    #[test]
    fn test_fresh_history() {
        let history = UndoHistory::new();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.is_save_point());
    }

    #[test]
    fn test_adjacent_typing_coalesces() {
        let mut history = UndoHistory::new();
        history.set_save_point();
        history.append_action(ActionKind::Insert, 100, b"x", true);
        history.set_save_point();
        // Typing continues past the save point: the next key starts a step.
        let starts = type_chars(&mut history, 101, "abc");
        assert_eq!(starts, vec![true, false, false]);
        assert_eq!(undo_step(&mut history).len(), 3);
        assert_eq!(undo_step(&mut history).len(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_non_adjacent_insert_starts_new_step() {
        let mut history = UndoHistory::new();
        type_chars(&mut history, 0, "ab");
        assert!(history.append_action(ActionKind::Insert, 10, b"c", true));
        assert_eq!(undo_step(&mut history).len(), 1);
        assert_eq!(undo_step(&mut history).len(), 2);
    }

    #[test]
    fn test_backspace_and_delete_coalesce() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"hello world", true);
        assert!(history.append_action(ActionKind::Remove, 10, b"d", true));
        assert!(!history.append_action(ActionKind::Remove, 9, b"l", true));
        assert!(!history.append_action(ActionKind::Remove, 9, b"\r\n", true));
        assert!(history.append_action(ActionKind::Remove, 0, b"hel", true));
        assert!(history.append_action(ActionKind::Remove, 5, b"l", true));
        assert_eq!(undo_step(&mut history).len(), 1);
        assert_eq!(undo_step(&mut history).len(), 1);
        let removals = undo_step(&mut history);
        assert_eq!(removals.len(), 3);
        // Undone most recent first.
        assert_eq!(removals[0].data, b"\r\n");
        assert_eq!(removals[2].data, b"d");
    }

    #[test]
    fn test_kind_change_starts_new_step() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"ab", true);
        assert!(history.append_action(ActionKind::Remove, 1, b"b", true));
        assert!(history.append_action(ActionKind::Insert, 1, b"c", true));
    }

    #[test]
    fn test_may_coalesce_false_forces_step() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"a", true);
        assert!(history.append_action(ActionKind::Insert, 1, b"b", false));
        assert!(history.append_action(ActionKind::Insert, 2, b"c", true));
    }

    #[test]
    fn test_bracket_groups_everything() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"a", true);
        history.begin_undo_action();
        history.begin_undo_action();
        assert!(history.append_action(ActionKind::Insert, 40, b"x", true));
        assert!(!history.append_action(ActionKind::Remove, 3, b"yyyy", false));
        history.end_undo_action();
        assert!(!history.append_action(ActionKind::Insert, 7, b"z", true));
        history.end_undo_action();
        assert_eq!(history.undo_sequence_depth(), 0);
        // The bracket is closed: adjacent typing no longer joins it.
        assert!(history.append_action(ActionKind::Insert, 8, b"w", true));

        assert_eq!(undo_step(&mut history).len(), 1);
        assert_eq!(undo_step(&mut history).len(), 3);
        assert_eq!(undo_step(&mut history).len(), 1);
    }

    #[test]
    fn test_save_point_round_trip() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"a", true);
        history.set_save_point();
        assert!(history.is_save_point());
        undo_step(&mut history);
        assert!(!history.is_save_point());
        redo_step(&mut history);
        assert!(history.is_save_point());
    }

    #[test]
    fn test_edit_after_undo_discards_redo_and_save_point() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"a", true);
        history.append_action(ActionKind::Insert, 5, b"b", true);
        history.set_save_point();
        undo_step(&mut history);
        assert!(history.can_redo());

        history.append_action(ActionKind::Insert, 9, b"c", true);
        assert!(!history.can_redo());
        assert!(!history.is_save_point());
        undo_step(&mut history);
        undo_step(&mut history);
        assert!(!history.is_save_point());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_redo_replays_in_order() {
        let mut history = UndoHistory::new();
        type_chars(&mut history, 0, "abc");
        undo_step(&mut history);
        assert!(!history.can_undo());
        let redone = redo_step(&mut history);
        let positions: Vec<_> = redone.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(!history.can_redo());
        assert!(history.can_undo());
    }

    #[test]
    fn test_container_actions_are_transparent() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"a", true);
        assert!(!history.append_action(ActionKind::Container, 42, &[], true));
        assert!(!history.append_action(ActionKind::Insert, 1, b"b", true));
        let step = undo_step(&mut history);
        assert_eq!(step.len(), 3);
        assert_eq!(step[1].kind, ActionKind::Container);
        assert_eq!(step[1].position, 42);
    }

    #[test]
    fn test_tentative_steps() {
        let mut history = UndoHistory::new();
        history.append_action(ActionKind::Insert, 0, b"a", true);
        history.tentative_start();
        assert!(history.tentative_active());
        assert!(history.append_action(ActionKind::Insert, 1, b"b", true));
        history.append_action(ActionKind::Insert, 2, b"c", true);
        assert_eq!(history.tentative_steps(), Some(2));
        history.completed_undo_step();
        history.completed_undo_step();
        assert!(history.can_undo());

        history.tentative_commit();
        assert!(!history.tentative_active());
        assert!(!history.can_redo());
        assert_eq!(undo_step(&mut history).len(), 1);
    }

    #[test]
    fn test_delete_undo_history() {
        let mut history = UndoHistory::new();
        type_chars(&mut history, 0, "abc");
        history.delete_undo_history();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.is_save_point());
    }
}
