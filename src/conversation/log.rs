use super::{Role, Turn};

/// Ordered conversation history. The first entry is always the system turn.
///
/// Mutation is crate-private: only the exchange orchestrator appends or
/// reconciles turns, everyone else reads slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
    version: u64,
}

impl ConversationLog {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system_prompt)],
            version: 0,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns meant for display, without the leading system turn.
    pub fn visible_turns(&self) -> &[Turn] {
        match self.turns.first() {
            Some(t) if t.role() == Role::System => &self.turns[1..],
            _ => &self.turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Bumped on every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn has_pending(&self) -> bool {
        self.turns.last().is_some_and(Turn::is_pending)
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.version += 1;
    }

    /// Replace a trailing pending turn with `turn`. Appends if nothing is pending.
    pub(crate) fn replace_pending(&mut self, turn: Turn) {
        if self.has_pending() {
            self.turns.pop();
        }
        self.push(turn);
    }

    /// Drop a trailing pending turn. Returns whether one was removed.
    pub(crate) fn remove_pending(&mut self) -> bool {
        if self.has_pending() {
            self.turns.pop();
            self.version += 1;
            true
        } else {
            false
        }
    }
}
