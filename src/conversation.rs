use crate::protocol::{Role, Turn};

/// Ordered turn history for the one conversation a session owns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Swap in the server's authoritative history.
    pub fn replace_all(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// History without its last turn, i.e. without the pending user message.
    pub fn prior_turns(&self) -> &[Turn] {
        match self.turns.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn ends_with_model_turn(&self) -> bool {
        self.last().is_some_and(|turn| turn.role == Role::Model)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Reply text of one in-flight streaming request.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    buffer: String,
    updates: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the whole reply so far.
    pub fn push(&mut self, delta: &str) -> &str {
        self.buffer.push_str(delta);
        self.updates += 1;
        &self.buffer
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn into_turn(self) -> Turn {
        Turn::model(self.buffer)
    }
}
