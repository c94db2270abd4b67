use crate::llm::{Role, Turn};

pub const GREETING: &str = "✨ Hi there! I'm your AI assistant. How can I help you today? 🌸";

/// Ordered turns of one chat session. Starts with a synthetic greeting and is
/// only ever appended to or reset.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            turns: vec![Turn::assistant(GREETING)],
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn reset(&mut self) {
        self.turns = vec![Turn::assistant(GREETING)];
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
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

    /// Every turn, greeting included, as `User: ...` / `Assistant: ...` lines.
    pub fn render_transcript(&self) -> String {
        render(&self.turns)
    }

    /// Transcript of the turns after the synthetic greeting; this is the
    /// history a model actually took part in.
    pub fn history_transcript(&self) -> String {
        render(self.turns.get(1..).unwrap_or_default())
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

fn render(turns: &[Turn]) -> String {
    let mut out = String::new();
    for t in turns {
        let who = match t.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        out.push_str(who);
        out.push_str(": ");
        out.push_str(&t.content);
        out.push('\n');
    }
    out
}
