use std::borrow::Cow;

use crate::registry::ModelEntry;

pub const SYSTEM_PROMPT: &str = "You are a friendly and helpful AI assistant with a warm personality. You should:
1. Be engaging and conversational while remaining professional
2. Show empathy and understanding in your responses
3. Give detailed and helpful answers
4. Use appropriate emojis to make the conversation more lively
5. Avoid saying you don't have feelings or that you're an AI - just be helpful and friendly
";

pub const ASSISTANT_CUE: &str = "Assistant: ";

/// Renders one text payload from the persona, the prior dialogue and the new
/// user input.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    system: Cow<'static, str>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system: Cow::Borrowed(SYSTEM_PROMPT),
        }
    }

    pub fn with_system<S: Into<String>>(system: S) -> Self {
        Self {
            system: Cow::Owned(system.into()),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// `transcript` must not contain `input` yet. Completion-only models get
    /// the bare input; dialogue models get the transcript and an
    /// `Assistant:` cue to continue from.
    pub fn build(&self, transcript: &str, input: &str, entry: &ModelEntry) -> String {
        if entry.is_dialogue() {
            format!("{}{} {} {}", self.system, transcript, input, ASSISTANT_CUE)
        } else {
            format!("{}{}", self.system, input)
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
