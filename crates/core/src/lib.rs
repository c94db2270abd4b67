pub mod conversation;
pub mod dispatch;
pub mod llm;
pub mod params;
pub mod prompt;
pub mod registry;
pub mod session;

#[cfg(test)]
mod mock;

pub use conversation::ConversationState;
pub use dispatch::{ConfigError, Dispatcher};
pub use llm::{ApiToken, GenerateError, GenerateRequest, ModelClient, Role, Turn};
pub use params::{GenerationParameters, Param};
pub use prompt::PromptBuilder;
pub use registry::{ModelEntry, ModelRegistry};
pub use session::{ChatSession, PendingReply, SessionError};
