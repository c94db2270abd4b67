use thiserror::Error;

use crate::conversation::ConversationState;
use crate::dispatch::{build_request, ConfigError, Dispatcher};
use crate::llm::{GenerateRequest, ModelClient, Turn};
use crate::params::{GenerationParameters, Param};
use crate::prompt::PromptBuilder;
use crate::registry::ModelEntry;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is still being generated")]
    Busy,
}

/// A request that has been recorded in the conversation and is waiting for
/// its reply. `entry` is the model it was built for, which may differ from
/// the session's current model by the time the reply arrives.
#[derive(Clone, Debug)]
pub struct PendingReply {
    pub entry: ModelEntry,
    pub request: GenerateRequest,
}

/// Everything one chat session owns. Sessions share nothing.
#[derive(Clone, Debug)]
pub struct ChatSession {
    conversation: ConversationState,
    params: GenerationParameters,
    model: ModelEntry,
    prompt: PromptBuilder,
    in_flight: bool,
}

impl ChatSession {
    pub fn new(model: ModelEntry) -> Self {
        Self::with_prompt(model, PromptBuilder::new())
    }

    pub fn with_prompt(model: ModelEntry, prompt: PromptBuilder) -> Self {
        Self {
            conversation: ConversationState::new(),
            params: GenerationParameters::for_entry(&model),
            model,
            prompt,
            in_flight: false,
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn params(&self) -> &GenerationParameters {
        &self.params
    }

    pub fn model(&self) -> &ModelEntry {
        &self.model
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn select_model(&mut self, entry: ModelEntry) {
        self.params.retarget(&entry);
        self.model = entry;
    }

    pub fn nudge(&mut self, param: Param, steps: i32) {
        self.params.nudge(param, steps, &self.model);
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        if self.in_flight {
            return Err(SessionError::Busy);
        }
        self.conversation.reset();
        Ok(())
    }

    /// Records the user turn and builds the request for it. Exactly one
    /// request may be outstanding; call [`ChatSession::complete`] with its
    /// reply before preparing another.
    pub fn prepare(&mut self, input: &str) -> Result<PendingReply, SessionError> {
        if input.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if self.in_flight {
            return Err(SessionError::Busy);
        }
        let transcript = self.conversation.history_transcript();
        let payload = self.prompt.build(&transcript, input, &self.model);
        self.conversation.append(Turn::user(input));
        self.in_flight = true;
        Ok(PendingReply {
            entry: self.model.clone(),
            request: build_request(&self.model, &self.params, payload),
        })
    }

    /// Appends the reply and hands back a copy of it.
    pub fn complete(&mut self, reply: Turn) -> Turn {
        self.conversation.append(reply.clone());
        self.in_flight = false;
        reply
    }

    /// Full round trip: credential check, user turn, one backend call, one
    /// assistant turn. A missing credential leaves the session untouched.
    pub async fn submit<C: ModelClient>(
        &mut self,
        dispatcher: &Dispatcher<C>,
        input: &str,
    ) -> Result<Turn, SessionError> {
        let token = dispatcher.ensure_credential()?;
        let pending = self.prepare(input)?;
        let reply = dispatcher
            .send(token, &pending.entry, &pending.request)
            .await;
        Ok(self.complete(reply))
    }

    pub async fn submit_streaming<C: ModelClient, F: FnMut(&str)>(
        &mut self,
        dispatcher: &Dispatcher<C>,
        input: &str,
        on_text: F,
    ) -> Result<Turn, SessionError> {
        let token = dispatcher.ensure_credential()?;
        let pending = self.prepare(input)?;
        let reply = dispatcher
            .send_streaming(token, &pending.entry, pending.request, on_text)
            .await;
        Ok(self.complete(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::GREETING;
    use crate::llm::{ApiToken, GenerateError, Role};
    use crate::mock::ScriptedClient;
    use crate::prompt::SYSTEM_PROMPT;
    use crate::registry::ModelRegistry;
    use pretty_assertions::assert_eq;

    fn entry(label: &str) -> ModelEntry {
        ModelRegistry::builtin().entry(label).cloned().unwrap()
    }

    fn dispatcher(client: ScriptedClient) -> Dispatcher<ScriptedClient> {
        Dispatcher::new(client, ApiToken::new("hf_test"))
    }

    #[tokio::test]
    async fn hello_round_trip() {
        let mut s = ChatSession::new(entry("Mistral Mixtral-8x7B"));
        let d = dispatcher(ScriptedClient::ok("Hi!"));
        let turn = s.submit(&d, "Hello").await.unwrap();
        assert_eq!(turn, Turn::assistant("Hi!"));

        let sent = d.client().requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].prompt, format!("{} Hello Assistant: ", SYSTEM_PROMPT));
        assert_eq!(
            s.conversation().turns(),
            &[
                Turn::assistant(GREETING),
                Turn::user("Hello"),
                Turn::assistant("Hi!"),
            ]
        );
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn second_turn_carries_history() {
        let mut s = ChatSession::new(entry("Llama 2 (7B)"));
        let d = dispatcher(ScriptedClient::ok("fine"));
        s.submit(&d, "hi").await.unwrap();
        s.submit(&d, "how are you?").await.unwrap();
        let sent = d.client().requests();
        assert_eq!(
            sent[1].prompt,
            format!(
                "{}User: hi\nAssistant: fine\n how are you? Assistant: ",
                SYSTEM_PROMPT
            )
        );
    }

    #[tokio::test]
    async fn completion_model_gets_bare_input_and_cap() {
        let mut s = ChatSession::new(entry("GPT-2"));
        let d = dispatcher(ScriptedClient::ok("story"));
        s.submit(&d, "first").await.unwrap();
        s.submit(&d, "Once upon a time").await.unwrap();
        let sent = d.client().requests();
        assert_eq!(sent[1].prompt, format!("{}Once upon a time", SYSTEM_PROMPT));
        assert_eq!(sent[1].max_new_tokens, 512);
    }

    #[tokio::test]
    async fn missing_credential_leaves_state_untouched() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        let d = Dispatcher::new(ScriptedClient::ok("x"), None);
        let err = s.submit(&d, "Hello").await.unwrap_err();
        assert_eq!(err, SessionError::Config(ConfigError::MissingCredential));
        assert_eq!(s.conversation().len(), 1);
        assert!(!s.is_busy());
        assert!(d.client().requests().is_empty());
    }

    #[tokio::test]
    async fn failure_becomes_assistant_turn() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        let d = dispatcher(ScriptedClient::err(GenerateError::Unauthorized("401".into())));
        let turn = s.submit(&d, "Hello").await.unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, crate::dispatch::MSG_UNAUTHORIZED);
        assert_eq!(s.conversation().len(), 3);
    }

    #[tokio::test]
    async fn streaming_submit_appends_final_turn_once() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        let d = dispatcher(ScriptedClient::ok("streamed"));
        let mut chunks = 0;
        s.submit_streaming(&d, "go", |_| chunks += 1).await.unwrap();
        assert_eq!(chunks, 1);
        assert_eq!(s.conversation().len(), 3);
        assert_eq!(s.conversation().last(), Some(&Turn::assistant("streamed")));
    }

    #[test]
    fn one_request_in_flight() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        assert_eq!(s.prepare("   ").unwrap_err(), SessionError::EmptyInput);
        let pending = s.prepare("one").unwrap();
        assert_eq!(pending.entry.label, "Mistral 7B");
        assert_eq!(s.prepare("two").unwrap_err(), SessionError::Busy);
        assert_eq!(s.clear().unwrap_err(), SessionError::Busy);
        assert_eq!(s.complete(Turn::assistant("done")), Turn::assistant("done"));
        assert!(s.prepare("two").is_ok());
    }

    #[tokio::test]
    async fn input_is_sent_and_stored_verbatim() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        let d = dispatcher(ScriptedClient::ok("ok"));
        s.submit(&d, "  indented\n").await.unwrap();
        assert_eq!(
            d.client().requests()[0].prompt,
            format!("{}   indented\n Assistant: ", SYSTEM_PROMPT)
        );
        assert_eq!(s.conversation().turns()[1], Turn::user("  indented\n"));
    }

    #[test]
    fn pending_keeps_model_it_was_built_for() {
        let mut s = ChatSession::new(entry("Llama 2 (7B)"));
        let pending = s.prepare("hi").unwrap();
        s.select_model(entry("GPT-2"));
        assert!(pending.entry.is_gated());
        assert_eq!(pending.request.model_id, "meta-llama/Llama-2-7b-chat-hf");
    }

    #[test]
    fn model_switch_retargets_length() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        assert_eq!(s.params().max_new_tokens, 2048);
        s.select_model(entry("GPT-Neo"));
        assert_eq!(s.params().max_new_tokens, 512);
        s.nudge(Param::MaxNewTokens, 20);
        assert_eq!(s.params().max_new_tokens, 1024);
        assert_eq!(s.model().label, "GPT-Neo");
    }

    #[test]
    fn clear_resets_to_greeting() {
        let mut s = ChatSession::new(entry("Mistral 7B"));
        s.prepare("a").unwrap();
        s.complete(Turn::assistant("b"));
        s.clear().unwrap();
        assert_eq!(s.conversation().turns(), &[Turn::assistant(GREETING)]);
    }
}
