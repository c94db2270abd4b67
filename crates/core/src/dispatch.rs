//! Sends a rendered prompt to the backend and turns whatever comes back into
//! exactly one assistant turn. Nothing here retries.

use futures::StreamExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{
    ApiToken, GenerateDelta, GenerateError, GenerateRequest, ModelClient, Turn,
};
use crate::params::GenerationParameters;
use crate::registry::ModelEntry;

pub const MSG_UNAUTHORIZED: &str =
    "⚠️ Invalid API token. Please check your HuggingFace API token... 😔";

pub const MSG_GATED_ACCESS: &str = "⚠️ You need access to use Llama models. Please:
1. Visit huggingface.co/meta-llama
2. Request access to Llama models
3. Accept the license terms
4. Wait for approval (processed hourly)";

pub const MSG_FORBIDDEN: &str =
    "⚠️ You don't have permission to use this model. Please request access first... 😔";

pub const MISSING_TOKEN_HELP: &str = "⚠️ Hugging Face API token not found! Please follow these steps:
1. Export HUGGINGFACE_API_TOKEN=\"your_token_here\" (or put it in a .env file)
2. Or add api_token = \"your_token_here\" to the pinkai config.toml
3. Get your token from: https://huggingface.co/settings/tokens";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{}", MISSING_TOKEN_HELP)]
    MissingCredential,
}

pub fn error_message(err: &GenerateError) -> String {
    format!("⚠️ An error occurred 😔: {}", err)
}

/// Request for `entry`. Lightweight models always get the fixed token
/// ceiling instead of the user's length.
pub fn build_request(
    entry: &ModelEntry,
    params: &GenerationParameters,
    prompt: String,
) -> GenerateRequest {
    GenerateRequest {
        model_id: entry.backend_id.clone(),
        prompt,
        max_new_tokens: params.effective_max_new_tokens(entry),
        temperature: params.temperature,
        top_p: params.top_p,
        top_k: params.top_k,
        repetition_penalty: params.repetition_penalty,
        do_sample: params.do_sample,
    }
}

pub fn classify(entry: &ModelEntry, outcome: Result<String, GenerateError>) -> Turn {
    match outcome {
        Ok(text) => Turn::assistant(text),
        Err(e) => {
            warn!(
                target: "core::dispatch",
                "generation failed model={} err={}",
                entry.backend_id,
                e
            );
            let msg = match &e {
                GenerateError::Unauthorized(_) => MSG_UNAUTHORIZED.to_string(),
                GenerateError::Forbidden(_) if entry.is_gated() => MSG_GATED_ACCESS.to_string(),
                GenerateError::Forbidden(_) => MSG_FORBIDDEN.to_string(),
                other => error_message(other),
            };
            Turn::assistant(msg)
        }
    }
}

pub struct Dispatcher<C> {
    client: C,
    token: Option<ApiToken>,
}

impl<C: ModelClient> Dispatcher<C> {
    pub fn new(client: C, token: Option<ApiToken>) -> Self {
        Self { client, token }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn ensure_credential(&self) -> Result<&ApiToken, ConfigError> {
        self.token.as_ref().ok_or(ConfigError::MissingCredential)
    }

    pub async fn dispatch(
        &self,
        entry: &ModelEntry,
        req: &GenerateRequest,
    ) -> Result<Turn, ConfigError> {
        let token = self.ensure_credential()?;
        Ok(self.send(token, entry, req).await)
    }

    pub async fn dispatch_streaming<F: FnMut(&str)>(
        &self,
        entry: &ModelEntry,
        req: GenerateRequest,
        on_text: F,
    ) -> Result<Turn, ConfigError> {
        let token = self.ensure_credential()?;
        Ok(self.send_streaming(token, entry, req, on_text).await)
    }

    pub async fn send(&self, token: &ApiToken, entry: &ModelEntry, req: &GenerateRequest) -> Turn {
        info!(
            target: "core::dispatch",
            "generate model={} prompt_len={} max_new_tokens={}",
            req.model_id,
            req.prompt.len(),
            req.max_new_tokens
        );
        let outcome = self.client.generate(token, req).await;
        classify(entry, outcome)
    }

    /// Forwards text deltas to `on_text` as they arrive. Only a `Finish`
    /// commits the text; on failure, or when the stream just stops, the
    /// partial text is dropped and the classified message is returned.
    pub async fn send_streaming<F: FnMut(&str)>(
        &self,
        token: &ApiToken,
        entry: &ModelEntry,
        req: GenerateRequest,
        mut on_text: F,
    ) -> Turn {
        info!(
            target: "core::dispatch",
            "stream model={} prompt_len={} max_new_tokens={}",
            req.model_id,
            req.prompt.len(),
            req.max_new_tokens
        );
        let outcome = match self.client.stream_generate(token, req).await {
            Ok(mut stream) => {
                let mut acc = String::new();
                let mut outcome =
                    Err(GenerateError::Protocol("stream ended before completion".into()));
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(GenerateDelta::Text(t)) => {
                            on_text(&t);
                            acc.push_str(&t);
                        }
                        Ok(GenerateDelta::Finish) => {
                            outcome = Ok(std::mem::take(&mut acc));
                            break;
                        }
                        Err(e) => {
                            outcome = Err(e);
                            break;
                        }
                    }
                }
                outcome
            }
            Err(e) => Err(e),
        };
        classify(entry, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedClient;
    use crate::registry::ModelRegistry;
    use pretty_assertions::assert_eq;

    fn entry(label: &str) -> ModelEntry {
        ModelRegistry::builtin().entry(label).cloned().unwrap()
    }

    fn token() -> Option<ApiToken> {
        ApiToken::new("hf_test")
    }

    fn request(e: &ModelEntry) -> GenerateRequest {
        build_request(e, &GenerationParameters::for_entry(e), "prompt".into())
    }

    #[test]
    fn lightweight_request_is_capped() {
        let gpt = entry("GPT-2");
        let mut p = GenerationParameters::for_entry(&gpt);
        p.max_new_tokens = 2048;
        let req = build_request(&gpt, &p, "x".into());
        assert_eq!(req.max_new_tokens, 512);
        assert_eq!(req.model_id, "gpt2");

        let mistral = entry("Mistral 7B");
        let mut p = GenerationParameters::for_entry(&mistral);
        p.max_new_tokens = 1024;
        assert_eq!(build_request(&mistral, &p, "x".into()).max_new_tokens, 1024);
    }

    #[test]
    fn unauthorized_message_ignores_model() {
        for label in ["Llama 3.1 (70B)", "Mistral 7B", "GPT-2"] {
            let turn = classify(
                &entry(label),
                Err(GenerateError::Unauthorized("401 Client Error".into())),
            );
            assert_eq!(turn, Turn::assistant(MSG_UNAUTHORIZED));
        }
    }

    #[test]
    fn forbidden_depends_on_gating() {
        let gated = classify(
            &entry("Llama 2 (70B)"),
            Err(GenerateError::Forbidden("403".into())),
        );
        assert_eq!(gated.content, MSG_GATED_ACCESS);
        assert!(gated.content.contains("4. Wait for approval"));

        let open = classify(
            &entry("Mistral 13B"),
            Err(GenerateError::Forbidden("403".into())),
        );
        assert_eq!(open.content, MSG_FORBIDDEN);
    }

    #[test]
    fn other_errors_keep_raw_text() {
        let turn = classify(
            &entry("Mistral 7B"),
            Err(GenerateError::Network("503 model is loading".into())),
        );
        assert_eq!(
            turn.content,
            "⚠️ An error occurred 😔: network: 503 model is loading"
        );
    }

    #[tokio::test]
    async fn refuses_without_credential() {
        let e = entry("Mistral 7B");
        let d = Dispatcher::new(ScriptedClient::ok("never"), None);
        let err = d.dispatch(&e, &request(&e)).await.unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential);
        assert!(d.client().requests().is_empty());
    }

    #[tokio::test]
    async fn dispatch_returns_text_turn() {
        let e = entry("Mistral 7B");
        let d = Dispatcher::new(ScriptedClient::ok("Hi!"), token());
        let turn = d.dispatch(&e, &request(&e)).await.unwrap();
        assert_eq!(turn, Turn::assistant("Hi!"));
        assert_eq!(d.client().requests().len(), 1);
    }

    #[tokio::test]
    async fn streaming_accumulates_deltas() {
        let e = entry("Mistral 7B");
        let d = Dispatcher::new(
            ScriptedClient::with_deltas(vec![
                Ok(GenerateDelta::Text("Hel".into())),
                Ok(GenerateDelta::Text("lo".into())),
                Ok(GenerateDelta::Finish),
                Ok(GenerateDelta::Text("ignored".into())),
            ]),
            token(),
        );
        let mut seen = Vec::new();
        let turn = d
            .dispatch_streaming(&e, request(&e), |t| seen.push(t.to_string()))
            .await
            .unwrap();
        assert_eq!(turn, Turn::assistant("Hello"));
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn streaming_failure_drops_partial_text() {
        let e = entry("Llama 3.3 (70B)");
        let d = Dispatcher::new(
            ScriptedClient::with_deltas(vec![
                Ok(GenerateDelta::Text("partial".into())),
                Err(GenerateError::Timeout("idle".into())),
            ]),
            token(),
        );
        let turn = d.dispatch_streaming(&e, request(&e), |_| {}).await.unwrap();
        assert_eq!(turn.content, "⚠️ An error occurred 😔: timeout: idle");
    }

    #[tokio::test]
    async fn stream_without_finish_drops_partial_text() {
        let e = entry("Mistral 7B");
        let d = Dispatcher::new(
            ScriptedClient::with_deltas(vec![Ok(GenerateDelta::Text("Hel".into()))]),
            token(),
        );
        let mut seen = String::new();
        let turn = d
            .dispatch_streaming(&e, request(&e), |t| seen.push_str(t))
            .await
            .unwrap();
        assert_eq!(seen, "Hel");
        assert_eq!(
            turn.content,
            "⚠️ An error occurred 😔: protocol: stream ended before completion"
        );
    }

    #[tokio::test]
    async fn streaming_start_error_is_classified() {
        let e = entry("Llama 3.3 (70B)");
        let d = Dispatcher::new(
            ScriptedClient::err(GenerateError::Forbidden("403".into())),
            token(),
        );
        let turn = d.dispatch_streaming(&e, request(&e), |_| {}).await.unwrap();
        assert_eq!(turn.content, MSG_GATED_ACCESS);
    }
}
