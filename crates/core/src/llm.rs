use std::fmt;
use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::User,
            content: s.into(),
        }
    }
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self {
            role: Role::Assistant,
            content: s.into(),
        }
    }
}

/// API token handed to the backend on every call. Never empty.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    /// Returns `None` for a blank token so callers cannot dispatch with one.
    pub fn new<S: Into<String>>(raw: S) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// One text-generation call as seen by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateRequest {
    pub model_id: String,
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub do_sample: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenerateDelta {
    Text(String),
    Finish,
}

/// Closed set of failures reported by a backend. Classified once, in
/// `dispatch`.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
    #[error("unauthorized: {0}")] Unauthorized(String),
    #[error("forbidden: {0}")] Forbidden(String),
    #[error("rate limit: {0}")] RateLimit(String),
    #[error("timeout: {0}")] Timeout(String),
    #[error("network: {0}")] Network(String),
    #[error("decode: {0}")] Decode(String),
    #[error("protocol: {0}")] Protocol(String),
    #[error("other: {0}")] Other(String),
}

pub type GenerateStream<'a> =
    Pin<Box<dyn Stream<Item = Result<GenerateDelta, GenerateError>> + Send + 'a>>;

#[allow(async_fn_in_trait)]
pub trait ModelClient: Send + Sync {
    async fn generate(
        &self,
        token: &ApiToken,
        req: &GenerateRequest,
    ) -> Result<String, GenerateError>;

    async fn stream_generate<'a>(
        &'a self,
        token: &'a ApiToken,
        req: GenerateRequest,
    ) -> Result<GenerateStream<'a>, GenerateError>;
}
