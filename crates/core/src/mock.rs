use std::sync::Mutex;

use crate::llm::{
    ApiToken, GenerateDelta, GenerateError, GenerateRequest, GenerateStream, ModelClient,
};

/// Backend double that replays a fixed outcome and records every request.
pub(crate) struct ScriptedClient {
    reply: Result<String, GenerateError>,
    deltas: Vec<Result<GenerateDelta, GenerateError>>,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn ok(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            deltas: vec![Ok(GenerateDelta::Text(text.to_string())), Ok(GenerateDelta::Finish)],
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn err(e: GenerateError) -> Self {
        Self {
            reply: Err(e),
            deltas: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_deltas(deltas: Vec<Result<GenerateDelta, GenerateError>>) -> Self {
        Self {
            reply: Ok(String::new()),
            deltas,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl ModelClient for ScriptedClient {
    async fn generate(
        &self,
        _token: &ApiToken,
        req: &GenerateRequest,
    ) -> Result<String, GenerateError> {
        self.seen.lock().unwrap().push(req.clone());
        self.reply.clone()
    }

    async fn stream_generate<'a>(
        &'a self,
        _token: &'a ApiToken,
        req: GenerateRequest,
    ) -> Result<GenerateStream<'a>, GenerateError> {
        self.seen.lock().unwrap().push(req);
        if let Err(e) = &self.reply {
            return Err(e.clone());
        }
        Ok(Box::pin(futures::stream::iter(self.deltas.clone())))
    }
}
