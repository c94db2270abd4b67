use crate::hf::config::HfConfig;
use bytes::Buf;
use futures::StreamExt;
use pink_core::llm::{
    ApiToken, GenerateDelta, GenerateError, GenerateRequest, GenerateStream, ModelClient,
};
use reqwest::{header, Client, StatusCode};
use std::time::Instant;
use tokio::time::Duration;
use tracing::{debug, error, info};

/// Hugging Face Inference API / text-generation-inference client.
#[derive(Clone)]
pub struct HfClient {
    http: Client,
    cfg: HfConfig,
}

impl HfClient {
    pub fn new(cfg: HfConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("pinkai/", env!("CARGO_PKG_VERSION"))),
        );
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &HfConfig {
        &self.cfg
    }

    fn endpoint(&self, model_id: &str) -> String {
        format!("{}/models/{}", self.cfg.base_url.trim_end_matches('/'), model_id)
    }

    fn body(req: &GenerateRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "inputs": req.prompt,
            "parameters": {
                "max_new_tokens": req.max_new_tokens,
                "temperature": req.temperature,
                "top_p": req.top_p,
                "top_k": req.top_k,
                "repetition_penalty": req.repetition_penalty,
                "do_sample": req.do_sample,
                "return_full_text": false,
            },
            "options": { "wait_for_model": true },
            "stream": stream,
        })
    }
}

#[allow(async_fn_in_trait)]
impl ModelClient for HfClient {
    async fn generate(
        &self,
        token: &ApiToken,
        req: &GenerateRequest,
    ) -> Result<String, GenerateError> {
        let url = self.endpoint(&req.model_id);
        info!(target:"providers::hf","generate model={} url={}", req.model_id, url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose())
            .json(&Self::body(req, false))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target:"providers::hf","generate non-200 status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GenerateError::Decode(e.to_string()))?;
        parse_generated_text(&v)
    }

    async fn stream_generate<'a>(
        &'a self,
        token: &'a ApiToken,
        req: GenerateRequest,
    ) -> Result<GenerateStream<'a>, GenerateError> {
        let url = self.endpoint(&req.model_id);
        info!(target:"providers::hf","start stream model={} url={}", req.model_id, url);
        let resp = self
            .http
            .post(url)
            .bearer_auth(token.expose())
            .json(&Self::body(&req, true))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target:"providers::hf","stream non-200 status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }
        let idle = self.cfg.stream_idle_timeout;
        let tick = idle.min(Duration::from_millis(500));
        let mut stream = resp.bytes_stream();
        let s = async_stream::stream! {
            let mut buf = bytes::BytesMut::new();
            let mut last = Instant::now();
            'outer: loop {
                tokio::select! {
                    chunk = stream.next() => {
                        match chunk {
                            Some(Ok(b)) => {
                                buf.extend_from_slice(&b);
                                last = Instant::now();
                                while let Some((pos, sep)) = find_event_boundary(&buf) {
                                    let ev = buf.split_to(pos).freeze();
                                    buf.advance(sep);
                                    match parse_tgi_sse_event(&ev) {
                                        Ok(deltas) => {
                                            for d in deltas {
                                                let done = d == GenerateDelta::Finish;
                                                yield Ok(d);
                                                if done { break 'outer; }
                                            }
                                        }
                                        Err(e) => { yield Err(e); break 'outer; }
                                    }
                                }
                            }
                            Some(Err(e)) => { yield Err(map_reqwest_err(e)); break 'outer; }
                            None => {
                                let left = buf.len();
                                debug!(target:"providers::hf","stream closed, {} bytes left", left);
                                match parse_trailing(&buf) {
                                    Ok(deltas) => {
                                        for d in deltas {
                                            let done = d == GenerateDelta::Finish;
                                            yield Ok(d);
                                            if done { break 'outer; }
                                        }
                                    }
                                    Err(e) => { yield Err(e); break 'outer; }
                                }
                                error!(target:"providers::hf","stream ended without a final event");
                                let msg = "stream ended before completion".to_string();
                                yield Err(GenerateError::Protocol(msg));
                                break 'outer;
                            }
                        }
                    }
                    _ = tokio::time::sleep(tick) => {
                        if last.elapsed() > idle {
                            error!(target:"providers::hf","stream idle for {:?}", last.elapsed());
                            yield Err(GenerateError::Timeout("idle".into()));
                            break 'outer;
                        }
                    }
                }
            }
        };
        Ok(Box::pin(s))
    }
}

fn parse_generated_text(v: &serde_json::Value) -> Result<String, GenerateError> {
    if let Some(msg) = v["error"].as_str() {
        return Err(GenerateError::Protocol(msg.to_string()));
    }
    let item = if v.is_array() { &v[0] } else { v };
    item["generated_text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GenerateError::Decode(format!("missing generated_text in {}", v)))
}

fn map_reqwest_err(e: reqwest::Error) -> GenerateError {
    if e.is_timeout() {
        GenerateError::Timeout(e.to_string())
    } else if e.is_request() || e.is_connect() {
        GenerateError::Network(e.to_string())
    } else {
        GenerateError::Other(e.to_string())
    }
}

fn map_status_err(status: StatusCode, body: Option<String>) -> GenerateError {
    let body = body.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(body);
    let s = format!("{} {}", status.as_u16(), detail).trim_end().to_string();
    match status {
        StatusCode::UNAUTHORIZED => GenerateError::Unauthorized(s),
        StatusCode::FORBIDDEN => GenerateError::Forbidden(s),
        StatusCode::TOO_MANY_REQUESTS => GenerateError::RateLimit(s),
        StatusCode::NOT_FOUND => GenerateError::Protocol(s),
        _ if status.is_server_error() => GenerateError::Network(s),
        _ => GenerateError::Other(s),
    }
}

/// Bytes left after the last separator once the server hangs up. A bare JSON
/// body means the server ignored `stream: true` and answered in one piece.
fn parse_trailing(rest: &[u8]) -> Result<Vec<GenerateDelta>, GenerateError> {
    let s = std::str::from_utf8(rest)
        .map_err(|e| GenerateError::Decode(e.to_string()))?
        .trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    if s.lines().any(|l| l.starts_with("data:")) {
        return parse_tgi_sse_event(s.as_bytes());
    }
    let v: serde_json::Value =
        serde_json::from_str(s).map_err(|e| GenerateError::Decode(e.to_string()))?;
    let text = parse_generated_text(&v)?;
    let mut out = Vec::new();
    if !text.is_empty() {
        out.push(GenerateDelta::Text(text));
    }
    out.push(GenerateDelta::Finish);
    Ok(out)
}

/// Earliest blank-line event separator: `(offset, separator_len)`.
fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = twoway::find_bytes(buf, b"\r\n\r\n").map(|p| (p, 4));
    let lf = twoway::find_bytes(buf, b"\n\n").map(|p| (p, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_tgi_sse_event(ev: &[u8]) -> Result<Vec<GenerateDelta>, GenerateError> {
    let s = std::str::from_utf8(ev).map_err(|e| GenerateError::Decode(e.to_string()))?;
    let data_lines: Vec<&str> = s
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data_lines.is_empty() {
        return Ok(Vec::new());
    }
    if data_lines.len() == 1 && data_lines[0] == "[DONE]" {
        return Ok(vec![GenerateDelta::Finish]);
    }
    let v: serde_json::Value = serde_json::from_str(&data_lines.join("\n"))
        .map_err(|e| GenerateError::Decode(e.to_string()))?;
    if let Some(msg) = v["error"].as_str() {
        return Err(GenerateError::Protocol(msg.to_string()));
    }
    let mut out = Vec::new();
    let special = v["token"]["special"].as_bool().unwrap_or(false);
    if let Some(text) = v["token"]["text"].as_str() {
        if !special && !text.is_empty() {
            out.push(GenerateDelta::Text(text.to_string()));
        }
    }
    if !v["generated_text"].is_null() {
        out.push(GenerateDelta::Finish);
    }
    Ok(out)
}
