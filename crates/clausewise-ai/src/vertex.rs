//! Vertex AI Gemini client using the server-sent-events streaming endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{FailureKind, FragmentStream, GenerationParams, GenerativeModel, ModelError};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Covers the whole exchange, streamed body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for a Vertex AI publisher model.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project: String,
    pub location: String,
    pub model: String,
    pub access_token: String,
    /// Overrides `https://{location}-aiplatform.googleapis.com`.
    pub endpoint: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl VertexConfig {
    pub fn new(project: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            access_token: access_token.into(),
            endpoint: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn stream_url(&self) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!(
            "{base}/v1/projects/{}/locations/{}/publishers/google/models/{}:streamGenerateContent?alt=sse",
            self.project, self.location, self.model
        )
    }
}

/// Streaming Gemini client on Vertex AI.
pub struct VertexClient {
    client: reqwest::Client,
    config: VertexConfig,
    url: String,
}

impl VertexClient {
    pub fn new(config: VertexConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        let url = config.stream_url();
        Ok(Self {
            client,
            config,
            url,
        })
    }
}

// ── Wire types ──

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: RpcError,
}

#[derive(Deserialize)]
struct RpcError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl RpcError {
    fn into_model_error(self) -> ModelError {
        let kind = match FailureKind::from_rpc_status(&self.status) {
            FailureKind::Other => FailureKind::from_http_status(self.code),
            kind => kind,
        };
        let status = if self.status.is_empty() {
            self.code.to_string()
        } else {
            self.status
        };
        ModelError::provider(kind, status, self.message)
    }
}

/// Classify a non-success HTTP response, preferring the RPC status in the body.
fn http_failure(status: u16, body: &str) -> ModelError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let mut err = envelope.error;
            if err.code == 0 {
                err.code = status;
            }
            err.into_model_error()
        }
        Err(_) => ModelError::provider(FailureKind::from_http_status(status), status.to_string(), body.trim()),
    }
}

/// Incremental decoder for the `alt=sse` response body.
///
/// Bytes may split anywhere, including inside a UTF-8 sequence; only
/// complete lines are decoded.
#[derive(Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw body bytes, returning the text fragments of every complete event line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<String, ModelError>> {
        self.pending.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            decode_line(line.trim_end_matches(['\r', '\n']), &mut out);
        }
        out
    }

    /// Flush a final line that was not newline-terminated.
    pub fn finish(&mut self) -> Vec<Result<String, ModelError>> {
        let rest = std::mem::take(&mut self.pending);
        let mut out = Vec::new();
        let line = String::from_utf8_lossy(&rest);
        decode_line(line.trim_end_matches(['\r', '\n']), &mut out);
        out
    }
}

fn decode_line(line: &str, out: &mut Vec<Result<String, ModelError>>) {
    let Some(data) = line.strip_prefix("data:") else {
        return;
    };
    let data = data.trim_start();
    if data.is_empty() {
        return;
    }
    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            out.push(Err(ModelError::Json(e)));
            return;
        }
    };
    if let Some(err) = event.error {
        out.push(Err(err.into_model_error()));
        return;
    }
    let parts = event
        .candidates
        .into_iter()
        .take(1)
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .filter(|t| !t.is_empty());
    out.extend(parts.map(Ok));
}

#[async_trait]
impl GenerativeModel for VertexClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn stream_generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream, ModelError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_output_tokens,
                temperature: params.temperature,
            },
        };

        info!(model = %self.config.model, prompt_bytes = prompt.len(), "streaming generation request");
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(http_failure(status.as_u16(), &body));
        }

        let bytes = resp.bytes_stream().map(Some).chain(futures::stream::once(async { None }));
        let fragments = bytes
            .scan(SseDecoder::default(), |decoder, item| {
                let out = match item {
                    Some(Ok(chunk)) => decoder.push(&chunk),
                    Some(Err(e)) => vec![Err(ModelError::Http(e))],
                    None => decoder.finish(),
                };
                futures::future::ready(Some(futures::stream::iter(out)))
            })
            .flatten();
        Ok(fragments.boxed())
    }
}
