//! The generative model boundary: a prompt goes in, an ordered stream of
//! text fragments comes out, and failures carry a retry classification.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Generation settings sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 4000,
            temperature: 0.2,
        }
    }
}

/// Provider failure classes relevant to retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Rate limiting or quota backpressure.
    ResourceExhausted,
    /// Temporary unavailability of the service.
    ServiceUnavailable,
    Other,
}

impl FailureKind {
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::ResourceExhausted,
            503 => Self::ServiceUnavailable,
            _ => Self::Other,
        }
    }

    /// Classify a google.rpc status name such as `RESOURCE_EXHAUSTED`.
    pub fn from_rpc_status(status: &str) -> Self {
        match status {
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted,
            "UNAVAILABLE" => Self::ServiceUnavailable,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceExhausted => "resource_exhausted",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[cfg(feature = "vertex")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Provider {
        kind: FailureKind,
        status: String,
        message: String,
    },

    #[cfg(feature = "vertex")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ModelError {
    pub fn provider(kind: FailureKind, status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            kind,
            status: status.into(),
            message: message.into(),
        }
    }

    /// Timeouts count as temporary unavailability so they follow the retry policy.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Provider { kind, .. } => *kind,
            #[cfg(feature = "vertex")]
            Self::Http(e) if e.is_timeout() => FailureKind::ServiceUnavailable,
            _ => FailureKind::Other,
        }
    }
}

/// Ordered text fragments of one streamed response.
pub type FragmentStream = BoxStream<'static, Result<String, ModelError>>;

/// A generative text model that streams its output.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    /// Start generation for `prompt`. Errors before the first fragment are
    /// returned directly; errors mid-stream arrive as stream items.
    async fn stream_generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<FragmentStream, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_classification() {
        assert_eq!(FailureKind::from_http_status(429), FailureKind::ResourceExhausted);
        assert_eq!(FailureKind::from_http_status(503), FailureKind::ServiceUnavailable);
        assert_eq!(FailureKind::from_http_status(500), FailureKind::Other);
        assert_eq!(FailureKind::from_http_status(400), FailureKind::Other);
    }

    #[test]
    fn rpc_status_classification() {
        assert_eq!(
            FailureKind::from_rpc_status("RESOURCE_EXHAUSTED"),
            FailureKind::ResourceExhausted
        );
        assert_eq!(
            FailureKind::from_rpc_status("UNAVAILABLE"),
            FailureKind::ServiceUnavailable
        );
        assert_eq!(FailureKind::from_rpc_status("PERMISSION_DENIED"), FailureKind::Other);
    }

    #[test]
    fn only_provider_errors_carry_a_kind() {
        let err = ModelError::provider(FailureKind::ServiceUnavailable, "503", "try later");
        assert_eq!(err.kind(), FailureKind::ServiceUnavailable);
        assert_eq!(err.to_string(), "provider returned 503: try later");
        assert_eq!(ModelError::Other("boom".into()).kind(), FailureKind::Other);
    }

    #[test]
    fn default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.max_output_tokens, 4000);
        assert_eq!(params.temperature, 0.2);
    }
}
