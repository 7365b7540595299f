//! Resilient model invocation: stream, accumulate, retry transient failures.

use futures::TryStreamExt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{GenerationParams, GenerativeModel, ModelError};
use crate::retry::RetryPolicy;

/// A model call that produced no text.
///
/// Distinct from a successful call that returned an empty string.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: ModelError },

    #[error("{source}")]
    Fatal { attempts: u32, source: ModelError },
}

impl InvokeError {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Fatal { attempts, .. } => *attempts,
        }
    }

    pub fn source_error(&self) -> &ModelError {
        match self {
            Self::Exhausted { source, .. } | Self::Fatal { source, .. } => source,
        }
    }
}

/// Sends prompts to a [`GenerativeModel`] under a [`RetryPolicy`].
pub struct ModelInvoker<M> {
    model: M,
    params: GenerationParams,
    policy: RetryPolicy,
}

impl<M: GenerativeModel> ModelInvoker<M> {
    pub fn new(model: M) -> Self {
        Self::with_settings(model, GenerationParams::default(), RetryPolicy::default())
    }

    pub fn with_settings(model: M, params: GenerationParams, policy: RetryPolicy) -> Self {
        Self {
            model,
            params,
            policy,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Generate a response for `prompt`, returning all streamed fragments
    /// concatenated in arrival order.
    ///
    /// Partial output from a failed attempt is discarded.
    pub async fn invoke(&self, prompt: &str) -> Result<String, InvokeError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.attempt(prompt).await {
                Ok(text) => {
                    debug!(model = self.model.name(), attempt, bytes = text.len(), "model response received");
                    return Ok(text);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            if !self.policy.is_retryable(kind) {
                warn!(model = self.model.name(), attempt, error = %err, "model call failed");
                return Err(InvokeError::Fatal {
                    attempts: attempt,
                    source: err,
                });
            }
            if !self.policy.should_retry(kind, attempt) {
                warn!(model = self.model.name(), attempt, error = %err, "model call retries exhausted");
                return Err(InvokeError::Exhausted {
                    attempts: attempt,
                    source: err,
                });
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                model = self.model.name(),
                attempt,
                kind = kind.as_str(),
                delay_ms = delay.as_millis() as u64,
                "transient model failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<String, ModelError> {
        let fragments = self.model.stream_generate(prompt, &self.params).await?;
        fragments
            .try_fold(String::new(), |mut acc, fragment| async move {
                acc.push_str(&fragment);
                Ok(acc)
            })
            .await
    }
}
