//! Generative model layer: the streaming model boundary, retry policy, and
//! resilient invocation; with the `vertex` feature, a Vertex AI Gemini client.

pub mod invoker;
pub mod model;
pub mod retry;
#[cfg(feature = "vertex")]
pub mod vertex;

pub use invoker::{InvokeError, ModelInvoker};
pub use model::{FailureKind, FragmentStream, GenerationParams, GenerativeModel, ModelError};
pub use retry::RetryPolicy;
#[cfg(feature = "vertex")]
pub use vertex::{SseDecoder, VertexClient, VertexConfig};
