use thiserror::Error;

use super::image_prep::PreparedImage;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode API response: {0}")]
    Decode(String),
    #[error("API returned an empty response")]
    EmptyResponse,
}

impl InferenceError {
    /// Timeouts, connection failures, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::Timeout | InferenceError::Transport(_) => true,
            InferenceError::Status { status, .. } => *status == 429 || *status >= 500,
            InferenceError::Decode(_) | InferenceError::EmptyResponse => false,
        }
    }
}

/// Trait for multimodal inference services (OpenRouter, OpenAI-compatible gateways, test fakes)
#[async_trait::async_trait]
pub trait InferenceClient: Send + Sync {
    /// One prompt/response exchange. `image` is attached as a vision input when present.
    async fn complete(&self, prompt: &str, image: Option<&PreparedImage>) -> Result<String, InferenceError>;

    fn model(&self) -> &str;
}
