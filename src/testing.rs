//! Test doubles shared across module tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::services::ai_service::{InferenceClient, InferenceError};
use crate::services::image_prep::PreparedImage;

/// Replays queued replies in order; once the queue is drained every call fails with a 503.
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, InferenceError>>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<String, InferenceError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// (prompt, had image) for every call so far.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, prompt: &str, image: Option<&PreparedImage>) -> Result<String, InferenceError> {
        self.calls.lock().unwrap().push((prompt.to_string(), image.is_some()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(InferenceError::Status {
                    status: 503,
                    body: "service unavailable".to_string(),
                })
            })
    }

    fn model(&self) -> &str {
        "scripted/test-model"
    }
}
