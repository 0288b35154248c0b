use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ai_service::{InferenceClient, InferenceError};
use super::image_prep::PreparedImage;
use crate::config::InferenceSettings;
use crate::error::ScanError;

const RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_TOKENS: u32 = 500;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
pub struct OpenRouterService {
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenRouterService {
    pub fn from_settings(settings: &InferenceSettings) -> Result<Self, ScanError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| ScanError::Configuration("no inference API key configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ScanError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, prompt: &str, image: Option<&PreparedImage>) -> ChatRequest {
        let mut content = vec![ContentPart::Text {
            content_type: "text".to_string(),
            text: prompt.to_string(),
        }];
        if let Some(image) = image {
            content.push(ContentPart::ImageUrl {
                content_type: "image_url".to_string(),
                image_url: ImageData {
                    url: image.data_url.clone(),
                },
            });
        }

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            max_tokens: MAX_TOKENS,
        }
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/meal-scanner") // OpenRouter app attribution
            .header("X-Title", "Meal Scanner")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        log::debug!("📥 Inference response status: {}", status);

        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            log::error!("❌ Inference API error ({}): {}", status, body);
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("📄 Raw inference response size: {} bytes", body.len());
        let chat_response: ChatResponse =
            serde_json::from_str(&body).map_err(|e| InferenceError::Decode(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}

fn transport_error(err: reqwest::Error) -> InferenceError {
    if err.is_timeout() {
        InferenceError::Timeout
    } else {
        InferenceError::Transport(err.to_string())
    }
}

#[async_trait::async_trait]
impl InferenceClient for OpenRouterService {
    async fn complete(&self, prompt: &str, image: Option<&PreparedImage>) -> Result<String, InferenceError> {
        let request = self.build_request(prompt, image);
        if log::log_enabled!(log::Level::Debug) {
            if let Ok(payload) = serde_json::to_string(&request) {
                log::debug!("📤 Request payload size: {} bytes", payload.len());
            }
        }

        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    log::warn!(
                        "⚠️ Inference call failed ({}), retrying ({}/{})",
                        e,
                        attempt,
                        self.max_retries
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
