use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ScanError;
use crate::handlers::Recognizer;

/// `POST /analyze_food` body
#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    /// Data URI or bare base64 payload
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug)]
pub struct ApiReply {
    pub status: u16,
    pub body: serde_json::Value,
}

pub fn status_for(err: &ScanError) -> u16 {
    match err {
        ScanError::InvalidInput(_) => 400,
        ScanError::Configuration(_) => 503,
        ScanError::Upstream(_) => 502,
        ScanError::ExtractionEmpty => 422,
    }
}

/// Runs one meal-scanner request. Framework-agnostic so it can be tested without a server.
pub async fn analyze_request(recognizer: &Recognizer, request: AnalyzeRequest) -> ApiReply {
    let Some(image) = request.image.filter(|i| !i.trim().is_empty()) else {
        return ApiReply {
            status: 400,
            body: json!({ "success": false, "error": "No image data provided" }),
        };
    };

    log::info!("📸 Received food image for analysis ({} bytes encoded)", image.len());

    match recognizer.recognize(image).await {
        Ok(result) => ApiReply {
            status: 200,
            body: json!({
                "success": true,
                "foods": result.foods,
                "nutrition": result.nutrition,
                "source": result.source,
                "nutrition_source": result.nutrition_source,
            }),
        },
        Err(e) => ApiReply {
            status: status_for(&e),
            body: json!({
                "success": false,
                "error": format!("Analysis failed: {}", e),
                "stage": e.stage().to_string(),
            }),
        },
    }
}

// Axum integration (optional - requires the http-server feature)
#[cfg(feature = "http-server")]
pub mod server {
    use super::*;
    use axum::{
        extract::{DefaultBodyLimit, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::sync::Arc;
    use tower_http::limit::RequestBodyLimitLayer;

    /// Phone photos base64-encoded routinely exceed axum's 2 MiB default.
    pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

    pub fn create_router(recognizer: Arc<Recognizer>) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/analyze_food", post(analyze_food_handler))
            .route("/health", get(health_check))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .with_state(recognizer)
    }

    async fn analyze_food_handler(
        State(recognizer): State<Arc<Recognizer>>,
        body: String,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let request: AnalyzeRequest = match serde_json::from_str(&body) {
            Ok(r) => r,
            Err(e) => {
                log::error!("❌ Failed to parse analyze_food payload: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "error": format!("Invalid JSON body: {}", e) })),
                );
            }
        };

        let reply = analyze_request(&recognizer, request).await;
        let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(reply.body))
    }

    async fn root_handler() -> &'static str {
        "Meal Scanner - POST a photo to /analyze_food as {\"image\": \"data:image/...;base64,...\"}"
    }

    async fn health_check() -> &'static str {
        "OK"
    }

}
