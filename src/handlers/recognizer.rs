use std::sync::Arc;

use crate::config::{Config, FallbackPolicy, OfflineFallbackKind};
use crate::error::ScanError;
use crate::models::{RecognitionResult, RecognitionSource};
use crate::services::ai_service::InferenceClient;
use crate::services::estimator::NutritionEstimator;
use crate::services::extractor::{extract_with_method, ExtractionMethod};
use crate::services::fallback::{ExampleMealsFallback, FixedMealFallback, OfflineFallbackProvider};
use crate::services::image_prep::{self, ImageInput, PreparedImage};
use crate::services::OpenRouterService;

pub const IDENTIFY_PROMPT: &str = "Analyze this food image and identify the food items you can see.\n\n\
Provide your response in this exact JSON format:\n\
{\"foods\": [{\"name\": \"Food Item Name\", \"confidence\": 85}, {\"name\": \"Another Food\", \"confidence\": 92}]}\n\n\
Be specific about the food items (e.g., \"Chicken Biryani\" instead of just \"Rice\", \"Fried Chicken\" instead of just \"Chicken\"). \
Generic labels are wrong answers.\n\
Confidence should be 70-95 based on how clearly you can identify each item.\n\
List 2-5 food items. Return ONLY the JSON object.";

/// Coordinates identification, extraction and nutrition for one meal photo.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct Recognizer {
    client: Option<Arc<dyn InferenceClient>>,
    estimator: NutritionEstimator,
    fallback: Arc<dyn OfflineFallbackProvider>,
    policy: FallbackPolicy,
}

impl Recognizer {
    pub fn new(
        client: Option<Arc<dyn InferenceClient>>,
        estimator: NutritionEstimator,
        fallback: Arc<dyn OfflineFallbackProvider>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            client,
            estimator,
            fallback,
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let client: Option<Arc<dyn InferenceClient>> = match config.inference.api_key {
            Some(_) => Some(Arc::new(OpenRouterService::from_settings(&config.inference)?)),
            None => None,
        };

        let fallback: Arc<dyn OfflineFallbackProvider> = match config.offline_fallback {
            OfflineFallbackKind::Examples => Arc::new(ExampleMealsFallback::new()),
            OfflineFallbackKind::Basic => Arc::new(FixedMealFallback::basic()),
        };

        Ok(Self::new(
            client.clone(),
            NutritionEstimator::new(client, config.nutrition_strategy),
            fallback,
            config.fallback_policy,
        ))
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Model identifier in use, if a client is configured.
    pub fn model(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.model())
    }

    /// Identify the foods in a meal photo and estimate its nutrition.
    ///
    /// Bad input and missing configuration are always returned as errors.
    /// Service and parse failures return the error under `Strict`, or an
    /// `offline-estimate` result under `DegradeToOffline`.
    pub async fn recognize(&self, input: impl Into<ImageInput>) -> Result<RecognitionResult, ScanError> {
        let client = self.client.as_ref().ok_or_else(|| {
            log::error!("❌ Recognition requested but no inference client is configured");
            ScanError::Configuration("no inference API key configured (set OPENROUTER_API_KEY)".to_string())
        })?;

        let image = image_prep::prepare(&input.into()).map_err(|e| {
            log::error!("❌ Image decoding failed: {}", e);
            e
        })?;

        match self.identify(client.as_ref(), &image).await {
            Ok(result) => {
                log::info!(
                    "✅ Recognized {} food(s) [source: {}, nutrition: {}]",
                    result.foods.len(),
                    result.source,
                    result.nutrition_source
                );
                Ok(result)
            }
            Err(e) if e.is_degradable() && self.policy == FallbackPolicy::DegradeToOffline => {
                log::warn!(
                    "⚠️ Recognition failed at {} stage ({}), returning offline estimate",
                    e.stage(),
                    e
                );
                Ok(self.fallback.offline_result())
            }
            Err(e) => {
                log::error!("❌ Recognition failed at {} stage: {}", e.stage(), e);
                Err(e)
            }
        }
    }

    async fn identify(
        &self,
        client: &dyn InferenceClient,
        image: &PreparedImage,
    ) -> Result<RecognitionResult, ScanError> {
        log::info!(
            "🤖 Sending {}x{} image to model: {}",
            image.width,
            image.height,
            client.model()
        );
        let response = client.complete(IDENTIFY_PROMPT, Some(image)).await?;
        log::debug!("💬 Identification response: {}", response);

        let extraction = extract_with_method(&response);
        if extraction.items.is_empty() {
            return Err(ScanError::ExtractionEmpty);
        }

        let source = match extraction.method {
            ExtractionMethod::Json => RecognitionSource::ModelVision,
            ExtractionMethod::Heuristic => {
                log::warn!("⚠️ Model ignored the JSON format, foods recovered from text");
                RecognitionSource::ModelTextFallback
            }
        };

        let (nutrition, nutrition_source) = self.estimator.estimate(&extraction.items).await;

        Ok(RecognitionResult {
            foods: extraction.items,
            nutrition,
            source,
            nutrition_source,
        })
    }
}
