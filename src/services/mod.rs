pub mod ai_service;
pub mod estimator;
pub mod extractor;
pub mod fallback;
pub mod image_prep;
pub mod openrouter; // OpenRouter / OpenAI-compatible inference

pub use ai_service::{InferenceClient, InferenceError};
pub use estimator::{NutritionEstimator, NutritionStrategy};
pub use extractor::extract;
pub use fallback::{ExampleMealsFallback, FixedMealFallback, OfflineFallbackProvider};
pub use image_prep::ImageInput;
pub use openrouter::OpenRouterService;
