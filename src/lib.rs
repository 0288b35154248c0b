//! Meal scanner: turns a meal photo into a validated `{foods, nutrition, source}`
//! result using a multimodal model, with heuristic extraction and an offline
//! nutrition table for when the model output is unusable.

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, FallbackPolicy};
pub use error::{ScanError, Stage};
pub use handlers::Recognizer;
pub use models::{FoodItem, NutritionEstimate, NutritionSource, RecognitionResult, RecognitionSource};
pub use services::ImageInput;
