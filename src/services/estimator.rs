use serde_json::Value;
use std::sync::Arc;

use super::ai_service::InferenceClient;
use super::extractor::{parse_json_object, unwrap_fence};
use crate::models::{FoodItem, NutritionEstimate, NutritionSource};

/// Matched foods are assumed close to a full standard portion.
/// Unvalidated heuristic, kept for parity with the meal scanner's historical numbers.
pub const MATCHED_PORTION_FACTOR: f64 = 1.2;
/// Unidentified foods are discounted. Same caveat as above.
pub const GENERIC_PORTION_FACTOR: f64 = 0.8;

/// Per-serving baselines (kcal, protein g, carbs g, fat g). First matching key wins.
/// This is a degradation policy, not a nutrition database.
pub const NUTRITION_TABLE: &[(&str, NutritionEstimate)] = &[
    ("chicken", NutritionEstimate { calories: 165.0, protein: 31.0, carbs: 0.0, fat: 3.6 }),
    ("beef", NutritionEstimate { calories: 250.0, protein: 26.0, carbs: 0.0, fat: 17.0 }),
    ("fish", NutritionEstimate { calories: 140.0, protein: 25.0, carbs: 0.0, fat: 5.0 }),
    ("rice", NutritionEstimate { calories: 130.0, protein: 2.7, carbs: 28.0, fat: 0.3 }),
    ("pasta", NutritionEstimate { calories: 220.0, protein: 8.0, carbs: 44.0, fat: 1.1 }),
    ("bread", NutritionEstimate { calories: 265.0, protein: 9.0, carbs: 49.0, fat: 3.2 }),
    ("vegetable", NutritionEstimate { calories: 25.0, protein: 2.0, carbs: 5.0, fat: 0.2 }),
    ("fruit", NutritionEstimate { calories: 50.0, protein: 0.5, carbs: 12.0, fat: 0.2 }),
];

pub const GENERIC_FOOD: NutritionEstimate = NutritionEstimate {
    calories: 150.0,
    protein: 8.0,
    carbs: 20.0,
    fat: 5.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NutritionStrategy {
    /// Ask the model, fall back to the table on any failure
    Model,
    /// Table only, no network
    Offline,
}

pub struct NutritionEstimator {
    client: Option<Arc<dyn InferenceClient>>,
    strategy: NutritionStrategy,
}

impl NutritionEstimator {
    pub fn new(client: Option<Arc<dyn InferenceClient>>, strategy: NutritionStrategy) -> Self {
        Self { client, strategy }
    }

    pub fn offline() -> Self {
        Self::new(None, NutritionStrategy::Offline)
    }

    /// Never fails: a model error degrades to the offline table.
    pub async fn estimate(&self, items: &[FoodItem]) -> (NutritionEstimate, NutritionSource) {
        if let (NutritionStrategy::Model, Some(client)) = (self.strategy, &self.client) {
            match self.model_estimate(client.as_ref(), items).await {
                Ok(nutrition) => return (nutrition, NutritionSource::Model),
                Err(e) => log::warn!("⚠️ Model nutrition analysis failed: {}", e),
            }
        }

        log::info!("📊 Using offline nutrition table for {} item(s)", items.len());
        (offline_estimate(items), NutritionSource::OfflineTable)
    }

    async fn model_estimate(
        &self,
        client: &dyn InferenceClient,
        items: &[FoodItem],
    ) -> anyhow::Result<NutritionEstimate> {
        let prompt = nutrition_prompt(items);
        let response = client.complete(&prompt, None).await?;
        log::debug!("💬 Nutrition response: {}", response);
        parse_nutrition_response(&response)
    }
}

pub fn nutrition_prompt(items: &[FoodItem]) -> String {
    let food_list = items
        .iter()
        .map(|item| format!("{} (confidence: {}%)", item.name, item.confidence))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the nutritional content of this meal/food items: {}\n\n\
         Provide realistic nutritional estimates for a typical serving size. \
         Consider the confidence levels - higher confidence items should have more weight in calculations.\n\n\
         Return ONLY a JSON object with this exact format:\n\
         {{\"calories\": number, \"protein\": number, \"carbs\": number, \"fat\": number}}\n\n\
         Example: {{\"calories\": 420, \"protein\": 25, \"carbs\": 45, \"fat\": 12}}\n\n\
         Be realistic about portion sizes and nutritional values.",
        food_list
    )
}

/// Missing or non-numeric fields count as 0.0; a response without any JSON object is an error.
pub fn parse_nutrition_response(response: &str) -> anyhow::Result<NutritionEstimate> {
    let value = parse_json_object(unwrap_fence(response))
        .ok_or_else(|| anyhow::anyhow!("Invalid nutrition response format"))?;

    if !value.is_object() {
        anyhow::bail!("Nutrition response is not a JSON object");
    }

    let field = |key: &str| match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    Ok(NutritionEstimate::new(field("calories"), field("protein"), field("carbs"), field("fat")).normalized())
}

/// Coarse keyword-table estimate. Deterministic and offline.
pub fn offline_estimate(items: &[FoodItem]) -> NutritionEstimate {
    items
        .iter()
        .map(|item| {
            let name = item.name.to_lowercase();
            let matched = NUTRITION_TABLE
                .iter()
                .find(|(key, _)| name.contains(*key) || key.contains(name.as_str()));

            match matched {
                Some((_, baseline)) => baseline.scaled(item.confidence_factor() * MATCHED_PORTION_FACTOR),
                None => GENERIC_FOOD.scaled(item.confidence_factor() * GENERIC_PORTION_FACTOR),
            }
        })
        .fold(NutritionEstimate::default(), |total, n| total + n)
        .normalized()
}
