use rand::seq::SliceRandom;

use crate::models::{FoodItem, NutritionEstimate, NutritionSource, RecognitionResult, RecognitionSource};
use crate::services::extractor::MAX_JSON_ITEMS;

/// Supplies the canned result returned when no real recognition was possible.
/// Implementations must tag results as `offline-estimate`.
pub trait OfflineFallbackProvider: Send + Sync {
    fn offline_result(&self) -> RecognitionResult;
}

/// A canned meal: food names with confidence, plus fixed nutrition.
#[derive(Debug, Clone)]
pub struct ExampleMeal {
    pub foods: Vec<(&'static str, u8)>,
    pub nutrition: NutritionEstimate,
}

impl ExampleMeal {
    fn food_items(&self) -> Vec<FoodItem> {
        self.foods
            .iter()
            .filter_map(|(name, confidence)| FoodItem::new(name, *confidence as i64))
            .take(MAX_JSON_ITEMS)
            .collect()
    }

    fn to_result(&self) -> RecognitionResult {
        RecognitionResult {
            foods: self.food_items(),
            nutrition: self.nutrition.normalized(),
            source: RecognitionSource::OfflineEstimate,
            nutrition_source: NutritionSource::ExampleMeal,
        }
    }
}

pub fn example_meals() -> Vec<ExampleMeal> {
    vec![
        ExampleMeal {
            foods: vec![("Grilled Chicken Breast", 94), ("Steamed Rice", 89), ("Mixed Vegetables", 92)],
            nutrition: NutritionEstimate::new(420.0, 35.0, 38.0, 8.0),
        },
        ExampleMeal {
            foods: vec![("Salmon Fillet", 91), ("Quinoa", 87), ("Green Salad", 95)],
            nutrition: NutritionEstimate::new(380.0, 28.0, 32.0, 12.0),
        },
        ExampleMeal {
            foods: vec![("Spaghetti Pasta", 96), ("Tomato Sauce", 88), ("Ground Beef", 85)],
            nutrition: NutritionEstimate::new(520.0, 22.0, 68.0, 16.0),
        },
    ]
}

/// Picks one of the example meals at random.
pub struct ExampleMealsFallback {
    meals: Vec<ExampleMeal>,
}

impl ExampleMealsFallback {
    pub fn new() -> Self {
        Self { meals: example_meals() }
    }
}

impl Default for ExampleMealsFallback {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineFallbackProvider for ExampleMealsFallback {
    fn offline_result(&self) -> RecognitionResult {
        let meal = self
            .meals
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(FixedMealFallback::basic_meal);
        meal.to_result()
    }
}

/// Always returns the same meal. Deterministic, so tests can assert on it.
pub struct FixedMealFallback {
    meal: ExampleMeal,
}

impl FixedMealFallback {
    /// `None` when the meal has no nameable food, since every result must list at least one.
    pub fn new(meal: ExampleMeal) -> Option<Self> {
        if meal.food_items().is_empty() {
            log::warn!("⚠️ Rejected offline meal without any food names");
            return None;
        }
        Some(Self { meal })
    }

    /// Single "Mixed Meal" of average size.
    pub fn basic() -> Self {
        Self {
            meal: Self::basic_meal(),
        }
    }

    fn basic_meal() -> ExampleMeal {
        ExampleMeal {
            foods: vec![("Mixed Meal", 85)],
            nutrition: NutritionEstimate::new(350.0, 20.0, 30.0, 12.0),
        }
    }
}

impl OfflineFallbackProvider for FixedMealFallback {
    fn offline_result(&self) -> RecognitionResult {
        self.meal.to_result()
    }
}
