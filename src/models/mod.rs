use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,     // Title-cased, never empty
    pub confidence: u8,   // 0-100
}

impl FoodItem {
    /// Validates and normalizes a raw model entry. Returns `None` for blank names.
    pub fn new(name: &str, confidence: i64) -> Option<Self> {
        let name = title_case(name.trim());
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            confidence: confidence.clamp(0, 100) as u8,
        })
    }

    /// Confidence as a 0.0-1.0 factor.
    pub fn confidence_factor(&self) -> f64 {
        self.confidence as f64 / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionEstimate {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionEstimate {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    /// Clamps negatives (and NaN) to zero and rounds every field to one decimal.
    pub fn normalized(self) -> Self {
        Self {
            calories: round1(self.calories),
            protein: round1(self.protein),
            carbs: round1(self.carbs),
            fat: round1(self.fat),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
        }
    }
}

impl std::ops::Add for NutritionEstimate {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }
}

fn round1(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    (value * 10.0).round() / 10.0
}

/// How the food list of a result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionSource {
    /// Model answered with parsable JSON.
    ModelVision,
    /// Model answered, but foods were recovered from prose.
    ModelTextFallback,
    /// No real identification happened; canned example meal.
    OfflineEstimate,
}

impl std::fmt::Display for RecognitionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecognitionSource::ModelVision => "model-vision",
            RecognitionSource::ModelTextFallback => "model-text-fallback",
            RecognitionSource::OfflineEstimate => "offline-estimate",
        };
        write!(f, "{}", s)
    }
}

/// How the nutrition figures of a result were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NutritionSource {
    Model,
    OfflineTable,
    ExampleMeal,
}

impl std::fmt::Display for NutritionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NutritionSource::Model => "model",
            NutritionSource::OfflineTable => "offline-table",
            NutritionSource::ExampleMeal => "example-meal",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub foods: Vec<FoodItem>,
    pub nutrition: NutritionEstimate,
    pub source: RecognitionSource,
    pub nutrition_source: NutritionSource,
}

impl RecognitionResult {
    /// True only for results backed by a real model identification.
    pub fn is_authoritative(&self) -> bool {
        self.source != RecognitionSource::OfflineEstimate
    }
}

/// Uppercases every letter that follows a non-letter, lowercases the rest.
/// Apostrophes don't start a new word ("mcdonald's" -> "Mcdonald's").
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = c == '\'' && prev_is_letter;
        }
    }
    out
}
