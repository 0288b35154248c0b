//! Recovers `{name, confidence}` food entries from free-text model output.
//!
//! Models asked for JSON usually comply, but sometimes wrap it in markdown or
//! prose, and occasionally ignore the instruction entirely. The cascade below
//! tries strict JSON first, then falls back to keyword heuristics. Every stage
//! is a pure function of its input.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::models::FoodItem;

pub const MAX_JSON_ITEMS: usize = 5;
pub const MAX_HEURISTIC_ITEMS: usize = 3;
pub const PATTERN_CONFIDENCE: i64 = 80;
pub const CAPITALIZED_CONFIDENCE: i64 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Json,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub items: Vec<FoodItem>,
    pub method: ExtractionMethod,
}

pub fn extract(raw: &str) -> Vec<FoodItem> {
    extract_with_method(raw).items
}

pub fn extract_with_method(raw: &str) -> Extraction {
    let candidate = unwrap_fence(raw);

    let items = match parse_json_object(candidate) {
        Some(value) => foods_from_json(&value),
        None => Vec::new(),
    };
    if !items.is_empty() {
        return Extraction {
            items,
            method: ExtractionMethod::Json,
        };
    }

    log::debug!("🔍 No usable JSON in model response, trying text heuristics");
    Extraction {
        items: foods_from_text(raw),
        method: ExtractionMethod::Heuristic,
    }
}

/// Returns the body of the first fenced block holding a `{`, minus any language
/// tag. Unfenced text, or text whose fences hold no object, is returned trimmed.
pub fn unwrap_fence(raw: &str) -> &str {
    let text = raw.trim();
    if !text.contains("```") {
        return text;
    }

    // Odd segments sit between fence markers; an unclosed fence still yields one.
    let blocks: Vec<&str> = text.split("```").skip(1).step_by(2).collect();
    let Some(block) = blocks.into_iter().find(|b| b.contains('{')) else {
        return text;
    };

    strip_language_tag(block).trim()
}

fn strip_language_tag(block: &str) -> &str {
    let body = block.trim_start();
    let tag_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    &body[tag_len..]
}

/// Parses the substring between the first `{` and the last `}`.
pub fn parse_json_object(candidate: &str) -> Option<Value> {
    let start = candidate.find('{')?;
    let end = candidate.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&candidate[start..=end]) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("🔍 Bracket slice is not valid JSON: {}", e);
            None
        }
    }
}

fn foods_from_json(value: &Value) -> Vec<FoodItem> {
    let Some(foods) = value.get("foods").and_then(Value::as_array) else {
        return Vec::new();
    };

    foods
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_object()?;
            let name = match entry.get("name")? {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let confidence = coerce_confidence(entry.get("confidence")?)?;
            FoodItem::new(&name, confidence)
        })
        .take(MAX_JSON_ITEMS)
        .collect()
}

fn coerce_confidence(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn food_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"chicken\s+\d+",
            r"\b(?:fried|grilled|steamed|baked)\s+\w+",
            r"\b(?:biryani|curry|rice|naan|roti)\b",
            r"\b\w+\s+(?:chicken|mutton|fish|paneer)\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn foods_from_text(raw: &str) -> Vec<FoodItem> {
    let lowered = raw.to_lowercase();
    let mut found: Vec<FoodItem> = Vec::new();

    for pattern in food_patterns() {
        for m in pattern.find_iter(&lowered) {
            push_unique(&mut found, m.as_str(), PATTERN_CONFIDENCE);
        }
    }

    if found.is_empty() {
        for word in raw.split_whitespace() {
            let word = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if word.chars().count() > 3 && is_title_word(word) {
                push_unique(&mut found, word, CAPITALIZED_CONFIDENCE);
            }
        }
    }

    found.truncate(MAX_HEURISTIC_ITEMS);
    found
}

/// Case-insensitive repeats are dropped, so "rice ... rice ... naan" yields
/// `[Rice, Naan]` rather than one item per match.
fn push_unique(found: &mut Vec<FoodItem>, name: &str, confidence: i64) {
    if let Some(item) = FoodItem::new(name, confidence) {
        if !found.iter().any(|f| f.name.eq_ignore_ascii_case(&item.name)) {
            found.push(item);
        }
    }
}

/// "Biryani" yes, "BIRYANI" / "biryani" / "1234" no.
fn is_title_word(word: &str) -> bool {
    let mut letters = word.chars().filter(|c| c.is_alphabetic());
    match letters.next() {
        Some(first) if first.is_uppercase() => letters.all(|c| c.is_lowercase()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[FoodItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_clean_json() {
        let raw = r#"{"foods": [{"name": "chicken biryani", "confidence": 92}, {"name": "RAITA", "confidence": 81}]}"#;
        let extraction = extract_with_method(raw);

        assert_eq!(extraction.method, ExtractionMethod::Json);
        assert_eq!(
            extraction.items,
            vec![
                FoodItem { name: "Chicken Biryani".into(), confidence: 92 },
                FoodItem { name: "Raita".into(), confidence: 81 },
            ]
        );
    }

    #[test]
    fn test_json_wrapped_in_prose() {
        let raw = "Sure! Here is what I see:\n{\"foods\": [{\"name\": \"masala dosa\", \"confidence\": 88}]}\nEnjoy your meal.";
        assert_eq!(names(&extract(raw)), vec!["Masala Dosa"]);
    }

    #[test]
    fn test_fenced_json_matches_unfenced() {
        let body = r#"{"foods": [{"name": "Paneer Tikka", "confidence": 90}, {"name": "Garlic Naan", "confidence": 85}]}"#;
        let fenced = format!("Here you go:\n```json\n{}\n```\nLet me know!", body);
        let fenced_upper = format!("```JSON\n{}\n```", body);
        let fenced_bare = format!("```\n{}\n```", body);

        let expected = extract(body);
        assert_eq!(expected.len(), 2);
        assert_eq!(extract(&fenced), expected);
        assert_eq!(extract(&fenced_upper), expected);
        assert_eq!(extract(&fenced_bare), expected);
    }

    #[test]
    fn test_unwrap_fence_prefers_block_with_object() {
        let raw = "```text\nnotes\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(unwrap_fence(raw), "{\"a\": 1}");
        assert_eq!(unwrap_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(unwrap_fence("  plain  "), "plain");
    }

    #[test]
    fn test_json_outside_fences_still_parsed() {
        let raw = "Run ```identify``` done: {\"foods\": [{\"name\": \"chicken biryani\", \"confidence\": 92}, {\"name\": \"raita\", \"confidence\": 81}]}";
        assert_eq!(unwrap_fence(raw), raw);

        let extraction = extract_with_method(raw);
        assert_eq!(extraction.method, ExtractionMethod::Json);
        assert_eq!(
            extraction.items,
            vec![
                FoodItem { name: "Chicken Biryani".into(), confidence: 92 },
                FoodItem { name: "Raita".into(), confidence: 81 },
            ]
        );
    }

    #[test]
    fn test_json_truncated_to_five() {
        let entries: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"name": "dish {}", "confidence": 80}}"#, i))
            .collect();
        let raw = format!(r#"{{"foods": [{}]}}"#, entries.join(","));

        let items = extract(&raw);
        assert_eq!(items.len(), MAX_JSON_ITEMS);
        assert_eq!(items[4].name, "Dish 4");
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let raw = r#"{"foods": [
            {"name": "Idli"},
            {"confidence": 90},
            "sambar",
            {"name": "Vada", "confidence": "high"},
            {"name": "   ", "confidence": 70},
            {"name": "Upma", "confidence": 77.9},
            {"name": "Poha", "confidence": "83"},
            {"name": "Halwa", "confidence": 250}
        ]}"#;

        assert_eq!(
            extract(raw),
            vec![
                FoodItem { name: "Upma".into(), confidence: 77 },
                FoodItem { name: "Poha".into(), confidence: 83 },
                FoodItem { name: "Halwa".into(), confidence: 100 },
            ]
        );
    }

    #[test]
    fn test_broken_json_falls_back_to_patterns() {
        let raw = r#"{"foods": [{"name": "Grilled Fish", "confidence": 9"#;
        let extraction = extract_with_method(raw);

        assert_eq!(extraction.method, ExtractionMethod::Heuristic);
        assert_eq!(extraction.items[0].name, "Grilled Fish");
        assert_eq!(extraction.items[0].confidence, 80);
    }

    #[test]
    fn test_empty_foods_array_falls_back_to_patterns() {
        let raw = r#"{"foods": []} chicken 65 with jeera rice."#;
        let extraction = extract_with_method(raw);

        assert_eq!(extraction.method, ExtractionMethod::Heuristic);
        assert_eq!(names(&extraction.items), vec!["Chicken 65", "Rice"]);
    }

    #[test]
    fn test_pattern_matches_capped_at_three() {
        let raw = "The plate has fried rice, grilled paneer, butter chicken, tandoori fish and some naan.";
        let items = extract(raw);

        assert_eq!(items.len(), MAX_HEURISTIC_ITEMS);
        assert!(items.iter().all(|i| i.confidence == 80));
        assert_eq!(names(&items), vec!["Fried Rice", "Grilled Paneer", "Rice"]);
    }

    #[test]
    fn test_repeated_matches_reported_once() {
        assert_eq!(names(&extract("rice with more Rice and naan")), vec!["Rice", "Naan"]);
    }

    #[test]
    fn test_capitalized_word_fallback() {
        let raw = "I believe this is Lasagna.";
        assert_eq!(
            extract(raw),
            vec![FoodItem { name: "Lasagna".into(), confidence: 75 }]
        );
    }

    #[test]
    fn test_capitalized_words_capped_at_three() {
        let raw = "Looks like Pizza, Lasagna, Tiramisu and Bruschetta. Also a cup of TEA.";
        let items = extract(raw);

        assert_eq!(names(&items), vec!["Looks", "Pizza", "Lasagna"]);
        assert!(items.iter().all(|i| i.confidence == 75));
    }

    #[test]
    fn test_nothing_recognizable() {
        assert!(extract("").is_empty());
        assert!(extract("   ").is_empty());
        assert!(extract("no idea, sorry. cannot tell at all").is_empty());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let inputs = [
            r#"```json
{"foods": [{"name": "pad thai", "confidence": 87}]}
```"#,
            "steamed momos and a bowl of Thukpa",
            "Nothing Here",
        ];

        for raw in inputs {
            assert_eq!(extract_with_method(raw), extract_with_method(raw));
        }
    }
}
