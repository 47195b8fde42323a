use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::AnalysisError;
use crate::models::FoodItem;
use crate::services::prompt::ResponseShape;

/// Confidence reported when a provider omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:json)?").expect("code fence pattern is valid"));

/// Removes Markdown code fences (```json / ```) and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Canonical payload parsed out of a generative provider's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub items: Vec<FoodItem>,
    pub confidence: Option<f64>,
    pub options: Option<Vec<FoodItem>>,
}

pub fn normalize(raw: &str, shape: ResponseShape) -> Result<Normalized, AnalysisError> {
    let clean = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&clean).map_err(|e| {
        log::warn!("Provider text is not valid JSON: {}", e);
        AnalysisError::malformed(raw)
    })?;

    match shape {
        ResponseShape::Items => {
            let items = food_list(&value, "items").ok_or_else(|| AnalysisError::malformed(raw))?;
            if items.is_empty() {
                return Err(AnalysisError::NoFoodIdentified);
            }
            let confidence = match value.get("confidence") {
                None | Some(Value::Null) => DEFAULT_CONFIDENCE,
                Some(v) => number(v)
                    .ok_or_else(|| AnalysisError::malformed(raw))?
                    .clamp(0.0, 1.0),
            };
            Ok(Normalized {
                items,
                confidence: Some(confidence),
                options: None,
            })
        }
        ResponseShape::Options => {
            let options = food_list(&value, "options").ok_or_else(|| AnalysisError::malformed(raw))?;
            Ok(Normalized {
                items: Vec::new(),
                confidence: None,
                options: Some(options),
            })
        }
    }
}

/// `None` when the array is missing or any entry fails validation.
fn food_list(value: &Value, key: &str) -> Option<Vec<FoodItem>> {
    value.get(key)?.as_array()?.iter().map(food_item).collect()
}

fn food_item(value: &Value) -> Option<FoodItem> {
    let name = value.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let field = |key: &str| match value.get(key) {
        None | Some(Value::Null) => Some(0.0),
        Some(v) => number(v).map(|n| n.max(0.0)),
    };

    Some(FoodItem {
        name: name.to_string(),
        grams: field("grams")?,
        calories: field("calories")?,
        protein: field("protein")?,
        carbs: field("carbs")?,
        fat: field("fat")?,
    })
}

/// Accepts JSON numbers and numeric strings such as `"12.5"`.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"items":[{"name":"Rice","grams":150,"calories":195,"protein":4,"carbs":42,"fat":0.4}],"confidence":0.8}"#;

    #[test]
    fn test_strip_fences_with_json_tag() {
        let fenced = format!("```json\n{}\n```", PLAIN);
        assert_eq!(strip_code_fences(&fenced), PLAIN);
    }

    #[test]
    fn test_strip_fences_without_tag() {
        let fenced = format!("```\n{}\n```", PLAIN);
        assert_eq!(strip_code_fences(&fenced), PLAIN);
        assert_eq!(strip_code_fences(&format!("```JSON {}```", PLAIN)), PLAIN);
    }

    #[test]
    fn test_strip_fences_leaves_plain_text_unchanged() {
        assert_eq!(strip_code_fences(PLAIN), PLAIN);
    }

    #[test]
    fn test_strip_fences_is_idempotent() {
        for input in [
            format!("```json\n{}\n```", PLAIN),
            "````json``".to_string(),
            "  ``` ``` ".to_string(),
            PLAIN.to_string(),
        ] {
            let once = strip_code_fences(&input);
            assert_eq!(strip_code_fences(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let fenced = normalize(&format!("```json\n{}\n```", PLAIN), ResponseShape::Items).unwrap();
        let plain = normalize(PLAIN, ResponseShape::Items).unwrap();
        assert_eq!(fenced, plain);
        assert_eq!(plain.items[0].name, "Rice");
        assert_eq!(plain.confidence, Some(0.8));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = normalize("I think this is a sandwich!", ResponseShape::Items).unwrap_err();
        match err {
            AnalysisError::MalformedProviderResponse { raw } => {
                assert!(raw.contains("sandwich"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = normalize(r#"{"options":[]}"#, ResponseShape::Items).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedProviderResponse { .. }));

        let err = normalize("{}", ResponseShape::Options).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedProviderResponse { .. }));
    }

    #[test]
    fn test_item_without_name_is_malformed() {
        let err = normalize(r#"{"items":[{"grams":100}]}"#, ResponseShape::Items).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedProviderResponse { .. }));
    }

    #[test]
    fn test_empty_items_means_no_food() {
        let err = normalize(r#"{"items":[],"confidence":0.9}"#, ResponseShape::Items).unwrap_err();
        assert!(matches!(err, AnalysisError::NoFoodIdentified));
    }

    #[test]
    fn test_numbers_are_coerced_and_clamped() {
        let raw = r#"{"items":[{"name":"Egg","grams":"50","calories":-3,"protein":6.3}],"confidence":1.7}"#;
        let normalized = normalize(raw, ResponseShape::Items).unwrap();
        let egg = &normalized.items[0];

        assert_eq!(egg.grams, 50.0);
        assert_eq!(egg.calories, 0.0);
        assert_eq!(egg.protein, 6.3);
        assert_eq!(egg.carbs, 0.0);
        assert_eq!(normalized.confidence, Some(1.0));
    }

    #[test]
    fn test_missing_confidence_uses_default() {
        let normalized = normalize(r#"{"items":[{"name":"Tea"}]}"#, ResponseShape::Items).unwrap();
        assert_eq!(normalized.confidence, Some(DEFAULT_CONFIDENCE));
    }

    #[test]
    fn test_options_shape() {
        let raw = r#"```json
{"options":[{"name":"Small apple","grams":100,"calories":52,"protein":0.3,"carbs":14,"fat":0.2},
{"name":"Large apple","grams":220,"calories":114,"protein":0.6,"carbs":30,"fat":0.4}]}
```"#;
        let normalized = normalize(raw, ResponseShape::Options).unwrap();
        assert!(normalized.items.is_empty());
        assert!(normalized.confidence.is_none());
        assert_eq!(normalized.options.unwrap().len(), 2);
    }
}
