//! Coercion of Oracle replies into typed results.
//!
//! Replies are untyped JSON. Each reader checks the overall shape, then fills
//! every missing or mistyped field with a neutral default. A reply that is not
//! JSON at all, or is JSON of the wrong shape, is a format error.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::{
    extraction::{ExtractionMethod, ExtractionResult, KeyContent, SectionAnalysis, SiteStrategy, StrategyKind},
    objective::ObjectiveAnalysis,
};

static RE_THINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());
static RE_JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap());
static RE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());
static RE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Strip a reasoning block and an optional code fence.
pub fn clean_reply(raw: &str) -> String {
    let without_think = RE_THINK.replace_all(raw, "");
    let text = without_think.trim();

    let fenced = if text.contains("```json") {
        RE_JSON_FENCE.captures(text)
    } else if text.contains("```") {
        RE_FENCE.captures(text)
    } else {
        None
    };

    fenced
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim()
        .to_string()
}

/// Clean a reply and parse it as JSON.
pub fn parse_json(raw: &str) -> Result<Value, String> {
    let cleaned = clean_reply(raw);
    serde_json::from_str(&cleaned).map_err(|e| format!("reply is not valid JSON: {e}"))
}

/// Every run of digits in the reply, in order.
pub fn integer_tokens(reply: &str) -> Vec<usize> {
    RE_INTEGER
        .find_iter(reply)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Read a 0-10 score. Numbers and numeric strings are accepted; anything
/// else is 0.
pub fn score(value: Option<&Value>) -> f32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => v.clamp(0.0, 10.0) as f32,
        _ => 0.0,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn index(value: Option<&Value>) -> Option<usize> {
    match value {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as usize),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn object<'a>(value: &'a Value, what: &str) -> Result<&'a serde_json::Map<String, Value>, String> {
    value
        .as_object()
        .ok_or_else(|| format!("{what} reply is not a JSON object"))
}

/// Key content as an ordered map. Non-object content is kept under `content`.
pub fn key_content(value: Option<&Value>) -> KeyContent {
    match value {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::Null) | None => KeyContent::new(),
        Some(other) => {
            let mut content = KeyContent::new();
            content.insert("content".to_string(), other.clone());
            content
        }
    }
}

pub fn objective_analysis(value: &Value) -> Result<ObjectiveAnalysis, String> {
    let map = object(value, "objective analysis")?;
    Ok(ObjectiveAnalysis {
        data_types: string_list(map.get("data_types")),
        key_fields: string_list(map.get("key_fields")),
        valuable_sections: string_list(map.get("valuable_sections")),
        seek_patterns: string_list(map.get("url_patterns_to_seek")),
        avoid_patterns: string_list(map.get("url_patterns_to_avoid")),
        strategy: text(map.get("extraction_strategy")).unwrap_or_default(),
        success_criteria: text(map.get("success_criteria")).unwrap_or_default(),
    })
}

pub fn whole_page_extraction(value: &Value) -> Result<ExtractionResult, String> {
    let map = object(value, "page extraction")?;
    Ok(ExtractionResult {
        page_type: text(map.get("page_type")).unwrap_or_else(|| "unknown".to_string()),
        relevance_score: score(map.get("relevance_score")),
        key_content: key_content(map.get("key_content")),
        reasoning: text(map.get("reasoning")).unwrap_or_default(),
        content_summary: text(map.get("content_summary"))
            .unwrap_or_else(|| "No summary available".to_string()),
        sections: Vec::new(),
        method: ExtractionMethod::WholePage,
    })
}

/// Per-section reply before it is merged into a page result.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionReply {
    pub page_type: String,
    pub sections: Vec<SectionAnalysis>,
    pub content_summary: String,
}

pub fn section_reply(value: &Value) -> Result<SectionReply, String> {
    let map = object(value, "section extraction")?;

    let sections = match map.get("sections_analysis") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(position, item)| {
                let entry = item.as_object()?;
                Some(SectionAnalysis {
                    section_id: index(entry.get("section_id")).unwrap_or(position),
                    relevance_score: score(entry.get("relevance_score")),
                    reason: text(entry.get("reason")).unwrap_or_default(),
                    extracted_content: entry
                        .get("extracted_content")
                        .filter(|v| !v.is_null())
                        .cloned(),
                })
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => return Err("sections_analysis is not an array".to_string()),
    };

    Ok(SectionReply {
        page_type: text(map.get("page_type")).unwrap_or_else(|| "unknown".to_string()),
        sections,
        content_summary: text(map.get("content_summary"))
            .unwrap_or_else(|| "No summary available".to_string()),
    })
}

pub fn site_strategy(value: &Value) -> Result<SiteStrategy, String> {
    let map = object(value, "structure analysis")?;
    Ok(SiteStrategy {
        site_type: text(map.get("site_type")).unwrap_or_else(|| "unknown".to_string()),
        valuable_page_types: string_list(map.get("most_valuable_page_types")),
        recommended_focus: text(map.get("recommended_focus")).unwrap_or_default(),
        high_priority_patterns: string_list(map.get("high_priority_patterns")),
        strategy: text(map.get("strategy"))
            .map(|s| StrategyKind::from_label(&s))
            .unwrap_or_default(),
    })
}
