use html_escape::decode_html_entities;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::extractors::has_type;
use crate::model::ScrapedStep;
use crate::text::normalize_whitespace;

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;](?:\s+|$)").expect("sentence regex"));
static STEP_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[ée]tape|step)?\s*[0-9]+\s*[).:\-]\s*").expect("step index regex")
});
static HOURS_MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+)\s*(?:h|heures?)\s*([0-9]+)\s*(?:min|minutes?)?")
        .expect("hours minutes regex")
});
static HOURS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)\s*(?:h|heures?)\b").expect("hours regex"));
static MINUTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)\s*(?:min|minutes?)\b").expect("minutes regex"));

/// Turn `recipeInstructions` of any common shape into ordered steps.
pub fn normalize_instructions_to_steps(instructions: &Value) -> Vec<ScrapedStep> {
    extract_instruction_texts(instructions)
        .iter()
        .map(|text| normalize_whitespace(text))
        .map(|text| strip_leading_step_index(&text))
        .filter(|text| !text.is_empty())
        .map(|description| {
            let minutes = extract_minutes(&description);
            ScrapedStep {
                description,
                minutes,
            }
        })
        .collect()
}

fn extract_instruction_texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => split_instruction_string(&decode_html_entities(s)),
        Value::Array(items) => items.iter().flat_map(extract_instruction_texts).collect(),
        Value::Object(obj) => {
            if let Some(Value::String(text)) = obj.get("text") {
                return vec![decode_html_entities(text).into_owned()];
            }
            if let Some(items) = obj.get("itemListElement").filter(|v| is_present(v)) {
                return extract_instruction_texts(items);
            }
            if let Some(steps) = obj.get("steps").filter(|v| is_present(v)) {
                return extract_instruction_texts(steps);
            }
            match obj.get("name") {
                Some(Value::String(name)) if has_type(obj, "HowToStep") => {
                    vec![decode_html_entities(name).into_owned()]
                }
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Split free text into steps: by line, else by sentence, else whole.
fn split_instruction_string(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let by_lines: Vec<String> = raw
        .replace("\r\n", "\n")
        .split(['\n', '\r'])
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect();
    if by_lines.len() >= 2 {
        return by_lines;
    }

    let normalized = normalize_whitespace(raw);
    let by_sentences: Vec<String> = SENTENCE_END_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if by_sentences.len() >= 2 {
        by_sentences
    } else {
        vec![normalized]
    }
}

fn strip_leading_step_index(text: &str) -> String {
    STEP_INDEX_RE.replace(text, "").trim().to_string()
}

/// Duration hint embedded in a step, e.g. "1 h 30", "2 heures", "10 min".
fn extract_minutes(description: &str) -> Option<u32> {
    let number = |caps: &regex::Captures, i: usize| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    let total = if let Some(caps) = HOURS_MINUTES_RE.captures(description) {
        number(&caps, 1).saturating_mul(60).saturating_add(number(&caps, 2))
    } else if let Some(caps) = HOURS_RE.captures(description) {
        number(&caps, 1).saturating_mul(60)
    } else if let Some(caps) = MINUTES_RE.captures(description) {
        number(&caps, 1)
    } else {
        return None;
    };

    (total > 0).then_some(total)
}
