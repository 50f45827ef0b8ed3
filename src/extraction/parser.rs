use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::types::{InsuranceDetails, PatientDetails};
use super::ExtractionError;
use crate::models::DATE_FORMAT;

/// Birth-date layouts accepted from the model, tried in order.
const DOB_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse a patient-details response into typed fields.
pub fn parse_patient_details(response: &str) -> Result<PatientDetails, ExtractionError> {
    let object = parse_object(response)?;
    Ok(PatientDetails {
        full_name: field(&object, "full_name"),
        date_of_birth: field(&object, "date_of_birth").map(|raw| normalize_date_of_birth(&raw)),
        email: field(&object, "email"),
        phone_number: field(&object, "phone_number"),
    })
}

/// Parse an insurance-details response into typed fields.
pub fn parse_insurance_details(response: &str) -> Result<InsuranceDetails, ExtractionError> {
    let object = parse_object(response)?;
    Ok(InsuranceDetails {
        insurance_carrier: field(&object, "insurance_carrier"),
        member_id: field(&object, "member_id"),
    })
}

/// Rewrite a recognizable date to `YYYY-MM-DD`. Unrecognized input is kept as given.
pub fn normalize_date_of_birth(raw: &str) -> String {
    let trimmed = raw.trim();
    DOB_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|date| date.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Locate the JSON object in an LLM response (fenced or bare).
pub fn extract_json_block(response: &str) -> Result<&str, ExtractionError> {
    let trimmed = response.trim();

    // Strip markdown code fences if present
    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Ok(after_fence[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            if block.starts_with('{') {
                return Ok(block);
            }
        }
    }

    // Find the first { and last }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Ok(&trimmed[start..=end]);
        }
    }

    Err(ExtractionError::JsonParsing(
        "No JSON object found in LLM response".to_string(),
    ))
}

fn parse_object(response: &str) -> Result<Map<String, Value>, ExtractionError> {
    let block = extract_json_block(response)?;
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractionError::JsonParsing(format!(
            "Expected a JSON object, got {}",
            value_kind(&other)
        ))),
        Err(e) => Err(ExtractionError::JsonParsing(e.to_string())),
    }
}

fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(lenient_string)
}

/// Coerce a JSON value to a non-empty string. Lists are joined with spaces.
fn lenient_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(lenient_string)
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null | Value::Object(_) => return None,
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(text)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
