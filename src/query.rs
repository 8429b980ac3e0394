use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const NO_ANSWER: &str = "No answer returned.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a query.")]
    Empty,
}

/// Trimmed, non-empty search text. Built fresh for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(Query(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Body of a `/query` reply. Fields the backend adds beyond these are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub answer: Option<FieldValue>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub error: Option<FieldValue>,
}

impl QueryResponse {
    /// Server-side failure reported inside a 2xx body. Missing-looking
    /// values (empty, zero, `false`) don't count.
    pub fn application_error(&self) -> Option<String> {
        self.error.as_ref().and_then(FieldValue::display)
    }

    pub fn answer_text(&self) -> String {
        field_or(&self.answer, NO_ANSWER)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One vehicle listing backing the answer. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub make: Option<FieldValue>,
    #[serde(default)]
    pub model: Option<FieldValue>,
    #[serde(default)]
    pub year: Option<FieldValue>,
    #[serde(default)]
    pub latest_price: Option<FieldValue>,
    #[serde(default, rename = "mileage(km)")]
    pub mileage_km: Option<FieldValue>,
    #[serde(default)]
    pub body_type: Option<FieldValue>,
    #[serde(default)]
    pub title: Option<FieldValue>,
}

/// Listing columns arrive as text or numbers depending on the row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
    Other(serde_json::Value),
}

impl FieldValue {
    /// Printable form, or `None` for values that count as missing:
    /// empty text, zero, `false` and anything structured.
    pub fn display(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) if s.is_empty() => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => format_number(n),
            FieldValue::Flag(true) => Some("true".to_string()),
            FieldValue::Flag(false) | FieldValue::Other(_) => None,
        }
    }
}

fn format_number(n: &serde_json::Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return (i != 0).then(|| i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return (u != 0).then(|| u.to_string());
    }
    let f = n.as_f64()?;
    if f == 0.0 {
        None
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

/// Display value of an optional field, falling back to `placeholder`.
pub fn field_or(value: &Option<FieldValue>, placeholder: &str) -> String {
    value
        .as_ref()
        .and_then(FieldValue::display)
        .unwrap_or_else(|| placeholder.to_string())
}
