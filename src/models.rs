use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::AppError;

/// Fields every lead must carry, checked in this order.
pub const REQUIRED_FIELDS: [&str; 5] = ["name", "email", "phone", "loan_type", "amount"];

/// Optional fields the HTML form may send; stored as "" when absent.
pub const OPTIONAL_FORM_FIELDS: [&str; 4] = ["employment", "income", "city", "message"];

/// Timestamp layout used for `submitted_at` and `/health`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Same layout for instants that fall on a whole second.
const WHOLE_SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ============ Lead ============

/// A prospective customer's submitted contact / loan-interest record.
///
/// Field order is insertion order; it decides the CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lead(Map<String, Value>);

impl Lead {
    /// Builds a lead from an HTML form post.
    ///
    /// Fields not in the form vocabulary are dropped; missing ones become "".
    /// `source` is the referring page, or "direct" when there was none.
    pub fn from_form(form: &HashMap<String, String>, referer: Option<&str>) -> Self {
        let mut fields = Map::new();
        for key in REQUIRED_FIELDS.iter().chain(OPTIONAL_FORM_FIELDS.iter()) {
            let value = form.get(*key).cloned().unwrap_or_default();
            fields.insert((*key).to_string(), Value::String(value));
        }
        let source = referer
            .filter(|r| !r.is_empty())
            .unwrap_or("direct")
            .to_string();
        fields.insert("source".to_string(), Value::String(source));
        Self(fields)
    }

    /// Builds a lead from a JSON API payload. Only non-empty objects qualify.
    pub fn from_json(payload: Value) -> Option<Self> {
        match payload {
            Value::Object(fields) if !fields.is_empty() => Some(Self(fields)),
            _ => None,
        }
    }

    /// Rejects the lead naming the first required field that is missing.
    pub fn validate_required(&self) -> Result<(), AppError> {
        for field in REQUIRED_FIELDS {
            if !self.0.get(field).is_some_and(is_present) {
                return Err(AppError::BadRequest(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Stamps `submitted_at`, replacing any client-sent value.
    pub fn stamp(&mut self, at: DateTime<Local>) {
        self.set("submitted_at", format_timestamp(at));
    }

    pub fn submitted_at(&self) -> Option<&str> {
        self.0.get("submitted_at").and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Cell values in field order, for one CSV row.
    pub fn csv_record(&self) -> Vec<String> {
        self.0.values().map(csv_cell).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether a submitted value counts as filled in.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Local time without offset; the fraction is left out when it rounds down
/// to zero microseconds.
pub fn format_timestamp(at: DateTime<Local>) -> String {
    let layout = if at.nanosecond() / 1_000 == 0 {
        WHOLE_SECOND_FORMAT
    } else {
        TIMESTAMP_FORMAT
    };
    at.naive_local().format(layout).to_string()
}

// ============ EMI ============

/// Body of `POST /api/calculate-emi`.
///
/// Inputs are kept as raw JSON so numeric strings are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmiRequest {
    #[serde(default)]
    pub principal: Value,
    /// Annual interest rate, in percent.
    #[serde(default)]
    pub rate: Value,
    /// Loan tenure, in months.
    #[serde(default)]
    pub tenure: Value,
}

/// Result of an EMI calculation. Monetary amounts are rounded to cents;
/// `principal` is echoed unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmiBreakdown {
    pub emi: f64,
    pub total_amount: f64,
    pub total_interest: f64,
    pub principal: f64,
}

// ============ Responses ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
