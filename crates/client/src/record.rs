//! Submission records and their canonical byte encoding.

use chrono::{SecondsFormat, Utc};
use common::protocol::SubmissionRecord;
use common::ExchangeError;
use serde_json::{Map, Value};

/// Build a record for one questionnaire page. No timestamp is set.
pub fn new_record(user_id: impl Into<String>, page_no: u8, questions: Map<String, Value>) -> SubmissionRecord {
    SubmissionRecord {
        user_id: user_id.into(),
        page_no,
        questions,
        date: None,
    }
}

/// Set the record's `date` to the current UTC time, millisecond precision.
pub fn stamp(mut record: SubmissionRecord) -> SubmissionRecord {
    record.date = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
    record
}

/// Interpret an arbitrary JSON document as a questions map.
///
/// # Errors
///
/// Returns [`ExchangeError::Serialization`] unless `value` is a JSON object.
pub fn questions_from_value(value: Value) -> Result<Map<String, Value>, ExchangeError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExchangeError::Serialization(format!(
            "questions must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Encode a record as compact UTF-8 JSON.
///
/// Keys appear as `userId`, `pageNo`, `questions`, `date`; question fields
/// keep their insertion order.
///
/// # Errors
///
/// Returns [`ExchangeError::Serialization`] if `user_id` is empty or the value
/// cannot be encoded.
pub fn serialize(record: &SubmissionRecord) -> Result<Vec<u8>, ExchangeError> {
    if record.user_id.trim().is_empty() {
        return Err(ExchangeError::Serialization(
            "userId must be set before a record is encrypted".into(),
        ));
    }
    serde_json::to_vec(record).map_err(|e| ExchangeError::Serialization(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
