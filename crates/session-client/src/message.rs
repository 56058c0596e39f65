//! Error message extraction from failed responses

use serde_json::Value;

/// Pick the human-readable message out of an error response body.
///
/// A JSON string body is used as is. A JSON object contributes its `message`
/// field, then its `error` field, when either is a string. A non-JSON body is
/// taken verbatim as text. Anything else, including an empty body, falls back
/// to `request failed ({status})`.
pub fn extract_message(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(Value::Object(fields)) => ["message", "error"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| fallback(status)),
        Ok(_) => fallback(status),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            if text.trim().is_empty() {
                fallback(status)
            } else {
                text.into_owned()
            }
        }
    }
}

fn fallback(status: u16) -> String {
    format!("request failed ({status})")
}
