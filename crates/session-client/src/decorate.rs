//! Outbound request decoration
//!
//! Fills in baseline headers before a request leaves the process. Headers the
//! caller already set are never touched.

use std::str::FromStr;

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use tracing::warn;
use transport::RequestAttempt;

fn application_json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// Default header rule (name + value pair from config).
#[derive(Debug, Clone)]
pub struct DefaultHeader {
    pub name: String,
    pub value: String,
}

/// Applies default headers to outgoing requests.
#[derive(Debug, Clone, Default)]
pub struct Decorator {
    defaults: Vec<(HeaderName, HeaderValue)>,
}

impl Decorator {
    /// Build a decorator with extra default headers. Invalid names or values
    /// are skipped with a warning.
    pub fn new(defaults: &[DefaultHeader]) -> Self {
        let mut parsed = Vec::with_capacity(defaults.len());
        for header in defaults {
            let name = match HeaderName::from_str(&header.name) {
                Ok(n) => n,
                Err(e) => {
                    warn!(header = %header.name, error = %e, "skipping invalid header name");
                    continue;
                }
            };
            let value = match HeaderValue::from_str(&header.value) {
                Ok(v) => v,
                Err(e) => {
                    warn!(header = %header.name, error = %e, "skipping invalid header value");
                    continue;
                }
            };
            parsed.push((name, value));
        }
        Self { defaults: parsed }
    }

    /// Fill in missing headers on `attempt`.
    ///
    /// Body-carrying methods get `content-type: application/json`; every
    /// request gets `accept: application/json`; configured defaults follow.
    /// Each is added only when absent.
    pub fn apply(&self, attempt: &mut RequestAttempt) {
        if carries_body(attempt) && !attempt.headers.contains_key(CONTENT_TYPE) {
            attempt.headers.insert(CONTENT_TYPE, application_json());
        }
        if !attempt.headers.contains_key(ACCEPT) {
            attempt.headers.insert(ACCEPT, application_json());
        }
        for (name, value) in &self.defaults {
            if !attempt.headers.contains_key(name) {
                attempt.headers.insert(name.clone(), value.clone());
            }
        }
    }
}

/// POST, PUT and PATCH conventionally carry a body; DELETE only when it has one.
fn carries_body(attempt: &RequestAttempt) -> bool {
    match attempt.method {
        Method::POST | Method::PUT | Method::PATCH => true,
        Method::DELETE => attempt.body.is_some(),
        _ => false,
    }
}
