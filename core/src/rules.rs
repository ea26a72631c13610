//! Built-in custom rules.

use chrono::DateTime;
use serde_json::Value;

use crate::validator::Rule;

/// Accepts strings holding an RFC 3339 timestamp.
///
/// Pure, so it supplies a generator and compiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeRule;

impl Rule for DateTimeRule {
    fn describe(&self) -> String {
        "date-time".to_string()
    }

    fn test(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok())
    }

    fn generate(&self, reference: &str) -> Option<String> {
        Some(format!("is_rfc3339({reference})"))
    }
}

/// A closure-backed rule with no generator.
pub(crate) struct FnRule<F> {
    description: String,
    predicate: F,
}

impl<F> FnRule<F> {
    pub(crate) fn new(description: impl Into<String>, predicate: F) -> Self {
        Self {
            description: description.into(),
            predicate,
        }
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn test(&self, value: &Value) -> bool {
        (self.predicate)(value)
    }
}
