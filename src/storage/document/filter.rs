//! Predicates over JSON documents

use regex::Regex;
use serde_json::Value;
use crate::proverb::fold_case;
use super::collection::Document;

/// A find predicate, the subset a document server's query language needs here
#[derive(Debug, Clone)]
pub enum Filter {
    /// Every document
    All,
    /// String field whose case-folded value matches a pattern
    Regex { field: String, pattern: Regex },
    /// Array field holding an element equal to `value`
    ArrayContains { field: String, value: Value },
}

impl Filter {
    /// Case-insensitive, unanchored match of `literal` against a string field.
    ///
    /// Both sides go through `fold_case`, the fold the other backends use,
    /// rather than the regex engine's own case-insensitivity.
    pub fn contains_ignore_case(field: &str, literal: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&regex::escape(&fold_case(literal)))?;
        Ok(Filter::Regex { field: field.to_string(), pattern })
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains { field: field.to_string(), value: value.into() }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Regex { field, pattern } => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| pattern.is_match(&fold_case(s))),
            Filter::ArrayContains { field, value } => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        }
    }
}
