//! Free-text search over records.

use serde_json::Value;

use crate::value::{ValueKind, leaf_text, lookup};

/// A case-insensitive substring filter, global or scoped to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    term: String,
    field: Option<String>,
}

impl SearchFilter {
    /// Build a filter, or `None` when the term is blank.
    pub fn new(search: Option<&str>, field: Option<&str>) -> Option<Self> {
        let search = search?;
        if search.trim().is_empty() {
            return None;
        }
        Some(Self {
            term: search.to_lowercase(),
            field: field.filter(|f| !f.is_empty()).map(str::to_string),
        })
    }

    /// Whether any leaf of the searched value contains the term.
    ///
    /// Null leaves and missing fields never match.
    pub fn matches(&self, record: &Value) -> bool {
        let target = match &self.field {
            Some(field) => lookup(record, field),
            None => Some(record),
        };
        target.is_some_and(|value| contains_term(value, &self.term))
    }
}

fn contains_term(value: &Value, term: &str) -> bool {
    match ValueKind::of(value) {
        ValueKind::Null => false,
        ValueKind::Composite => match value {
            Value::Array(items) => items.iter().any(|item| contains_term(item, term)),
            Value::Object(map) => map.values().any(|item| contains_term(item, term)),
            _ => false,
        },
        ValueKind::Bool | ValueKind::Number | ValueKind::String => {
            leaf_text(value).is_some_and(|text| text.to_lowercase().contains(term))
        }
    }
}

/// Keep the records matching `filter`; no filter keeps everything.
pub fn filter_records(records: Vec<Value>, filter: Option<&SearchFilter>) -> Vec<Value> {
    match filter {
        Some(filter) => records.into_iter().filter(|r| filter.matches(r)).collect(),
        None => records,
    }
}
