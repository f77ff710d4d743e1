use serde_json::Value;

use crate::store::Record;

/// An equality condition on one projection field.
///
/// A slice of filters is a conjunction: a record matches when every filter
/// matches. Repeated field names are all applied; a later value does not
/// replace an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterValue {
    field: String,
    value: Value,
}

impl FilterValue {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether `record` holds this filter's value in its field.
    ///
    /// A missing field only matches a `null` filter value.
    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.field).unwrap_or(&Value::Null) == &self.value
    }
}

/// Whether `record` satisfies every filter. An empty slice matches everything.
pub fn matches_all(filters: &[FilterValue], record: &Record) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}
