use crate::models::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Match criteria applied to records of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Every record of the type
    All,
    /// Records whose `field` holds one of `values`
    FieldIn { field: String, values: Vec<Value> },
    /// Store-native predicate text, passed through untouched
    Raw { expression: String },
}

impl Predicate {
    /// Evaluate locally against a record. `Raw` predicates are opaque here and always match.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All | Self::Raw { .. } => true,
            Self::FieldIn { field, values } => record
                .field(field)
                .is_some_and(|value| values.contains(value)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "TRUEPREDICATE"),
            Self::FieldIn { field, values } => write!(f, "{field} IN {values:?}"),
            Self::Raw { expression } => f.write_str(expression),
        }
    }
}

/// A query against one record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub record_type: String,
    pub predicate: Predicate,
}

impl Query {
    /// Query for every record of `record_type`
    pub fn all(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            predicate: Predicate::All,
        }
    }

    /// Query for records whose `field` value is one of `values`
    pub fn field_in(record_type: impl Into<String>, field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            record_type: record_type.into(),
            predicate: Predicate::FieldIn {
                field: field.into(),
                values,
            },
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.record_type == self.record_type && self.predicate.matches(record)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} WHERE {}", self.record_type, self.predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_in_matches() {
        let query = Query::field_in("Note", "title", vec![json!("a"), json!("b")]);

        let hit = Record::new("1", "Note").with_field("title", json!("b"));
        let miss = Record::new("2", "Note").with_field("title", json!("c"));
        let wrong_type = Record::new("3", "Task").with_field("title", json!("a"));

        assert!(query.matches(&hit));
        assert!(!query.matches(&miss));
        assert!(!query.matches(&wrong_type));
    }

    #[test]
    fn test_all_matches_type_only() {
        let query = Query::all("Note");
        assert!(query.matches(&Record::new("1", "Note")));
        assert!(!query.matches(&Record::new("1", "Task")));
        assert_eq!(query.to_string(), "Note WHERE TRUEPREDICATE");
    }
}
