//! Equality-filter queries over one collection.

use std::cmp::Ordering;

use serde_json::Value;

use super::{StoreError, validate_path};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => " ASC",
            Self::Descending => " DESC",
        }
    }
}

/// `field == value` on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Sort on a top-level field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A query over a single collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every document in `collection`.
    #[must_use]
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Keep documents whose `field` equals `value`.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Sort by `field`.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Return at most `limit` documents.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document's data passes every filter.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| data.get(&f.field) == Some(&f.value))
    }

    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        validate_path(&self.collection)?;
        let fields = self
            .filters
            .iter()
            .map(|f| f.field.as_str())
            .chain(self.order_by.iter().map(|o| o.field.as_str()));
        for field in fields {
            let valid = !field.is_empty()
                && field.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
            if !valid {
                return Err(StoreError::Invalid {
                    kind: "field name",
                    value: field.to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Order two field values: missing and null first, then booleans, numbers,
/// strings, arrays and objects.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_matches_all_filters() {
        let query = Query::collection("orders")
            .where_eq("userId", "u1")
            .where_eq("status", "pending");
        assert!(query.matches(&json!({"userId": "u1", "status": "pending", "total": "5"})));
        assert!(!query.matches(&json!({"userId": "u1", "status": "shipped"})));
        assert!(!query.matches(&json!({"status": "pending"})));
    }

    #[test]
    fn test_field_names_are_checked() {
        let query = Query::collection("orders").where_eq("user') OR 1=1", "x");
        assert!(query.validate().is_err());
        let query = Query::collection("orders").order_by("createdAt", Direction::Descending);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(
            compare_values(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}
