//! Document store contract
//!
//! A hosted document database seen through four operations:
//! - `create` with server-stamped timestamps
//! - `get` by identifier
//! - `update` merging a partial field set
//! - `subscribe` to an ordered live query delivering full snapshots

use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Stored document fields
pub type Fields = Map<String, Value>;

/// Fields submitted on create/update
pub type WriteFields = BTreeMap<String, FieldValue>;

/// Document identifier assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier
    pub id: DocumentId,
    /// Field values, server timestamps already resolved
    pub fields: Fields,
}

/// Value written to a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Literal JSON value
    Value(Value),
    /// Replaced by the store's clock (microseconds since epoch) at write time
    ServerTimestamp,
}

impl FieldValue {
    /// Literal value from anything convertible to JSON
    #[inline]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first
    Ascending,
    /// Largest first
    #[default]
    Descending,
}

/// Ordering clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to sort on
    pub field: String,
    /// Direction
    pub direction: Direction,
}

/// Live query over one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Collection name
    pub collection: String,
    /// Optional ordering
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// Whole collection, unordered
    #[inline]
    #[must_use]
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: None,
        }
    }

    /// Whole collection ordered by `field`, largest first
    #[inline]
    #[must_use]
    pub fn ordered_desc(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: Some(OrderBy {
                field: field.into(),
                direction: Direction::Descending,
            }),
        }
    }

    /// Sort documents in place according to this query.
    ///
    /// Documents missing the order field sort after all stamped documents in
    /// descending order. Ties break on document id.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some(order) = &self.order_by else {
            documents.sort_by(|a, b| a.id.cmp(&b.id));
            return;
        };
        documents.sort_by(|a, b| {
            let ord = compare_field(a.fields.get(&order.field), b.fields.get(&order.field));
            let ord = match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            };
            ord.then_with(|| a.id.cmp(&b.id))
        });
    }
}

static NULL: Value = Value::Null;

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = (a.unwrap_or(&NULL), b.unwrap_or(&NULL));
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => number_key(x).total_cmp(&number_key(y)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Mixed types order null < bool < number < string < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn number_key(n: &serde_json::Number) -> f64 {
    n.as_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(id: &str, created_at: Option<i64>) -> Document {
        let mut fields = Fields::new();
        if let Some(ts) = created_at {
            fields.insert("createdAt".to_string(), json!(ts));
        }
        Document {
            id: DocumentId(id.to_string()),
            fields,
        }
    }

    #[test]
    fn query_sorts_descending() {
        let query = Query::ordered_desc("notes", "createdAt");
        let mut docs = vec![doc("a", Some(1)), doc("b", Some(3)), doc("c", Some(2))];
        query.sort(&mut docs);

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn unstamped_documents_sort_last_when_descending() {
        let query = Query::ordered_desc("notes", "createdAt");
        let mut docs = vec![doc("pending", None), doc("old", Some(1))];
        query.sort(&mut docs);

        assert_eq!(docs[0].id.as_str(), "old");
        assert_eq!(docs[1].id.as_str(), "pending");
    }

    #[test]
    fn mixed_field_types_order_by_type_rank() {
        let query = Query::ordered_desc("notes", "createdAt");
        let mut docs = vec![
            doc("num", Some(5)),
            Document {
                id: DocumentId("str".to_string()),
                fields: json!({ "createdAt": "2024-01-03" })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            },
            doc("missing", None),
            doc("big", Some(9)),
        ];
        query.sort(&mut docs);

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["str", "big", "num", "missing"]);
    }

    proptest! {
        #[test]
        fn sort_is_total_over_mixed_values(
            values in proptest::collection::vec(
                prop_oneof![
                    Just(None),
                    Just(Some(Value::Null)),
                    any::<bool>().prop_map(|b| Some(json!(b))),
                    any::<i64>().prop_map(|n| Some(json!(n))),
                    (-1.0e6..1.0e6f64).prop_map(|f| Some(json!(f))),
                    "[0-9a-z-]{0,10}".prop_map(|s| Some(json!(s))),
                ],
                0..80,
            ),
        ) {
            let query = Query::ordered_desc("notes", "createdAt");
            let mut docs: Vec<Document> = values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let mut fields = Fields::new();
                    if let Some(value) = value {
                        fields.insert("createdAt".to_string(), value);
                    }
                    Document { id: DocumentId(format!("d{i:03}")), fields }
                })
                .collect();
            query.sort(&mut docs);

            for pair in docs.windows(2) {
                let ord = compare_field(pair[0].fields.get("createdAt"), pair[1].fields.get("createdAt"));
                prop_assert_ne!(ord, Ordering::Less);
            }
        }

        #[test]
        fn stamped_documents_come_out_newest_first(
            stamps in proptest::collection::vec(proptest::option::of(0..1_000_000i64), 0..60),
        ) {
            let query = Query::ordered_desc("notes", "createdAt");
            let mut docs: Vec<Document> = stamps
                .iter()
                .enumerate()
                .map(|(i, ts)| doc(&format!("d{i:03}"), *ts))
                .collect();
            query.sort(&mut docs);

            let sorted: Vec<Option<i64>> = docs
                .iter()
                .map(|d| d.fields.get("createdAt").and_then(Value::as_i64))
                .collect();
            let stamped = sorted.iter().take_while(|ts| ts.is_some()).count();
            prop_assert_eq!(stamped, stamps.iter().filter(|ts| ts.is_some()).count());
            for pair in sorted[..stamped].windows(2) {
                prop_assert!(pair[0] >= pair[1]);
            }
        }
    }

    #[test]
    fn subscription_handle_cancel_is_idempotent() {
        let handle = SubscriptionHandle::new();
        assert!(!handle.is_cancelled());

        handle.cancel();
        handle.cancel();

        assert!(handle.is_cancelled());
        assert!(handle.token().is_cancelled());
    }

    #[test]
    fn field_value_from_literal() {
        assert_eq!(FieldValue::value(0), FieldValue::Value(json!(0)));
        assert_eq!(FieldValue::from(json!("x")), FieldValue::value("x"));
    }
}
