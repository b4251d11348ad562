//! Row store interface
//!
//! The hosted backend exposes table-scoped CRUD with filter/order/limit
//! predicates. [`RowStore`] is the seam every screen service talks to;
//! [`RowStoreExt`] layers typed decoding on top of raw JSON rows.

use crate::error::StoreError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// A raw row: column name to JSON value
pub type Row = Map<String, Value>;

/// Tables exposed by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Display name and demographics per account
    Profiles,
    /// Role grant per account
    UserRoles,
    /// Clinical record, optionally linked to an account
    Patients,
    /// Daily KPI readings
    Measurements,
    /// Generated observations per patient
    Insights,
    /// Assessment scores
    TestResults,
    /// Exercises clinicians assign to patients
    AssignedExercises,
}

impl Table {
    /// Every table, in declaration order
    pub const ALL: [Table; 7] = [
        Table::Profiles,
        Table::UserRoles,
        Table::Patients,
        Table::Measurements,
        Table::Insights,
        Table::TestResults,
        Table::AssignedExercises,
    ];

    /// Backend table name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::UserRoles => "user_roles",
            Table::Patients => "patients",
            Table::Measurements => "measurements",
            Table::Insights => "insights",
            Table::TestResults => "test_results",
            Table::AssignedExercises => "assigned_exercises",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filter operators supported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// Value must be a JSON array; matches if any element equals the column
    In,
}

/// Column predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name
    pub column: String,
    /// Operator
    pub op: FilterOp,
    /// Operand
    pub value: Value,
}

impl Filter {
    /// Create filter
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Equality filter
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// Membership filter
    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(column, FilterOp::In, Value::Array(values))
    }

    /// Evaluate against a row; a missing column reads as null.
    ///
    /// Follows SQL: a null cell or operand satisfies no comparison, `Neq`
    /// included, and never appears in an `In` list.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(&self.column).unwrap_or(&Value::Null);
        if cell.is_null() || self.value.is_null() {
            return false;
        }
        let ord = compare_values(cell, &self.value);
        match self.op {
            FilterOp::Eq => ord == Some(Ordering::Equal),
            FilterOp::Neq => ord != Some(Ordering::Equal),
            FilterOp::Gt => ord == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => ord == Some(Ordering::Less),
            FilterOp::Lte => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            FilterOp::In => match &self.value {
                Value::Array(options) => options
                    .iter()
                    .any(|option| compare_values(cell, option) == Some(Ordering::Equal)),
                _ => false,
            },
        }
    }
}

/// Compare two JSON scalars the way the backend does.
///
/// Numbers compare numerically, strings lexicographically (ISO dates sort
/// correctly), booleans false < true. Mixed or composite types are
/// incomparable. Two nulls are equal here so that ordering groups them;
/// filters reject nulls before comparing.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Sort column
    pub column: String,
    /// Direction
    pub ascending: bool,
}

/// Select predicate: filters, then order, then limit
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// All must match
    pub filters: Vec<Filter>,
    /// Sort keys, most significant first
    pub orders: Vec<Order>,
    /// Row cap applied after ordering
    pub limit: Option<usize>,
}

impl Query {
    /// Empty query (all rows, backend order)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add arbitrary filter
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// `column = value`
    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    /// `column >= value`
    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Gte, value))
    }

    /// `column <= value`
    #[must_use]
    pub fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(column, FilterOp::Lte, value))
    }

    /// `column in (values)`
    #[must_use]
    pub fn is_in<V: Into<Value>>(self, column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.filter(Filter::is_in(column, values))
    }

    /// Order by column; repeated calls add tie-breaking keys
    #[must_use]
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.orders.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Cap number of rows returned
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check a row against every filter
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Evaluate the query over rows held in memory
    pub fn evaluate<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Vec<Row> {
        let mut selected: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).cloned().collect();

        if !self.orders.is_empty() {
            selected.sort_by(|a, b| {
                self.orders
                    .iter()
                    .map(|order| {
                        let left = a.get(&order.column).unwrap_or(&Value::Null);
                        let right = b.get(&order.column).unwrap_or(&Value::Null);
                        let ord = compare_values(left, right).unwrap_or(Ordering::Equal);
                        if order.ascending {
                            ord
                        } else {
                            ord.reverse()
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Table-scoped CRUD against the hosted backend
#[async_trait]
pub trait RowStore: Send + Sync + fmt::Debug {
    /// Rows matching the query
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Insert a record; returns the stored row with backend defaults filled in
    async fn insert(&self, table: Table, record: Row) -> Result<Row, StoreError>;

    /// Shallow-merge `patch` into every row matching `filters`; returns the count
    async fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<usize, StoreError>;

    /// Remove every row matching `filters`; returns the count
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, StoreError>;
}

/// Typed helpers over [`RowStore`]
#[async_trait]
pub trait RowStoreExt: RowStore {
    /// Select and decode rows
    async fn select_as<T>(&self, table: Table, query: &Query) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.select(table, query)
            .await?
            .into_iter()
            .map(|row| decode_row(table, row))
            .collect()
    }

    /// First matching row, if any
    async fn maybe_single<T>(&self, table: Table, query: Query) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let query = query.limit(1);
        let mut rows = self.select(table, &query).await?;
        match rows.pop() {
            Some(row) => decode_row(table, row).map(Some),
            None => Ok(None),
        }
    }

    /// Encode, insert and decode the stored row
    async fn insert_as<N, T>(&self, table: Table, record: &N) -> Result<T, StoreError>
    where
        N: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let row = encode_row(table, record)?;
        let stored = self.insert(table, row).await?;
        decode_row(table, stored)
    }
}

impl<S: RowStore + ?Sized> RowStoreExt for S {}

/// Decode a raw row into a record
pub fn decode_row<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|source| StoreError::Decode { table, source })
}

/// Encode a record into a raw row; `None` fields become nulls
pub fn encode_row<T: Serialize + ?Sized>(table: Table, record: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(record).map_err(|source| StoreError::Encode { table, source })? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test rows are objects"),
        }
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(2), &json!(10.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(3), &json!(3.0)), Some(Ordering::Equal));
    }

    #[test]
    fn mixed_types_are_incomparable() {
        assert_eq!(compare_values(&json!("3"), &json!(3)), None);
        let f = Filter::new("score", FilterOp::Gte, 3);
        assert!(!f.matches(&row(json!({"score": "3"}))));
    }

    #[test]
    fn date_range_filter() {
        let q = Query::new().gte("date", "2025-03-01");
        assert!(q.matches(&row(json!({"date": "2025-03-01"}))));
        assert!(q.matches(&row(json!({"date": "2025-03-10"}))));
        assert!(!q.matches(&row(json!({"date": "2025-02-28"}))));
    }

    #[test]
    fn nulls_match_no_filter() {
        assert!(!Filter::eq("user_id", Value::Null).matches(&row(json!({"user_id": null}))));
        assert!(!Filter::new("user_id", FilterOp::Neq, "x").matches(&row(json!({}))));
        assert!(!Filter::new("user_id", FilterOp::Neq, "x").matches(&row(json!({"user_id": null}))));
        assert!(!Filter::is_in("user_id", [Value::Null]).matches(&row(json!({"user_id": null}))));
        assert!(Filter::new("user_id", FilterOp::Neq, "x").matches(&row(json!({"user_id": "y"}))));
    }

    #[test]
    fn in_filter() {
        let f = Filter::is_in("id", ["a", "c"]);
        assert!(f.matches(&row(json!({"id": "c"}))));
        assert!(!f.matches(&row(json!({"id": "b"}))));
    }

    #[test]
    fn evaluate_orders_and_limits() {
        let rows = vec![
            row(json!({"date": "2025-01-02", "v": 1})),
            row(json!({"date": "2025-01-05", "v": 2})),
            row(json!({"date": "2025-01-03", "v": 3})),
        ];
        let q = Query::new().order("date", false).limit(2);
        let out = q.evaluate(&rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["v"], json!(2));
        assert_eq!(out[1]["v"], json!(3));
    }

    #[test]
    fn later_order_keys_break_ties() {
        let rows = vec![
            row(json!({"date": "2025-01-05", "created_at": "2025-01-05T08:00:00Z", "v": 1})),
            row(json!({"date": "2025-01-04", "created_at": "2025-01-04T09:00:00Z", "v": 2})),
            row(json!({"date": "2025-01-05", "created_at": "2025-01-05T17:30:00Z", "v": 3})),
        ];
        let out = Query::new().order("date", false).order("created_at", false).evaluate(&rows);
        let order: Vec<&Value> = out.iter().map(|r| &r["v"]).collect();
        assert_eq!(order, vec![&json!(3), &json!(1), &json!(2)]);
    }

    #[test]
    fn encode_rejects_non_objects() {
        let err = encode_row(Table::Insights, &5).unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject(Table::Insights)));
    }

    fn scored(values: &[i64]) -> Vec<Row> {
        values.iter().map(|v| row(json!({ "score": v }))).collect()
    }

    proptest! {
        #[test]
        fn gte_and_lt_partition_rows(
            values in prop::collection::vec(-1000i64..1000, 0..40),
            pivot in -1000i64..1000,
        ) {
            let rows = scored(&values);
            let at_least = Query::new().gte("score", pivot).evaluate(&rows);
            let below = Query::new()
                .filter(Filter::new("score", FilterOp::Lt, pivot))
                .evaluate(&rows);

            prop_assert_eq!(at_least.len() + below.len(), rows.len());
            prop_assert!(at_least.iter().all(|r| r["score"].as_i64().is_some_and(|v| v >= pivot)));
            prop_assert!(below.iter().all(|r| r["score"].as_i64().is_some_and(|v| v < pivot)));
        }

        #[test]
        fn descending_limit_is_top_n(
            values in prop::collection::vec(-1000i64..1000, 0..40),
            n in 0usize..50,
        ) {
            let rows = scored(&values);
            let out = Query::new().order("score", false).limit(n).evaluate(&rows);
            let got: Vec<i64> = out.iter().filter_map(|r| r["score"].as_i64()).collect();

            let mut expected = values.clone();
            expected.sort_unstable_by(|a, b| b.cmp(a));
            expected.truncate(n);
            prop_assert_eq!(got, expected);
        }

        #[test]
        fn eq_and_neq_are_complements_on_non_null(
            values in prop::collection::vec(0i64..5, 0..30),
            target in 0i64..5,
        ) {
            let rows = scored(&values);
            let eq = Query::new().eq("score", target).evaluate(&rows).len();
            let neq = Query::new()
                .filter(Filter::new("score", FilterOp::Neq, target))
                .evaluate(&rows)
                .len();
            prop_assert_eq!(eq + neq, rows.len());
        }
    }
}
