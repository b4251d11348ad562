//! In-memory row store
//!
//! Stands in for the hosted backend in tests, demos and the CLI. Mirrors the
//! backend's column defaults (`id`, `created_at`, date and status defaults) so
//! services observe the same rows they would get from the real thing.

use crate::error::StoreError;
use crate::store::{Filter, Query, Row, RowStore, Table};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

/// Thread-safe in-memory backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<Table, Vec<Row>>,
    /// One-shot failure injected into the next operation on a table
    failures: Mutex<Vec<(Table, String)>>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation on `table` fail with a backend error
    pub fn fail_next(&self, table: Table, message: impl Into<String>) {
        self.failures.lock().push((table, message.into()));
    }

    /// Number of rows currently held in `table`
    #[must_use]
    pub fn row_count(&self, table: Table) -> usize {
        self.tables.get(&table).map_or(0, |rows| rows.len())
    }

    fn take_failure(&self, table: Table) -> Result<(), StoreError> {
        let mut failures = self.failures.lock();
        if let Some(idx) = failures.iter().position(|(t, _)| *t == table) {
            let (_, message) = failures.remove(idx);
            return Err(StoreError::backend(table, message));
        }
        Ok(())
    }
}

/// Column defaults applied by the backend on insert
fn column_defaults(table: Table) -> Vec<(&'static str, Value)> {
    let now = Utc::now();
    let today = Value::String(now.date_naive().to_string());
    let mut defaults = vec![
        ("id", Value::String(Uuid::new_v4().to_string())),
        ("created_at", Value::String(now.to_rfc3339())),
    ];
    match table {
        Table::AssignedExercises => {
            defaults.push(("status", Value::String("pending".into())));
            defaults.push(("assigned_date", today));
        }
        Table::TestResults | Table::Insights => defaults.push(("date", today)),
        Table::Profiles | Table::UserRoles | Table::Patients | Table::Measurements => {}
    }
    defaults
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.take_failure(table)?;
        let rows = match self.tables.get(&table) {
            Some(rows) => query.evaluate(rows.iter()),
            None => Vec::new(),
        };
        tracing::trace!(%table, count = rows.len(), "select");
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut record: Row) -> Result<Row, StoreError> {
        self.take_failure(table)?;
        for (column, value) in column_defaults(table) {
            match record.get(column) {
                Some(Value::Null) | None => {
                    record.insert(column.to_string(), value);
                }
                Some(_) => {}
            }
        }
        self.tables.entry(table).or_default().push(record.clone());
        tracing::trace!(%table, "insert");
        Ok(record)
    }

    async fn update(&self, table: Table, patch: Row, filters: &[Filter]) -> Result<usize, StoreError> {
        self.take_failure(table)?;
        let mut updated = 0;
        if let Some(mut rows) = self.tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| filters.iter().all(|f| f.matches(r))) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                updated += 1;
            }
        }
        tracing::trace!(%table, updated, "update");
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, StoreError> {
        self.take_failure(table)?;
        let mut removed = 0;
        if let Some(mut rows) = self.tables.get_mut(&table) {
            let before = rows.len();
            rows.retain(|r| !filters.iter().all(|f| f.matches(r)));
            removed = before - rows.len();
        }
        tracing::trace!(%table, removed, "delete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{encode_row, RowStoreExt};
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test rows are objects"),
        }
    }

    #[tokio::test]
    async fn insert_fills_defaults() {
        let store = MemoryStore::new();
        let stored = store
            .insert(Table::AssignedExercises, row(json!({"title": "Recall words"})))
            .await
            .unwrap();

        assert!(stored.get("id").and_then(Value::as_str).is_some());
        assert_eq!(stored["status"], json!("pending"));
        assert!(stored.contains_key("assigned_date"));
        assert!(stored.contains_key("created_at"));
    }

    #[tokio::test]
    async fn insert_keeps_explicit_values() {
        let store = MemoryStore::new();
        let stored = store
            .insert(Table::TestResults, row(json!({"date": "2024-12-01", "score": 40})))
            .await
            .unwrap();
        assert_eq!(stored["date"], json!("2024-12-01"));
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let store = MemoryStore::new();
        store.insert(Table::Patients, row(json!({"risk_level": "low", "sex": "M"}))).await.unwrap();
        store.insert(Table::Patients, row(json!({"risk_level": "low", "sex": "F"}))).await.unwrap();

        let n = store
            .update(
                Table::Patients,
                row(json!({"risk_level": "high"})),
                &[Filter::eq("sex", "F")],
            )
            .await
            .unwrap();
        assert_eq!(n, 1);

        let high = store
            .select(Table::Patients, &Query::new().eq("risk_level", "high"))
            .await
            .unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0]["sex"], json!("F"));
    }

    #[tokio::test]
    async fn delete_removes_matching_rows() {
        let store = MemoryStore::new();
        store.insert(Table::Profiles, row(json!({"name": "Ada"}))).await.unwrap();
        store.insert(Table::Profiles, row(json!({"name": "Bea"}))).await.unwrap();

        let n = store.delete(Table::Profiles, &[Filter::eq("name", "Ada")]).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.row_count(Table::Profiles), 1);
        assert_eq!(store.delete(Table::Insights, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_failure_is_one_shot() {
        let store = MemoryStore::new();
        store.fail_next(Table::UserRoles, "timeout");

        let err = store.select(Table::UserRoles, &Query::new()).await.unwrap_err();
        assert!(err.is_backend());
        assert!(store.select(Table::UserRoles, &Query::new()).await.is_ok());
    }

    #[tokio::test]
    async fn maybe_single_returns_first_match() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }

        let store = MemoryStore::new();
        let record = encode_row(Table::Profiles, &json!({"name": "Ada"})).unwrap();
        store.insert(Table::Profiles, record).await.unwrap();

        let found: Option<Named> = store
            .maybe_single(Table::Profiles, Query::new().eq("name", "Ada"))
            .await
            .unwrap();
        assert_eq!(found.map(|n| n.name).as_deref(), Some("Ada"));

        let missing: Option<Named> = store
            .maybe_single(Table::Profiles, Query::new().eq("name", "Bob"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
