//! In-process [`RemoteStore`] used by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{Filter, Query, RemoteStore, Table};
use crate::error::RemoteError;

#[derive(Default)]
pub struct MemoryRemote {
    tables: Mutex<HashMap<Table, Vec<Map<String, Value>>>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).map(as_text).unwrap_or_default();
    match filter {
        Filter::Eq(_, v) => &cell == v,
        Filter::Ilike(_, frag) => cell.to_lowercase().contains(&frag.to_lowercase()),
        Filter::In(_, vs) => vs.contains(&cell),
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails with a transport-like error while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seed(&self, table: Table, row: Value) {
        if let Value::Object(obj) = row {
            self.tables.lock().unwrap().entry(table).or_default().push(obj);
        }
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(&table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn enter(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("network unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select(&self, table: Table, query: Query) -> Result<Vec<Value>, RemoteError> {
        self.enter()?;
        let tables = self.tables.lock().unwrap();
        let rows = tables.get(&table).map(Vec::as_slice).unwrap_or_default();
        let limit = query.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        Ok(rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .take(limit)
            .cloned()
            .map(Value::Object)
            .collect())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, RemoteError> {
        self.enter()?;
        let Value::Object(mut obj) = row else {
            return Err(RemoteError::InvalidRow {
                table: table.name(),
                reason: "row is not a JSON object",
            });
        };
        obj.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        if table.columns().contains(&"created_at") {
            obj.entry("created_at")
                .or_insert_with(|| Value::String("2024-01-01T00:00:00+00:00".into()));
        }
        self.tables
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push(obj.clone());
        Ok(Value::Object(obj))
    }

    async fn update(
        &self,
        table: Table,
        row: Value,
        filters: Vec<Filter>,
    ) -> Result<u64, RemoteError> {
        self.enter()?;
        let Value::Object(patch) = row else {
            return Err(RemoteError::InvalidRow {
                table: table.name(),
                reason: "row is not a JSON object",
            });
        };
        let mut tables = self.tables.lock().unwrap();
        let mut n = 0;
        for existing in tables.entry(table).or_default().iter_mut() {
            if filters.iter().all(|f| matches(existing, f)) {
                for (k, v) in patch.iter().filter(|(k, _)| !Table::is_managed(k)) {
                    existing.insert(k.clone(), v.clone());
                }
                n += 1;
            }
        }
        Ok(n)
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> Result<u64, RemoteError> {
        self.enter()?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !filters.iter().all(|f| matches(row, f)));
        Ok((before - rows.len()) as u64)
    }
}
