use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{Filter, Query, RemoteStore, Table};
use crate::error::RemoteError;

/// [`RemoteStore`] over a Postgres pool. Rows are produced with `to_jsonb`
/// and written through `jsonb_populate_record`, so the JSON field names are
/// exactly the column names.
#[derive(Clone)]
pub struct PgRemoteStore {
    db: PgPool,
}

impl PgRemoteStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

fn escape_like(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    table: Table,
    filters: &[Filter],
) -> Result<(), RemoteError> {
    for (i, filter) in filters.iter().enumerate() {
        let column = filter.column();
        table.check_column(column)?;
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::Eq(_, value) => {
                qb.push(format!("t.{column}::text = "));
                qb.push_bind(value.clone());
            }
            Filter::Ilike(_, fragment) => {
                qb.push(format!("t.{column}::text ILIKE "));
                qb.push_bind(format!("%{}%", escape_like(fragment)));
            }
            Filter::In(_, values) => {
                qb.push(format!("t.{column}::text = ANY("));
                qb.push_bind(values.clone());
                qb.push(")");
            }
        }
    }
    Ok(())
}

fn present_columns(
    table: Table,
    row: &Value,
    skip_managed: bool,
) -> Result<Vec<&'static str>, RemoteError> {
    let obj = row.as_object().ok_or(RemoteError::InvalidRow {
        table: table.name(),
        reason: "row is not a JSON object",
    })?;
    let cols: Vec<&'static str> = table
        .columns()
        .iter()
        .copied()
        .filter(|c| obj.contains_key(*c))
        .filter(|c| !(skip_managed && Table::is_managed(c)))
        .collect();
    if cols.is_empty() {
        return Err(RemoteError::InvalidRow {
            table: table.name(),
            reason: "row has no known columns",
        });
    }
    Ok(cols)
}

#[async_trait]
impl RemoteStore for PgRemoteStore {
    async fn select(&self, table: Table, query: Query) -> Result<Vec<Value>, RemoteError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT to_jsonb(t) AS row FROM {} AS t",
            table.name()
        ));
        push_filters(&mut qb, table, &query.filters)?;
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        let rows: Vec<(Value,)> = qb.build_query_as().fetch_all(&self.db).await?;
        debug!(table = table.name(), rows = rows.len(), "remote select");
        Ok(rows.into_iter().map(|(row,)| row).collect())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, RemoteError> {
        let list = present_columns(table, &row, false)?.join(", ");
        let name = table.name();

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {name} AS t ({list}) SELECT {list} FROM jsonb_populate_record(NULL::{name}, "
        ));
        qb.push_bind(row);
        qb.push(") RETURNING to_jsonb(t) AS row");

        let (stored,): (Value,) = qb.build_query_as().fetch_one(&self.db).await?;
        debug!(table = name, "remote insert");
        Ok(stored)
    }

    async fn update(
        &self,
        table: Table,
        row: Value,
        filters: Vec<Filter>,
    ) -> Result<u64, RemoteError> {
        let list = present_columns(table, &row, true)?.join(", ");
        let name = table.name();

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "UPDATE {name} AS t SET ({list}) = (SELECT {list} FROM jsonb_populate_record(NULL::{name}, "
        ));
        qb.push_bind(row);
        qb.push("))");
        push_filters(&mut qb, table, &filters)?;

        let done = qb.build().execute(&self.db).await?;
        debug!(table = name, rows = done.rows_affected(), "remote update");
        Ok(done.rows_affected())
    }

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> Result<u64, RemoteError> {
        if filters.is_empty() {
            return Err(RemoteError::InvalidRow {
                table: table.name(),
                reason: "delete without a filter",
            });
        }
        let mut qb = QueryBuilder::<Postgres>::new(format!("DELETE FROM {} AS t", table.name()));
        push_filters(&mut qb, table, &filters)?;

        let done = qb.build().execute(&self.db).await?;
        debug!(table = table.name(), rows = done.rows_affected(), "remote delete");
        Ok(done.rows_affected())
    }
}
