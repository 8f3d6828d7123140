//! Table-scoped access to the remote Postgres backend.
//!
//! Records travel as JSON objects whose keys are the table's column names.
//! Callers only ever name columns through [`Table`] and `&'static str`
//! filters, so identifiers never come from user input.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgRemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Recipes,
    Ingredients,
    RecipeIngredients,
    Profiles,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Recipes => "recipes",
            Table::Ingredients => "ingredients",
            Table::RecipeIngredients => "recipe_ingredients",
            Table::Profiles => "profiles",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Recipes => &[
                "id",
                "title",
                "description",
                "image_url",
                "author_id",
                "author_name",
                "ingredients",
                "total_calories",
                "total_proteins",
                "total_fats",
                "total_carbs",
                "total_weight",
                "created_at",
            ],
            Table::Ingredients => &["id", "name", "calories", "proteins", "fats", "carbs"],
            Table::RecipeIngredients => &["id", "recipe_id", "ingredient_id", "amount_grams"],
            Table::Profiles => &["id", "username", "bio", "avatar_url", "created_at"],
        }
    }

    /// Columns the server owns; never written by an update.
    pub fn is_managed(column: &str) -> bool {
        matches!(column, "id" | "created_at")
    }

    pub fn check_column(self, column: &str) -> Result<(), RemoteError> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            Err(RemoteError::UnknownColumn {
                table: self.name(),
                column: column.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Exact match on the column's text form.
    Eq(&'static str, String),
    /// Case-insensitive substring match.
    Ilike(&'static str, String),
    /// Set membership on the column's text form.
    In(&'static str, Vec<String>),
}

impl Filter {
    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(c, _) | Filter::Ilike(c, _) | Filter::In(c, _) => c,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq(column, value.into()));
        self
    }

    pub fn ilike(mut self, column: &'static str, fragment: impl Into<String>) -> Self {
        self.filters.push(Filter::Ilike(column, fragment.into()));
        self
    }

    pub fn is_in(mut self, column: &'static str, values: Vec<String>) -> Self {
        self.filters.push(Filter::In(column, values));
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn select(&self, table: Table, query: Query) -> Result<Vec<Value>, RemoteError>;

    /// Inserts the row and returns the stored copy, server defaults applied.
    async fn insert(&self, table: Table, row: Value) -> Result<Value, RemoteError>;

    async fn update(&self, table: Table, row: Value, filters: Vec<Filter>)
        -> Result<u64, RemoteError>;

    async fn delete(&self, table: Table, filters: Vec<Filter>) -> Result<u64, RemoteError>;
}

pub async fn select_as<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    table: Table,
    query: Query,
) -> Result<Vec<T>, RemoteError> {
    store
        .select(table, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(RemoteError::from))
        .collect()
}

/// First matching row, or [`RemoteError::NotFound`].
pub async fn select_one<T: DeserializeOwned>(
    store: &dyn RemoteStore,
    table: Table,
    query: Query,
) -> Result<T, RemoteError> {
    select_as::<T>(store, table, query.limit(1))
        .await?
        .into_iter()
        .next()
        .ok_or(RemoteError::NotFound { table: table.name() })
}

pub async fn insert_as<T: Serialize, R: DeserializeOwned>(
    store: &dyn RemoteStore,
    table: Table,
    row: &T,
) -> Result<R, RemoteError> {
    let stored = store.insert(table, serde_json::to_value(row)?).await?;
    Ok(serde_json::from_value(stored)?)
}
