//! On-device record store for recipes and fridge items.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{error::CacheError, fridge::repo_types::FridgeItem, recipes::repo_types::Recipe};

pub mod sqlite;

pub use sqlite::SqliteCache;

/// A query that re-emits its result every time the underlying table changes.
/// The first item is the current state.
pub type LiveQuery<T> = BoxStream<'static, Result<T, CacheError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeFilter {
    All,
    Favorites,
    Preloaded,
    /// Ingredient text contains the fragment (ASCII case-insensitive).
    IngredientContains(String),
}

#[async_trait]
pub trait RecipeCache: Send + Sync {
    /// Atomic insert-or-replace by key. Concurrent upserts of one key from
    /// different sources are last-write-wins.
    async fn upsert_recipe(&self, recipe: &Recipe) -> Result<(), CacheError>;

    async fn get_recipe(&self, id: &str) -> Result<Option<Recipe>, CacheError>;

    async fn delete_recipe(&self, id: &str) -> Result<bool, CacheError>;

    async fn set_favorite(&self, id: &str, favorite: bool) -> Result<bool, CacheError>;

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, CacheError>;

    fn watch_recipes(&self, filter: RecipeFilter) -> LiveQuery<Vec<Recipe>>;
}

#[async_trait]
pub trait FridgeCache: Send + Sync {
    async fn add_item(&self, name: &str) -> Result<FridgeItem, CacheError>;

    async fn delete_item(&self, id: i64) -> Result<bool, CacheError>;

    async fn clear_items(&self) -> Result<u64, CacheError>;

    async fn list_items(&self) -> Result<Vec<FridgeItem>, CacheError>;

    fn watch_items(&self) -> LiveQuery<Vec<FridgeItem>>;
}
