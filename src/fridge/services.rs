use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::repo_types::FridgeItem;
use crate::{
    cache::{FridgeCache, LiveQuery},
    error::AppError,
    nutrition::dictionary::Dictionary,
    recipes::repo_types::IngredientRow,
    remote::{select_as, select_one, Query, RemoteStore, Table},
};

const SUGGESTION_LIMIT: usize = 5;
const REMOTE_SEARCH_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct FridgeRepository {
    cache: Arc<dyn FridgeCache>,
    remote: Arc<dyn RemoteStore>,
}

impl FridgeRepository {
    pub fn new(cache: Arc<dyn FridgeCache>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { cache, remote }
    }

    pub fn items(&self) -> LiveQuery<Vec<FridgeItem>> {
        self.cache.watch_items()
    }

    pub async fn list(&self) -> Result<Vec<FridgeItem>, AppError> {
        Ok(self.cache.list_items().await?)
    }

    pub async fn names(&self) -> Result<Vec<String>, AppError> {
        Ok(self.list().await?.into_iter().map(|i| i.name).collect())
    }

    #[instrument(skip(self))]
    pub async fn add_product(&self, name: &str) -> Result<FridgeItem, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("product name cannot be empty"));
        }
        let item = self.cache.add_item(name).await?;
        info!(id = item.id, name = %item.name, "product added");
        Ok(item)
    }

    pub async fn delete_product(&self, id: i64) -> Result<bool, AppError> {
        let removed = self.cache.delete_item(id).await?;
        debug!(id, removed, "product deleted");
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<u64, AppError> {
        let n = self.cache.clear_items().await?;
        info!(removed = n, "fridge cleared");
        Ok(n)
    }

    /// Dictionary autocomplete for the add-product input.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        Dictionary.suggest(query, SUGGESTION_LIMIT)
    }

    #[instrument(skip(self))]
    pub async fn search_ingredients_remote(
        &self,
        query: &str,
    ) -> Result<Vec<IngredientRow>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<IngredientRow> = select_as(
            self.remote.as_ref(),
            Table::Ingredients,
            Query::new().ilike("name", query).limit(REMOTE_SEARCH_LIMIT),
        )
        .await?;
        debug!(found = rows.len(), "remote ingredient search");
        Ok(rows)
    }

    pub async fn get_ingredient(&self, id: &str) -> Result<IngredientRow, AppError> {
        Ok(select_one(self.remote.as_ref(), Table::Ingredients, Query::new().eq("id", id)).await?)
    }
}
