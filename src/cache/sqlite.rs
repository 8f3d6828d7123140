use std::{future::Future, str::FromStr, sync::Arc};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tokio::sync::watch;
use tracing::{debug, info};

use super::{FridgeCache, LiveQuery, RecipeCache, RecipeFilter};
use crate::{error::CacheError, fridge::repo_types::FridgeItem, recipes::repo_types::Recipe};

const RECIPE_COLUMNS: &str = "id, title, description, image_url, author_id, author_name, \
     ingredients, calories, proteins, fats, carbs, weight, is_favorite, is_preloaded";

/// SQLite-backed cache. Every write bumps a change counter that drives the
/// live queries.
#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
    fresh: bool,
}

impl SqliteCache {
    pub async fn open(url: &str) -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Private database that lives as long as the returned cache.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CacheError> {
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'local_recipes'",
        )
        .fetch_one(&pool)
        .await?;

        sqlx::migrate!("./migrations/cache").run(&pool).await?;

        let fresh = existing == 0;
        if fresh {
            info!("local cache created");
        }
        let (changes, _) = watch::channel(0u64);
        Ok(Self {
            pool,
            changes: Arc::new(changes),
            fresh,
        })
    }

    /// True when this open created the schema (first run).
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    fn notify(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn live<T, F, Fut>(&self, load: F) -> LiveQuery<T>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CacheError>> + Send + 'static,
    {
        let rx = self.changes.subscribe();
        stream::unfold((rx, load, true), |(mut rx, load, first)| async move {
            if first {
                rx.borrow_and_update();
            } else if rx.changed().await.is_err() {
                return None;
            }
            let item = load().await;
            Some((item, (rx, load, false)))
        })
        .boxed()
    }
}

fn escape_like(fragment: &str) -> String {
    fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl RecipeCache for SqliteCache {
    async fn upsert_recipe(&self, r: &Recipe) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO local_recipes (id, title, description, image_url, author_id, author_name,
                                       ingredients, calories, proteins, fats, carbs, weight,
                                       is_favorite, is_preloaded)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                image_url = excluded.image_url,
                author_id = excluded.author_id,
                author_name = excluded.author_name,
                ingredients = excluded.ingredients,
                calories = excluded.calories,
                proteins = excluded.proteins,
                fats = excluded.fats,
                carbs = excluded.carbs,
                weight = excluded.weight,
                is_favorite = excluded.is_favorite,
                is_preloaded = excluded.is_preloaded
            "#,
        )
        .bind(&r.id)
        .bind(&r.title)
        .bind(&r.description)
        .bind(&r.image_url)
        .bind(&r.author_id)
        .bind(&r.author_name)
        .bind(&r.ingredients)
        .bind(r.calories)
        .bind(r.proteins)
        .bind(r.fats)
        .bind(r.carbs)
        .bind(r.weight)
        .bind(r.is_favorite)
        .bind(r.is_preloaded)
        .execute(&self.pool)
        .await?;
        debug!(id = %r.id, "recipe cached");
        self.notify();
        Ok(())
    }

    async fn get_recipe(&self, id: &str) -> Result<Option<Recipe>, CacheError> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM local_recipes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: &str) -> Result<bool, CacheError> {
        let done = sqlx::query("DELETE FROM local_recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.notify();
        Ok(done.rows_affected() > 0)
    }

    async fn set_favorite(&self, id: &str, favorite: bool) -> Result<bool, CacheError> {
        let done = sqlx::query("UPDATE local_recipes SET is_favorite = ? WHERE id = ?")
            .bind(favorite)
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.notify();
        Ok(done.rows_affected() > 0)
    }

    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, CacheError> {
        let base = format!("SELECT {RECIPE_COLUMNS} FROM local_recipes");
        let rows = match filter {
            RecipeFilter::All => {
                sqlx::query_as::<_, Recipe>(&format!("{base} ORDER BY rowid"))
                    .fetch_all(&self.pool)
                    .await?
            }
            RecipeFilter::Favorites => {
                sqlx::query_as::<_, Recipe>(&format!("{base} WHERE is_favorite = 1 ORDER BY rowid"))
                    .fetch_all(&self.pool)
                    .await?
            }
            RecipeFilter::Preloaded => {
                sqlx::query_as::<_, Recipe>(&format!(
                    "{base} WHERE is_preloaded = 1 ORDER BY rowid"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            RecipeFilter::IngredientContains(fragment) => {
                sqlx::query_as::<_, Recipe>(&format!(
                    "{base} WHERE ingredients LIKE '%' || ? || '%' ESCAPE '\\' ORDER BY rowid"
                ))
                .bind(escape_like(fragment.trim()))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    fn watch_recipes(&self, filter: RecipeFilter) -> LiveQuery<Vec<Recipe>> {
        let cache = self.clone();
        self.live(move || {
            let cache = cache.clone();
            let filter = filter.clone();
            async move { cache.list_recipes(&filter).await }
        })
    }
}

#[async_trait]
impl FridgeCache for SqliteCache {
    async fn add_item(&self, name: &str) -> Result<FridgeItem, CacheError> {
        let item = sqlx::query_as::<_, FridgeItem>(
            "INSERT INTO fridge_items (name) VALUES (?) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        self.notify();
        Ok(item)
    }

    async fn delete_item(&self, id: i64) -> Result<bool, CacheError> {
        let done = sqlx::query("DELETE FROM fridge_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.notify();
        Ok(done.rows_affected() > 0)
    }

    async fn clear_items(&self) -> Result<u64, CacheError> {
        let done = sqlx::query("DELETE FROM fridge_items")
            .execute(&self.pool)
            .await?;
        self.notify();
        Ok(done.rows_affected())
    }

    async fn list_items(&self) -> Result<Vec<FridgeItem>, CacheError> {
        let items = sqlx::query_as::<_, FridgeItem>("SELECT id, name FROM fridge_items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    fn watch_items(&self) -> LiveQuery<Vec<FridgeItem>> {
        let cache = self.clone();
        self.live(move || {
            let cache = cache.clone();
            async move { cache.list_items().await }
        })
    }
}
