use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, error, info, instrument, warn};

use super::{
    repo_types::{Recipe, RecipeRow},
    seed,
};
use crate::{
    cache::{LiveQuery, RecipeCache, RecipeFilter},
    error::{AppError, RemoteError},
    remote::{select_as, select_one, Filter, Query, RemoteStore, Table},
    sync::SyncHandle,
};

/// Cache-first access to recipes with best-effort write-through to the
/// remote store. The cache is the source of truth for the caller: remote
/// failures on writes and on refetches of cached records are logged, never
/// returned.
#[derive(Clone)]
pub struct RecipeRepository {
    cache: Arc<dyn RecipeCache>,
    remote: Arc<dyn RemoteStore>,
    refreshed: Arc<AtomicBool>,
}

impl RecipeRepository {
    pub fn new(cache: Arc<dyn RecipeCache>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            cache,
            remote,
            refreshed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    pub fn recipes(&self) -> LiveQuery<Vec<Recipe>> {
        self.cache.watch_recipes(RecipeFilter::All)
    }

    pub fn favorite_recipes(&self) -> LiveQuery<Vec<Recipe>> {
        self.cache.watch_recipes(RecipeFilter::Favorites)
    }

    pub fn preloaded_recipes(&self) -> LiveQuery<Vec<Recipe>> {
        self.cache.watch_recipes(RecipeFilter::Preloaded)
    }

    pub async fn list(&self, filter: RecipeFilter) -> Result<Vec<Recipe>, AppError> {
        Ok(self.cache.list_recipes(&filter).await?)
    }

    /// Starts one reconciliation pass in the background.
    pub fn refresh(&self) -> SyncHandle {
        let this = self.clone();
        SyncHandle::spawn(async move {
            let result = this.sync_from_remote().await;
            if let Err(e) = &result {
                warn!(error = %e, "background recipe sync failed");
            }
            result
        })
    }

    /// Like [`refresh`](Self::refresh), but only the first call on this
    /// repository starts a pass.
    pub fn refresh_once(&self) -> Option<SyncHandle> {
        if self.refreshed.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.refresh())
    }

    /// Pulls every cached, remote-backed recipe and overwrites the cached copy.
    /// Recipes under the local-only marker are left alone.
    #[instrument(skip(self))]
    pub async fn sync_from_remote(&self) -> Result<usize, AppError> {
        let ids: Vec<String> = self
            .cache
            .list_recipes(&RecipeFilter::All)
            .await?
            .into_iter()
            .filter(|r| !r.is_local_only())
            .map(|r| r.id)
            .collect();

        if ids.is_empty() {
            debug!("no remote-backed recipes to sync");
            return Ok(0);
        }

        info!(count = ids.len(), "syncing recipes from remote");
        let rows: Vec<RecipeRow> =
            select_as(self.remote(), Table::Recipes, Query::new().is_in("id", ids)).await?;
        let applied = self.apply_remote_batch(rows).await?;
        info!(applied, "recipe sync completed");
        Ok(applied)
    }

    /// Overwrites cached recipes with remote rows in the given order, keeping
    /// each record's favorite and preloaded flags. Applying the same batch
    /// twice leaves the cache as applying it once.
    pub async fn apply_remote_batch(&self, rows: Vec<RecipeRow>) -> Result<usize, AppError> {
        self.apply_rows(rows, false).await
    }

    async fn apply_rows(
        &self,
        rows: Vec<RecipeRow>,
        mark_preloaded: bool,
    ) -> Result<usize, AppError> {
        let mut applied = 0;
        for row in rows {
            let (favorite, preloaded) = self
                .cache
                .get_recipe(&row.id)
                .await?
                .map(|r| (r.is_favorite, r.is_preloaded))
                .unwrap_or_default();
            let recipe = row.into_recipe(favorite, preloaded || mark_preloaded);
            self.cache.upsert_recipe(&recipe).await?;
            applied += 1;
        }
        Ok(applied)
    }

    async fn fetch_remote(&self, id: &str) -> Result<RecipeRow, RemoteError> {
        select_one(self.remote(), Table::Recipes, Query::new().eq("id", id)).await
    }

    /// Cached copy refreshed from the remote when possible; the remote is
    /// mandatory only when nothing is cached.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<Recipe, AppError> {
        match self.cache.get_recipe(id).await? {
            Some(cached) => match self.fetch_remote(id).await {
                Ok(row) => {
                    let fresh = row.into_recipe(cached.is_favorite, cached.is_preloaded);
                    self.cache.upsert_recipe(&fresh).await?;
                    Ok(fresh)
                }
                Err(e) => {
                    warn!(error = %e, %id, "remote refetch failed, returning cached recipe");
                    Ok(cached)
                }
            },
            None => {
                let row = self.fetch_remote(id).await.map_err(|e| {
                    error!(error = %e, %id, "recipe not cached and remote fetch failed");
                    e
                })?;
                let recipe = row.into_recipe(false, false);
                self.cache.upsert_recipe(&recipe).await?;
                Ok(recipe)
            }
        }
    }

    /// Saves locally, then pushes. On a successful push the local record is
    /// replaced by the server's copy under the server-assigned key.
    #[instrument(skip(self, recipe), fields(id = %recipe.id))]
    pub async fn create(&self, recipe: Recipe) -> Result<Recipe, AppError> {
        self.cache.upsert_recipe(&recipe).await?;
        debug!("recipe saved locally");

        let mut payload =
            serde_json::to_value(RecipeRow::from(&recipe)).map_err(RemoteError::from)?;
        if recipe.is_local_only() {
            if let Some(obj) = payload.as_object_mut() {
                obj.remove("id");
            }
        }

        let pushed = match self.remote.insert(Table::Recipes, payload).await {
            Ok(stored) => serde_json::from_value::<RecipeRow>(stored).map_err(RemoteError::from),
            Err(e) => Err(e),
        };

        match pushed {
            Ok(row) => {
                let canonical = row.into_recipe(recipe.is_favorite, recipe.is_preloaded);
                self.cache.upsert_recipe(&canonical).await?;
                if canonical.id != recipe.id {
                    if let Err(e) = self.cache.delete_recipe(&recipe.id).await {
                        warn!(error = %e, local_id = %recipe.id, "local copy not removed");
                    }
                }
                info!(remote_id = %canonical.id, "recipe pushed to remote");
                Ok(canonical)
            }
            Err(e) => {
                warn!(error = %e, "remote insert failed, keeping local copy");
                Ok(recipe)
            }
        }
    }

    #[instrument(skip(self, recipe), fields(id = %recipe.id))]
    pub async fn update(&self, recipe: Recipe) -> Result<Recipe, AppError> {
        self.cache.upsert_recipe(&recipe).await?;

        let payload = serde_json::to_value(RecipeRow::from(&recipe)).map_err(RemoteError::from)?;
        match self
            .remote
            .update(Table::Recipes, payload, vec![Filter::Eq("id", recipe.id.clone())])
            .await
        {
            Ok(rows) => debug!(rows, "recipe update pushed"),
            Err(e) => warn!(error = %e, "remote update failed"),
        }
        Ok(recipe)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let removed = self.cache.delete_recipe(id).await?;
        debug!(removed, "recipe deleted locally");

        match self
            .remote
            .delete(Table::Recipes, vec![Filter::Eq("id", id.to_string())])
            .await
        {
            Ok(rows) => debug!(rows, "recipe delete pushed"),
            Err(e) => warn!(error = %e, "remote delete failed"),
        }
        Ok(())
    }

    /// Device-only flag; never sent to the remote. Returns whether the recipe exists.
    pub async fn toggle_favorite(&self, id: &str, favorite: bool) -> Result<bool, AppError> {
        let found = self.cache.set_favorite(id, favorite).await?;
        debug!(%id, favorite, found, "favorite updated");
        Ok(found)
    }

    /// Caches up to `limit` remote recipes flagged as preloaded.
    pub async fn preload_popular(&self, limit: i64) -> Result<usize, AppError> {
        let rows: Vec<RecipeRow> =
            select_as(self.remote(), Table::Recipes, Query::new().limit(limit)).await?;
        let applied = self.apply_rows(rows, true).await?;
        info!(applied, "preloaded popular recipes");
        Ok(applied)
    }

    /// Seeds the bundled default recipes.
    pub async fn load_default_recipes(&self) -> Result<usize, AppError> {
        let defaults = seed::default_recipes();
        for recipe in &defaults {
            self.cache.upsert_recipe(recipe).await?;
        }
        info!(count = defaults.len(), "default recipes loaded");
        Ok(defaults.len())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::StreamExt;
    use serde_json::json;

    use super::*;
    use crate::{
        cache::SqliteCache,
        error::CacheError,
        remote::{memory::MemoryRemote, MockRemoteStore},
    };

    /// SQLite cache whose deletes always fail.
    struct StuckDeletes(SqliteCache);

    #[async_trait]
    impl RecipeCache for StuckDeletes {
        async fn upsert_recipe(&self, recipe: &Recipe) -> Result<(), CacheError> {
            self.0.upsert_recipe(recipe).await
        }

        async fn get_recipe(&self, id: &str) -> Result<Option<Recipe>, CacheError> {
            self.0.get_recipe(id).await
        }

        async fn delete_recipe(&self, _id: &str) -> Result<bool, CacheError> {
            Err(CacheError::Query(sqlx::Error::PoolClosed))
        }

        async fn set_favorite(&self, id: &str, favorite: bool) -> Result<bool, CacheError> {
            self.0.set_favorite(id, favorite).await
        }

        async fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>, CacheError> {
            self.0.list_recipes(filter).await
        }

        fn watch_recipes(&self, filter: RecipeFilter) -> LiveQuery<Vec<Recipe>> {
            self.0.watch_recipes(filter)
        }
    }

    async fn setup() -> (RecipeRepository, Arc<SqliteCache>, Arc<MemoryRemote>) {
        let cache = Arc::new(SqliteCache::in_memory().await.unwrap());
        let remote = Arc::new(MemoryRemote::new());
        let repo = RecipeRepository::new(cache.clone(), remote.clone());
        (repo, cache, remote)
    }

    fn remote_row(id: &str, title: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "ingredients": "milk: 200g, egg",
            "total_calories": 300.0,
            "total_proteins": 20.0,
            "total_fats": 10.0,
            "total_carbs": 30.0,
            "total_weight": 200.0,
        })
    }

    fn cached(id: &str, title: &str) -> Recipe {
        let mut r = Recipe::new_local(title);
        r.id = id.to_string();
        r
    }

    #[tokio::test]
    async fn get_by_id_fetches_when_not_cached() {
        let (repo, cache, remote) = setup().await;
        remote.seed(Table::Recipes, remote_row("r1", "Omelette"));

        let recipe = repo.get_by_id("r1").await.unwrap();
        assert_eq!(recipe.title, "Omelette");
        assert_eq!(recipe.calories, 150.0);
        assert!(cache.get_recipe("r1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn get_by_id_without_cache_propagates_remote_failure() {
        let (repo, _cache, remote) = setup().await;
        remote.seed(Table::Recipes, remote_row("r1", "Omelette"));
        remote.set_offline(true);

        assert!(matches!(repo.get_by_id("r1").await, Err(AppError::Remote(_))));
        remote.set_offline(false);
        assert!(matches!(
            repo.get_by_id("missing").await,
            Err(AppError::Remote(RemoteError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn get_by_id_falls_back_to_stale_copy() {
        let (repo, cache, remote) = setup().await;
        cache.upsert_recipe(&cached("r1", "Old title")).await.unwrap();
        remote.seed(Table::Recipes, remote_row("r1", "New title"));
        remote.set_offline(true);

        let recipe = repo.get_by_id("r1").await.unwrap();
        assert_eq!(recipe.title, "Old title");
    }

    #[tokio::test]
    async fn get_by_id_refreshes_cached_copy_and_keeps_flags() {
        let (repo, cache, remote) = setup().await;
        let mut old = cached("r1", "Old title");
        old.is_favorite = true;
        cache.upsert_recipe(&old).await.unwrap();
        remote.seed(Table::Recipes, remote_row("r1", "New title"));

        let recipe = repo.get_by_id("r1").await.unwrap();
        assert_eq!(recipe.title, "New title");
        assert!(recipe.is_favorite);
        assert_eq!(cache.get_recipe("r1").await.unwrap(), Some(recipe));
    }

    #[tokio::test]
    async fn create_with_failing_remote_keeps_local_key() {
        let (repo, cache, remote) = setup().await;
        remote.set_offline(true);
        let recipe = Recipe::new_local("Borscht");

        let created = repo.create(recipe.clone()).await.unwrap();
        assert_eq!(created.id, recipe.id);
        assert!(created.is_local_only());
        assert!(cache.get_recipe(&recipe.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_reports_server_copy_even_if_local_cleanup_fails() {
        let cache = Arc::new(StuckDeletes(SqliteCache::in_memory().await.unwrap()));
        let remote = Arc::new(MemoryRemote::new());
        let repo = RecipeRepository::new(cache.clone(), remote.clone());
        let recipe = Recipe::new_local("Borscht");

        let created = repo.create(recipe.clone()).await.unwrap();
        assert!(!created.is_local_only());
        assert_eq!(remote.rows(Table::Recipes).len(), 1);
        assert!(cache.get_recipe(&created.id).await.unwrap().is_some());
        assert!(cache.get_recipe(&recipe.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn create_replaces_local_record_with_server_copy() {
        let (repo, cache, remote) = setup().await;
        let mut recipe = Recipe::new_local("Borscht");
        recipe.is_favorite = true;
        recipe.calories = 50.0;
        recipe.weight = 1000.0;

        let created = repo.create(recipe.clone()).await.unwrap();
        assert!(!created.is_local_only());
        assert!(created.is_favorite);
        assert_eq!(created.calories, 50.0);
        assert!(cache.get_recipe(&recipe.id).await.unwrap().is_none());
        assert!(cache.get_recipe(&created.id).await.unwrap().is_some());

        let stored = remote.rows(Table::Recipes);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["total_calories"], json!(500.0));
    }

    #[tokio::test]
    async fn update_and_delete_swallow_remote_failures() {
        let (repo, cache, remote) = setup().await;
        let mut recipe = cached("r1", "Soup");
        cache.upsert_recipe(&recipe).await.unwrap();
        remote.set_offline(true);

        recipe.title = "Better soup".into();
        let updated = repo.update(recipe.clone()).await.unwrap();
        assert_eq!(updated.title, "Better soup");
        assert_eq!(cache.get_recipe("r1").await.unwrap().unwrap().title, "Better soup");

        repo.delete("r1").await.unwrap();
        assert!(cache.get_recipe("r1").await.unwrap().is_none());
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_reach_the_remote() {
        let (repo, _cache, remote) = setup().await;
        remote.seed(Table::Recipes, remote_row("r1", "Soup"));
        let mut recipe = cached("r1", "Soup v2");
        recipe.weight = 100.0;
        recipe.calories = 80.0;

        repo.update(recipe).await.unwrap();
        assert_eq!(remote.rows(Table::Recipes)[0]["title"], json!("Soup v2"));
        repo.delete("r1").await.unwrap();
        assert!(remote.rows(Table::Recipes).is_empty());
    }

    #[tokio::test]
    async fn toggle_favorite_never_touches_the_remote() {
        let cache = Arc::new(SqliteCache::in_memory().await.unwrap());
        // No expectations: any remote call would panic.
        let repo = RecipeRepository::new(cache.clone(), Arc::new(MockRemoteStore::new()));
        cache.upsert_recipe(&cached("r1", "Soup")).await.unwrap();

        assert!(repo.toggle_favorite("r1", true).await.unwrap());
        assert!(!repo.toggle_favorite("nope", true).await.unwrap());
        let favs = repo.list(RecipeFilter::Favorites).await.unwrap();
        assert_eq!(favs.len(), 1);
    }

    #[tokio::test]
    async fn sync_skips_when_only_local_recipes_exist() {
        let (repo, cache, remote) = setup().await;
        cache.upsert_recipe(&Recipe::new_local("Mine")).await.unwrap();

        assert_eq!(repo.sync_from_remote().await.unwrap(), 0);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn sync_overwrites_remote_backed_recipes() {
        let (repo, cache, remote) = setup().await;
        let mut stale = cached("r1", "Stale");
        stale.is_preloaded = true;
        stale.is_favorite = true;
        cache.upsert_recipe(&stale).await.unwrap();
        cache.upsert_recipe(&Recipe::new_local("Mine")).await.unwrap();
        remote.seed(Table::Recipes, remote_row("r1", "Fresh"));
        remote.seed(Table::Recipes, remote_row("r2", "Not cached"));

        assert_eq!(repo.sync_from_remote().await.unwrap(), 1);
        let r1 = cache.get_recipe("r1").await.unwrap().unwrap();
        assert_eq!(r1.title, "Fresh");
        assert!(r1.is_favorite && r1.is_preloaded);
        assert!(cache.get_recipe("r2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn applying_a_batch_twice_is_idempotent() {
        let (repo, cache, _remote) = setup().await;
        let mut fav = cached("r1", "Old");
        fav.is_favorite = true;
        cache.upsert_recipe(&fav).await.unwrap();

        let batch: Vec<RecipeRow> = vec![
            serde_json::from_value(remote_row("r1", "New")).unwrap(),
            serde_json::from_value(remote_row("r2", "Other")).unwrap(),
        ];
        repo.apply_remote_batch(batch.clone()).await.unwrap();
        let once = repo.list(RecipeFilter::All).await.unwrap();
        repo.apply_remote_batch(batch).await.unwrap();
        let twice = repo.list(RecipeFilter::All).await.unwrap();

        assert_eq!(once, twice);
        assert!(twice.iter().find(|r| r.id == "r1").unwrap().is_favorite);
    }

    #[tokio::test]
    async fn refresh_once_only_starts_one_pass() {
        let (repo, cache, remote) = setup().await;
        cache.upsert_recipe(&cached("r1", "Stale")).await.unwrap();
        remote.seed(Table::Recipes, remote_row("r1", "Fresh"));

        let handle = repo.refresh_once().expect("first call starts a pass");
        assert_eq!(handle.finished().await.unwrap(), 1);
        assert!(repo.refresh_once().is_none());

        let mut live = repo.recipes();
        let first = live.next().await.unwrap().unwrap();
        assert_eq!(first[0].title, "Fresh");
    }

    #[tokio::test]
    async fn failed_refresh_reports_through_the_handle() {
        let (repo, cache, remote) = setup().await;
        cache.upsert_recipe(&cached("r1", "Stale")).await.unwrap();
        remote.set_offline(true);

        assert!(repo.refresh().finished().await.is_err());
        assert_eq!(cache.get_recipe("r1").await.unwrap().unwrap().title, "Stale");
    }

    #[tokio::test]
    async fn preload_marks_recipes() {
        let (repo, _cache, remote) = setup().await;
        remote.seed(Table::Recipes, remote_row("r1", "A"));
        remote.seed(Table::Recipes, remote_row("r2", "B"));
        remote.seed(Table::Recipes, remote_row("r3", "C"));

        assert_eq!(repo.preload_popular(2).await.unwrap(), 2);
        let pre = repo.list(RecipeFilter::Preloaded).await.unwrap();
        assert_eq!(pre.len(), 2);
    }

    #[tokio::test]
    async fn default_recipes_are_local_and_preloaded() {
        let (repo, _cache, _remote) = setup().await;
        let n = repo.load_default_recipes().await.unwrap();
        let pre = repo.list(RecipeFilter::Preloaded).await.unwrap();
        assert_eq!(pre.len(), n);
        assert!(pre.iter().all(|r| r.is_local_only()));
    }
}
