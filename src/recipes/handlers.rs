use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{debug, instrument, warn};

use super::{
    draft::RecipeDraft,
    dto::{FavoriteRequest, PreloadRequest, RecipeDetails, RecipeSearch, SyncResponse},
    matcher::{filter_by_query, ingredient_availability, IngredientStatus},
    repo_types::Recipe,
};
use crate::{
    cache::RecipeFilter,
    error::AppError,
    events::{live_events, EventStream},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/stream", get(stream_recipes))
        .route("/recipes/favorites", get(list_favorites))
        .route("/recipes/preloaded", get(list_preloaded))
        .route("/recipes/:id", get(get_recipe))
        .route("/recipes/:id/availability", get(recipe_availability))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route("/recipes/sync", post(sync_recipes))
        .route("/recipes/preload", post(preload_recipes))
        .route("/recipes/:id", put(update_recipe).delete(delete_recipe))
        .route("/recipes/:id/favorite", put(set_favorite))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(search): Query<RecipeSearch>,
) -> Result<Json<Vec<Recipe>>, AppError> {
    if state.recipes.refresh_once().is_some() {
        debug!("initial recipe sync started");
    }
    let filter = match search.ingredient.as_deref().map(str::trim) {
        Some(fragment) if !fragment.is_empty() => {
            RecipeFilter::IngredientContains(fragment.to_string())
        }
        _ => RecipeFilter::All,
    };
    let all = state.recipes.list(filter).await?;
    Ok(Json(filter_by_query(all, &search.q)))
}

pub async fn stream_recipes(State(state): State<AppState>) -> EventStream {
    state.recipes.refresh_once();
    live_events("recipes", state.recipes.recipes())
}

#[instrument(skip(state))]
pub async fn list_favorites(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.recipes.list(RecipeFilter::Favorites).await?))
}

#[instrument(skip(state))]
pub async fn list_preloaded(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.recipes.list(RecipeFilter::Preloaded).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecipeDetails>, AppError> {
    let recipe = state.recipes.get_by_id(&id).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(state))]
pub async fn recipe_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<IngredientStatus>>, AppError> {
    let recipe = state.recipes.get_by_id(&id).await?;
    let owned = state.fridge.names().await?;
    Ok(Json(ingredient_availability(&recipe, &owned)))
}

#[instrument(skip(state, draft), fields(title = %draft.title))]
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(draft): Json<RecipeDraft>,
) -> Result<(StatusCode, Json<Recipe>), AppError> {
    let author_id = state.accounts.current_user_id();
    let author_name = match state.accounts.current_user().await {
        Ok(profile) => profile.map(|p| p.username),
        Err(e) => {
            warn!(error = %e, "author profile unavailable");
            None
        }
    };
    let recipe = draft.into_recipe(author_id, author_name)?;
    let created = state.recipes.create(recipe).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, recipe))]
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut recipe): Json<Recipe>,
) -> Result<Json<Recipe>, AppError> {
    if recipe.title.trim().is_empty() {
        return Err(AppError::validation("recipe title is required"));
    }
    recipe.id = id;
    Ok(Json(state.recipes.update(recipe).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.recipes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn set_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<FavoriteRequest>,
) -> Result<StatusCode, AppError> {
    if state.recipes.toggle_favorite(&id, body.is_favorite).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("recipe {id}")))
    }
}

/// Runs one reconciliation pass and waits for it.
#[instrument(skip(state))]
pub async fn sync_recipes(State(state): State<AppState>) -> Result<Json<SyncResponse>, AppError> {
    let applied = state.recipes.refresh().finished().await?;
    Ok(Json(SyncResponse { applied }))
}

#[instrument(skip(state))]
pub async fn preload_recipes(
    State(state): State<AppState>,
    Json(body): Json<PreloadRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    if body.limit <= 0 {
        return Err(AppError::validation("limit must be positive"));
    }
    let applied = state.recipes.preload_popular(body.limit).await?;
    Ok(Json(SyncResponse { applied }))
}
