use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use futures::StreamExt;
use tracing::instrument;

use super::{
    dto::{AddProductRequest, ClearedResponse, IngredientQuery, MatchesResponse},
    repo_types::FridgeItem,
};
use crate::{
    error::AppError,
    events::{live_events, EventStream},
    recipes::repo_types::IngredientRow,
    state::AppState,
};

pub fn fridge_routes() -> Router<AppState> {
    Router::new()
        .route("/fridge", get(list_items).post(add_item).delete(clear_items))
        .route("/fridge/stream", get(stream_items))
        .route("/fridge/matches", get(fridge_matches))
        .route("/fridge/matches/stream", get(stream_matches))
        .route("/fridge/:id", delete(delete_item))
}

pub fn ingredient_routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients/suggest", get(suggest_ingredients))
        .route("/ingredients/search", get(search_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

#[instrument(skip(state))]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<FridgeItem>>, AppError> {
    Ok(Json(state.fridge.list().await?))
}

pub async fn stream_items(State(state): State<AppState>) -> EventStream {
    live_events("fridge", state.fridge.items())
}

#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    Json(body): Json<AddProductRequest>,
) -> Result<(StatusCode, Json<FridgeItem>), AppError> {
    let item = state.fridge.add_product(&body.name).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if state.fridge.delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("fridge item {id}")))
    }
}

#[instrument(skip(state))]
pub async fn clear_items(State(state): State<AppState>) -> Result<Json<ClearedResponse>, AppError> {
    let removed = state.fridge.clear().await?;
    Ok(Json(ClearedResponse { removed }))
}

/// Answers with the ranked cache view. The remote lookup keeps running in
/// the background and shows up on the next request or on the stream.
#[instrument(skip(state))]
pub async fn fridge_matches(
    State(state): State<AppState>,
) -> Result<Json<MatchesResponse>, AppError> {
    let ingredients = state.fridge.names().await?;
    if ingredients.is_empty() {
        return Err(AppError::validation("add products to the fridge first"));
    }

    let mut search = state.matcher.search_by_ingredient(&ingredients);
    let recipes = match search.results.next().await {
        Some(batch) => batch?,
        None => Vec::new(),
    };
    Ok(Json(MatchesResponse {
        ingredients,
        recipes,
    }))
}

pub async fn stream_matches(State(state): State<AppState>) -> Result<EventStream, AppError> {
    let ingredients = state.fridge.names().await?;
    let search = state.matcher.search_by_ingredient(&ingredients);
    Ok(live_events("matches", search.results))
}

pub async fn suggest_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Json<Vec<String>> {
    Json(state.fridge.suggest(&query.q))
}

#[instrument(skip(state))]
pub async fn search_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<IngredientRow>>, AppError> {
    Ok(Json(state.fridge.search_ingredients_remote(&query.q).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IngredientRow>, AppError> {
    Ok(Json(state.fridge.get_ingredient(&id).await?))
}
