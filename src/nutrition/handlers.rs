use axum::{routing::post, Json, Router};
use tracing::instrument;

use super::{
    dictionary::Dictionary,
    dto::{CalculateRequest, CalculateResponse},
    services::calculate,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/nutrition/calculate", post(calculate_nutrition))
}

#[instrument(skip(body), fields(count = body.ingredients.len()))]
pub async fn calculate_nutrition(Json(body): Json<CalculateRequest>) -> Json<CalculateResponse> {
    Json(calculate(&body.ingredients, &Dictionary).into())
}
