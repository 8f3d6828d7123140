use serde::{Deserialize, Serialize};

use crate::recipes::repo_types::Recipe;

#[derive(Debug, Deserialize)]
pub struct AddProductRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: u64,
}

/// Recipes ranked against the fridge contents.
#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub ingredients: Vec<String>,
    pub recipes: Vec<Recipe>,
}
