use serde::{Deserialize, Serialize};

use super::repo_types::Recipe;

#[derive(Debug, Deserialize)]
pub struct RecipeSearch {
    #[serde(default)]
    pub q: String,
    /// Restricts to recipes whose ingredient text contains this fragment.
    #[serde(default)]
    pub ingredient: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct PreloadRequest {
    #[serde(default = "default_preload_limit")]
    pub limit: i64,
}

fn default_preload_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub applied: usize,
}

/// Recipe plus its text fields split for display.
#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredient_list: Vec<String>,
    pub steps: Vec<String>,
}

impl From<Recipe> for RecipeDetails {
    fn from(recipe: Recipe) -> Self {
        Self {
            ingredient_list: recipe.ingredient_tokens(),
            steps: recipe.instruction_steps(),
            recipe,
        }
    }
}
