use serde::{Deserialize, Serialize};

use super::{dictionary::Macros, services::{IngredientInput, NutritionFacts}};

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

/// Display labels plus the raw per-100g numbers.
#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub calories: String,
    pub proteins: String,
    pub fats: String,
    pub carbs: String,
    pub weight: f64,
    pub per_100g: Macros,
}

impl From<NutritionFacts> for CalculateResponse {
    fn from(facts: NutritionFacts) -> Self {
        Self {
            calories: facts.calories_label(),
            proteins: facts.proteins_label(),
            fats: facts.fats_label(),
            carbs: facts.carbs_label(),
            weight: facts.weight,
            per_100g: facts.per_100g,
        }
    }
}
