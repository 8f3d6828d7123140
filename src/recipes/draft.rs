use serde::{Deserialize, Serialize};

use super::repo_types::Recipe;
use crate::{
    error::AppError,
    nutrition::{
        dictionary::Dictionary,
        services::{calculate, IngredientInput, NutritionFacts},
    },
};

/// A recipe being authored. Nutrition is derived from the ingredient list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

impl RecipeDraft {
    pub fn nutrition(&self) -> NutritionFacts {
        calculate(&self.ingredients, &Dictionary)
    }

    /// `name: <grams>g` tokens joined with `, `; the amount is omitted when
    /// it does not parse to a positive number.
    pub fn ingredients_text(&self) -> String {
        self.ingredients
            .iter()
            .filter(|i| !i.name.trim().is_empty())
            .map(|i| {
                let name = i.name.trim();
                match i.grams_value() {
                    g if g > 0.0 => format!("{name}: {g}g"),
                    _ => name.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn instructions_text(&self) -> String {
        self.instructions
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" * ")
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("recipe title is required"));
        }
        if self.ingredients.iter().all(|i| i.name.trim().is_empty()) {
            return Err(AppError::validation("add at least one ingredient"));
        }
        Ok(())
    }

    /// Builds a local-only recipe ready for
    /// [`RecipeRepository::create`](super::services::RecipeRepository::create).
    pub fn into_recipe(
        self,
        author_id: Option<String>,
        author_name: Option<String>,
    ) -> Result<Recipe, AppError> {
        self.validate()?;
        let facts = self.nutrition();
        let macros = facts.rounded();

        let mut recipe = Recipe::new_local(self.title.trim());
        recipe.description = Some(self.instructions_text()).filter(|s| !s.is_empty());
        recipe.ingredients = Some(self.ingredients_text());
        recipe.image_url = self.image_url.filter(|u| !u.trim().is_empty());
        recipe.author_id = author_id;
        recipe.author_name = author_name;
        recipe.calories = macros.calories;
        recipe.proteins = macros.proteins;
        recipe.fats = macros.fats;
        recipe.carbs = macros.carbs;
        recipe.weight = facts.weight;
        Ok(recipe)
    }
}
