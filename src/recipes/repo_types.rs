use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Key prefix of recipes created on this device and never backed by the remote store.
pub const LOCAL_ID_PREFIX: &str = "local_";

/// Recipe as held in the on-device cache. Macros are per 100 g of the dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub ingredients: Option<String>,
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
    pub weight: f64,
    pub is_favorite: bool,
    pub is_preloaded: bool,
}

impl Recipe {
    pub fn new_local(title: impl Into<String>) -> Self {
        Self {
            id: format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()),
            title: title.into(),
            description: None,
            image_url: None,
            author_id: None,
            author_name: None,
            ingredients: None,
            calories: 0.0,
            proteins: 0.0,
            fats: 0.0,
            carbs: 0.0,
            weight: 0.0,
            is_favorite: false,
            is_preloaded: false,
        }
    }

    pub fn is_local_only(&self) -> bool {
        is_local_id(&self.id)
    }

    /// Ingredient text split on commas, e.g. `["milk: 200g", "egg"]`.
    pub fn ingredient_tokens(&self) -> Vec<String> {
        split_trimmed(self.ingredients.as_deref(), ',')
    }

    /// Instruction steps; authored text joins them with `*`.
    pub fn instruction_steps(&self) -> Vec<String> {
        split_trimmed(self.description.as_deref(), '*')
    }
}

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

fn split_trimmed(text: Option<&str>, sep: char) -> Vec<String> {
    text.unwrap_or_default()
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Row of the remote `recipes` table. Nutrition is stored as batch totals
/// alongside the batch weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub total_calories: Option<f64>,
    #[serde(default)]
    pub total_proteins: Option<f64>,
    #[serde(default)]
    pub total_fats: Option<f64>,
    #[serde(default)]
    pub total_carbs: Option<f64>,
    #[serde(default)]
    pub total_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl RecipeRow {
    /// Converts to the per-100g cache shape. The two flags are device state
    /// the remote schema never carries.
    pub fn into_recipe(self, is_favorite: bool, is_preloaded: bool) -> Recipe {
        let weight = non_negative(self.total_weight.unwrap_or_default());
        let coef = if weight > 0.0 { weight / 100.0 } else { 1.0 };
        let per_100 = |total: Option<f64>| non_negative(total.unwrap_or_default() / coef);

        Recipe {
            id: self.id,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            author_id: self.author_id,
            author_name: self.author_name,
            ingredients: self.ingredients,
            calories: per_100(self.total_calories),
            proteins: per_100(self.total_proteins),
            fats: per_100(self.total_fats),
            carbs: per_100(self.total_carbs),
            weight,
            is_favorite,
            is_preloaded,
        }
    }
}

impl From<&Recipe> for RecipeRow {
    fn from(r: &Recipe) -> Self {
        let coef = if r.weight > 0.0 { r.weight / 100.0 } else { 1.0 };
        Self {
            id: r.id.clone(),
            title: r.title.clone(),
            description: r.description.clone(),
            image_url: r.image_url.clone(),
            author_id: r.author_id.clone(),
            author_name: r.author_name.clone(),
            ingredients: r.ingredients.clone(),
            total_calories: Some(r.calories * coef),
            total_proteins: Some(r.proteins * coef),
            total_fats: Some(r.fats * coef),
            total_carbs: Some(r.carbs * coef),
            total_weight: Some(r.weight),
            created_at: None,
        }
    }
}

/// Row of the remote `ingredients` table (macros per 100 g).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub proteins: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(default)]
    pub carbs: f64,
}

/// Row of the remote `recipe_ingredients` join table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredientRow {
    #[serde(default)]
    pub id: Option<String>,
    pub recipe_id: String,
    pub ingredient_id: String,
    #[serde(default)]
    pub amount_grams: Option<f64>,
}
