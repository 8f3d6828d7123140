use serde::{Deserialize, Serialize};
use tracing::debug;

use super::dictionary::{MacroLookup, Macros};

/// One ingredient line of a recipe being authored. `grams` is kept as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    #[serde(default)]
    pub grams: String,
}

impl IngredientInput {
    pub fn new(name: impl Into<String>, grams: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grams: grams.into(),
        }
    }

    /// Unparseable, non-finite and negative amounts count as zero.
    pub fn grams_value(&self) -> f64 {
        self.grams
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|g| g.is_finite() && *g > 0.0)
            .unwrap_or(0.0)
    }
}

/// Aggregate nutrition of a dish, per 100 g of the finished dish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub per_100g: Macros,
    pub weight: f64,
}

impl NutritionFacts {
    pub fn calories_label(&self) -> String {
        format!("{}", self.per_100g.calories.round() as i64)
    }

    pub fn proteins_label(&self) -> String {
        one_decimal(self.per_100g.proteins)
    }

    pub fn fats_label(&self) -> String {
        one_decimal(self.per_100g.fats)
    }

    pub fn carbs_label(&self) -> String {
        one_decimal(self.per_100g.carbs)
    }

    /// Values as they are stored on a recipe: calories whole, the rest to one decimal.
    pub fn rounded(&self) -> Macros {
        Macros {
            calories: self.per_100g.calories.round(),
            proteins: round1(self.per_100g.proteins),
            fats: round1(self.per_100g.fats),
            carbs: round1(self.per_100g.carbs),
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn one_decimal(v: f64) -> String {
    format!("{:.1}", round1(v))
}

/// Folds the ingredient list into per-100g totals of the whole dish.
///
/// Unknown ingredients add their weight but no nutrition, so they dilute
/// the result.
pub fn calculate<L: MacroLookup + ?Sized>(
    inputs: &[IngredientInput],
    lookup: &L,
) -> NutritionFacts {
    let mut total = Macros::default();
    let mut weight = 0.0_f64;

    for input in inputs {
        let name = input.name.trim().to_lowercase();
        let grams = input.grams_value();

        match lookup.lookup(&name) {
            Some(profile) => {
                let k = grams / 100.0;
                total.calories += profile.calories * k;
                total.proteins += profile.proteins * k;
                total.fats += profile.fats * k;
                total.carbs += profile.carbs * k;
                debug!(%name, grams, "ingredient counted");
            }
            None if grams > 0.0 => {
                debug!(%name, grams, "ingredient not in dictionary, weight only")
            }
            None => {}
        }
        weight += grams;
    }

    if weight <= 0.0 {
        return NutritionFacts {
            per_100g: Macros::default(),
            weight: 0.0,
        };
    }

    let per_100 = |v: f64| (v / weight) * 100.0;
    NutritionFacts {
        per_100g: Macros {
            calories: per_100(total.calories),
            proteins: per_100(total.proteins),
            fats: per_100(total.fats),
            carbs: per_100(total.carbs),
        },
        weight,
    }
}
