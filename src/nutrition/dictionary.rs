use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Macro profile per 100 g.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub proteins: f64,
    pub fats: f64,
    pub carbs: f64,
}

impl Macros {
    pub const fn new(calories: f64, proteins: f64, fats: f64, carbs: f64) -> Self {
        Self {
            calories,
            proteins,
            fats,
            carbs,
        }
    }
}

/// Source of per-100g macro profiles keyed by normalized ingredient name.
pub trait MacroLookup {
    fn lookup(&self, name: &str) -> Option<Macros>;
}

impl MacroLookup for HashMap<String, Macros> {
    fn lookup(&self, name: &str) -> Option<Macros> {
        self.get(name).copied()
    }
}

// name, kcal, protein, fat, carbs (per 100 g)
const INGREDIENTS: &[(&str, Macros)] = &[
    ("apple", Macros::new(52.0, 0.3, 0.2, 14.0)),
    ("avocado", Macros::new(160.0, 2.0, 14.7, 8.5)),
    ("bacon", Macros::new(541.0, 37.0, 42.0, 1.4)),
    ("banana", Macros::new(89.0, 1.1, 0.3, 22.8)),
    ("beef", Macros::new(250.0, 26.0, 15.0, 0.0)),
    ("bell pepper", Macros::new(31.0, 1.0, 0.3, 6.0)),
    ("bread", Macros::new(265.0, 9.0, 3.2, 49.0)),
    ("broccoli", Macros::new(34.0, 2.8, 0.4, 6.6)),
    ("buckwheat", Macros::new(343.0, 13.3, 3.4, 71.5)),
    ("butter", Macros::new(717.0, 0.9, 81.0, 0.1)),
    ("cabbage", Macros::new(25.0, 1.3, 0.1, 5.8)),
    ("carrot", Macros::new(41.0, 0.9, 0.2, 9.6)),
    ("cheese", Macros::new(402.0, 25.0, 33.0, 1.3)),
    ("chicken breast", Macros::new(165.0, 31.0, 3.6, 0.0)),
    ("cottage cheese", Macros::new(98.0, 11.1, 4.3, 3.4)),
    ("cucumber", Macros::new(15.0, 0.7, 0.1, 3.6)),
    ("egg", Macros::new(155.0, 13.0, 11.0, 1.1)),
    ("flour", Macros::new(364.0, 10.0, 1.0, 76.0)),
    ("garlic", Macros::new(149.0, 6.4, 0.5, 33.0)),
    ("honey", Macros::new(304.0, 0.3, 0.0, 82.4)),
    ("kefir", Macros::new(41.0, 3.4, 1.0, 4.5)),
    ("lemon", Macros::new(29.0, 1.1, 0.3, 9.3)),
    ("milk", Macros::new(60.0, 3.2, 3.3, 4.7)),
    ("mushroom", Macros::new(22.0, 3.1, 0.3, 3.3)),
    ("oats", Macros::new(389.0, 16.9, 6.9, 66.3)),
    ("olive oil", Macros::new(884.0, 0.0, 100.0, 0.0)),
    ("onion", Macros::new(40.0, 1.1, 0.1, 9.3)),
    ("pasta", Macros::new(371.0, 13.0, 1.5, 75.0)),
    ("pork", Macros::new(242.0, 27.0, 14.0, 0.0)),
    ("potato", Macros::new(77.0, 2.0, 0.1, 17.0)),
    ("rice", Macros::new(130.0, 2.7, 0.3, 28.0)),
    ("salmon", Macros::new(208.0, 20.0, 13.0, 0.0)),
    ("sour cream", Macros::new(193.0, 2.4, 20.0, 3.4)),
    ("spinach", Macros::new(23.0, 2.9, 0.4, 3.6)),
    ("sugar", Macros::new(387.0, 0.0, 0.0, 100.0)),
    ("sunflower oil", Macros::new(884.0, 0.0, 100.0, 0.0)),
    ("tomato", Macros::new(18.0, 0.9, 0.2, 3.9)),
    ("yogurt", Macros::new(59.0, 10.0, 0.4, 3.6)),
];

lazy_static! {
    static ref BY_NAME: HashMap<&'static str, Macros> = INGREDIENTS.iter().copied().collect();
}

/// The ingredient table bundled with the application.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dictionary;

impl Dictionary {
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        INGREDIENTS.iter().map(|(name, _)| *name)
    }

    /// Autocomplete: names containing `query` (case-insensitive), sorted.
    /// Queries shorter than two characters yield nothing.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        suggestions(self.names(), query, limit)
    }
}

fn suggestions<'a>(names: impl Iterator<Item = &'a str>, query: &str, limit: usize) -> Vec<String> {
    let query = query.trim().to_lowercase();
    if query.chars().count() < 2 {
        return Vec::new();
    }
    let mut hits: Vec<String> = names
        .filter(|name| name.contains(&query))
        .map(str::to_string)
        .collect();
    hits.sort();
    hits.truncate(limit);
    hits
}

impl MacroLookup for Dictionary {
    fn lookup(&self, name: &str) -> Option<Macros> {
        BY_NAME.get(name).copied()
    }
}
