use super::{draft::RecipeDraft, repo_types::Recipe};
use crate::nutrition::services::IngredientInput;

pub const DEFAULT_ID_PREFIX: &str = "local_default_";

// key suffix, title, ingredients (name, grams), steps
const DEFAULTS: &[(&str, &str, &[(&str, &str)], &[&str])] = &[
    (
        "omelette",
        "Classic omelette",
        &[("egg", "150"), ("milk", "50"), ("butter", "10")],
        &["Whisk eggs with milk", "Melt butter in a pan", "Cook on low heat until set"],
    ),
    (
        "oatmeal",
        "Oatmeal with banana",
        &[("oats", "60"), ("milk", "200"), ("banana", "100"), ("honey", "10")],
        &[
            "Bring milk to a simmer",
            "Stir in oats and cook 5 minutes",
            "Top with sliced banana and honey",
        ],
    ),
    (
        "greek_salad",
        "Vegetable salad",
        &[
            ("tomato", "150"),
            ("cucumber", "150"),
            ("bell pepper", "80"),
            ("onion", "30"),
            ("cheese", "60"),
            ("olive oil", "15"),
        ],
        &["Chop the vegetables", "Crumble the cheese on top", "Dress with olive oil"],
    ),
    (
        "chicken_rice",
        "Chicken with rice",
        &[
            ("chicken breast", "200"),
            ("rice", "250"),
            ("carrot", "80"),
            ("onion", "50"),
            ("sunflower oil", "10"),
        ],
        &[
            "Fry onion and carrot in oil",
            "Add diced chicken and brown it",
            "Serve over boiled rice",
        ],
    ),
    (
        "pancakes",
        "Pancakes",
        &[("flour", "200"), ("milk", "300"), ("egg", "100"), ("sugar", "20"), ("butter", "20")],
        &[
            "Mix flour, sugar, milk and eggs",
            "Rest the batter 10 minutes",
            "Fry thin pancakes on butter",
        ],
    ),
];

/// Bundled recipes seeded into a freshly created cache.
pub fn default_recipes() -> Vec<Recipe> {
    DEFAULTS
        .iter()
        .filter_map(|(key, title, ingredients, steps)| {
            let draft = RecipeDraft {
                title: title.to_string(),
                image_url: None,
                ingredients: ingredients
                    .iter()
                    .map(|(name, grams)| IngredientInput::new(*name, *grams))
                    .collect(),
                instructions: steps.iter().map(|s| s.to_string()).collect(),
            };
            let mut recipe = draft.into_recipe(None, Some("Eatopedia".into())).ok()?;
            recipe.id = format!("{DEFAULT_ID_PREFIX}{key}");
            recipe.is_preloaded = true;
            Some(recipe)
        })
        .collect()
}
