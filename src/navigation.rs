//! Screen identifiers of the application shell.

use serde::Serialize;

const RECIPE_DETAIL_PREFIX: &str = "recipe_detail_screen/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum Screen {
    Auth,
    Home,
    Fridge,
    Profile,
    AddRecipe,
    RecipeDetail { recipe_id: String },
}

impl Screen {
    pub fn route(&self) -> String {
        match self {
            Screen::Auth => "auth_screen".into(),
            Screen::Home => "home_screen".into(),
            Screen::Fridge => "fridge_screen".into(),
            Screen::Profile => "profile_screen".into(),
            Screen::AddRecipe => "add_recipe_screen".into(),
            Screen::RecipeDetail { recipe_id } => format!("{RECIPE_DETAIL_PREFIX}{recipe_id}"),
        }
    }

    pub fn parse(route: &str) -> Option<Screen> {
        let screen = match route {
            "auth_screen" => Screen::Auth,
            "home_screen" => Screen::Home,
            "fridge_screen" => Screen::Fridge,
            "profile_screen" => Screen::Profile,
            "add_recipe_screen" => Screen::AddRecipe,
            other => {
                let recipe_id = other.strip_prefix(RECIPE_DETAIL_PREFIX)?;
                if recipe_id.is_empty() || recipe_id.contains('/') {
                    return None;
                }
                Screen::RecipeDetail {
                    recipe_id: recipe_id.to_string(),
                }
            }
        };
        Some(screen)
    }
}
