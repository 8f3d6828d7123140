use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{
    repo_types::{IngredientRow, Recipe, RecipeIngredientRow, RecipeRow},
    services::RecipeRepository,
};
use crate::{
    cache::LiveQuery,
    error::AppError,
    remote::{select_as, Query, Table},
    sync::SyncHandle,
};

/// Live search result plus the background remote lookup feeding it.
pub struct IngredientSearch {
    pub results: LiveQuery<Vec<Recipe>>,
    pub lookup: Option<SyncHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientStatus {
    pub name: String,
    pub is_available: bool,
}

/// Trimmed, lowercased, blank-free, first occurrence wins.
pub fn normalize_names(owned: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(owned.len());
    for name in owned {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// How many distinct owned names occur in the recipe's ingredient text.
pub fn count_matches(recipe: &Recipe, names: &[String]) -> usize {
    let text = recipe.ingredients.as_deref().unwrap_or_default().to_lowercase();
    names.iter().filter(|n| text.contains(n.as_str())).count()
}

/// Recipes with at least one match, most matches first. Ties keep input order.
pub fn match_recipes(recipes: Vec<Recipe>, names: &[String]) -> Vec<Recipe> {
    let mut scored: Vec<(usize, Recipe)> = recipes
        .into_iter()
        .map(|r| (count_matches(&r, names), r))
        .filter(|(n, _)| *n > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, r)| r).collect()
}

/// Search-box filter over title and author name; blank query keeps everything.
pub fn filter_by_query(recipes: Vec<Recipe>, query: &str) -> Vec<Recipe> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return recipes;
    }
    recipes
        .into_iter()
        .filter(|r| {
            r.title.to_lowercase().contains(&query)
                || r.author_name
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&query))
        })
        .collect()
}

/// Marks each ingredient of the recipe as owned or missing.
pub fn ingredient_availability(recipe: &Recipe, owned: &[String]) -> Vec<IngredientStatus> {
    let names = normalize_names(owned);
    recipe
        .ingredient_tokens()
        .into_iter()
        .map(|token| {
            let ingredient = token
                .split(':')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            let is_available = !ingredient.is_empty()
                && names
                    .iter()
                    .any(|n| ingredient.contains(n.as_str()) || n.contains(ingredient.as_str()));
            IngredientStatus {
                name: token,
                is_available,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct IngredientMatcher {
    recipes: RecipeRepository,
}

impl IngredientMatcher {
    pub fn new(recipes: RecipeRepository) -> Self {
        Self { recipes }
    }

    /// Ranks cached recipes against the owned ingredient names and keeps the
    /// ranking live. A relational lookup runs in the background and pulls any
    /// matching remote recipes into the cache; its failure only shows up in
    /// the logs.
    pub fn search_by_ingredient(&self, owned: &[String]) -> IngredientSearch {
        let names = normalize_names(owned);
        if names.is_empty() {
            return IngredientSearch {
                results: stream::once(async { Ok(Vec::new()) }).boxed(),
                lookup: None,
            };
        }

        let this = self.clone();
        let lookup_names = names.clone();
        let lookup = SyncHandle::spawn(async move {
            match this.fetch_matching_remote(&lookup_names).await {
                Ok(n) => Ok(n),
                Err(e) => {
                    warn!(error = %e, "ingredient lookup failed");
                    Ok(0)
                }
            }
        });

        let results = self
            .recipes
            .recipes()
            .map(move |batch| batch.map(|all| match_recipes(all, &names)))
            .boxed();

        IngredientSearch {
            results,
            lookup: Some(lookup),
        }
    }

    /// ingredients (by name) -> recipe_ingredients -> recipes, applied to the cache.
    #[instrument(skip(self))]
    pub async fn fetch_matching_remote(&self, names: &[String]) -> Result<usize, AppError> {
        let remote = self.recipes.remote();

        let mut ingredient_ids = Vec::new();
        for name in names {
            let rows: Vec<IngredientRow> =
                select_as(remote, Table::Ingredients, Query::new().ilike("name", name.as_str()))
                    .await?;
            ingredient_ids.extend(rows.into_iter().map(|r| r.id));
        }
        ingredient_ids.sort();
        ingredient_ids.dedup();
        if ingredient_ids.is_empty() {
            debug!("no remote ingredients matched");
            return Ok(0);
        }

        let links: Vec<RecipeIngredientRow> = select_as(
            remote,
            Table::RecipeIngredients,
            Query::new().is_in("ingredient_id", ingredient_ids),
        )
        .await?;
        let mut recipe_ids: Vec<String> = links.into_iter().map(|l| l.recipe_id).collect();
        recipe_ids.sort();
        recipe_ids.dedup();
        if recipe_ids.is_empty() {
            return Ok(0);
        }

        let rows: Vec<RecipeRow> =
            select_as(remote, Table::Recipes, Query::new().is_in("id", recipe_ids)).await?;
        let applied = self.recipes.apply_remote_batch(rows).await?;
        debug!(applied, "remote recipes matched by ingredient");
        Ok(applied)
    }
}
