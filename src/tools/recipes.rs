//! Recipe MCP Tools
//!
//! Tools for storing and browsing recipes.

use serde::Serialize;

use crate::db::Database;
use crate::grocery::IngredientEntry;
use crate::models::{CalorieRange, CookTime, PerServingNutrition, Recipe, RecipeCreate, RecipeFilter, RecipeUpdate};

/// Response for create_recipe
#[derive(Debug, Serialize)]
pub struct CreateRecipeResponse {
    pub id: i64,
    pub name: String,
    pub ingredient_count: usize,
    pub created_at: String,
}

/// Recipe summary for listing
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub emoji: Option<String>,
    pub servings: f64,
    pub is_public: bool,
    pub calories_per_serving: f64,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<CookTime>,
    pub ingredient_count: usize,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            category: recipe.category.clone(),
            emoji: recipe.emoji.clone(),
            servings: recipe.servings,
            is_public: recipe.is_public,
            calories_per_serving: recipe.nutrition.calories,
            tags: recipe.tags.clone(),
            cook_time: recipe.cook_time,
            ingredient_count: recipe.ingredients.len(),
        }
    }
}

/// Response for list_recipes
#[derive(Debug, Serialize)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for explore_recipes
#[derive(Debug, Serialize)]
pub struct ExploreRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
    pub has_more: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Response for successful update
#[derive(Debug, Serialize)]
pub struct RecipeUpdateSuccessResponse {
    pub success: bool,
    pub updated_at: String,
}

/// Response for delete
#[derive(Debug, Serialize)]
pub struct RecipeDeleteResponse {
    pub success: bool,
    pub deleted_id: i64,
}

// ============================================================================
// Validation
// ============================================================================

/// Reject ingredient lines the aggregator would have to guess about
pub fn validate_ingredients(ingredients: &[IngredientEntry]) -> Result<(), String> {
    for (i, ingredient) in ingredients.iter().enumerate() {
        if ingredient.name.trim().is_empty() {
            return Err(format!("Ingredient {} has an empty name", i + 1));
        }
        if let Some(q) = ingredient.quantity {
            if !q.is_finite() || q < 0.0 {
                return Err(format!(
                    "Ingredient '{}' has invalid quantity {} (must be 0 or more)",
                    ingredient.name, q
                ));
            }
        }
    }
    Ok(())
}

fn validate_servings(servings: f64) -> Result<(), String> {
    if !servings.is_finite() || servings <= 0.0 {
        return Err("servings must be greater than 0".to_string());
    }
    Ok(())
}

fn validate_nutrition(nutrition: &PerServingNutrition) -> Result<(), String> {
    let values = [
        ("calories", nutrition.calories),
        ("protein_g", nutrition.protein_g),
        ("fat_g", nutrition.fat_g),
        ("carbs_g", nutrition.carbs_g),
        ("sugar_g", nutrition.sugar_g),
    ];
    for (field, value) in values {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("Nutrition {} must be 0 or more, got {}", field, value));
        }
    }
    Ok(())
}

fn validate_cook_time(cook_time: &CookTime) -> Result<(), String> {
    if cook_time.active_min > cook_time.total_min {
        return Err(format!(
            "Active time ({} min) cannot exceed total time ({} min)",
            cook_time.active_min, cook_time.total_min
        ));
    }
    Ok(())
}

/// Trimmed, non-empty, first spelling of each tag kept
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        let key = tag.to_lowercase();
        if tag.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        normalized.push(tag);
    }
    normalized
}

// ============================================================================
// Recipe Tools
// ============================================================================

/// Create a new recipe
pub fn create_recipe(db: &Database, mut data: RecipeCreate) -> Result<CreateRecipeResponse, String> {
    data.name = data.name.trim().to_string();
    if data.name.is_empty() {
        return Err("Recipe name cannot be empty".to_string());
    }
    validate_servings(data.servings)?;
    validate_nutrition(&data.nutrition)?;
    if let Some(ref cook_time) = data.cook_time {
        validate_cook_time(cook_time)?;
    }
    validate_ingredients(&data.ingredients)?;
    data.tags = normalize_tags(data.tags);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::create(&conn, &data)
        .map_err(|e| format!("Failed to create recipe: {}", e))?;

    tracing::info!("Created recipe {} '{}'", recipe.id, recipe.name);

    Ok(CreateRecipeResponse {
        id: recipe.id,
        name: recipe.name,
        ingredient_count: recipe.ingredients.len(),
        created_at: recipe.created_at,
    })
}

/// Get a recipe with its ingredients and instructions
pub fn get_recipe(db: &Database, id: i64) -> Result<Option<Recipe>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    Recipe::get_by_id(&conn, id).map_err(|e| format!("Failed to get recipe: {}", e))
}

/// List recipes with filtering
pub fn list_recipes(
    db: &Database,
    filter: &RecipeFilter<'_>,
    sort_by: &str,
    sort_order: &str,
    limit: i64,
    offset: i64,
) -> Result<ListRecipesResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipes = Recipe::list(&conn, filter, sort_by, sort_order, limit, offset)
        .map_err(|e| format!("Failed to list recipes: {}", e))?;
    let total = Recipe::count(&conn, filter)
        .map_err(|e| format!("Failed to count recipes: {}", e))?;

    Ok(ListRecipesResponse {
        recipes: recipes.iter().map(RecipeSummary::from).collect(),
        total,
        limit,
        offset,
    })
}

/// Public recipe feed, newest first
///
/// `query` matches recipe names and ingredient lines.
pub fn explore_recipes(
    db: &Database,
    query: Option<&str>,
    category: Option<&str>,
    calorie_range: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ExploreRecipesResponse, String> {
    let limit = limit.clamp(1, 100);
    let offset = offset.max(0);
    let calorie_range = calorie_range
        .filter(|r| !r.trim().is_empty())
        .map(str::parse::<CalorieRange>)
        .transpose()?;

    let filter = RecipeFilter {
        query,
        query_ingredients: true,
        category,
        is_public: Some(true),
        calorie_range,
        ..Default::default()
    };

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    // One extra row tells us whether another page exists
    let mut recipes = Recipe::list(&conn, &filter, "created_at", "desc", limit + 1, offset)
        .map_err(|e| format!("Failed to load public recipes: {}", e))?;
    let has_more = recipes.len() as i64 > limit;
    recipes.truncate(limit as usize);

    Ok(ExploreRecipesResponse {
        recipes: recipes.iter().map(RecipeSummary::from).collect(),
        has_more,
        limit,
        offset,
    })
}

/// Update a recipe; Ok(None) if it does not exist
pub fn update_recipe(
    db: &Database,
    id: i64,
    mut data: RecipeUpdate,
) -> Result<Option<RecipeUpdateSuccessResponse>, String> {
    if let Some(name) = data.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err("Recipe name cannot be empty".to_string());
        }
    }
    if let Some(servings) = data.servings {
        validate_servings(servings)?;
    }
    if let Some(ref nutrition) = data.nutrition {
        validate_nutrition(nutrition)?;
    }
    if let Some(ref cook_time) = data.cook_time {
        validate_cook_time(cook_time)?;
    }
    if let Some(ref ingredients) = data.ingredients {
        validate_ingredients(ingredients)?;
    }
    data.tags = data.tags.map(normalize_tags);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let updated = Recipe::update(&conn, id, &data)
        .map_err(|e| format!("Failed to update recipe: {}", e))?;

    Ok(updated.map(|recipe| RecipeUpdateSuccessResponse {
        success: true,
        updated_at: recipe.updated_at,
    }))
}

/// Delete a recipe; Ok(None) if it does not exist
pub fn delete_recipe(db: &Database, id: i64) -> Result<Option<RecipeDeleteResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = Recipe::delete(&conn, id)
        .map_err(|e| format!("Failed to delete recipe: {}", e))?;

    if deleted {
        tracing::info!("Deleted recipe {}", id);
        Ok(Some(RecipeDeleteResponse {
            success: true,
            deleted_id: id,
        }))
    } else {
        Ok(None)
    }
}
