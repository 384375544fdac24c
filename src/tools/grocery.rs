//! Grocery list MCP Tools
//!
//! Builds consolidated grocery lists from stored recipes or caller-supplied
//! ingredient lines.

use serde::Serialize;

use crate::aisle::{sort_by_aisle, AisleClient};
use crate::db::Database;
use crate::grocery::{
    aggregate_with_policy, classify, format_quantity, render_markdown_checklist, CountMergePolicy,
    GroceryItem, GroceryLine, IngredientEntry, UnitKind,
};
use crate::models::Recipe;
use crate::tools::recipes::validate_ingredients;

/// Recipe that contributed to a grocery list
#[derive(Debug, Serialize)]
pub struct RecipeRef {
    pub id: i64,
    pub name: String,
}

/// Response for generate_grocery_list
#[derive(Debug, Serialize)]
pub struct GroceryListResponse {
    pub recipes: Vec<RecipeRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_recipe_ids: Vec<i64>,
    pub ingredient_lines: usize,
    pub item_count: usize,
    pub items: Vec<GroceryLine>,
    pub aisle_sorted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aisle_note: Option<String>,
}

/// Response for aggregate_ingredients
#[derive(Debug, Serialize)]
pub struct AggregateIngredientsResponse {
    pub ingredient_lines: usize,
    pub item_count: usize,
    pub items: Vec<GroceryLine>,
}

/// Response for export_grocery_list_markdown
#[derive(Debug, Serialize)]
pub struct ExportGroceryListResponse {
    pub markdown: String,
    pub item_count: usize,
    pub aisle_sorted: bool,
    pub generated_at: String,
}

/// Response for format_quantity
#[derive(Debug, Serialize)]
pub struct FormatQuantityResponse {
    pub quantity: f64,
    pub formatted: String,
}

/// Response for classify_unit
#[derive(Debug, Serialize)]
pub struct ClassifyUnitResponse {
    pub unit: String,
    pub unit_kind: UnitKind,
    pub base_unit: Option<&'static str>,
}

pub fn count_policy(strict_count_units: bool) -> CountMergePolicy {
    if strict_count_units {
        CountMergePolicy::SameUnitOnly
    } else {
        CountMergePolicy::SumAcrossUnits
    }
}

/// Every ingredient line of the given recipes, in recipe order
pub fn ingredient_lines(recipes: &[Recipe]) -> Vec<IngredientEntry> {
    recipes
        .iter()
        .flat_map(|r| r.ingredients.iter().cloned())
        .collect()
}

/// Recipes loaded for a grocery list, with their aggregated items
struct Collected {
    recipes: Vec<Recipe>,
    missing: Vec<i64>,
    ingredient_lines: usize,
    items: Vec<GroceryItem>,
}

fn collect(db: &Database, recipe_ids: &[i64], policy: CountMergePolicy) -> Result<Collected, String> {
    if recipe_ids.is_empty() {
        return Err("Select at least one recipe".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let (recipes, missing) = Recipe::get_many(&conn, recipe_ids)
        .map_err(|e| format!("Failed to load recipes: {}", e))?;

    if recipes.is_empty() {
        return Err(format!("No recipes found for ids {:?}", recipe_ids));
    }
    if !missing.is_empty() {
        tracing::warn!("Grocery list skipping missing recipes {:?}", missing);
    }

    let entries = ingredient_lines(&recipes);
    let items = aggregate_with_policy(&entries, policy);

    tracing::info!(
        "Grocery list: {} recipes, {} ingredient lines -> {} items",
        recipes.len(),
        entries.len(),
        items.len()
    );

    Ok(Collected {
        recipes,
        missing,
        ingredient_lines: entries.len(),
        items,
    })
}

/// Build a grocery list from stored recipes
pub async fn generate_grocery_list(
    db: &Database,
    aisle_client: Option<&dyn AisleClient>,
    recipe_ids: &[i64],
    strict_count_units: bool,
    sort_by_aisle_order: bool,
) -> Result<GroceryListResponse, String> {
    let collected = collect(db, recipe_ids, count_policy(strict_count_units))?;

    let (items, aisle_sorted, aisle_note) = if sort_by_aisle_order {
        let outcome = sort_by_aisle(aisle_client, collected.items).await;
        (outcome.items, outcome.aisle_sorted, outcome.fallback_reason)
    } else {
        (collected.items, false, None)
    };

    Ok(GroceryListResponse {
        recipes: collected
            .recipes
            .iter()
            .map(|r| RecipeRef {
                id: r.id,
                name: r.name.clone(),
            })
            .collect(),
        missing_recipe_ids: collected.missing,
        ingredient_lines: collected.ingredient_lines,
        item_count: items.len(),
        items: items.iter().map(GroceryLine::from).collect(),
        aisle_sorted,
        aisle_note,
    })
}

/// Aggregate caller-supplied ingredient lines without touching the database
pub fn aggregate_ingredients(
    entries: &[IngredientEntry],
    strict_count_units: bool,
) -> Result<AggregateIngredientsResponse, String> {
    validate_ingredients(entries)?;

    let items = aggregate_with_policy(entries, count_policy(strict_count_units));

    Ok(AggregateIngredientsResponse {
        ingredient_lines: entries.len(),
        item_count: items.len(),
        items: items.iter().map(GroceryLine::from).collect(),
    })
}

/// Markdown checklist of a grocery list, for download
pub async fn export_grocery_list_markdown(
    db: &Database,
    aisle_client: Option<&dyn AisleClient>,
    recipe_ids: &[i64],
    strict_count_units: bool,
    sort_by_aisle_order: bool,
) -> Result<ExportGroceryListResponse, String> {
    let collected = collect(db, recipe_ids, count_policy(strict_count_units))?;

    let (items, aisle_sorted) = if sort_by_aisle_order {
        let outcome = sort_by_aisle(aisle_client, collected.items).await;
        (outcome.items, outcome.aisle_sorted)
    } else {
        (collected.items, false)
    };

    let generated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let recipe_names: Vec<String> = collected.recipes.iter().map(|r| r.name.clone()).collect();
    let markdown = render_markdown_checklist("Grocery List", &recipe_names, &generated_at, &items);

    Ok(ExportGroceryListResponse {
        markdown,
        item_count: items.len(),
        aisle_sorted,
        generated_at,
    })
}

pub fn format_quantity_tool(quantity: f64) -> FormatQuantityResponse {
    FormatQuantityResponse {
        quantity,
        formatted: format_quantity(quantity),
    }
}

pub fn classify_unit(unit: &str) -> ClassifyUnitResponse {
    let unit_kind = classify(unit);
    ClassifyUnitResponse {
        unit: unit.to_string(),
        unit_kind,
        base_unit: unit_kind.base_unit(),
    }
}
