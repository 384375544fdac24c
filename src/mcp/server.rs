//! Pantry MCP Server Implementation
//!
//! Implements the MCP server with all Pantry tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::aisle::AisleClient;
use crate::db::Database;
use crate::grocery::IngredientEntry;
use crate::models::{CookTime, Instruction, PerServingNutrition, RecipeCreate, RecipeFilter, RecipeUpdate};
use crate::tools::grocery;
use crate::tools::recipes;
use crate::tools::status::StatusTracker;

/// Pantry MCP Service
#[derive(Clone)]
pub struct PantryService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    /// None when no API key is configured; aisle sorting then falls back
    aisle_client: Option<Arc<dyn AisleClient>>,
    tool_router: ToolRouter<PantryService>,
}

impl PantryService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        aisle_client: Option<Arc<dyn AisleClient>>,
    ) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            aisle_client,
            tool_router: Self::tool_router(),
        }
    }

    fn aisle_client(&self) -> Option<&dyn AisleClient> {
        self.aisle_client.as_deref()
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        what, id
    ))]))
}

// ============================================================================
// Shared Parameter Structs
// ============================================================================

/// One ingredient line
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientParam {
    /// Ingredient name, e.g. "Flour"
    pub name: String,
    /// Amount; omit or 0 for unspecified ("to taste")
    pub quantity: Option<f64>,
    /// Free-text unit, e.g. "cup", "g", "clove", "pinch" (default empty)
    #[serde(default)]
    pub unit: String,
    /// Preparation note, e.g. "diced"
    pub prep: Option<String>,
    /// Optional ingredients are still included in grocery totals
    #[serde(default)]
    pub optional: bool,
    /// Recipe section, e.g. "Sauce"
    pub section: Option<String>,
}

impl From<IngredientParam> for IngredientEntry {
    fn from(p: IngredientParam) -> Self {
        Self {
            name: p.name,
            quantity: p.quantity,
            unit: p.unit,
            prep: p.prep,
            optional: p.optional,
            section: p.section,
        }
    }
}

/// One method step
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InstructionParam {
    pub step: u32,
    pub text: String,
}

impl From<InstructionParam> for Instruction {
    fn from(p: InstructionParam) -> Self {
        Self {
            step: p.step,
            text: p.text,
        }
    }
}

/// Per-serving nutrition; omitted values are 0
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NutritionParam {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
}

impl From<NutritionParam> for PerServingNutrition {
    fn from(p: NutritionParam) -> Self {
        Self {
            calories: p.calories,
            protein_g: p.protein_g,
            fat_g: p.fat_g,
            carbs_g: p.carbs_g,
            sugar_g: p.sugar_g,
        }
    }
}

/// Cook time in minutes
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CookTimeParam {
    /// Hands-on minutes
    pub active_min: u32,
    /// Minutes from start to table
    pub total_min: u32,
}

impl From<CookTimeParam> for CookTime {
    fn from(p: CookTimeParam) -> Self {
        Self {
            active_min: p.active_min,
            total_min: p.total_min,
        }
    }
}

fn into_entries(params: Vec<IngredientParam>) -> Vec<IngredientEntry> {
    params.into_iter().map(IngredientEntry::from).collect()
}

// ============================================================================
// Recipe Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRecipeParams {
    /// Name of the recipe
    pub name: String,
    /// Category, e.g. "Dinner"
    pub category: Option<String>,
    /// Number of servings this recipe produces (default 1.0)
    #[serde(default = "default_servings")]
    pub servings: f64,
    /// Emoji shown next to the recipe
    pub emoji: Option<String>,
    /// Show in the public recipe feed (default false)
    #[serde(default)]
    pub is_public: bool,
    /// Per-serving nutrition (optional)
    pub nutrition: Option<NutritionParam>,
    /// Free-form tags, e.g. ["quick", "vegetarian"]
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cook time (optional)
    pub cook_time: Option<CookTimeParam>,
    /// Ingredient lines
    #[serde(default)]
    pub ingredients: Vec<IngredientParam>,
    /// Method steps
    #[serde(default)]
    pub instructions: Vec<InstructionParam>,
    /// Optional notes
    pub notes: Option<String>,
}

fn default_servings() -> f64 { 1.0 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetRecipeParams {
    /// Recipe ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListRecipesParams {
    /// Search query for recipe name (optional)
    pub query: Option<String>,
    /// Only show recipes in this category (optional)
    pub category: Option<String>,
    /// Only public (true) or only private (false) recipes (optional)
    pub is_public: Option<bool>,
    /// Only recipes carrying this tag (optional)
    pub tag: Option<String>,
    /// Sort by: name, category, calories, total_time, created_at, or updated_at (default name)
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// Sort order: asc or desc (default asc)
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
    /// Maximum results (default 50, max 200)
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    /// Offset for pagination (default 0)
    #[serde(default)]
    pub offset: i64,
}

fn default_sort_by() -> String { "name".to_string() }
fn default_sort_order() -> String { "asc".to_string() }
fn default_list_limit() -> i64 { 50 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExploreRecipesParams {
    /// Search recipe names and ingredients (optional)
    pub query: Option<String>,
    /// Only show recipes in this category (optional)
    pub category: Option<String>,
    /// Calories per serving: under300, 300to500, 500to750, 750to1000, or over1000 (optional)
    pub calorie_range: Option<String>,
    /// Maximum results (default 20, max 100)
    #[serde(default = "default_explore_limit")]
    pub limit: i64,
    /// Offset for pagination (default 0)
    #[serde(default)]
    pub offset: i64,
}

fn default_explore_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateRecipeParams {
    /// Recipe ID to update
    pub id: i64,
    /// New name (optional)
    pub name: Option<String>,
    /// New category (optional)
    pub category: Option<String>,
    /// New servings (optional)
    pub servings: Option<f64>,
    /// New emoji (optional)
    pub emoji: Option<String>,
    /// Publish to or withdraw from the public feed (optional)
    pub is_public: Option<bool>,
    /// Replacement nutrition, all five values (optional)
    pub nutrition: Option<NutritionParam>,
    /// Replacement tags (optional)
    pub tags: Option<Vec<String>>,
    /// New cook time (optional)
    pub cook_time: Option<CookTimeParam>,
    /// Replacement ingredient list (optional, replaces all lines)
    pub ingredients: Option<Vec<IngredientParam>>,
    /// Replacement method steps (optional)
    pub instructions: Option<Vec<InstructionParam>>,
    /// New notes (optional)
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteRecipeParams {
    /// Recipe ID to delete
    pub id: i64,
}

// ============================================================================
// Grocery Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateGroceryListParams {
    /// Recipes to shop for
    pub recipe_ids: Vec<i64>,
    /// Keep count lines with different units apart, e.g. "2 clove" vs "1 head" (default false)
    #[serde(default)]
    pub strict_count_units: bool,
    /// Order items by grocery store section (best effort, default false)
    #[serde(default)]
    pub sort_by_aisle: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AggregateIngredientsParams {
    /// Ingredient lines to merge
    pub ingredients: Vec<IngredientParam>,
    /// Keep count lines with different units apart (default false)
    #[serde(default)]
    pub strict_count_units: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FormatQuantityParams {
    /// Quantity to render, e.g. 1.5
    pub quantity: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClassifyUnitParams {
    /// Unit string, e.g. "tbsp"
    pub unit: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl PantryService {
    // --- Status ---

    #[tool(description = "Get the current status of the Pantry service including build info, database status, and process information")]
    async fn get_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database, self.aisle_client.is_some());
        json_result(&status)
    }

    #[tool(description = "Get instructions for storing recipes and building grocery lists. Call this when unsure how units are merged.")]
    fn grocery_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::GROCERY_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(GROCERY_INSTRUCTIONS)]))
    }

    // --- Recipes ---

    #[tool(description = "Create a new recipe with its ingredient lines and method")]
    fn create_recipe(&self, Parameters(p): Parameters<CreateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeCreate {
            name: p.name,
            category: p.category,
            servings: p.servings,
            emoji: p.emoji,
            is_public: p.is_public,
            nutrition: p.nutrition.map(PerServingNutrition::from).unwrap_or_default(),
            tags: p.tags,
            cook_time: p.cook_time.map(CookTime::from),
            ingredients: into_entries(p.ingredients),
            instructions: p.instructions.into_iter().map(Instruction::from).collect(),
            notes: p.notes,
        };
        let result = recipes::create_recipe(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get full recipe details with ingredients and instructions")]
    fn get_recipe(&self, Parameters(p): Parameters<GetRecipeParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::get_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(recipe) => json_result(&recipe),
            None => not_found("Recipe", p.id),
        }
    }

    #[tool(description = "List recipes with optional name search, category, public and tag filters, sorting, and pagination")]
    fn list_recipes(&self, Parameters(p): Parameters<ListRecipesParams>) -> Result<CallToolResult, McpError> {
        let filter = RecipeFilter {
            query: p.query.as_deref(),
            category: p.category.as_deref(),
            is_public: p.is_public,
            tag: p.tag.as_deref(),
            ..Default::default()
        };
        let result = recipes::list_recipes(
            &self.database,
            &filter,
            &p.sort_by,
            &p.sort_order,
            p.limit,
            p.offset,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Browse the public recipe feed, newest first, with search, category and calorie filters")]
    fn explore_recipes(&self, Parameters(p): Parameters<ExploreRecipesParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::explore_recipes(
            &self.database,
            p.query.as_deref(),
            p.category.as_deref(),
            p.calorie_range.as_deref(),
            p.limit,
            p.offset,
        )
        .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Update a recipe. Passing ingredients replaces the whole ingredient list.")]
    fn update_recipe(&self, Parameters(p): Parameters<UpdateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeUpdate {
            name: p.name,
            category: p.category,
            servings: p.servings,
            emoji: p.emoji,
            is_public: p.is_public,
            nutrition: p.nutrition.map(PerServingNutrition::from),
            tags: p.tags,
            cook_time: p.cook_time.map(CookTime::from),
            ingredients: p.ingredients.map(into_entries),
            instructions: p
                .instructions
                .map(|steps| steps.into_iter().map(Instruction::from).collect()),
            notes: p.notes,
        };
        let result = recipes::update_recipe(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(success) => json_result(&success),
            None => not_found("Recipe", p.id),
        }
    }

    #[tool(description = "Delete a recipe")]
    fn delete_recipe(&self, Parameters(p): Parameters<DeleteRecipeParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::delete_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(success) => json_result(&success),
            None => not_found("Recipe", p.id),
        }
    }

    // --- Grocery Lists ---

    #[tool(description = "Build one consolidated grocery list from several recipes. Same-named ingredients are merged by unit kind (volume, weight, count); pinch/to-taste lines are kept separate. Optionally orders items by store aisle.")]
    async fn generate_grocery_list(&self, Parameters(p): Parameters<GenerateGroceryListParams>) -> Result<CallToolResult, McpError> {
        if p.recipe_ids.is_empty() {
            return Err(McpError::invalid_params("recipe_ids must not be empty", None));
        }
        let result = grocery::generate_grocery_list(
            &self.database,
            self.aisle_client(),
            &p.recipe_ids,
            p.strict_count_units,
            p.sort_by_aisle,
        )
        .await
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Merge ingredient lines passed directly (no stored recipes needed) into grocery items")]
    fn aggregate_ingredients(&self, Parameters(p): Parameters<AggregateIngredientsParams>) -> Result<CallToolResult, McpError> {
        let entries = into_entries(p.ingredients);
        let result = grocery::aggregate_ingredients(&entries, p.strict_count_units)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Export a grocery list for the given recipes as a Markdown checklist")]
    async fn export_grocery_list_markdown(&self, Parameters(p): Parameters<GenerateGroceryListParams>) -> Result<CallToolResult, McpError> {
        if p.recipe_ids.is_empty() {
            return Err(McpError::invalid_params("recipe_ids must not be empty", None));
        }
        let result = grocery::export_grocery_list_markdown(
            &self.database,
            self.aisle_client(),
            &p.recipe_ids,
            p.strict_count_units,
            p.sort_by_aisle,
        )
        .await
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Render a quantity the way grocery lists show it, e.g. 1.5 -> \"1 1/2\"")]
    fn format_quantity(&self, Parameters(p): Parameters<FormatQuantityParams>) -> Result<CallToolResult, McpError> {
        json_result(&grocery::format_quantity_tool(p.quantity))
    }

    #[tool(description = "Show which unit kind (volume, weight, count, other) a unit string belongs to")]
    fn classify_unit(&self, Parameters(p): Parameters<ClassifyUnitParams>) -> Result<CallToolResult, McpError> {
        json_result(&grocery::classify_unit(&p.unit))
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for PantryService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pantry".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Pantry".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Pantry - recipes and consolidated grocery lists. \
                 Call grocery_instructions first if unsure how units merge. \
                 Recipes: create/get/list/update/delete_recipe, explore_recipes for the public feed. \
                 Grocery lists: generate_grocery_list (optionally sort_by_aisle), \
                 export_grocery_list_markdown, aggregate_ingredients for ad-hoc lines. \
                 Helpers: format_quantity, classify_unit, get_status."
                    .into(),
            ),
        }
    }
}
