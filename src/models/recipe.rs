//! Recipe model
//!
//! A recipe with its ingredient lines stored as JSON.

use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, ToSql};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::db::DbResult;
use crate::grocery::IngredientEntry;

/// One step of a recipe's method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub step: u32,
    pub text: String,
}

/// Per-serving nutrition as stored with the recipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerServingNutrition {
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

/// Hands-on and total time, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookTime {
    pub active_min: u32,
    pub total_min: u32,
}

/// A stored recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub servings: f64,
    pub emoji: Option<String>,
    pub is_public: bool,
    pub nutrition: PerServingNutrition,
    pub tags: Vec<String>,
    pub cook_time: Option<CookTime>,
    pub ingredients: Vec<IngredientEntry>,
    pub instructions: Vec<Instruction>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCreate {
    pub name: String,
    pub category: Option<String>,
    #[serde(default = "default_servings")]
    pub servings: f64,
    pub emoji: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub nutrition: PerServingNutrition,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cook_time: Option<CookTime>,
    #[serde(default)]
    pub ingredients: Vec<IngredientEntry>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    pub notes: Option<String>,
}

fn default_servings() -> f64 {
    1.0
}

impl Default for RecipeCreate {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: None,
            servings: default_servings(),
            emoji: None,
            is_public: false,
            nutrition: PerServingNutrition::default(),
            tags: Vec::new(),
            cook_time: None,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            notes: None,
        }
    }
}

/// Data for updating a recipe; None fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub servings: Option<f64>,
    pub emoji: Option<String>,
    pub is_public: Option<bool>,
    /// Replaces all five nutrition values
    pub nutrition: Option<PerServingNutrition>,
    pub tags: Option<Vec<String>>,
    pub cook_time: Option<CookTime>,
    pub ingredients: Option<Vec<IngredientEntry>>,
    pub instructions: Option<Vec<Instruction>>,
    pub notes: Option<String>,
}

/// Per-serving calorie buckets used by the public feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalorieRange {
    Under300,
    #[serde(rename = "300to500")]
    From300To500,
    #[serde(rename = "500to750")]
    From500To750,
    #[serde(rename = "750to1000")]
    From750To1000,
    Over1000,
}

impl CalorieRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Under300 => "under300",
            Self::From300To500 => "300to500",
            Self::From500To750 => "500to750",
            Self::From750To1000 => "750to1000",
            Self::Over1000 => "over1000",
        }
    }

    fn condition(&self) -> &'static str {
        match self {
            Self::Under300 => "per_serving_calories < 300",
            Self::From300To500 => "per_serving_calories >= 300 AND per_serving_calories < 500",
            Self::From500To750 => "per_serving_calories >= 500 AND per_serving_calories < 750",
            Self::From750To1000 => "per_serving_calories >= 750 AND per_serving_calories <= 1000",
            Self::Over1000 => "per_serving_calories > 1000",
        }
    }
}

impl std::str::FromStr for CalorieRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "under300" => Ok(Self::Under300),
            "300to500" => Ok(Self::From300To500),
            "500to750" => Ok(Self::From500To750),
            "750to1000" => Ok(Self::From750To1000),
            "over1000" => Ok(Self::Over1000),
            other => Err(format!(
                "Unknown calorie range '{}' (expected under300, 300to500, 500to750, 750to1000 or over1000)",
                other
            )),
        }
    }
}

/// Filters for listing recipes
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter<'a> {
    pub query: Option<&'a str>,
    /// Also match `query` against ingredient lines
    pub query_ingredients: bool,
    pub category: Option<&'a str>,
    pub is_public: Option<bool>,
    pub tag: Option<&'a str>,
    pub calorie_range: Option<CalorieRange>,
}

impl RecipeFilter<'_> {
    /// WHERE clause and its parameters
    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(q) = self.query.filter(|q| !q.trim().is_empty()) {
            params_vec.push(Box::new(format!("%{}%", q.trim())));
            let n = params_vec.len();
            if self.query_ingredients {
                conditions.push(format!("(name LIKE ?{n} OR ingredients_json LIKE ?{n})"));
            } else {
                conditions.push(format!("name LIKE ?{n}"));
            }
        }
        if let Some(category) = self.category.filter(|c| !c.trim().is_empty()) {
            params_vec.push(Box::new(category.trim().to_string()));
            conditions.push(format!("category = ?{} COLLATE NOCASE", params_vec.len()));
        }
        if let Some(is_public) = self.is_public {
            params_vec.push(Box::new(is_public));
            conditions.push(format!("is_public = ?{}", params_vec.len()));
        }
        if let Some(tag) = self.tag.filter(|t| !t.trim().is_empty()) {
            params_vec.push(Box::new(tag.trim().to_string()));
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM json_each(recipes.tags_json) WHERE json_each.value = ?{} COLLATE NOCASE)",
                params_vec.len()
            ));
        }
        if let Some(range) = self.calorie_range {
            conditions.push(format!("({})", range.condition()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        (clause, params_vec)
    }
}

/// Read a JSON text column, surfacing bad JSON as a conversion failure
fn json_column<T: DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| {
        let index = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
    })
}

/// Either time column may be null; a recipe with neither has no cook time
fn cook_time_columns(row: &Row) -> rusqlite::Result<Option<CookTime>> {
    let active: Option<u32> = row.get("active_time_min")?;
    let total: Option<u32> = row.get("total_time_min")?;
    Ok(match (active, total) {
        (None, None) => None,
        (active, total) => Some(CookTime {
            active_min: active.unwrap_or(0),
            total_min: total.unwrap_or(0),
        }),
    })
}

impl Recipe {
    /// Create a Recipe from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            servings: row.get("servings")?,
            emoji: row.get("emoji")?,
            is_public: row.get("is_public")?,
            nutrition: PerServingNutrition {
                calories: row.get("per_serving_calories")?,
                protein_g: row.get("per_serving_protein_g")?,
                fat_g: row.get("per_serving_fat_g")?,
                carbs_g: row.get("per_serving_carbs_g")?,
                sugar_g: row.get("per_serving_sugar_g")?,
            },
            tags: json_column(row, "tags_json")?,
            cook_time: cook_time_columns(row)?,
            ingredients: json_column(row, "ingredients_json")?,
            instructions: json_column(row, "instructions_json")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new recipe into the database
    pub fn create(conn: &Connection, data: &RecipeCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO recipes (
                name, category, servings, emoji, is_public,
                per_serving_calories, per_serving_protein_g, per_serving_fat_g,
                per_serving_carbs_g, per_serving_sugar_g,
                tags_json, active_time_min, total_time_min,
                ingredients_json, instructions_json, notes
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                data.name,
                data.category,
                data.servings,
                data.emoji,
                data.is_public,
                data.nutrition.calories,
                data.nutrition.protein_g,
                data.nutrition.fat_g,
                data.nutrition.carbs_g,
                data.nutrition.sugar_g,
                serde_json::to_string(&data.tags)?,
                data.cook_time.map(|t| t.active_min),
                data.cook_time.map(|t| t.total_min),
                serde_json::to_string(&data.ingredients)?,
                serde_json::to_string(&data.instructions)?,
                data.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Get a recipe by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipes WHERE id = ?1")?;

        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(recipe) => Ok(Some(recipe)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Get several recipes in the order requested
    ///
    /// Returns the recipes found and the IDs that were not.
    pub fn get_many(conn: &Connection, ids: &[i64]) -> DbResult<(Vec<Self>, Vec<i64>)> {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for &id in ids {
            match Self::get_by_id(conn, id)? {
                Some(recipe) => found.push(recipe),
                None => missing.push(id),
            }
        }
        Ok((found, missing))
    }

    /// List recipes with optional filtering
    pub fn list(
        conn: &Connection,
        filter: &RecipeFilter<'_>,
        sort_by: &str,
        sort_order: &str,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Self>> {
        let order = if sort_order.eq_ignore_ascii_case("desc") { "DESC" } else { "ASC" };
        let sort_col = match sort_by.to_lowercase().as_str() {
            "created_at" => "created_at",
            "updated_at" => "updated_at",
            "category" => "category",
            "calories" => "per_serving_calories",
            "total_time" => "total_time_min",
            _ => "name",
        };

        let (where_clause, mut params_vec) = filter.where_clause();
        let sql = format!(
            "SELECT * FROM recipes{} ORDER BY {} {}, id {} LIMIT ?{} OFFSET ?{}",
            where_clause,
            sort_col,
            order,
            order,
            params_vec.len() + 1,
            params_vec.len() + 2
        );
        params_vec.push(Box::new(limit));
        params_vec.push(Box::new(offset));

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let recipes = stmt
            .query_map(params_refs.as_slice(), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recipes)
    }

    /// Count recipes matching a filter
    pub fn count(conn: &Connection, filter: &RecipeFilter<'_>) -> DbResult<i64> {
        let (where_clause, params_vec) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM recipes{}", where_clause);
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    /// Update a recipe, returning None if it does not exist
    pub fn update(conn: &Connection, id: i64, data: &RecipeUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref name) = data.name {
            params_vec.push(Box::new(name.clone()));
            updates.push(format!("name = ?{}", params_vec.len()));
        }
        if let Some(ref category) = data.category {
            params_vec.push(Box::new(category.clone()));
            updates.push(format!("category = ?{}", params_vec.len()));
        }
        if let Some(servings) = data.servings {
            params_vec.push(Box::new(servings));
            updates.push(format!("servings = ?{}", params_vec.len()));
        }
        if let Some(ref emoji) = data.emoji {
            params_vec.push(Box::new(emoji.clone()));
            updates.push(format!("emoji = ?{}", params_vec.len()));
        }
        if let Some(is_public) = data.is_public {
            params_vec.push(Box::new(is_public));
            updates.push(format!("is_public = ?{}", params_vec.len()));
        }
        if let Some(nutrition) = data.nutrition {
            for (column, value) in [
                ("per_serving_calories", nutrition.calories),
                ("per_serving_protein_g", nutrition.protein_g),
                ("per_serving_fat_g", nutrition.fat_g),
                ("per_serving_carbs_g", nutrition.carbs_g),
                ("per_serving_sugar_g", nutrition.sugar_g),
            ] {
                params_vec.push(Box::new(value));
                updates.push(format!("{} = ?{}", column, params_vec.len()));
            }
        }
        if let Some(ref tags) = data.tags {
            params_vec.push(Box::new(serde_json::to_string(tags)?));
            updates.push(format!("tags_json = ?{}", params_vec.len()));
        }
        if let Some(cook_time) = data.cook_time {
            params_vec.push(Box::new(cook_time.active_min));
            updates.push(format!("active_time_min = ?{}", params_vec.len()));
            params_vec.push(Box::new(cook_time.total_min));
            updates.push(format!("total_time_min = ?{}", params_vec.len()));
        }
        if let Some(ref ingredients) = data.ingredients {
            params_vec.push(Box::new(serde_json::to_string(ingredients)?));
            updates.push(format!("ingredients_json = ?{}", params_vec.len()));
        }
        if let Some(ref instructions) = data.instructions {
            params_vec.push(Box::new(serde_json::to_string(instructions)?));
            updates.push(format!("instructions_json = ?{}", params_vec.len()));
        }
        if let Some(ref notes) = data.notes {
            params_vec.push(Box::new(notes.clone()));
            updates.push(format!("notes = ?{}", params_vec.len()));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE recipes SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = conn.execute(&sql, params_refs.as_slice())?;
        if rows == 0 {
            return Ok(None);
        }

        Self::get_by_id(conn, id)
    }

    /// Delete a recipe. Returns Ok(false) if it was not found.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
