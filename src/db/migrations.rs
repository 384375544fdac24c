//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- RECIPES
        -- Ingredient and instruction lines are stored as JSON arrays;
        -- they are only ever read back whole.
        -- ============================================
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT,
            servings REAL NOT NULL DEFAULT 1 CHECK(servings > 0),
            emoji TEXT,
            is_public INTEGER NOT NULL DEFAULT 0 CHECK(is_public IN (0, 1)),
            per_serving_calories REAL NOT NULL DEFAULT 0,
            per_serving_protein_g REAL NOT NULL DEFAULT 0,
            per_serving_fat_g REAL NOT NULL DEFAULT 0,
            per_serving_carbs_g REAL NOT NULL DEFAULT 0,
            per_serving_sugar_g REAL NOT NULL DEFAULT 0,
            tags_json TEXT NOT NULL DEFAULT '[]',          -- ["quick", "vegetarian"]
            active_time_min INTEGER,
            total_time_min INTEGER,
            ingredients_json TEXT NOT NULL DEFAULT '[]',   -- [{name, quantity, unit, prep, optional, section}]
            instructions_json TEXT NOT NULL DEFAULT '[]',  -- [{step, text}]
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_recipes_name ON recipes(name);
        CREATE INDEX idx_recipes_category ON recipes(category);
        CREATE INDEX idx_recipes_public ON recipes(is_public, created_at);
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
