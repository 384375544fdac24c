//! Print a consolidated grocery list for stored recipes
//! Usage: cargo run --bin grocery_list -- <recipe_id> [recipe_id...] [--strict]

use pantry::config::get_database_path;
use pantry::db::{migrations, Database};
use pantry::grocery::{aggregate_with_policy, render_plain_text};
use pantry::models::Recipe;
use pantry::tools::grocery::{count_policy, ingredient_lines};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut strict = false;
    let mut ids = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--strict" {
            strict = true;
            continue;
        }
        ids.push(arg.parse::<i64>().map_err(|e| format!("Invalid recipe id '{}': {}", arg, e))?);
    }
    if ids.is_empty() {
        return Err("Usage: grocery_list <recipe_id> [recipe_id...] [--strict]".into());
    }

    let db_path = get_database_path();
    eprintln!("Database: {}", db_path.display());

    let database = Database::new(&db_path)?;
    let (recipes, missing) = database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        Recipe::get_many(conn, &ids)
    })?;

    for id in &missing {
        eprintln!("Recipe {} not found, skipping", id);
    }
    for recipe in &recipes {
        eprintln!("  {} ({} ingredients)", recipe.name, recipe.ingredients.len());
    }

    let entries = ingredient_lines(&recipes);
    let items = aggregate_with_policy(&entries, count_policy(strict));

    print!("{}", render_plain_text(&items));
    Ok(())
}
