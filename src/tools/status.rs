//! Pantry Status Tool
//!
//! Provides runtime status information about the Pantry service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::{migrations, Database};
use crate::models::{Recipe, RecipeFilter};

/// Grocery list instructions for AI assistants
pub const GROCERY_INSTRUCTIONS: &str = r#"
# Pantry Grocery List Instructions

## Storing recipes

Call `create_recipe` with one entry per ingredient line:

```json
{"name": "Flour", "quantity": 1.5, "unit": "cup", "prep": "sifted", "section": "Batter"}
```

- `quantity` may be omitted (or 0) for "to taste" style lines.
- `unit` is free text. Recognised units merge; anything else is kept as written.
- Use the same ingredient name across recipes ("Eggs", not "Egg") so lines merge.
- `nutrition`, `tags` and `cook_time` are optional. Set `is_public: true` to
  list the recipe in `explore_recipes`.

## Unit kinds

| Kind | Examples | Merged? |
|------|----------|---------|
| volume | tsp, tbsp, cup, fl oz, pt, qt, gal, ml, l | yes, through milliliters |
| weight | oz, lb, g, kg | yes, through grams |
| count | each, clove, slice, can, pkg, stick, bunch, sprig, head, small/medium/large | yes, summed |
| other | pinch, dash, to taste, handful, blank | never |

Volume and weight of the same ingredient stay as separate lines: Pantry
does not guess densities.

## Building a list

1. `list_recipes` to find recipe IDs.
2. `generate_grocery_list` with `recipe_ids`.
   - `strict_count_units: true` keeps "2 clove" and "1 head" of garlic apart.
   - `sort_by_aisle: true` orders the list by store section when an API key
     is configured. If that fails the list comes back in its original order
     with `aisle_sorted: false`.
3. `export_grocery_list_markdown` for a printable checklist.

`aggregate_ingredients` merges ingredient lines you pass directly, without
stored recipes.
"#;

/// Status response
#[derive(Debug, Serialize)]
pub struct PantryStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub recipe_count: Option<i64>,
    pub aisle_sorting_enabled: bool,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Tracks process start time for uptime reporting
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status
    pub fn get_status(&self, database: &Database, aisle_sorting_enabled: bool) -> PantryStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        // A broken database shouldn't hide the rest of the status
        let schema_version = database.with_conn(migrations::get_schema_version).ok();
        let recipe_count = database
            .with_conn(|conn| Recipe::count(conn, &RecipeFilter::default()))
            .ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        PantryStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            recipe_count,
            aisle_sorting_enabled,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reports_database() {
        let database = Database::in_memory().unwrap();
        database.with_conn(migrations::run_migrations).unwrap();

        let tracker = StatusTracker::new(PathBuf::from("does-not-exist.db"));
        let status = tracker.get_status(&database, false);

        assert_eq!(status.schema_version, Some(1));
        assert_eq!(status.recipe_count, Some(0));
        assert_eq!(status.database_size_bytes, None);
        assert!(!status.aisle_sorting_enabled);
        assert_eq!(status.process_id, std::process::id());
    }
}
