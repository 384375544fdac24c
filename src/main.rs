//! Pantry
//!
//! An MCP server for recipes and grocery lists.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use pantry::aisle::{AisleClient, AisleConfig, AnthropicAisleClient};
use pantry::config::{get_database_path, DEFAULT_LOG_DIRECTIVE};
use pantry::mcp::PantryService;
use pantry::{build_info, db};

/// Aisle sorting is optional; without a client lists keep their merged order
fn build_aisle_client() -> Option<Arc<dyn AisleClient>> {
    let config = AisleConfig::from_env();
    match AnthropicAisleClient::new(&config) {
        Ok(client) => {
            tracing::info!("Aisle sorting enabled (model {})", config.model);
            let client: Arc<dyn AisleClient> = Arc::new(client);
            Some(client)
        }
        Err(e) => {
            tracing::info!("Aisle sorting disabled: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(DEFAULT_LOG_DIRECTIVE.parse()?))
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let db_path = get_database_path();
    eprintln!("Database path: {}", db_path.display());

    // Ensure data directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = db::Database::new(&db_path)?;

    database.with_conn(|conn| {
        if db::migrations::needs_migration(conn)? {
            eprintln!("Database schema is out of date, migrating...");
        }
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let service = PantryService::new(db_path, database, build_aisle_client());

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
