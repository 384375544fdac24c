//! Runtime configuration from environment variables

use std::path::PathBuf;

/// Database location override
pub const DATABASE_PATH_VAR: &str = "PANTRY_DATABASE_PATH";

/// Default tracing directive when RUST_LOG doesn't set one
pub const DEFAULT_LOG_DIRECTIVE: &str = "pantry=info";

/// Get the database path from environment or use default
pub fn get_database_path() -> PathBuf {
    std::env::var(DATABASE_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_database_path())
}

/// `<project>/data/pantry.db`, resolved from the running executable
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("pantry.db");
    path
}
