//! Build script for Pantry
//!
//! Increments build number on each recompilation and embeds build metadata.

use std::fs;
use std::path::Path;

fn main() {
    // Only rerun when src/ files change (not on every cargo build)
    println!("cargo:rerun-if-changed=src");

    let build_number_path = Path::new("build_number.txt");

    let current_build: u64 = if build_number_path.exists() {
        fs::read_to_string(build_number_path)
            .unwrap_or_else(|_| "0".to_string())
            .trim()
            .parse()
            .unwrap_or(0)
    } else {
        0
    };

    let new_build = current_build + 1;

    // A read-only checkout still builds; the number just doesn't advance
    if let Err(e) = fs::write(build_number_path, new_build.to_string()) {
        println!("cargo:warning=Could not persist build number: {}", e);
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    println!("cargo:rustc-env=PANTRY_BUILD_NUMBER={}", new_build);
    println!("cargo:rustc-env=PANTRY_BUILD_TIMESTAMP={}", timestamp);
}
