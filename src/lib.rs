//! Pantry Library
//!
//! Recipe storage and consolidated grocery lists with unit-aware merging.

pub mod aisle;
pub mod build_info;
pub mod config;
pub mod db;
pub mod grocery;
pub mod mcp;
pub mod models;
pub mod tools;
