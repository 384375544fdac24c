//! Pantry Tools module
//!
//! MCP tool implementations for Pantry.

pub mod grocery;
pub mod recipes;
pub mod status;
