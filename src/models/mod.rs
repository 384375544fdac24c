//! Data models for Pantry

mod recipe;

pub use recipe::{
    CalorieRange, CookTime, Instruction, PerServingNutrition, Recipe, RecipeCreate, RecipeFilter,
    RecipeUpdate,
};
