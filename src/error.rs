//! Error types for the crafting engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CraftError {
    /// Lookup by an id that is not in the current recipe book
    #[error("Recipe not found: {0}")]
    NotFound(String),

    #[error("Unknown crafting category: {0}")]
    UnknownCategory(String),

    #[error("Invalid favorite {0:?}, expected NAME:RARITY")]
    InvalidFavorite(String),

    #[error("Unknown market region: {0}")]
    UnknownRegion(String),

    #[error("Recipe {recipe} has no ingredient at index {index}")]
    IngredientOutOfRange { recipe: String, index: usize },

    #[error("Invalid bonus: {field} must be within {min}..={max}, got {value}")]
    InvalidBonus {
        field: &'static str,
        min: i32,
        max: i32,
        value: i32,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type CraftResult<T> = std::result::Result<T, CraftError>;
