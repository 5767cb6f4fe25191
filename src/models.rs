//! Data models for recipes, ingredients and their computed prices

use std::fmt;

use serde::{Deserialize, Serialize};

pub type RecipeId = String;

/// Currency a crafting fee is paid in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyKind {
    Gold,
    Silver,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub value: u64,
    #[serde(rename = "type")]
    pub kind: CurrencyKind,
}

impl Cost {
    /// Only gold fees compete with market prices, other currencies add nothing
    pub fn gold_component(&self, discounted: u64) -> u64 {
        match self.kind {
            CurrencyKind::Gold => discounted,
            _ => 0,
        }
    }
}

/// Reference from a recipe to something it consumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rarity: u8,
    pub amount: u32,
}

/// Static recipe record as shipped in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDefinition {
    pub id: RecipeId,
    pub name: String,
    pub category: String,
    pub sub_category: String,
    #[serde(default)]
    pub rarity: u8,
    /// Units produced per craft
    pub amount: u32,
    pub cost: Cost,
    #[serde(default)]
    pub energy: u64,
    /// "<hours>h <minutes>m", either part optional
    #[serde(default)]
    pub crafting_time: String,
    #[serde(default)]
    pub stronghold_xp: u64,
    pub ingredients: Vec<IngredientRef>,
}

/// Base values after the player's bonus modifiers are applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discounts {
    pub cost: u64,
    pub energy: u64,
    pub crafting_time_seconds: u64,
    pub stronghold_xp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Recommendation {
    Craft,
    PartialCraft,
    Buy,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::Craft => "Craft",
            Recommendation::PartialCraft => "Partial Craft",
            Recommendation::Buy => "Buy",
        };
        f.write_str(label)
    }
}

/// Raw material consumed by a sub-recipe, amount already rescaled
#[derive(Debug, Clone, PartialEq)]
pub struct SubIngredient {
    pub id: String,
    pub name: String,
    pub rarity: u8,
    pub amount: u32,
    pub price: Option<u64>,
}

/// Recipe that produces an ingredient, scaled to what the parent consumes
#[derive(Debug, Clone, PartialEq)]
pub struct SubRecipe {
    pub cost: Cost,
    pub energy: u64,
    pub crafting_time_seconds: u64,
    pub stronghold_xp: u64,
    pub ingredients: Vec<SubIngredient>,
    pub discounts: Discounts,
    pub craft_total: Option<u64>,
    pub craft_vs_buy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub rarity: u8,
    pub amount: u32,
    /// Crafted from its own sub-recipe instead of bought
    pub open: bool,
    pub price: Option<u64>,
    /// None for raw materials
    pub sub_recipe: Option<SubRecipe>,
}

impl Ingredient {
    pub fn is_craftable(&self) -> bool {
        self.sub_recipe.is_some()
    }

    pub fn craft_total(&self) -> Option<u64> {
        self.sub_recipe.as_ref().and_then(|sub| sub.craft_total)
    }

    pub fn craft_vs_buy(&self) -> Option<f64> {
        self.sub_recipe.as_ref().and_then(|sub| sub.craft_vs_buy)
    }

    /// Zero for raw materials
    pub fn crafting_time_seconds_discounted(&self) -> u64 {
        self.sub_recipe
            .as_ref()
            .map_or(0, |sub| sub.discounts.crafting_time_seconds)
    }
}

/// Totals and verdict for a recipe with a known market price
#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    pub craft_total: u64,
    pub partial_craft_total: u64,
    /// Either craft_total or partial_craft_total depending on `Recipe::open`
    pub total: u64,
    pub full_craft_vs_buy: Option<f64>,
    pub partial_craft_vs_buy: Option<f64>,
    pub craft_vs_buy: Option<f64>,
    pub recommendation: Recommendation,
    pub profit_per_hour: Option<i64>,
}

/// A catalog recipe expanded into its crafting graph, with computed prices
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub definition: RecipeDefinition,
    pub crafting_time_seconds: u64,
    pub ingredients: Vec<Ingredient>,
    pub discounts: Discounts,
    pub open: bool,
    /// None until market data has been applied
    pub price: Option<u64>,
    pub pricing: Option<Pricing>,
}

impl Recipe {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_priced(&self) -> bool {
        self.pricing.is_some()
    }

    /// At least 30% cheaper to craft than to buy, on either the displayed or the full-craft path
    pub fn is_recommended(&self) -> bool {
        self.pricing.as_ref().is_some_and(|p| {
            let displayed = p.craft_vs_buy.unwrap_or(0.0);
            let full = p.full_craft_vs_buy.unwrap_or(0.0);
            displayed.min(full) < -30.0
        })
    }
}
