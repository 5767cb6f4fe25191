//! Recipe graph construction
//!
//! Every recipe is expanded exactly two levels deep: recipe → ingredient →
//! sub-ingredient. An ingredient that is itself a catalog recipe carries
//! that recipe's fields, rescaled to the amount the parent consumes.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::calculator::round_half_up;
use crate::catalog::CraftingTimeParser;
use crate::error::{CraftError, CraftResult};
use crate::models::{
    Cost, Discounts, Ingredient, IngredientRef, Recipe, RecipeDefinition, SubIngredient, SubRecipe,
};

/// Arena of recipes in catalog order, indexed by id
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
    index: HashMap<String, usize>,
}

impl RecipeBook {
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn get(&self, id: &str) -> CraftResult<&Recipe> {
        self.index
            .get(id)
            .map(|&i| &self.recipes[i])
            .ok_or_else(|| CraftError::NotFound(id.to_string()))
    }

    /// Mutable access stays inside the crate so only the pricing engine writes
    pub(crate) fn get_mut(&mut self, id: &str) -> CraftResult<&mut Recipe> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.recipes[i]),
            None => Err(CraftError::NotFound(id.to_string())),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Recipe> {
        self.recipes.iter_mut()
    }
}

/// Scale a per-batch value of a sub-recipe to the amount actually consumed
fn rescale(value: u64, consumed: u32, batch: u32) -> u64 {
    round_half_up(value as f64 * f64::from(consumed) / f64::from(batch)) as u64
}

fn build_sub_recipe(
    reference: &IngredientRef,
    sub: &RecipeDefinition,
    times: &CraftingTimeParser,
) -> SubRecipe {
    let consumed = reference.amount;
    let batch = sub.amount;

    let ingredients = sub
        .ingredients
        .iter()
        .map(|item| SubIngredient {
            id: item.id.clone(),
            name: item.name.clone(),
            rarity: item.rarity,
            amount: rescale(u64::from(item.amount), consumed, batch) as u32,
            price: None,
        })
        .collect();

    SubRecipe {
        cost: Cost {
            value: rescale(sub.cost.value, consumed, batch),
            kind: sub.cost.kind.clone(),
        },
        energy: rescale(sub.energy, consumed, batch),
        crafting_time_seconds: rescale(times.seconds(&sub.crafting_time), consumed, batch),
        stronghold_xp: rescale(sub.stronghold_xp, consumed, batch),
        ingredients,
        discounts: Discounts::default(),
        craft_total: None,
        craft_vs_buy: None,
    }
}

fn build_ingredient(
    reference: &IngredientRef,
    definitions: &HashMap<&str, &RecipeDefinition>,
    times: &CraftingTimeParser,
) -> Ingredient {
    let sub_recipe = match definitions.get(reference.id.as_str()) {
        Some(sub) if sub.amount == 0 => {
            warn!(recipe = %sub.id, "sub-recipe produces nothing per craft, treating as raw material");
            None
        }
        Some(sub) => Some(build_sub_recipe(reference, sub, times)),
        None => None,
    };

    Ingredient {
        id: reference.id.clone(),
        name: reference.name.clone(),
        rarity: reference.rarity,
        amount: reference.amount,
        open: false,
        price: None,
        sub_recipe,
    }
}

/// Build the crafting graph for every definition, in catalog order
pub fn build_recipes(definitions: &[RecipeDefinition]) -> CraftResult<RecipeBook> {
    let times = CraftingTimeParser::new()?;
    let mut by_id: HashMap<&str, &RecipeDefinition> = HashMap::new();
    for definition in definitions {
        by_id.entry(definition.id.as_str()).or_insert(definition);
    }

    let mut book = RecipeBook::default();
    for definition in definitions {
        if book.contains(&definition.id) {
            warn!(recipe = %definition.id, "duplicate recipe id, keeping the first definition");
            continue;
        }

        let ingredients = definition
            .ingredients
            .iter()
            .map(|reference| build_ingredient(reference, &by_id, &times))
            .collect();

        let recipe = Recipe {
            definition: definition.clone(),
            crafting_time_seconds: times.seconds(&definition.crafting_time),
            ingredients,
            discounts: Discounts::default(),
            open: false,
            price: None,
            pricing: None,
        };

        book.index.insert(definition.id.clone(), book.recipes.len());
        book.recipes.push(recipe);
    }

    debug!(recipes = book.len(), "recipe graph built");
    Ok(book)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::CurrencyKind;

    pub(crate) fn ingredient(id: &str, amount: u32) -> IngredientRef {
        IngredientRef {
            id: id.to_string(),
            name: id.replace('-', " "),
            rarity: 0,
            amount,
        }
    }

    pub(crate) fn definition(
        id: &str,
        amount: u32,
        cost: u64,
        crafting_time: &str,
        ingredients: Vec<IngredientRef>,
    ) -> RecipeDefinition {
        RecipeDefinition {
            id: id.to_string(),
            name: id.replace('-', " "),
            category: "Special".to_string(),
            sub_category: "Fusion".to_string(),
            rarity: 0,
            amount,
            cost: Cost {
                value: cost,
                kind: CurrencyKind::Gold,
            },
            energy: 5,
            crafting_time: crafting_time.to_string(),
            stronghold_xp: 12,
            ingredients,
        }
    }

    #[test]
    fn raw_ingredients_have_no_sub_recipe() {
        let defs = vec![definition("potion", 3, 30, "1h 30m", vec![ingredient("herb", 24)])];
        let book = build_recipes(&defs).unwrap();

        let potion = book.get("potion").unwrap();
        assert_eq!(potion.crafting_time_seconds, 5400);
        assert_eq!(potion.ingredients.len(), 1);
        assert!(!potion.ingredients[0].is_craftable());
        assert_eq!(potion.ingredients[0].crafting_time_seconds_discounted(), 0);
        assert!(potion.price.is_none());
    }

    #[test]
    fn integral_multiples_rescale_exactly() {
        let defs = vec![
            definition("bomb", 1, 100, "2h", vec![ingredient("powder", 30), ingredient("ore", 4)]),
            definition("powder", 10, 40, "30m", vec![ingredient("ore", 7), ingredient("herb", 3)]),
        ];
        let book = build_recipes(&defs).unwrap();

        let powder = book.get("bomb").unwrap().ingredients[0]
            .sub_recipe
            .as_ref()
            .unwrap();
        assert_eq!(powder.energy, 15);
        assert_eq!(powder.cost.value, 120);
        assert_eq!(powder.stronghold_xp, 36);
        assert_eq!(powder.crafting_time_seconds, 3 * 1800);
        assert_eq!(powder.ingredients[0].amount, 21);
        assert_eq!(powder.ingredients[1].amount, 9);
    }

    #[test]
    fn fractional_rescale_rounds_to_nearest() {
        let defs = vec![
            definition("bomb", 1, 100, "2h", vec![ingredient("powder", 15)]),
            definition("powder", 10, 41, "1m", vec![ingredient("ore", 3)]),
        ];
        let book = build_recipes(&defs).unwrap();

        let powder = book.get("bomb").unwrap().ingredients[0]
            .sub_recipe
            .as_ref()
            .unwrap();
        // 41 * 1.5 = 61.5 rounds up, 3 * 1.5 = 4.5 rounds up
        assert_eq!(powder.cost.value, 62);
        assert_eq!(powder.ingredients[0].amount, 5);
        assert_eq!(powder.crafting_time_seconds, 90);
    }

    #[test]
    fn zero_batch_sub_recipe_is_raw() {
        let defs = vec![
            definition("bomb", 1, 100, "2h", vec![ingredient("powder", 15)]),
            definition("powder", 0, 41, "1m", vec![ingredient("ore", 3)]),
        ];
        let book = build_recipes(&defs).unwrap();
        assert!(!book.get("bomb").unwrap().ingredients[0].is_craftable());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let book = build_recipes(&[]).unwrap();
        assert!(book.is_empty());
        assert!(matches!(book.get("missing"), Err(CraftError::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn keeps_catalog_order_and_first_duplicate() {
        let defs = vec![
            definition("b", 1, 1, "", vec![]),
            definition("a", 1, 2, "", vec![]),
            definition("b", 1, 3, "", vec![]),
        ];
        let book = build_recipes(&defs).unwrap();
        let ids: Vec<&str> = book.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(book.get("b").unwrap().definition.cost.value, 1);
    }
}
