//! Pricing and recommendation engine
//!
//! Recomputes every derived field of the recipe book from base values,
//! current market prices and the active bonus configuration. Nothing here
//! reads a previously discounted value, so repeated runs never compound
//! rounding error.

use tracing::debug;

use crate::bonus::BonusConfiguration;
use crate::error::{CraftError, CraftResult};
use crate::graph::RecipeBook;
use crate::market::{MarketItem, MarketSnapshot};
use crate::models::{Pricing, Recipe, RecipeId, Recommendation};

/// Data-quality floor for recipes reporting near-zero crafting times
pub const MIN_CRAFT_SECONDS: u64 = 10;

/// Time the player spends claiming finished goods
pub const CLAIM_SECONDS: u64 = 10;

/// Round to nearest, halves toward positive infinity
pub fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Price of `amount` units given a market listing; 0 means no price data
pub fn unit_price(entry: Option<&MarketItem>, amount: u32) -> u64 {
    match entry {
        Some(item) if item.low_price > 0.0 && item.amount > 0 => {
            let price = round_half_up(item.low_price / f64::from(item.amount) * f64::from(amount));
            (price as u64).max(1)
        }
        _ => 0,
    }
}

/// Percentage difference of crafting versus buying, two decimals
///
/// Negative means crafting is cheaper. Undefined without a market price.
pub fn craft_vs_buy(total: u64, price: u64) -> Option<f64> {
    if price == 0 {
        return None;
    }
    let ratio = total as f64 / price as f64 - 1.0;
    Some(round_half_up(ratio * 10000.0) / 100.0)
}

pub fn recommend(craft_total: u64, partial_craft_total: u64, price: u64) -> Recommendation {
    if craft_total <= partial_craft_total {
        if craft_total < price {
            Recommendation::Craft
        } else {
            Recommendation::Buy
        }
    } else if partial_craft_total < price {
        Recommendation::PartialCraft
    } else {
        Recommendation::Buy
    }
}

fn set_prices(recipe: &mut Recipe, snapshot: &MarketSnapshot) {
    let definition = &recipe.definition;
    recipe.price = Some(unit_price(
        snapshot.lookup(&definition.name, definition.rarity),
        definition.amount,
    ));

    for ingredient in &mut recipe.ingredients {
        ingredient.price = Some(unit_price(
            snapshot.lookup(&ingredient.name, ingredient.rarity),
            ingredient.amount,
        ));
        if let Some(sub) = ingredient.sub_recipe.as_mut() {
            for item in &mut sub.ingredients {
                item.price = Some(unit_price(snapshot.lookup(&item.name, item.rarity), item.amount));
            }
        }
    }
}

/// Recompute discounts, totals, ratios, recommendation and profit of one recipe
pub fn update_discount(recipe: &mut Recipe, bonuses: &BonusConfiguration) {
    let priced = recipe.price.is_some();
    recipe.discounts = bonuses.discounts(
        recipe.definition.cost.value,
        recipe.definition.energy,
        recipe.crafting_time_seconds,
        recipe.definition.stronghold_xp,
    );

    for ingredient in &mut recipe.ingredients {
        let Some(sub) = ingredient.sub_recipe.as_mut() else {
            continue;
        };
        sub.discounts = bonuses.discounts(
            sub.cost.value,
            sub.energy,
            sub.crafting_time_seconds,
            sub.stronghold_xp,
        );

        if priced {
            let bought: u64 = sub.ingredients.iter().map(|i| i.price.unwrap_or(0)).sum();
            let craft_total = bought + sub.cost.gold_component(sub.discounts.cost);
            sub.craft_total = Some(craft_total);
            sub.craft_vs_buy = craft_vs_buy(craft_total, ingredient.price.unwrap_or(0));
        } else {
            sub.craft_total = None;
            sub.craft_vs_buy = None;
        }
    }

    let Some(price) = recipe.price else {
        recipe.pricing = None;
        return;
    };

    let fee = recipe.definition.cost.gold_component(recipe.discounts.cost);
    let craft_total = fee
        + recipe
            .ingredients
            .iter()
            .map(|i| i.craft_total().or(i.price).unwrap_or(0))
            .sum::<u64>();
    let partial_craft_total = fee
        + recipe
            .ingredients
            .iter()
            .map(|i| i.price.unwrap_or(0))
            .sum::<u64>();

    let full_craft_vs_buy = craft_vs_buy(craft_total, price);
    let partial_craft_vs_buy = craft_vs_buy(partial_craft_total, price);
    let (total, displayed) = if recipe.open {
        (craft_total, full_craft_vs_buy)
    } else {
        (partial_craft_total, partial_craft_vs_buy)
    };

    recipe.pricing = Some(Pricing {
        craft_total,
        partial_craft_total,
        total,
        full_craft_vs_buy,
        partial_craft_vs_buy,
        craft_vs_buy: displayed,
        recommendation: recommend(craft_total, partial_craft_total, price),
        profit_per_hour: None,
    });

    if bonuses.show_advanced_profit {
        calculate_profit_per_hour(recipe, bonuses);
    }
}

/// Gold per hour from crafting and selling, per the configured workbench count
///
/// Leaves the recipe untouched when it has no market price.
pub fn calculate_profit_per_hour(recipe: &mut Recipe, bonuses: &BonusConfiguration) {
    let price = recipe.price.unwrap_or(0);
    if price == 0 {
        return;
    }
    let Some(total) = recipe.pricing.as_ref().map(|p| p.total) else {
        return;
    };

    let mut seconds = recipe.discounts.crafting_time_seconds;
    if recipe.open {
        for ingredient in &recipe.ingredients {
            if !ingredient.open || !ingredient.is_craftable() {
                continue;
            }
            if ingredient.craft_vs_buy().is_some_and(|ratio| ratio > 0.0) {
                continue;
            }
            seconds += ingredient.crafting_time_seconds_discounted();
        }
    }
    let seconds = seconds.max(MIN_CRAFT_SECONDS) + CLAIM_SECONDS;

    let margin = price as f64 - total as f64;
    let per_hour = (margin / seconds as f64 * 3600.0).floor() as i64;
    if let Some(pricing) = recipe.pricing.as_mut() {
        pricing.profit_per_hour = Some(per_hour * i64::from(bonuses.workbench_count));
    }
}

/// Expand every ingredient when full crafting wins, otherwise buy them all
fn reset_expansion(recipe: &mut Recipe) {
    let craft = recipe
        .pricing
        .as_ref()
        .is_some_and(|p| p.recommendation == Recommendation::Craft);
    recipe.open = craft;
    for ingredient in &mut recipe.ingredients {
        ingredient.open = craft;
    }
}

fn recommendations(book: &RecipeBook) -> Vec<RecipeId> {
    book.iter()
        .filter(|r| r.is_recommended())
        .map(|r| r.id().to_string())
        .collect()
}

/// Price every recipe from a market snapshot and choose default expansion
///
/// Returns the ids of recommended recipes, in catalog order.
pub fn apply_market_data(
    book: &mut RecipeBook,
    snapshot: &MarketSnapshot,
    bonuses: &BonusConfiguration,
) -> Vec<RecipeId> {
    for recipe in book.iter_mut() {
        set_prices(recipe, snapshot);
        update_discount(recipe, bonuses);
        reset_expansion(recipe);
        update_discount(recipe, bonuses);
    }
    debug!(recipes = book.len(), items = snapshot.len(), "market data applied");
    recommendations(book)
}

/// Recompute every recipe; returns the recommended subset in catalog order
pub fn update_discounts(book: &mut RecipeBook, bonuses: &BonusConfiguration) -> Vec<RecipeId> {
    for recipe in book.iter_mut() {
        update_discount(recipe, bonuses);
    }
    recommendations(book)
}

/// Flip one ingredient between crafted and bought, then recompute the recipe
pub fn toggle_craft(
    book: &mut RecipeBook,
    recipe_id: &str,
    ingredient_index: usize,
    bonuses: &BonusConfiguration,
) -> CraftResult<()> {
    let recipe = book.get_mut(recipe_id)?;
    let Some(ingredient) = recipe.ingredients.get_mut(ingredient_index) else {
        return Err(CraftError::IngredientOutOfRange {
            recipe: recipe_id.to_string(),
            index: ingredient_index,
        });
    };

    ingredient.open = !ingredient.open;
    recipe.open = ingredient.open;
    update_discount(recipe, bonuses);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_recipes;
    use crate::graph::tests::{definition, ingredient};
    use crate::market::tests::market_item;
    use approx::assert_relative_eq;

    /// Bomb (1 per craft) = 30 powder + 4 ore + 100 gold, powder (10 per craft) = 7 ore + 3 herb + 40 gold
    fn fixture() -> (RecipeBook, MarketSnapshot) {
        let defs = vec![
            definition("bomb", 1, 100, "2h", vec![ingredient("powder", 30), ingredient("ore", 4)]),
            definition("powder", 10, 40, "30m", vec![ingredient("ore", 7), ingredient("herb", 3)]),
        ];
        let book = build_recipes(&defs).unwrap();
        let snapshot = MarketSnapshot::new(vec![
            market_item("bomb", 0, 1, 1000.0),
            market_item("powder", 0, 10, 150.0),
            market_item("ore", 0, 10, 20.0),
            market_item("herb", 0, 1, 5.0),
        ]);
        (book, snapshot)
    }

    #[test]
    fn craft_vs_buy_examples() {
        assert_relative_eq!(craft_vs_buy(700, 1000).unwrap(), -30.0);
        assert_relative_eq!(craft_vs_buy(1250, 1000).unwrap(), 25.0);
        assert_relative_eq!(craft_vs_buy(0, 1000).unwrap(), -100.0);
        assert_eq!(craft_vs_buy(700, 0), None);
    }

    #[test]
    fn halves_round_toward_positive_infinity() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.51), -3.0);
    }

    #[test]
    fn recommendation_decision_table() {
        assert_eq!(recommend(650, 700, 1000), Recommendation::Craft);
        assert_eq!(recommend(700, 700, 700), Recommendation::Buy);
        assert_eq!(recommend(800, 700, 1000), Recommendation::PartialCraft);
        assert_eq!(recommend(1200, 1100, 1000), Recommendation::Buy);
        assert_eq!(recommend(0, 0, 0), Recommendation::Buy);
    }

    #[test]
    fn unit_price_scales_and_floors_at_one() {
        let ore = market_item("ore", 0, 10, 20.0);
        assert_eq!(unit_price(Some(&ore), 4), 8);
        assert_eq!(unit_price(Some(&ore), 0), 1);
        assert_eq!(unit_price(None, 4), 0);

        let unlisted = market_item("ore", 0, 10, 0.0);
        assert_eq!(unit_price(Some(&unlisted), 4), 0);
    }

    #[test]
    fn unpriced_recipes_stay_unpriced() {
        let (mut book, _) = fixture();
        let recommended = update_discounts(&mut book, &BonusConfiguration::default());
        assert!(recommended.is_empty());

        let bomb = book.get("bomb").unwrap();
        assert!(!bomb.is_priced());
        assert_eq!(bomb.discounts.cost, 100);
        assert_eq!(bomb.ingredients[0].craft_total(), None);
    }

    #[test]
    fn rolls_up_full_and_partial_totals() {
        let (mut book, snapshot) = fixture();
        let recommended = apply_market_data(&mut book, &snapshot, &BonusConfiguration::default());

        let bomb = book.get("bomb").unwrap();
        assert_eq!(bomb.price, Some(1000));
        // powder: 30 units at 15 each, crafted from 21 ore (42) + 9 herb (45) + 120 gold
        assert_eq!(bomb.ingredients[0].price, Some(450));
        assert_eq!(bomb.ingredients[0].craft_total(), Some(207));
        assert_relative_eq!(bomb.ingredients[0].craft_vs_buy().unwrap(), -54.0);
        assert_eq!(bomb.ingredients[1].price, Some(8));

        let pricing = bomb.pricing.as_ref().unwrap();
        assert_eq!(pricing.craft_total, 207 + 8 + 100);
        assert_eq!(pricing.partial_craft_total, 450 + 8 + 100);
        assert_eq!(pricing.recommendation, Recommendation::Craft);
        assert_relative_eq!(pricing.full_craft_vs_buy.unwrap(), -68.5);
        assert_relative_eq!(pricing.partial_craft_vs_buy.unwrap(), -44.2);

        // Craft expands every ingredient and shows the full-craft path
        assert!(bomb.open);
        assert!(bomb.ingredients.iter().all(|i| i.open));
        assert_eq!(pricing.total, pricing.craft_total);
        assert_eq!(recommended, vec!["bomb".to_string(), "powder".to_string()]);
    }

    #[test]
    fn bonuses_discount_fees_from_base_values() {
        let (mut book, snapshot) = fixture();
        let bonuses = BonusConfiguration {
            cost_reduction: -10,
            crafting_time_reduction: -20,
            ..Default::default()
        };
        apply_market_data(&mut book, &snapshot, &bonuses);
        update_discounts(&mut book, &bonuses);

        let bomb = book.get("bomb").unwrap();
        assert_eq!(bomb.discounts.cost, 90);
        assert_eq!(bomb.discounts.crafting_time_seconds, 5760);
        assert_eq!(bomb.ingredients[0].sub_recipe.as_ref().unwrap().discounts.cost, 108);
        assert_eq!(bomb.pricing.as_ref().unwrap().craft_total, 42 + 45 + 108 + 8 + 90);
    }

    #[test]
    fn update_discounts_is_idempotent() {
        let (mut book, snapshot) = fixture();
        let bonuses = BonusConfiguration {
            cost_reduction: -7,
            energy_reduction: -13,
            stronghold_xp_increase: 11,
            workbench_count: 2,
            ..Default::default()
        };
        apply_market_data(&mut book, &snapshot, &bonuses);

        let first = update_discounts(&mut book, &bonuses);
        let before = book.clone();
        let second = update_discounts(&mut book, &bonuses);

        assert_eq!(first, second);
        for (a, b) in before.iter().zip(book.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn profit_per_hour_counts_expanded_craftable_ingredients() {
        let (mut book, snapshot) = fixture();
        let bonuses = BonusConfiguration {
            workbench_count: 2,
            ..Default::default()
        };
        apply_market_data(&mut book, &snapshot, &bonuses);

        let bomb = book.get("bomb").unwrap();
        // 2h bomb + 1.5h of powder (3 batches of 30m) + 10s claim
        let seconds = 7200.0 + 5400.0 + 10.0;
        let expected = ((1000.0 - 315.0) / seconds * 3600.0_f64).floor() as i64 * 2;
        assert_eq!(bomb.pricing.as_ref().unwrap().profit_per_hour, Some(expected));
    }

    #[test]
    fn profit_per_hour_floors_tiny_crafting_times() {
        let defs = vec![definition("snack", 1, 0, "", vec![ingredient("herb", 2)])];
        let mut book = build_recipes(&defs).unwrap();
        let snapshot = MarketSnapshot::new(vec![
            market_item("snack", 0, 1, 100.0),
            market_item("herb", 0, 1, 5.0),
        ]);
        apply_market_data(&mut book, &snapshot, &BonusConfiguration::default());

        let snack = book.get("snack").unwrap();
        // (100 - 10) gold over 10s floor + 10s claim
        assert_eq!(snack.pricing.as_ref().unwrap().profit_per_hour, Some(16200));
    }

    #[test]
    fn profit_is_skipped_without_price_or_when_hidden() {
        let (mut book, snapshot) = fixture();
        let hidden = BonusConfiguration {
            show_advanced_profit: false,
            ..Default::default()
        };
        apply_market_data(&mut book, &snapshot, &hidden);
        assert_eq!(book.get("bomb").unwrap().pricing.as_ref().unwrap().profit_per_hour, None);

        let (mut book, _) = fixture();
        apply_market_data(&mut book, &MarketSnapshot::default(), &BonusConfiguration::default());
        let bomb = book.get("bomb").unwrap();
        assert_eq!(bomb.price, Some(0));
        let pricing = bomb.pricing.as_ref().unwrap();
        assert_eq!(pricing.profit_per_hour, None);
        assert_eq!(pricing.full_craft_vs_buy, None);
        assert_eq!(pricing.recommendation, Recommendation::Buy);
    }

    #[test]
    fn toggling_twice_restores_displayed_values() {
        let (mut book, snapshot) = fixture();
        let bonuses = BonusConfiguration::default();
        apply_market_data(&mut book, &snapshot, &bonuses);
        let original = book.get("bomb").unwrap().clone();

        toggle_craft(&mut book, "bomb", 0, &bonuses).unwrap();
        let toggled = book.get("bomb").unwrap();
        let pricing = toggled.pricing.as_ref().unwrap();
        assert!(!toggled.open);
        assert_eq!(pricing.total, pricing.partial_craft_total);
        assert_eq!(pricing.craft_vs_buy, pricing.partial_craft_vs_buy);
        assert_ne!(pricing.profit_per_hour, original.pricing.as_ref().unwrap().profit_per_hour);

        toggle_craft(&mut book, "bomb", 0, &bonuses).unwrap();
        assert_eq!(book.get("bomb").unwrap(), &original);
    }

    #[test]
    fn toggle_rejects_unknown_targets() {
        let (mut book, _) = fixture();
        let bonuses = BonusConfiguration::default();
        assert!(matches!(
            toggle_craft(&mut book, "missing", 0, &bonuses),
            Err(CraftError::NotFound(_))
        ));
        assert!(matches!(
            toggle_craft(&mut book, "bomb", 9, &bonuses),
            Err(CraftError::IngredientOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn exactly_thirty_percent_cheaper_is_not_recommended() {
        let defs = vec![definition("stew", 1, 0, "10m", vec![ingredient("herb", 70)])];
        let mut book = build_recipes(&defs).unwrap();
        let snapshot = MarketSnapshot::new(vec![
            market_item("stew", 0, 1, 1000.0),
            market_item("herb", 0, 1, 10.0),
        ]);
        let recommended = apply_market_data(&mut book, &snapshot, &BonusConfiguration::default());

        let pricing = book.get("stew").unwrap().pricing.clone().unwrap();
        assert_eq!(pricing.craft_total, 700);
        assert_relative_eq!(pricing.craft_vs_buy.unwrap(), -30.0);
        assert_relative_eq!(pricing.full_craft_vs_buy.unwrap(), -30.0);
        assert!(recommended.is_empty());
    }

    #[test]
    fn just_past_thirty_percent_is_recommended() {
        // 6999 against 10000 is -30.01%
        let defs = vec![definition("stew", 1, 9, "10m", vec![ingredient("herb", 699)])];
        let mut book = build_recipes(&defs).unwrap();
        let snapshot = MarketSnapshot::new(vec![
            market_item("stew", 0, 1, 10000.0),
            market_item("herb", 0, 1, 10.0),
        ]);
        let recommended = apply_market_data(&mut book, &snapshot, &BonusConfiguration::default());

        let pricing = book.get("stew").unwrap().pricing.clone().unwrap();
        assert_eq!(pricing.craft_total, 6999);
        assert_relative_eq!(pricing.full_craft_vs_buy.unwrap(), -30.01);
        assert_eq!(recommended, vec!["stew".to_string()]);
    }

    #[test]
    fn missing_ingredient_prices_look_like_free_crafts() {
        let defs = vec![definition("snack", 1, 0, "1m", vec![ingredient("herb", 2)])];
        let mut book = build_recipes(&defs).unwrap();
        let snapshot = MarketSnapshot::new(vec![market_item("snack", 0, 1, 100.0)]);
        apply_market_data(&mut book, &snapshot, &BonusConfiguration::default());

        let pricing = book.get("snack").unwrap().pricing.clone().unwrap();
        assert_eq!(pricing.craft_total, 0);
        assert_relative_eq!(pricing.full_craft_vs_buy.unwrap(), -100.0);
        assert_eq!(pricing.recommendation, Recommendation::Craft);
    }
}
