//! Terminal rendering of recipes, market pages and cash-shop offers

use std::fmt::Write;

use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_FULL};

use crate::bonus::BonusConfiguration;
use crate::cash_shop::CashShopOffer;
use crate::market::QueryPage;
use crate::models::Recipe;

/// Seconds as "HH:MM:SS"
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = seconds % 3600 / 60;
    let s = seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

fn gold(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:+.2}%", v))
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}

pub fn recipe_table<'a>(
    recipes: impl IntoIterator<Item = &'a Recipe>,
    bonuses: &BonusConfiguration,
) -> Table {
    let mut headers = vec!["Recipe", "Market", "Total", "Craft vs Buy", "Advice"];
    if bonuses.show_advanced_profit {
        headers.push("Profit/h");
    }
    let mut table = new_table(&headers);

    for recipe in recipes {
        let pricing = recipe.pricing.as_ref();
        let mut row = vec![
            Cell::new(recipe.name()),
            Cell::new(gold(recipe.price)),
            Cell::new(gold(pricing.map(|p| p.total))),
            Cell::new(percent(pricing.and_then(|p| p.craft_vs_buy))),
            Cell::new(pricing.map_or_else(|| "-".to_string(), |p| p.recommendation.to_string())),
        ];
        if bonuses.show_advanced_profit {
            row.push(Cell::new(
                pricing
                    .and_then(|p| p.profit_per_hour)
                    .map_or_else(|| "-".to_string(), |v| v.to_string()),
            ));
        }
        table.add_row(row);
    }
    table
}

/// Detail panel for one recipe with its ingredient breakdown
pub fn recipe_detail(recipe: &Recipe, bonuses: &BonusConfiguration) -> String {
    let mut out = String::new();
    let def = &recipe.definition;
    let _ = writeln!(out, "{} x{} ({} / {})", def.name, def.amount, def.category, def.sub_category);
    let _ = writeln!(
        out,
        "  Crafting fee: {} {:?}  Time: {}",
        recipe.discounts.cost,
        def.cost.kind,
        format_duration(recipe.discounts.crafting_time_seconds)
    );
    if bonuses.show_energy {
        let _ = writeln!(out, "  Energy: {}", recipe.discounts.energy);
    }
    if bonuses.show_stronghold_xp {
        let _ = writeln!(out, "  Stronghold XP: {}", recipe.discounts.stronghold_xp);
    }

    let _ = writeln!(out, "  Ingredients:");
    for (index, ingredient) in recipe.ingredients.iter().enumerate() {
        let mode = match (&ingredient.sub_recipe, ingredient.open) {
            (Some(_), true) => "craft",
            (Some(_), false) => "buy",
            (None, _) => "raw",
        };
        let _ = writeln!(
            out,
            "    [{}] {} x{}  market {}  ({})",
            index,
            ingredient.name,
            ingredient.amount,
            gold(ingredient.price),
            mode
        );
        if let Some(sub) = &ingredient.sub_recipe {
            let _ = writeln!(
                out,
                "        craft {} ({})  fee {}  time {}",
                gold(sub.craft_total),
                percent(sub.craft_vs_buy),
                sub.discounts.cost,
                format_duration(sub.discounts.crafting_time_seconds)
            );
            for item in &sub.ingredients {
                let _ = writeln!(out, "        - {} x{}  market {}", item.name, item.amount, gold(item.price));
            }
        }
    }

    match &recipe.pricing {
        Some(p) => {
            let _ = writeln!(out, "  Market price:  {}", gold(recipe.price));
            let _ = writeln!(out, "  Full craft:    {} ({})", p.craft_total, percent(p.full_craft_vs_buy));
            let _ = writeln!(
                out,
                "  Partial craft: {} ({})",
                p.partial_craft_total,
                percent(p.partial_craft_vs_buy)
            );
            let _ = writeln!(out, "  Recommendation: {}", p.recommendation);
            if let Some(profit) = p.profit_per_hour.filter(|_| bonuses.show_advanced_profit) {
                let _ = writeln!(out, "  Profit per hour: {}", profit);
            }
        }
        None => {
            let _ = writeln!(out, "  No market data");
        }
    }
    out
}

pub fn market_table(page: &QueryPage) -> Table {
    let mut table = new_table(&["Item", "Rarity", "Bundle", "Low", "Avg", "Recent", "Updated"]);
    for item in &page.items {
        let price = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v));
        table.add_row(vec![
            Cell::new(&item.name),
            Cell::new(item.rarity),
            Cell::new(item.amount),
            Cell::new(format!("{:.0}", item.low_price)),
            Cell::new(price(item.avg_price)),
            Cell::new(price(item.recent_price)),
            Cell::new(item.updated_at.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

pub fn cash_shop_table(offers: &[CashShopOffer]) -> Table {
    let mut table = new_table(&["Item", "Amount", "Crystals", "Gold", "Market", "Discount"]);
    for offer in offers {
        table.add_row(vec![
            Cell::new(&offer.item.name),
            Cell::new(offer.item.amount),
            Cell::new(offer.item.blue_crystals),
            Cell::new(gold(offer.gold_price)),
            Cell::new(gold(offer.market_gold_price)),
            Cell::new(offer.discount.map_or_else(|| "-".to_string(), |d| format!("{}%", d))),
        ]);
    }
    table
}
