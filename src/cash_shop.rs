//! Cash-shop value comparison
//!
//! Cash-shop goods are priced in blue crystals. Converting through the
//! market price of a blue crystal gives their gold value, which is then
//! compared with buying the same goods on the market.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::calculator::round_half_up;
use crate::market::{MarketSnapshot, market_slug};

pub const BLUE_CRYSTAL: &str = "Blue Crystal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashShopItem {
    pub cash_shop_id: String,
    /// Market key of the goods, when they are also traded on the market
    #[serde(default)]
    pub market_id: Option<String>,
    pub name: String,
    pub amount: u32,
    pub blue_crystals: f64,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub rarity: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashShopOffer {
    pub item: CashShopItem,
    pub gold_price: Option<u64>,
    pub market_gold_price: Option<u64>,
    /// Negative percent saved versus the market, only when the shop is cheaper
    pub discount: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CashShopFilter {
    pub search: Option<String>,
    pub favorites: Option<Vec<String>>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

impl CashShopFilter {
    /// Search wins over favorites, favorites over category
    fn matches(&self, item: &CashShopItem) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            return item.name.to_lowercase().contains(&search.to_lowercase());
        }
        if let Some(favorites) = &self.favorites {
            return favorites.contains(&item.cash_shop_id);
        }
        match (&self.category, &self.subcategory) {
            (Some(category), Some(subcategory)) => {
                item.category == *category && item.subcategory.as_ref() == Some(subcategory)
            }
            (Some(category), None) => item.category == *category,
            (None, _) => true,
        }
    }
}

pub fn load_items(path: &Path) -> Result<Vec<CashShopItem>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cash shop items in {}", path.display()))?;
    Ok(items)
}

/// Price one offer from the current blue crystal rate
pub fn price_item(item: &CashShopItem, snapshot: &MarketSnapshot) -> CashShopOffer {
    let crystal_price = snapshot
        .get(&market_slug(BLUE_CRYSTAL, 0))
        .map(|entry| entry.low_price)
        .filter(|price| *price > 0.0);

    let gold_price = crystal_price.map(|rate| round_half_up(item.blue_crystals * rate) as u64);
    let market_gold_price = item
        .market_id
        .as_deref()
        .and_then(|id| snapshot.get(id))
        .filter(|entry| entry.amount > 0)
        .map(|entry| {
            round_half_up(entry.low_price / f64::from(entry.amount) * f64::from(item.amount)) as u64
        });

    let discount = match (gold_price, market_gold_price) {
        (Some(gold), Some(market)) if market > gold => {
            let saved = (gold as f64 - market as f64) / market as f64 * 100.0;
            Some(round_half_up(saved) as i64)
        }
        _ => None,
    };

    CashShopOffer {
        item: item.clone(),
        gold_price,
        market_gold_price,
        discount,
    }
}

/// Filtered offers sorted by name
pub fn compare(
    items: &[CashShopItem],
    filter: &CashShopFilter,
    snapshot: &MarketSnapshot,
) -> Vec<CashShopOffer> {
    let mut offers: Vec<CashShopOffer> = items
        .iter()
        .filter(|item| filter.matches(item))
        .map(|item| price_item(item, snapshot))
        .collect();
    offers.sort_by(|a, b| a.item.name.cmp(&b.item.name));
    offers
}
