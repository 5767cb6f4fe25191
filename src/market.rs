//! Market data: item records, lookup keys, sources and the browse query

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CraftError, CraftResult};

/// Market regions: slug and display name
pub const REGIONS: [(&str, &str); 5] = [
    ("north-america-east", "North America East"),
    ("north-america-west", "North America West"),
    ("europe-central", "Europe Central"),
    ("europe-west", "Europe West"),
    ("south-america", "South America"),
];

pub const DEFAULT_REGION: &str = "north-america-east";

pub fn region_name(slug: &str) -> CraftResult<&'static str> {
    REGIONS
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, name)| *name)
        .ok_or_else(|| CraftError::UnknownRegion(slug.to_string()))
}

/// Live market listing for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketItem {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Units per listing bundle
    pub amount: u32,
    #[serde(default)]
    pub rarity: u8,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub low_price: f64,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub recent_price: Option<f64>,
    #[serde(default)]
    pub cheapest_remaining: Option<u64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Lowercase, keep alphanumerics, turn whitespace runs into single hyphens
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut gap = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            gap = true;
        }
    }
    slug
}

/// Canonical market key for an item: "<slug>-<rarity>"
pub fn market_slug(name: &str, rarity: u8) -> String {
    format!("{}-{}", slugify(name), rarity)
}

/// Market items indexed by their canonical key
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    items: HashMap<String, MarketItem>,
}

impl MarketSnapshot {
    pub fn new(items: Vec<MarketItem>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (market_slug(&item.name, item.rarity), item))
            .collect();
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MarketItem> {
        self.items.get(key)
    }

    pub fn lookup(&self, name: &str, rarity: u8) -> Option<&MarketItem> {
        self.get(&market_slug(name, rarity))
    }
}

/// Parameters of a live data request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveDataRequest {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// Comma separated category names
    pub categories: Option<String>,
    /// Comma separated item names
    pub items: Option<String>,
}

fn comma_list_contains(list: &Option<String>, value: &str) -> bool {
    match list {
        Some(list) => list.split(',').any(|entry| entry.trim() == value),
        None => true,
    }
}

impl LiveDataRequest {
    pub fn matches(&self, item: &MarketItem) -> bool {
        self.category.as_ref().is_none_or(|c| *c == item.category)
            && self
                .subcategory
                .as_ref()
                .is_none_or(|s| item.subcategory.as_ref() == Some(s))
            && comma_list_contains(&self.categories, &item.category)
            && comma_list_contains(&self.items, &item.name)
    }
}

pub trait MarketSource {
    fn fetch(&self, request: &LiveDataRequest) -> Result<Vec<MarketItem>>;
}

/// Market export saved as a JSON array
///
/// `path` is either one export file or a directory holding one
/// `<region>.json` export per region.
pub struct JsonFileSource {
    path: PathBuf,
    region: String,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            region: DEFAULT_REGION.to_string(),
        }
    }

    pub fn with_region(mut self, slug: &str) -> CraftResult<Self> {
        region_name(slug)?;
        self.region = slug.to_string();
        Ok(self)
    }

    fn export_path(&self) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.json", self.region))
        } else {
            self.path.clone()
        }
    }
}

impl MarketSource for JsonFileSource {
    fn fetch(&self, request: &LiveDataRequest) -> Result<Vec<MarketItem>> {
        let path = self.export_path();
        debug!(region = %self.region, path = %path.display(), "reading market export");
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let items: Vec<MarketItem> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse market data in {}", path.display()))?;
        Ok(items.into_iter().filter(|item| request.matches(item)).collect())
    }
}

/// Fetch failures degrade to an empty listing
pub fn fetch_items(source: &dyn MarketSource, request: &LiveDataRequest) -> Vec<MarketItem> {
    match source.fetch(request) {
        Ok(items) => {
            debug!(items = items.len(), "market data fetched");
            items
        }
        Err(e) => {
            warn!("market data unavailable: {:#}", e);
            Vec::new()
        }
    }
}

pub fn fetch_snapshot(source: &dyn MarketSource, request: &LiveDataRequest) -> MarketSnapshot {
    MarketSnapshot::new(fetch_items(source, request))
}

pub type RequestId = u64;

/// Issues request ids; only the most recent request's response is accepted
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: RequestId,
}

impl RequestTracker {
    pub fn issue(&mut self) -> RequestId {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        id != 0 && id == self.latest
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FavoriteItem {
    pub name: String,
    pub rarity: u8,
}

impl FromStr for FavoriteItem {
    type Err = CraftError;

    /// "Oreha Relic:2"
    fn from_str(s: &str) -> CraftResult<Self> {
        let invalid = || CraftError::InvalidFavorite(s.to_string());
        let (name, rarity) = s.rsplit_once(':').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            rarity: rarity.trim().parse().map_err(|_| invalid())?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketFilter {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// `Some("")` is an empty search and matches nothing
    pub search: Option<String>,
    pub favorites: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortField {
    #[default]
    Name,
    Amount,
    Rarity,
    LowPrice,
    AvgPrice,
    RecentPrice,
    CheapestRemaining,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub index: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { index: 0, size: 10 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketQuery {
    pub filter: MarketFilter,
    pub page: PageRequest,
    pub sort: Sort,
}

#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<MarketItem>,
    /// Matching items before pagination
    pub total: usize,
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

fn compare(a: &MarketItem, b: &MarketItem, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Amount => a.amount.cmp(&b.amount),
        SortField::Rarity => a.rarity.cmp(&b.rarity),
        SortField::LowPrice => a.low_price.total_cmp(&b.low_price),
        SortField::AvgPrice => cmp_f64(a.avg_price, b.avg_price),
        SortField::RecentPrice => cmp_f64(a.recent_price, b.recent_price),
        SortField::CheapestRemaining => a.cheapest_remaining.cmp(&b.cheapest_remaining),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

fn matches_filter(item: &MarketItem, filter: &MarketFilter, favorites: &[FavoriteItem]) -> bool {
    if filter.favorites {
        return favorites
            .iter()
            .any(|f| f.name == item.name && f.rarity == item.rarity);
    }
    if let Some(search) = &filter.search {
        if search.is_empty() || !item.name.starts_with(search.as_str()) {
            return false;
        }
    }
    if let Some(category) = &filter.category {
        if item.category != *category {
            return false;
        }
        if let Some(subcategory) = &filter.subcategory {
            if item.subcategory.as_ref() != Some(subcategory) {
                return false;
            }
        }
    }
    true
}

/// Filter, sort and paginate a market listing
pub fn query(items: &[MarketItem], query: &MarketQuery, favorites: &[FavoriteItem]) -> QueryPage {
    let mut matched: Vec<MarketItem> = items
        .iter()
        .filter(|item| matches_filter(item, &query.filter, favorites))
        .cloned()
        .collect();

    // Base order: name descending, rarity ascending within a name
    matched.sort_by(|a, b| b.name.cmp(&a.name).then(a.rarity.cmp(&b.rarity)));
    matched.sort_by(|a, b| {
        let ord = compare(a, b, query.sort.field);
        match query.sort.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total = matched.len();
    let start = query.page.index.saturating_mul(query.page.size).min(total);
    let end = start.saturating_add(query.page.size).min(total);
    let items = matched.drain(start..end).collect();

    QueryPage { items, total }
}
