//! Crafting session: the state a crafting browser works against
//!
//! Owns the recipe book, the bonus settings and the menu/selection model.
//! Market responses, bonus changes and ingredient toggles are queued as
//! events and applied strictly in the order they were triggered.

use std::collections::VecDeque;
use std::time::Instant;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::bonus::{BonusConfiguration, BonusSettings};
use crate::calculator;
use crate::debounce::{BONUS_DEBOUNCE, Debouncer};
use crate::error::{CraftError, CraftResult};
use crate::graph::RecipeBook;
use crate::market::{MarketSnapshot, RequestId, RequestTracker, slugify};
use crate::models::{Recipe, RecipeId};

/// Menu entries in display order: slug and category name
pub const CATEGORIES: [(&str, &str); 8] = [
    ("favorites", "Favorites"),
    ("recommendations", "Recommendations"),
    ("battle-item", "Battle Item"),
    ("cooking", "Cooking"),
    ("structure", "Structure"),
    ("tools", "Tools"),
    ("special", "Special"),
    ("farm", "Farm"),
];

/// Recipes in the recommendations view must stay at least this far below market
const RECOMMENDATION_KEEP_THRESHOLD: f64 = -20.0;

const AUTOCOMPLETE_MIN_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Favorites,
    Recommendations,
    Search(String),
    Category(String),
}

impl View {
    /// Resolve a menu slug into a view
    pub fn from_slug(slug: &str) -> CraftResult<Self> {
        match slug {
            "favorites" => Ok(View::Favorites),
            "recommendations" => Ok(View::Recommendations),
            _ if category_name(slug).is_some() => Ok(View::Category(slug.to_string())),
            _ => Err(CraftError::UnknownCategory(slug.to_string())),
        }
    }
}

pub fn category_name(slug: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, name)| *name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubMenu {
    pub id: String,
    pub name: String,
    pub items: Vec<RecipeId>,
}

#[derive(Debug, Clone)]
pub enum Event {
    MarketData {
        request: RequestId,
        snapshot: MarketSnapshot,
    },
    Bonuses(BonusConfiguration),
    Toggle {
        recipe: RecipeId,
        index: usize,
    },
}

pub struct CraftingSession {
    book: RecipeBook,
    settings: BonusSettings,
    favorites: Vec<RecipeId>,
    recommendations: Vec<RecipeId>,
    requests: RequestTracker,
    events: VecDeque<Event>,
    bonus_input: Debouncer<BonusConfiguration>,
    view: View,
    submenu: Vec<SubMenu>,
    selected: Option<RecipeId>,
}

impl CraftingSession {
    pub fn new(mut book: RecipeBook, settings: BonusSettings, favorites: Vec<RecipeId>) -> Self {
        let recommendations = calculator::update_discounts(&mut book, settings.current());
        let mut session = Self {
            book,
            settings,
            favorites,
            recommendations,
            requests: RequestTracker::default(),
            events: VecDeque::new(),
            bonus_input: Debouncer::new(BONUS_DEBOUNCE),
            view: View::Recommendations,
            submenu: Vec::new(),
            selected: None,
        };
        session.submenu = session.build_submenu(&View::Recommendations);
        session
    }

    pub fn bonuses(&self) -> &BonusConfiguration {
        self.settings.current()
    }

    pub fn subscribe_bonuses(&mut self) -> Receiver<BonusConfiguration> {
        self.settings.subscribe()
    }

    pub fn recipe(&self, id: &str) -> CraftResult<&Recipe> {
        self.book.get(id)
    }

    pub fn recommendations(&self) -> impl Iterator<Item = &Recipe> {
        self.recommendations
            .iter()
            .filter_map(|id| self.book.get(id).ok())
    }

    pub fn submenu(&self) -> &[SubMenu] {
        &self.submenu
    }

    pub fn selected(&self) -> Option<&Recipe> {
        self.selected.as_deref().and_then(|id| self.book.get(id).ok())
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.iter().any(|f| f == id)
    }

    /// Returns whether the recipe is a favorite afterwards
    pub fn toggle_favorite(&mut self, id: &str) -> CraftResult<bool> {
        self.book.get(id)?;
        let now_favorite = match self.favorites.iter().position(|f| f == id) {
            Some(index) => {
                self.favorites.remove(index);
                false
            }
            None => {
                self.favorites.push(id.to_string());
                true
            }
        };
        if self.view == View::Favorites {
            self.submenu = self.build_submenu(&View::Favorites);
        }
        Ok(now_favorite)
    }

    /// Start a market request; earlier outstanding requests become stale
    pub fn request_market_data(&mut self) -> RequestId {
        self.requests.issue()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Apply queued events in order, stopping at the first failure
    pub fn process(&mut self) -> CraftResult<usize> {
        let mut applied = 0;
        while let Some(event) = self.events.pop_front() {
            if self.apply(event)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn apply(&mut self, event: Event) -> CraftResult<bool> {
        match event {
            Event::MarketData { request, snapshot } => {
                if !self.requests.is_current(request) {
                    debug!(request, "dropping superseded market data");
                    return Ok(false);
                }
                self.recommendations =
                    calculator::apply_market_data(&mut self.book, &snapshot, self.settings.current());
                info!(
                    items = snapshot.len(),
                    recommendations = self.recommendations.len(),
                    "market prices applied"
                );
            }
            Event::Bonuses(config) => {
                if !self.settings.update(config)? {
                    return Ok(false);
                }
                self.recommendations =
                    calculator::update_discounts(&mut self.book, self.settings.current());
            }
            Event::Toggle { recipe, index } => {
                calculator::toggle_craft(&mut self.book, &recipe, index, self.settings.current())?;
                return Ok(true);
            }
        }
        self.refresh_view();
        Ok(true)
    }

    /// Record bonus form input; applied once input has been quiet long enough
    pub fn bonus_input(&mut self, config: BonusConfiguration, now: Instant) {
        self.bonus_input.push(config, now);
    }

    /// Returns whether a debounced bonus change was applied
    pub fn tick(&mut self, now: Instant) -> CraftResult<bool> {
        let Some(config) = self.bonus_input.poll(now) else {
            return Ok(false);
        };
        self.push(Event::Bonuses(config));
        Ok(self.process()? > 0)
    }

    /// Feed successive form edits through the debouncer
    ///
    /// Only the last edit reaches the settings, once the quiet period after
    /// `now` has passed. Returns whether it changed the configuration.
    pub fn edit_bonuses(
        &mut self,
        edits: impl IntoIterator<Item = BonusConfiguration>,
        now: Instant,
    ) -> CraftResult<bool> {
        for config in edits {
            self.bonus_input(config, now);
        }
        self.tick(now + BONUS_DEBOUNCE)
    }

    pub fn toggle_craft(&mut self, recipe: &str, index: usize) -> CraftResult<()> {
        self.push(Event::Toggle {
            recipe: recipe.to_string(),
            index,
        });
        self.process().map(|_| ())
    }

    fn sorted_by_name<'a>(recipes: impl Iterator<Item = &'a Recipe>) -> Vec<RecipeId> {
        let mut recipes: Vec<&Recipe> = recipes.collect();
        recipes.sort_by(|a, b| a.name().cmp(b.name()));
        recipes.iter().map(|r| r.id().to_string()).collect()
    }

    fn single(items: Vec<RecipeId>) -> Vec<SubMenu> {
        vec![SubMenu {
            id: "all".to_string(),
            name: "All".to_string(),
            items,
        }]
    }

    pub fn build_submenu(&self, view: &View) -> Vec<SubMenu> {
        match view {
            View::Favorites => Self::single(
                Self::sorted_by_name(self.book.iter().filter(|r| self.is_favorite(r.id()))),
            ),
            View::Recommendations => Self::single(self.recommendations.clone()),
            View::Search(term) => {
                let term = term.to_lowercase();
                Self::single(Self::sorted_by_name(
                    self.book
                        .iter()
                        .filter(|r| r.name().to_lowercase().contains(&term)),
                ))
            }
            View::Category(slug) => {
                let Some(category) = category_name(slug) else {
                    return Vec::new();
                };
                let in_category: Vec<&Recipe> = self
                    .book
                    .iter()
                    .filter(|r| r.definition.category == category)
                    .collect();

                let mut subcategories: Vec<&str> = Vec::new();
                for recipe in &in_category {
                    let sub = recipe.definition.sub_category.as_str();
                    if !subcategories.contains(&sub) {
                        subcategories.push(sub);
                    }
                }

                subcategories
                    .into_iter()
                    .map(|sub| SubMenu {
                        id: slugify(sub),
                        name: sub.to_string(),
                        items: Self::sorted_by_name(
                            in_category
                                .iter()
                                .copied()
                                .filter(|r| r.definition.sub_category == sub),
                        ),
                    })
                    .collect()
            }
        }
    }

    /// Switch views; the selection falls back to the first listed recipe
    pub fn navigate(&mut self, view: View) {
        self.submenu = self.build_submenu(&view);
        self.view = view;
        let keep = self
            .selected
            .as_deref()
            .is_some_and(|id| self.submenu.iter().any(|s| s.items.iter().any(|i| i == id)));
        if !keep {
            self.selected = self.first_item();
        }
    }

    fn first_item(&self) -> Option<RecipeId> {
        self.submenu.iter().find_map(|s| s.items.first().cloned())
    }

    pub fn select_recipe(&mut self, id: &str) -> CraftResult<&Recipe> {
        let recipe = self.book.get(id)?;
        self.selected = Some(recipe.id().to_string());
        Ok(recipe)
    }

    /// Select by id, or the first recipe of the current submenu when the id is stale
    pub fn select_or_fallback(&mut self, id: &str) -> Option<&Recipe> {
        match self.select_recipe(id) {
            Ok(_) => {}
            Err(e) => {
                warn!("{}, falling back to the first listed recipe", e);
                self.selected = self.first_item();
            }
        }
        self.selected()
    }

    /// Select a recipe for display and flip the requested ingredients
    ///
    /// A stale id shows the first recipe of the current submenu instead,
    /// without toggling anything on it.
    pub fn show(&mut self, id: &str, toggles: &[usize]) -> CraftResult<Option<&Recipe>> {
        let Some(shown) = self.select_or_fallback(id).map(|r| r.id().to_string()) else {
            return Ok(None);
        };
        if shown == id {
            for &index in toggles {
                self.toggle_craft(&shown, index)?;
            }
        } else if !toggles.is_empty() {
            warn!(recipe = %shown, "ignoring ingredient toggles for a fallback recipe");
        }
        Ok(self.selected())
    }

    /// Recipe names containing the term, once at least three characters are typed
    pub fn autocomplete(&self, term: &str) -> Vec<&str> {
        if term.chars().count() < AUTOCOMPLETE_MIN_CHARS {
            return Vec::new();
        }
        let term = term.to_lowercase();
        self.book
            .iter()
            .map(|r| r.name())
            .filter(|name| name.to_lowercase().contains(&term))
            .collect()
    }

    fn refresh_view(&mut self) {
        if matches!(self.view, View::Category(_)) {
            return;
        }
        self.submenu = self.build_submenu(&self.view);

        if self.view == View::Recommendations {
            let stale = self.selected().is_none_or(|r| {
                r.pricing
                    .as_ref()
                    .and_then(|p| p.craft_vs_buy)
                    .is_none_or(|ratio| ratio > RECOMMENDATION_KEEP_THRESHOLD)
            });
            if stale {
                self.selected = self.first_item();
            }
        } else if self.selected.is_none() {
            self.selected = self.first_item();
        }
    }
}
