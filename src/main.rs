//! Crafting Profitability Calculator
//!
//! Decides whether game-market goods are cheaper to craft or to buy.

mod bonus;
mod calculator;
mod cash_shop;
mod catalog;
mod db;
mod debounce;
mod error;
mod graph;
mod market;
mod models;
mod report;
mod session;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::bonus::{BonusConfiguration, BonusSettings};
use crate::market::{
    DEFAULT_REGION, FavoriteItem, JsonFileSource, LiveDataRequest, MarketFilter, MarketQuery,
    MarketSnapshot, PageRequest, Sort, SortDirection, SortField,
};
use crate::session::{CraftingSession, Event, View};

/// Market categories that carry crafting inputs and outputs
const CRAFTING_MARKET_CATEGORIES: &str =
    "Combat Supplies,Cooking,Trader,Sailing,Enhancement Material";

/// Market categories relevant to cash-shop goods
const CASH_SHOP_MARKET_CATEGORIES: &str = "Currency Exchange,Enhancement Material,Combat Supplies";

#[derive(Parser)]
#[command(name = "craft-calculator")]
#[command(about = "Crafting profitability calculator for game-market goods")]
struct Cli {
    /// Path to the SQLite database holding settings
    #[arg(short, long, default_value = "craft_data.db")]
    database: PathBuf,

    /// Recipe catalog: a JSON file or a directory of JSON files
    #[arg(short, long, default_value = "data/craftingdata.json")]
    catalog: PathBuf,

    /// Market snapshot exported as JSON, or a directory of `<region>.json` exports
    #[arg(short, long)]
    market: Option<PathBuf>,

    /// Market region slug (north-america-east, europe-west, ...)
    #[arg(short, long, default_value = DEFAULT_REGION)]
    region: String,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// List recipes of a menu category
    List {
        /// Menu slug (favorites, recommendations, battle-item, cooking, ...)
        #[arg(default_value = "recommendations")]
        category: String,

        /// Only show one subcategory (slug)
        #[arg(short, long)]
        subcategory: Option<String>,

        /// Search recipe names instead of browsing a category
        #[arg(long)]
        search: Option<String>,

        /// Favorite recipe ids
        #[arg(short, long = "favorite")]
        favorites: Vec<String>,
    },

    /// Show the cost breakdown of one recipe
    Show {
        /// Recipe id
        id: String,

        /// Flip an ingredient between crafting and buying (by index)
        #[arg(short, long)]
        toggle: Vec<usize>,
    },

    /// Recipes at least 30% cheaper to craft than to buy
    Recommend,

    /// Browse the market snapshot
    Market {
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        subcategory: Option<String>,

        /// Name prefix
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_enum, default_value_t = SortField::Name)]
        sort: SortField,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        #[arg(long, default_value_t = 0)]
        page: usize,

        #[arg(long, default_value_t = 10)]
        page_size: usize,

        /// Only show favorites, given as NAME:RARITY
        #[arg(long = "favorite")]
        favorites: Vec<FavoriteItem>,
    },

    /// Compare cash-shop offers with market prices
    CashShop {
        /// Cash-shop items exported as JSON
        items: PathBuf,

        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        subcategory: Option<String>,

        /// Only show these cash-shop ids
        #[arg(short, long = "favorite")]
        favorites: Vec<String>,
    },

    /// Read or change the stored bonus modifiers
    Bonus {
        #[command(subcommand)]
        action: BonusAction,
    },
}

#[derive(Subcommand)]
enum BonusAction {
    /// Print the stored configuration
    Show,

    /// Change individual modifiers
    Set {
        /// Crafting fee modifier in percent (-30..=0)
        #[arg(long, allow_hyphen_values = true)]
        cost_reduction: Option<i32>,

        /// Energy modifier in percent (-30..=0)
        #[arg(long, allow_hyphen_values = true)]
        energy_reduction: Option<i32>,

        /// Crafting time modifier in percent (-30..=0)
        #[arg(long, allow_hyphen_values = true)]
        crafting_time_reduction: Option<i32>,

        /// Stronghold XP bonus in percent (0..=30)
        #[arg(long)]
        stronghold_xp_increase: Option<i32>,

        /// Parallel workbenches (1..=3)
        #[arg(long)]
        workbench_count: Option<i32>,

        #[arg(long)]
        show_stronghold_xp: Option<bool>,

        #[arg(long)]
        show_energy: Option<bool>,

        #[arg(long)]
        show_advanced_profit: Option<bool>,
    },

    /// Restore defaults
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "craft_calculator=debug"
    } else {
        "craft_calculator=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match &cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::List {
            category,
            subcategory,
            search,
            favorites,
        } => {
            let mut session = open_session(&cli, &conn)?;
            for id in favorites {
                if session.is_favorite(id) {
                    continue;
                }
                if let Err(e) = session.toggle_favorite(id) {
                    warn!("skipping favorite: {}", e);
                }
            }

            let view = match search {
                Some(term) => {
                    if session.autocomplete(term).is_empty() {
                        println!("No recipe name contains \"{}\" (searches need 3 characters).", term);
                        return Ok(());
                    }
                    View::Search(term.clone())
                }
                None => View::from_slug(category)?,
            };
            session.navigate(view);

            let menus: Vec<_> = session
                .submenu()
                .iter()
                .filter(|menu| subcategory.as_ref().is_none_or(|s| *s == menu.id))
                .collect();
            if menus.is_empty() {
                println!("Nothing to show.");
            }
            for menu in menus {
                println!("== {} ==", menu.name);
                let recipes = menu.items.iter().filter_map(|id| session.recipe(id).ok());
                println!("{}", report::recipe_table(recipes, session.bonuses()));
            }
        }

        Commands::Show { id, toggle } => {
            let mut session = open_session(&cli, &conn)?;
            let bonuses = *session.bonuses();
            match session.show(id, toggle)? {
                Some(recipe) => {
                    if recipe.id() != id {
                        println!("Recipe {} not found, showing {} instead.\n", id, recipe.id());
                    }
                    if !recipe.is_priced() {
                        warn!(recipe = recipe.id(), "no market price, showing base values only");
                    }
                    print!("{}", report::recipe_detail(recipe, &bonuses));
                }
                None => println!("Recipe {} not found and nothing to show instead.", id),
            }
        }

        Commands::Recommend => {
            let session = open_session(&cli, &conn)?;
            let recommended: Vec<_> = session.recommendations().collect();
            if recommended.is_empty() {
                println!("No recommendations. Is a market snapshot loaded?");
            } else {
                println!("{}", report::recipe_table(recommended, session.bonuses()));
            }
        }

        Commands::Market {
            category,
            subcategory,
            search,
            sort,
            desc,
            page,
            page_size,
            favorites,
        } => {
            let Some(path) = &cli.market else {
                bail!("--market is required to browse market data");
            };
            let source = JsonFileSource::new(path).with_region(&cli.region)?;
            let items = market::fetch_items(&source, &LiveDataRequest::default());
            let query = MarketQuery {
                filter: MarketFilter {
                    category: category.clone(),
                    subcategory: subcategory.clone(),
                    search: search.clone(),
                    favorites: !favorites.is_empty(),
                },
                page: PageRequest {
                    index: *page,
                    size: *page_size,
                },
                sort: Sort {
                    field: *sort,
                    direction: if *desc {
                        SortDirection::Desc
                    } else {
                        SortDirection::Asc
                    },
                },
            };
            let result = market::query(&items, &query, favorites);
            println!("{}", report::market_table(&result));
            println!("Page {} ({} of {} items)", page, result.items.len(), result.total);
        }

        Commands::CashShop {
            items,
            search,
            category,
            subcategory,
            favorites,
        } => {
            let shop_items = cash_shop::load_items(items)?;
            let snapshot = load_market(&cli, CASH_SHOP_MARKET_CATEGORIES)?;
            let filter = cash_shop::CashShopFilter {
                search: search.clone(),
                favorites: (!favorites.is_empty()).then(|| favorites.clone()),
                category: category.clone(),
                subcategory: subcategory.clone(),
            };
            let offers = cash_shop::compare(&shop_items, &filter, &snapshot);
            println!("{}", report::cash_shop_table(&offers));
        }

        Commands::Bonus { action } => run_bonus(&cli, &conn, action)?,
    }

    Ok(())
}

fn load_market(cli: &Cli, categories: &str) -> Result<MarketSnapshot> {
    let Some(path) = &cli.market else {
        warn!("no market snapshot given, prices are unavailable");
        return Ok(MarketSnapshot::default());
    };
    let source = JsonFileSource::new(path).with_region(&cli.region)?;
    let request = LiveDataRequest {
        categories: Some(categories.to_string()),
        ..Default::default()
    };
    Ok(market::fetch_snapshot(&source, &request))
}

/// Build the recipe graph and price it from the market snapshot
fn open_session(cli: &Cli, conn: &Connection) -> Result<CraftingSession> {
    let definitions = catalog::load_catalog(&cli.catalog)?;
    let book = graph::build_recipes(&definitions)?;
    if book.is_empty() {
        warn!("catalog {} contains no recipes", cli.catalog.display());
    }
    let settings = BonusSettings::new(db::load_bonuses(conn)?)?;
    let mut session = CraftingSession::new(book, settings, Vec::new());

    let request = session.request_market_data();
    let snapshot = load_market(cli, CRAFTING_MARKET_CATEGORIES)?;
    if !snapshot.is_empty() {
        session.push(Event::MarketData { request, snapshot });
        session.process()?;
    }
    Ok(session)
}

/// Apply bonus edits through the session and persist what it publishes
fn commit_bonuses(cli: &Cli, conn: &Connection, edits: Vec<BonusConfiguration>) -> Result<()> {
    let mut session = open_session(cli, conn)?;
    let published = session.subscribe_bonuses();

    if !session.edit_bonuses(edits, Instant::now())? {
        println!("Bonus configuration unchanged");
        return Ok(());
    }
    for config in published.try_iter() {
        db::save_bonuses(conn, &config)?;
        info!("bonus configuration saved");
    }

    println!("{}", serde_json::to_string_pretty(session.bonuses())?);
    let recommended: Vec<_> = session.recommendations().collect();
    if !recommended.is_empty() {
        println!("{}", report::recipe_table(recommended, session.bonuses()));
    }
    Ok(())
}

fn run_bonus(cli: &Cli, conn: &Connection, action: &BonusAction) -> Result<()> {
    match action {
        BonusAction::Show => {
            let config = db::load_bonuses(conn)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        BonusAction::Set {
            cost_reduction,
            energy_reduction,
            crafting_time_reduction,
            stronghold_xp_increase,
            workbench_count,
            show_stronghold_xp,
            show_energy,
            show_advanced_profit,
        } => {
            // Every changed field is one form edit
            let mut config = db::load_bonuses(conn)?;
            let mut edits = Vec::new();
            macro_rules! take {
                ($field:ident) => {
                    if let Some(value) = $field {
                        config.$field = *value;
                        edits.push(config);
                    }
                };
            }
            take!(cost_reduction);
            take!(energy_reduction);
            take!(crafting_time_reduction);
            take!(stronghold_xp_increase);
            take!(workbench_count);
            take!(show_stronghold_xp);
            take!(show_energy);
            take!(show_advanced_profit);

            commit_bonuses(cli, conn, edits)?;
        }
        BonusAction::Reset => {
            commit_bonuses(cli, conn, vec![BonusConfiguration::default()])?;
        }
    }
    Ok(())
}
