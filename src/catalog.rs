//! Recipe catalog loading
//!
//! The catalog is a JSON array of recipe definitions, either in a single
//! file or spread over every `*.json` file of a directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::CraftResult;
use crate::models::RecipeDefinition;

/// Parses crafting-time strings such as "1h 30m", "2h" or "45m"
pub struct CraftingTimeParser {
    pattern: Regex,
}

impl CraftingTimeParser {
    pub fn new() -> CraftResult<Self> {
        let pattern = Regex::new(r"^\s*(?:(\d{1,3})h)?\s?(?:(\d{1,2})m)?")?;
        Ok(Self { pattern })
    }

    /// Total seconds of the leading "<h>h <m>m" part; unparsable text counts as 0
    pub fn seconds(&self, text: &str) -> u64 {
        let Some(cap) = self.pattern.captures(text) else {
            warn!(crafting_time = text, "unparsable crafting time, using 0s");
            return 0;
        };
        let parsed = cap.get(0).map_or(0, |m| m.end());
        if parsed < text.trim_end().len() {
            warn!(crafting_time = text, "ignoring unparsed crafting time text");
        }

        let part = |index: usize| {
            cap.get(index)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0)
        };
        part(1) * 3600 + part(2) * 60
    }
}

/// Find every catalog file under a directory, sorted for a stable recipe order
pub fn find_catalog_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn read_definitions(path: &Path) -> Result<Vec<RecipeDefinition>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let definitions = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse recipes in {}", path.display()))?;
    Ok(definitions)
}

/// Load recipe definitions from a file or a directory of files
pub fn load_catalog(path: &Path) -> Result<Vec<RecipeDefinition>> {
    let files = if path.is_dir() {
        find_catalog_files(path)
    } else {
        vec![path.to_path_buf()]
    };

    let mut definitions = Vec::new();
    for file in &files {
        definitions.extend(read_definitions(file)?);
    }

    let stats = CatalogStats::from_definitions(files.len(), &definitions);
    info!("{}", stats);
    Ok(definitions)
}

#[derive(Debug, Default)]
pub struct CatalogStats {
    pub files: usize,
    pub recipes: usize,
    pub ingredients: usize,
    pub categories: usize,
}

impl CatalogStats {
    pub fn from_definitions(files: usize, definitions: &[RecipeDefinition]) -> Self {
        let mut categories: Vec<&str> = definitions.iter().map(|d| d.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();

        Self {
            files,
            recipes: definitions.len(),
            ingredients: definitions.iter().map(|d| d.ingredients.len()).sum(),
            categories: categories.len(),
        }
    }
}

impl std::fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} recipes ({} ingredient references, {} categories) from {} files",
            self.recipes, self.ingredients, self.categories, self.files
        )
    }
}
