//! Player bonus modifiers and the settings holder that publishes changes

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculator::round_half_up;
use crate::error::{CraftError, CraftResult};
use crate::models::Discounts;

/// Percentage modifiers granted by the player's stronghold research
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BonusConfiguration {
    pub cost_reduction: i32,
    pub energy_reduction: i32,
    pub crafting_time_reduction: i32,
    pub stronghold_xp_increase: i32,
    pub workbench_count: i32,
    pub show_stronghold_xp: bool,
    pub show_energy: bool,
    pub show_advanced_profit: bool,
}

impl Default for BonusConfiguration {
    fn default() -> Self {
        Self {
            cost_reduction: 0,
            energy_reduction: 0,
            crafting_time_reduction: 0,
            stronghold_xp_increase: 0,
            workbench_count: 1,
            show_stronghold_xp: true,
            show_energy: true,
            show_advanced_profit: true,
        }
    }
}

fn check_range(field: &'static str, value: i32, min: i32, max: i32) -> CraftResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CraftError::InvalidBonus {
            field,
            min,
            max,
            value,
        })
    }
}

impl BonusConfiguration {
    pub fn validate(&self) -> CraftResult<()> {
        check_range("costReduction", self.cost_reduction, -30, 0)?;
        check_range("energyReduction", self.energy_reduction, -30, 0)?;
        check_range("craftingTimeReduction", self.crafting_time_reduction, -30, 0)?;
        check_range("strongholdXpIncrease", self.stronghold_xp_increase, 0, 30)?;
        check_range("workbenchCount", self.workbench_count, 1, 3)?;
        Ok(())
    }

    /// Discounted values derived from untouched base values
    pub fn discounts(&self, cost: u64, energy: u64, crafting_time_seconds: u64, stronghold_xp: u64) -> Discounts {
        Discounts {
            cost: apply_modifier(cost, self.cost_reduction),
            energy: apply_modifier(energy, self.energy_reduction),
            crafting_time_seconds: apply_modifier(crafting_time_seconds, self.crafting_time_reduction),
            stronghold_xp: apply_modifier(stronghold_xp, self.stronghold_xp_increase),
        }
    }
}

/// round(base * (1 + modifier / 100))
pub fn apply_modifier(base: u64, modifier: i32) -> u64 {
    let scaled = base as f64 * (1.0 + f64::from(modifier) / 100.0);
    round_half_up(scaled).max(0.0) as u64
}

/// Single writer for the active bonus configuration
///
/// Every accepted update is pushed to all live subscribers.
#[derive(Debug, Default)]
pub struct BonusSettings {
    current: BonusConfiguration,
    subscribers: Vec<Sender<BonusConfiguration>>,
}

impl BonusSettings {
    pub fn new(initial: BonusConfiguration) -> CraftResult<Self> {
        initial.validate()?;
        Ok(Self {
            current: initial,
            subscribers: Vec::new(),
        })
    }

    pub fn current(&self) -> &BonusConfiguration {
        &self.current
    }

    pub fn subscribe(&mut self) -> Receiver<BonusConfiguration> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Returns whether the configuration changed
    pub fn update(&mut self, config: BonusConfiguration) -> CraftResult<bool> {
        config.validate()?;
        if config == self.current {
            return Ok(false);
        }

        self.current = config;
        self.subscribers.retain(|tx| tx.send(config).is_ok());
        debug!(subscribers = self.subscribers.len(), "bonus configuration updated");
        Ok(true)
    }
}
