//! Database schema and settings persistence

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::bonus::BonusConfiguration;

/// Settings key the bonus configuration is stored under
pub const BONUS_KEY: &str = "craftingStrongholdBonuses";

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Key-value blobs (JSON encoded)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;
    Ok(())
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

/// Insert or replace a setting
pub fn put_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value, updated_at)
         VALUES (?1, ?2, CURRENT_TIMESTAMP)",
        (key, value),
    )?;
    Ok(())
}

/// Stored bonuses merged over defaults; defaults when nothing is stored
pub fn load_bonuses(conn: &Connection) -> Result<BonusConfiguration> {
    match get_setting(conn, BONUS_KEY)? {
        Some(json) => {
            let config: BonusConfiguration =
                serde_json::from_str(&json).context("Stored bonus configuration is corrupt")?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(BonusConfiguration::default()),
    }
}

pub fn save_bonuses(conn: &Connection, config: &BonusConfiguration) -> Result<()> {
    config.validate()?;
    put_setting(conn, BONUS_KEY, &serde_json::to_string(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn missing_bonuses_fall_back_to_defaults() {
        let conn = memory_db();
        assert_eq!(load_bonuses(&conn).unwrap(), BonusConfiguration::default());
    }

    #[test]
    fn bonuses_round_trip_through_settings() {
        let conn = memory_db();
        let config = BonusConfiguration {
            cost_reduction: -12,
            workbench_count: 3,
            show_energy: false,
            ..Default::default()
        };
        save_bonuses(&conn, &config).unwrap();
        assert_eq!(load_bonuses(&conn).unwrap(), config);
    }

    #[test]
    fn partial_blob_keeps_defaults() {
        let conn = memory_db();
        put_setting(&conn, BONUS_KEY, r#"{"energyReduction": -5}"#).unwrap();
        let config = load_bonuses(&conn).unwrap();
        assert_eq!(config.energy_reduction, -5);
        assert_eq!(config.workbench_count, 1);
    }

    #[test]
    fn invalid_values_are_refused() {
        let conn = memory_db();
        let config = BonusConfiguration {
            stronghold_xp_increase: 50,
            ..Default::default()
        };
        assert!(save_bonuses(&conn, &config).is_err());

        put_setting(&conn, BONUS_KEY, r#"{"workbenchCount": 9}"#).unwrap();
        assert!(load_bonuses(&conn).is_err());
    }
}
