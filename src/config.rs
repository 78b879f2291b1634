//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::fees::FeePolicy;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub betting: BettingConfig,
    pub treasury: TreasuryConfig,
    pub farcaster: FarcasterConfig,
    pub payments: PaymentsConfig,
    pub settlement: SettlementConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://castmarket.db?mode=rwc`.
    pub url: String,
    pub max_connections: u32,
}

/// Fee schedule and stake/duration limits.
#[derive(Debug, Deserialize, Clone)]
pub struct BettingConfig {
    pub base_fee: rust_decimal::Decimal,
    pub win_fee_rate: rust_decimal::Decimal,
    pub house_cut: rust_decimal::Decimal,
    pub min_bet: rust_decimal::Decimal,
    pub max_bet: rust_decimal::Decimal,
    pub min_duration_hours: i64,
    pub max_duration_hours: i64,
}

impl BettingConfig {
    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy {
            base_fee: self.base_fee,
            win_fee_rate: self.win_fee_rate,
            house_cut: self.house_cut,
            min_bet: self.min_bet,
            max_bet: self.max_bet,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TreasuryConfig {
    /// Account fee revenue is routed to.
    pub treasury_account: String,
    /// Account stakes are pooled in until settlement.
    pub escrow_account: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FarcasterConfig {
    pub hub_url: String,
    pub api_key_env: String,
    /// Seconds a cached profile stays fresh.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub rpc_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettlementConfig {
    pub auto_settle: bool,
    /// How often the background sweep looks for expired markets.
    pub interval_secs: u64,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that catch a bad schedule before it touches the ledger.
    fn validate(&self) -> Result<()> {
        use rust_decimal::Decimal;

        anyhow::ensure!(
            self.betting.house_cut >= Decimal::ZERO && self.betting.house_cut < Decimal::ONE,
            "house_cut must be in [0, 1)"
        );
        anyhow::ensure!(
            self.betting.win_fee_rate >= Decimal::ZERO && self.betting.win_fee_rate < Decimal::ONE,
            "win_fee_rate must be in [0, 1)"
        );
        anyhow::ensure!(
            self.betting.min_bet > Decimal::ZERO && self.betting.min_bet <= self.betting.max_bet,
            "min_bet must be positive and <= max_bet"
        );
        anyhow::ensure!(
            self.betting.min_duration_hours >= 1
                && self.betting.min_duration_hours <= self.betting.max_duration_hours,
            "duration bounds must satisfy 1 <= min <= max"
        );
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
