//! Env-driven configuration, validated once at startup.
//!
//! Follows the teacher's `models::Config::from_env` idiom: `dotenv` for
//! local development, `std::env::var` with typed parsing and documented
//! fallbacks. Unlike the teacher, invalid values here are fatal — §7
//! treats bad configuration as a startup error, not a silently-clamped
//! default, so `from_env` validates before returning.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::Asset;

/// Cycle-enumeration bounds and starting assets (spec §6 `paths.*`).
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub min_len: usize,
    pub max_len: usize,
    pub start_assets: Vec<Asset>,
    pub allow_cross_exchange: bool,
    pub allow_revisit_assets: bool,
    pub allow_same_market_twice: bool,
}

/// Thresholds the evaluator rejects cycles against (spec §6 `risk_model.*`).
#[derive(Debug, Clone)]
pub struct RiskModelConfig {
    pub min_profit_margin: Decimal,
    pub vol_risk_multiplier: Decimal,
    pub slippage_coefficient: Decimal,
    pub staleness_bound: Duration,
    pub min_leg_fill_ratio: Decimal,
    pub reject_on_partial_fill: bool,
    /// Sigma substituted for a symbol with no volatility entry, or one
    /// whose entry is older than `max_sigma_age` (spec §4.3).
    pub fallback_sigma: f64,
    pub max_sigma_age: Duration,
}

/// Scan cadence and concurrency bound (spec §6 `execution.*`).
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub tick_interval: Duration,
    pub max_concurrent_evaluations: usize,
    pub input_notional: Decimal,
    pub opportunity_channel_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub paths: PathsConfig,
    pub risk_model: RiskModelConfig,
    pub execution: ExecutionConfig,
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let min_len = parse_env("PATHS_MIN_LEN", 2usize).context("PATHS_MIN_LEN")?;
        let max_len = parse_env("PATHS_MAX_LEN", 4usize).context("PATHS_MAX_LEN")?;
        let start_assets = env_var_or("PATHS_START_ASSETS", "USDT,USDC,BTC,ETH")
            .split(',')
            .map(Asset::new)
            .collect();
        let allow_cross_exchange =
            parse_env("PATHS_ALLOW_CROSS_EXCHANGE", false).context("PATHS_ALLOW_CROSS_EXCHANGE")?;
        let allow_revisit_assets =
            parse_env("PATHS_ALLOW_REVISIT_ASSETS", false).context("PATHS_ALLOW_REVISIT_ASSETS")?;
        let allow_same_market_twice = parse_env("PATHS_ALLOW_SAME_MARKET_TWICE", false)
            .context("PATHS_ALLOW_SAME_MARKET_TWICE")?;

        let min_profit_margin: Decimal =
            parse_env("RISK_MIN_PROFIT_MARGIN", "0.0015".to_string())
                .context("RISK_MIN_PROFIT_MARGIN")?
                .parse()
                .context("RISK_MIN_PROFIT_MARGIN: not a decimal")?;
        let vol_risk_multiplier: Decimal = parse_env("RISK_VOL_MULTIPLIER", "1.0".to_string())
            .context("RISK_VOL_MULTIPLIER")?
            .parse()
            .context("RISK_VOL_MULTIPLIER: not a decimal")?;
        let slippage_coefficient: Decimal =
            parse_env("RISK_SLIPPAGE_COEFFICIENT", "0.5".to_string())
                .context("RISK_SLIPPAGE_COEFFICIENT")?
                .parse()
                .context("RISK_SLIPPAGE_COEFFICIENT: not a decimal")?;
        let staleness_bound_ms = parse_env("RISK_STALENESS_BOUND_MS", 750u64)
            .context("RISK_STALENESS_BOUND_MS")?;
        let min_leg_fill_ratio: Decimal = parse_env("RISK_MIN_LEG_FILL_RATIO", "0.9".to_string())
            .context("RISK_MIN_LEG_FILL_RATIO")?
            .parse()
            .context("RISK_MIN_LEG_FILL_RATIO: not a decimal")?;
        let reject_on_partial_fill =
            parse_env("RISK_REJECT_ON_PARTIAL_FILL", true).context("RISK_REJECT_ON_PARTIAL_FILL")?;
        let fallback_sigma: f64 = parse_env("RISK_FALLBACK_SIGMA", "0.01".to_string())
            .context("RISK_FALLBACK_SIGMA")?
            .parse()
            .context("RISK_FALLBACK_SIGMA: not a float")?;
        let max_sigma_age_ms =
            parse_env("RISK_MAX_SIGMA_AGE_MS", 60_000u64).context("RISK_MAX_SIGMA_AGE_MS")?;

        let tick_interval_ms = parse_env("EXECUTION_TICK_INTERVAL_MS", 500u64)
            .context("EXECUTION_TICK_INTERVAL_MS")?;
        let max_concurrent_evaluations =
            parse_env("EXECUTION_MAX_CONCURRENT_EVALUATIONS", 32usize)
                .context("EXECUTION_MAX_CONCURRENT_EVALUATIONS")?;
        let input_notional: Decimal = parse_env("EXECUTION_INPUT_NOTIONAL", "1000".to_string())
            .context("EXECUTION_INPUT_NOTIONAL")?
            .parse()
            .context("EXECUTION_INPUT_NOTIONAL: not a decimal")?;
        let opportunity_channel_capacity =
            parse_env("EXECUTION_OPPORTUNITY_CHANNEL_CAPACITY", 256usize)
                .context("EXECUTION_OPPORTUNITY_CHANNEL_CAPACITY")?;

        let config = Self {
            paths: PathsConfig {
                min_len,
                max_len,
                start_assets,
                allow_cross_exchange,
                allow_revisit_assets,
                allow_same_market_twice,
            },
            risk_model: RiskModelConfig {
                min_profit_margin,
                vol_risk_multiplier,
                slippage_coefficient,
                staleness_bound: Duration::from_millis(staleness_bound_ms),
                min_leg_fill_ratio,
                reject_on_partial_fill,
                fallback_sigma,
                max_sigma_age: Duration::from_millis(max_sigma_age_ms),
            },
            execution: ExecutionConfig {
                tick_interval: Duration::from_millis(tick_interval_ms),
                max_concurrent_evaluations,
                input_notional,
                opportunity_channel_capacity,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.paths.min_len < 2 {
            bail!("PATHS_MIN_LEN must be >= 2, got {}", self.paths.min_len);
        }
        if self.paths.max_len < self.paths.min_len {
            bail!(
                "PATHS_MAX_LEN ({}) must be >= PATHS_MIN_LEN ({})",
                self.paths.max_len,
                self.paths.min_len
            );
        }
        if self.paths.start_assets.is_empty() {
            bail!("PATHS_START_ASSETS must name at least one asset");
        }
        if self.risk_model.min_profit_margin < Decimal::ZERO {
            bail!("RISK_MIN_PROFIT_MARGIN must be >= 0");
        }
        if self.risk_model.min_leg_fill_ratio <= Decimal::ZERO
            || self.risk_model.min_leg_fill_ratio > Decimal::ONE
        {
            bail!("RISK_MIN_LEG_FILL_RATIO must be in (0, 1]");
        }
        if self.execution.max_concurrent_evaluations == 0 {
            bail!("EXECUTION_MAX_CONCURRENT_EVALUATIONS must be > 0");
        }
        if self.execution.input_notional <= Decimal::ZERO {
            bail!("EXECUTION_INPUT_NOTIONAL must be > 0");
        }
        if self.risk_model.fallback_sigma < 0.0 {
            bail!("RISK_FALLBACK_SIGMA must be >= 0");
        }
        Ok(())
    }
}
