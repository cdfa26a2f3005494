use minestake_execution::{BonusTable, EngineConfig, LedgerPolicy, RetryPolicy};
use minestake_types::mines::{
    Allowance, Cents, MoneyError, BOARD_SIDE, DEFAULT_MINES, MIN_POINT_PURCHASE,
    STARTING_FREE_TRIALS, STARTING_POINTS,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;

/// Configuration for the HTTP backend, usually read from YAML.
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-client rate limit. Disabled when absent.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Balances, limits and the bonus table. Currency amounts are decimals.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameConfig {
    #[serde(default = "default_starting_points")]
    pub starting_points: u64,
    #[serde(default = "default_starting_wallet")]
    pub starting_wallet: f64,
    #[serde(default = "default_starting_free_trials")]
    pub starting_free_trials: u32,
    #[serde(default = "default_min_wallet_operation")]
    pub min_wallet_operation: f64,
    #[serde(default = "default_min_point_purchase")]
    pub min_point_purchase: u64,
    #[serde(default)]
    pub point_price: f64,
    #[serde(default = "default_wallet_credit_per_point")]
    pub wallet_credit_per_point: f64,
    /// Bonus per safe click, in percent, by mine count.
    #[serde(default = "default_bonus_percent")]
    pub bonus_percent: BTreeMap<u8, f64>,
    /// Bonus, in percent, for mine counts above the largest table entry.
    #[serde(default)]
    pub fallback_bonus_percent: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_conflicts")]
    pub max_conflicts: u32,
    #[serde(default = "default_max_outages")]
    pub max_outages: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Interval, in milliseconds, in which one request is replenished.
    pub replenish_ms: u64,
    pub burst_size: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} is not a valid amount: {value}")]
    InvalidAmount {
        field: &'static str,
        value: f64,
        #[source]
        source: MoneyError,
    },
    #[error("bonus for {mines} mines is not a valid percentage: {value}")]
    InvalidBonus { mines: String, value: f64 },
    #[error("invalid bonus table")]
    InvalidBonusTable(#[source] minestake_execution::Error),
    #[error("mine count {mines} leaves no safe cell on a {side}x{side} board")]
    TooManyMines { mines: u8, side: u8 },
    #[error("rate limit of {burst_size} per {replenish_ms}ms cannot be enforced")]
    RateLimit { replenish_ms: u64, burst_size: u32 },
}

pub struct ValidatedConfig {
    pub port: u16,
    pub log_level: Level,
    pub log_json: bool,
    pub engine: EngineConfig,
    pub rate_limit: Option<RateLimitConfig>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_starting_points() -> u64 {
    STARTING_POINTS
}

fn default_starting_wallet() -> f64 {
    Allowance::default().wallet.as_decimal()
}

fn default_starting_free_trials() -> u32 {
    STARTING_FREE_TRIALS
}

fn default_min_wallet_operation() -> f64 {
    LedgerPolicy::default().min_wallet_operation.as_decimal()
}

fn default_min_point_purchase() -> u64 {
    MIN_POINT_PURCHASE
}

fn default_wallet_credit_per_point() -> f64 {
    LedgerPolicy::default().wallet_credit_per_point.as_decimal()
}

fn default_bonus_percent() -> BTreeMap<u8, f64> {
    minestake_execution::payout::DEFAULT_BONUS_BPS
        .into_iter()
        .map(|(mines, bps)| (mines, bps as f64 / 100.0))
        .collect()
}

fn default_max_conflicts() -> u32 {
    RetryPolicy::default().max_conflicts
}

fn default_max_outages() -> u32 {
    RetryPolicy::default().max_outages
}

fn default_backoff_ms() -> u64 {
    RetryPolicy::default().backoff.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
            log_json: false,
            game: GameConfig::default(),
            retry: RetryConfig::default(),
            rate_limit: None,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_points: default_starting_points(),
            starting_wallet: default_starting_wallet(),
            starting_free_trials: default_starting_free_trials(),
            min_wallet_operation: default_min_wallet_operation(),
            min_point_purchase: default_min_point_purchase(),
            point_price: 0.0,
            wallet_credit_per_point: default_wallet_credit_per_point(),
            bonus_percent: default_bonus_percent(),
            fallback_bonus_percent: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_conflicts: default_max_conflicts(),
            max_outages: default_max_outages(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn amount(field: &'static str, value: f64) -> Result<Cents, ConfigError> {
    Cents::from_decimal(value).map_err(|source| ConfigError::InvalidAmount {
        field,
        value,
        source,
    })
}

fn basis_points(mines: String, percent: f64) -> Result<u32, ConfigError> {
    let bps = (percent * 100.0).round();
    if !bps.is_finite() || bps < 0.0 || bps > u32::MAX as f64 {
        return Err(ConfigError::InvalidBonus {
            mines,
            value: percent,
        });
    }
    Ok(bps as u32)
}

impl Config {
    /// Read a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        let game = self.game;
        if game.min_point_purchase == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "min_point_purchase",
                value: 0,
            });
        }
        let ledger = LedgerPolicy {
            allowance: Allowance {
                points: game.starting_points,
                wallet: amount("starting_wallet", game.starting_wallet)?,
                free_trials: game.starting_free_trials,
            },
            min_wallet_operation: amount("min_wallet_operation", game.min_wallet_operation)?,
            min_point_purchase: game.min_point_purchase,
            point_price: amount("point_price", game.point_price)?,
            wallet_credit_per_point: amount(
                "wallet_credit_per_point",
                game.wallet_credit_per_point,
            )?,
        };

        let mut entries = Vec::with_capacity(game.bonus_percent.len());
        for (mines, percent) in game.bonus_percent {
            if mines as usize >= BOARD_SIDE as usize * BOARD_SIDE as usize {
                return Err(ConfigError::TooManyMines {
                    mines,
                    side: BOARD_SIDE,
                });
            }
            entries.push((mines, basis_points(mines.to_string(), percent)?));
        }
        let fallback = game
            .fallback_bonus_percent
            .map(|percent| basis_points("fallback".to_string(), percent))
            .transpose()?;
        let bonus = BonusTable::new(entries, fallback).map_err(ConfigError::InvalidBonusTable)?;
        if bonus.bonus_bps(DEFAULT_MINES).is_err() {
            tracing::warn!(
                mines = DEFAULT_MINES,
                "bonus table does not cover the default mine count"
            );
        }

        let retry = self.retry;
        if retry.max_conflicts == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "max_conflicts",
                value: 0,
            });
        }
        if let Some(rate_limit) = self.rate_limit {
            if rate_limit.replenish_ms == 0 {
                return Err(ConfigError::InvalidNonZero {
                    field: "rate_limit.replenish_ms",
                    value: 0,
                });
            }
            if rate_limit.burst_size == 0 {
                return Err(ConfigError::InvalidNonZero {
                    field: "rate_limit.burst_size",
                    value: 0,
                });
            }
        }

        Ok(ValidatedConfig {
            port: self.port,
            log_level,
            log_json: self.log_json,
            engine: EngineConfig {
                board_side: BOARD_SIDE,
                bonus,
                ledger,
                retry: RetryPolicy {
                    max_conflicts: retry.max_conflicts,
                    max_outages: retry.max_outages,
                    backoff: Duration::from_millis(retry.backoff_ms),
                },
            },
            rate_limit: self.rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.port, 8080);
        assert_eq!(validated.log_level, Level::INFO);
        assert!(!validated.log_json);
        assert!(validated.rate_limit.is_none());
        assert_eq!(validated.engine, EngineConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config: Config = serde_yaml::from_str(
            r#"
port: 9000
log_level: debug
log_json: true
game:
  starting_points: 500
  starting_wallet: 25.5
  point_price: 0.1
  bonus_percent:
    1: 5
    2: 7.5
  fallback_bonus_percent: 10
retry:
  backoff_ms: 5
rate_limit:
  replenish_ms: 100
  burst_size: 20
"#,
        )
        .unwrap();
        let validated = config.validate().unwrap();
        assert_eq!(validated.port, 9000);
        assert_eq!(validated.log_level, Level::DEBUG);
        assert!(validated.log_json);

        let engine = validated.engine;
        assert_eq!(engine.ledger.allowance.points, 500);
        assert_eq!(engine.ledger.allowance.wallet, Cents::new(2_550));
        assert_eq!(engine.ledger.point_price, Cents::new(10));
        assert_eq!(engine.bonus.bonus_bps(2).unwrap(), 750);
        assert_eq!(engine.bonus.bonus_bps(6).unwrap(), 1_000);
        assert_eq!(engine.retry.backoff, Duration::from_millis(5));
        assert_eq!(
            validated.rate_limit,
            Some(RateLimitConfig {
                replenish_ms: 100,
                burst_size: 20
            })
        );
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.clone().validate(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));

        config.log_level = "info".to_string();
        config.game.starting_wallet = -1.0;
        assert!(matches!(
            config.clone().validate(),
            Err(ConfigError::InvalidAmount { field: "starting_wallet", .. })
        ));

        config.game.starting_wallet = 100.0;
        config.game.bonus_percent = BTreeMap::from([(1, 10.0), (2, 5.0)]);
        assert!(matches!(
            config.clone().validate(),
            Err(ConfigError::InvalidBonusTable(_))
        ));

        config.game.bonus_percent = BTreeMap::from([(25, 10.0)]);
        assert!(matches!(
            config.clone().validate(),
            Err(ConfigError::TooManyMines { mines: 25, .. })
        ));

        config.game.bonus_percent = default_bonus_percent();
        config.rate_limit = Some(RateLimitConfig {
            replenish_ms: 0,
            burst_size: 1,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidNonZero { .. })
        ));
    }
}
