//! Multiplier growth and winnings.
//!
//! Each safe click compounds the multiplier by the bonus for the session's mine count:
//! `m' = m * (1 + bonus/100)`, starting from [STARTING_MULTIPLIER]. Bonuses are stored in
//! basis points so the table itself is exact.

use std::collections::BTreeMap;

use crate::{Error, Result};

/// Multiplier of a session before its first safe click.
pub const STARTING_MULTIPLIER: f64 = 1.0;

/// Default bonus per safe click, in basis points, by mine count.
pub const DEFAULT_BONUS_BPS: [(u8, u32); 8] = [
    (1, 500),
    (2, 800),
    (3, 1_200),
    (4, 1_500),
    (5, 1_800),
    (6, 2_200),
    (7, 2_500),
    (8, 3_000),
];

/// Absorbs representation error so that e.g. `25 * 1.12` floors to 28, not 27.
const FLOOR_EPSILON: f64 = 1e-9;

/// Explicit per-mine-count bonus table.
///
/// Counts above the largest entry use `fallback` when one is configured; any other count
/// outside the table is rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BonusTable {
    entries: BTreeMap<u8, u32>,
    fallback: Option<u32>,
}

impl BonusTable {
    /// Build a table, rejecting one whose bonus ever decreases as mines are added.
    pub fn new(
        entries: impl IntoIterator<Item = (u8, u32)>,
        fallback: Option<u32>,
    ) -> Result<Self> {
        let entries: BTreeMap<u8, u32> = entries.into_iter().collect();
        if entries.is_empty() {
            return Err(Error::InvalidParameter("bonus table is empty".to_string()));
        }
        if entries.contains_key(&0) {
            return Err(Error::InvalidParameter(
                "bonus table cannot contain a zero mine count".to_string(),
            ));
        }

        let mut previous: Option<(u8, u32)> = None;
        for (&mines, &bps) in &entries {
            if let Some((previous_mines, previous_bps)) = previous {
                if bps < previous_bps {
                    return Err(Error::InvalidParameter(format!(
                        "bonus for {mines} mines ({bps} bps) is below the bonus for {previous_mines} mines ({previous_bps} bps)"
                    )));
                }
            }
            previous = Some((mines, bps));
        }
        if let (Some(fallback), Some((mines, bps))) = (fallback, previous) {
            if fallback < bps {
                return Err(Error::InvalidParameter(format!(
                    "fallback bonus ({fallback} bps) is below the bonus for {mines} mines ({bps} bps)"
                )));
            }
        }

        Ok(Self { entries, fallback })
    }

    /// Smallest mine count in the table.
    pub fn min_mines(&self) -> u8 {
        self.entries.keys().next().copied().unwrap_or(1)
    }

    /// Largest mine count in the table (the fallback may extend beyond it).
    pub fn max_mines(&self) -> u8 {
        self.entries.keys().next_back().copied().unwrap_or(1)
    }

    pub fn bonus_bps(&self, mine_count: u8) -> Result<u32> {
        if let Some(bps) = self.entries.get(&mine_count) {
            return Ok(*bps);
        }
        match self.fallback {
            Some(bps) if mine_count > self.max_mines() => Ok(bps),
            _ => Err(Error::InvalidParameter(format!(
                "mine count must be between {} and {}",
                self.min_mines(),
                self.max_mines()
            ))),
        }
    }

    /// Bonus per safe click, in percent.
    pub fn bonus_percent(&self, mine_count: u8) -> Result<f64> {
        Ok(self.bonus_bps(mine_count)? as f64 / 100.0)
    }

    /// Multiplier after one more safe click.
    pub fn apply_safe_click(&self, current_multiplier: f64, mine_count: u8) -> Result<f64> {
        let bonus = self.bonus_percent(mine_count)?;
        Ok(current_multiplier * (1.0 + bonus / 100.0))
    }

    /// Multiplier after `safe_clicks` safe clicks from the start.
    pub fn multiplier_after(&self, mine_count: u8, safe_clicks: u32) -> Result<f64> {
        let bonus = self.bonus_percent(mine_count)?;
        let exponent = i32::try_from(safe_clicks)
            .map_err(|_| Error::InvalidParameter("too many safe clicks".to_string()))?;
        Ok(STARTING_MULTIPLIER * (1.0 + bonus / 100.0).powi(exponent))
    }
}

impl Default for BonusTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_BONUS_BPS.into_iter().collect(),
            fallback: None,
        }
    }
}

/// Winnings for a bet at the given multiplier, rounded down to whole points.
pub fn winnings(bet_amount: u64, multiplier: f64) -> u64 {
    (bet_amount as f64 * multiplier + FLOOR_EPSILON).floor() as u64
}
