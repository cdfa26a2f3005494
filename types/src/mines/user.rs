use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::{Cents, GameId, STARTING_FREE_TRIALS, STARTING_POINTS, STARTING_WALLET_CENTS};

/// Opaque user identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Balances a new user is registered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allowance {
    pub points: u64,
    pub wallet: Cents,
    pub free_trials: u32,
}

impl Default for Allowance {
    fn default() -> Self {
        Self {
            points: STARTING_POINTS,
            wallet: Cents::new(STARTING_WALLET_CENTS),
            free_trials: STARTING_FREE_TRIALS,
        }
    }
}

/// Authoritative balance record for a user.
///
/// Only the ledger mutates this record. It doubles as the snapshot returned to clients after
/// every balance-affecting request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub points: u64,
    pub wallet_balance: Cents,
    pub free_trials_left: u32,
    pub total_games: u64,
    pub total_winnings: u64,
    /// Stake of the active session. Leaves `points` only when the session settles.
    pub reserved_points: u64,
    /// The user's in-progress session, if any.
    pub active_game: Option<GameId>,
    pub created_at: u64,
}

impl User {
    pub fn new(user_id: UserId, allowance: Allowance, created_at: u64) -> Self {
        Self {
            user_id,
            points: allowance.points,
            wallet_balance: allowance.wallet,
            free_trials_left: allowance.free_trials,
            total_games: 0,
            total_winnings: 0,
            reserved_points: 0,
            active_game: None,
            created_at,
        }
    }

    /// Points that are not already at risk in a session.
    pub fn available_points(&self) -> u64 {
        self.points.saturating_sub(self.reserved_points)
    }
}
