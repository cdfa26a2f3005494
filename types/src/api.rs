//! Request and response bodies of the HTTP API.
//!
//! Field names follow the wire contract the browser client already speaks, so several
//! responses repeat values (`total_points`, `wallet_balance`) that are also inside `user_data`.

use serde::{Deserialize, Serialize};

use crate::mines::{Cents, Coordinate, GameId, RevealResult, User, UserId, DEFAULT_MINES};

fn default_mine_count() -> u8 {
    DEFAULT_MINES
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGame {
    pub user_id: UserId,
    pub bet_amount: u64,
    #[serde(default = "default_mine_count")]
    pub mine_count: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameStarted {
    pub game_id: GameId,
    pub is_free_trial: bool,
    pub bet_amount: u64,
    pub mine_count: u8,
    /// Per-click bonus, in percent.
    pub multiplier_per_click: f64,
    pub current_multiplier: f64,
    pub current_winnings: u64,
    pub safe_clicks: u32,
    pub grid_size: u8,
    pub user_data: User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickCell {
    pub game_id: GameId,
    pub row: u8,
    pub col: u8,
}

impl ClickCell {
    pub fn cell(&self) -> Coordinate {
        Coordinate::new(self.row, self.col)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellClicked {
    pub result: RevealResult,
    pub game_over: bool,
    pub message: String,
    pub current_winnings: u64,
    pub current_multiplier: f64,
    pub safe_clicks: u32,
    /// Per-click bonus, in percent.
    pub multiplier_increase: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mines: Option<Vec<Coordinate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<User>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOut {
    pub game_id: GameId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashedOut {
    /// Always `"cashed_out"`.
    pub result: String,
    pub winnings: u64,
    pub message: String,
    pub mines: Vec<Coordinate>,
    pub user_data: User,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletOperation {
    pub user_id: UserId,
    /// Decimal amount in major currency units.
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalletUpdated {
    pub message: String,
    pub wallet_balance: Cents,
    pub user_data: User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPoints {
    pub user_id: UserId,
    pub points: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointsAdded {
    pub message: String,
    pub total_points: u64,
    pub user_data: User,
}

/// Body of every failed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub detail: String,
    pub code: u8,
}
