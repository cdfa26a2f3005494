use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use uuid::Uuid;

use super::UserId;

/// Unique identifier of a game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A cell on the board, zero-indexed from the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: u8,
    pub col: u8,
}

impl Coordinate {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn within(&self, side: u8) -> bool {
        self.row < side && self.col < side
    }

    /// Row-major index of the cell on a board with `side` cells per row.
    pub fn index(&self, side: u8) -> usize {
        self.row as usize * side as usize + self.col as usize
    }

    /// Inverse of [Coordinate::index].
    pub fn from_index(index: usize, side: u8) -> Self {
        let side = side as usize;
        Self {
            row: (index / side) as u8,
            col: (index % side) as u8,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Lifecycle of a session. `Lost` and `CashedOut` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    InProgress,
    Lost,
    CashedOut,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::InProgress)
    }
}

/// Game session state
///
/// `mine_positions` is fixed when the session is created and must never leave the engine while
/// the session is in progress; clients only ever see a [GameView].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub game_id: GameId,
    pub user_id: UserId,
    pub board_side: u8,
    pub mine_count: u8,
    pub mine_positions: BTreeSet<Coordinate>,
    pub revealed_cells: BTreeSet<Coordinate>,
    pub bet_amount: u64,
    pub is_free_trial: bool,
    pub safe_clicks: u32,
    pub current_multiplier: f64,
    pub state: SessionState,
    pub created_at: u64,
}

impl GameSession {
    pub fn is_active(&self) -> bool {
        self.state == SessionState::InProgress
    }

    pub fn is_mine(&self, cell: &Coordinate) -> bool {
        self.mine_positions.contains(cell)
    }

    pub fn is_revealed(&self, cell: &Coordinate) -> bool {
        self.revealed_cells.contains(cell)
    }
}

/// Outcome of a single reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealResult {
    Safe,
    MineHit,
}

/// Client-facing projection of a [GameSession].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: GameId,
    pub user_id: UserId,
    pub grid_size: u8,
    pub mine_count: u8,
    pub bet_amount: u64,
    pub is_free_trial: bool,
    pub safe_clicks: u32,
    pub current_multiplier: f64,
    pub current_winnings: u64,
    pub state: SessionState,
    pub revealed: Vec<Coordinate>,
    /// Mine layout, present only once the session has ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mines: Option<Vec<Coordinate>>,
    pub created_at: u64,
}
