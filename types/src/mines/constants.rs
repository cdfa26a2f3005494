/// Cells per board side (the board is square)
pub const BOARD_SIDE: u8 = 5;

/// Smallest mine count a session may be started with
pub const MIN_MINES: u8 = 1;

/// Largest mine count a session may be started with
pub const MAX_MINES: u8 = 8;

/// Mine count used when a start request omits it
pub const DEFAULT_MINES: u8 = 3;

/// Points granted on registration
pub const STARTING_POINTS: u64 = 1_000;

/// Wallet balance granted on registration, in cents (100.00)
pub const STARTING_WALLET_CENTS: u64 = 10_000;

/// Free trials granted on registration
pub const STARTING_FREE_TRIALS: u32 = 3;

/// Minimum wallet deposit or withdrawal, in cents (10.00)
pub const MIN_WALLET_OPERATION_CENTS: u64 = 1_000;

/// Minimum points per purchase
pub const MIN_POINT_PURCHASE: u64 = 100;

/// Wallet cents credited for every point won on cash-out (1 point = 1.00)
pub const WALLET_CREDIT_PER_POINT_CENTS: u64 = 100;

/// Error codes returned alongside every failed request
pub const ERROR_INVALID_PARAMETER: u8 = 1;
pub const ERROR_USER_NOT_FOUND: u8 = 2;
pub const ERROR_INSUFFICIENT_POINTS: u8 = 3;
pub const ERROR_INSUFFICIENT_BALANCE: u8 = 4;
pub const ERROR_NO_FREE_TRIALS: u8 = 5;
pub const ERROR_SESSION_ACTIVE: u8 = 6;
pub const ERROR_SESSION_NOT_FOUND: u8 = 7;
pub const ERROR_SESSION_NOT_ACTIVE: u8 = 8;
pub const ERROR_CELL_REVEALED: u8 = 9;
pub const ERROR_NO_SAFE_CLICKS: u8 = 10;
pub const ERROR_LEDGER_CONFLICT: u8 = 11;
pub const ERROR_STORAGE: u8 = 12;
