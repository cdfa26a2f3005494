use minestake_types::mines::{
    Cents, Coordinate, GameId, ERROR_CELL_REVEALED, ERROR_INSUFFICIENT_BALANCE,
    ERROR_INSUFFICIENT_POINTS, ERROR_INVALID_PARAMETER, ERROR_LEDGER_CONFLICT,
    ERROR_NO_FREE_TRIALS, ERROR_NO_SAFE_CLICKS, ERROR_SESSION_ACTIVE, ERROR_SESSION_NOT_ACTIVE,
    ERROR_SESSION_NOT_FOUND, ERROR_STORAGE, ERROR_USER_NOT_FOUND,
};
use thiserror::Error;

use crate::state::StoreError;

/// Failure of an engine operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidParameter(String),
    #[error("user not found")]
    UserNotFound,
    #[error("insufficient points: have {available}, need {requested}")]
    InsufficientPoints { available: u64, requested: u64 },
    #[error("insufficient wallet balance: have {available}, need {requested}")]
    InsufficientBalance { available: Cents, requested: Cents },
    #[error("no free trials remaining")]
    NoFreeTrialsRemaining,
    #[error("game {0} is already in progress")]
    SessionAlreadyActive(GameId),
    #[error("game not found")]
    SessionNotFound,
    #[error("game is not active")]
    SessionNotActive,
    #[error("cell {0} already revealed")]
    CellAlreadyRevealed(Coordinate),
    #[error("reveal at least one safe cell before cashing out")]
    NoSafeClicksYet,
    /// A record changed between read and commit. Retried internally and never returned to
    /// callers of the public operations.
    #[error("concurrent ledger update")]
    LedgerConflict,
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl Error {
    /// Stable numeric code sent to clients with the message.
    pub fn code(&self) -> u8 {
        match self {
            Error::InvalidParameter(_) => ERROR_INVALID_PARAMETER,
            Error::UserNotFound => ERROR_USER_NOT_FOUND,
            Error::InsufficientPoints { .. } => ERROR_INSUFFICIENT_POINTS,
            Error::InsufficientBalance { .. } => ERROR_INSUFFICIENT_BALANCE,
            Error::NoFreeTrialsRemaining => ERROR_NO_FREE_TRIALS,
            Error::SessionAlreadyActive(_) => ERROR_SESSION_ACTIVE,
            Error::SessionNotFound => ERROR_SESSION_NOT_FOUND,
            Error::SessionNotActive => ERROR_SESSION_NOT_ACTIVE,
            Error::CellAlreadyRevealed(_) => ERROR_CELL_REVEALED,
            Error::NoSafeClicksYet => ERROR_NO_SAFE_CLICKS,
            Error::LedgerConflict => ERROR_LEDGER_CONFLICT,
            Error::Storage(_) => ERROR_STORAGE,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Error::LedgerConflict,
            StoreError::Unavailable(reason) => Error::Storage(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
