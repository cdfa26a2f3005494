//! Wager session engine.
//!
//! A [SessionManager] runs 5x5 minesweeper wagers on top of a [Ledger] of user balances, both
//! persisted through a [State] store with compare-and-set commits.

pub mod ledger;
pub mod locks;
pub mod minefield;
pub mod payout;
pub mod session;
pub mod state;

mod error;
mod retry;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerPolicy, Settlement};
pub use payout::BonusTable;
pub use retry::RetryPolicy;
pub use session::{CashOut, EngineConfig, Reveal, SessionManager, Started};
pub use state::{Memory, State, StoreError};
