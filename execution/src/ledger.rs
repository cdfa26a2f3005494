//! Authoritative per-user balances.
//!
//! Every mutation is an optimistic read-modify-write: the user record is read with its version,
//! changed in memory and committed only if nobody else wrote it in between. Session records that
//! must change together with a balance (reservation at start, settlement at the end) are part
//! of the same commit.

use minestake_types::mines::{
    Allowance, Cents, GameSession, SessionState, User, UserId, MIN_POINT_PURCHASE,
    MIN_WALLET_OPERATION_CENTS, WALLET_CREDIT_PER_POINT_CENTS,
};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info};

use crate::{
    payout,
    retry::{Attempts, RetryPolicy},
    state::{load_session, load_user, Change, Key, State, StoreError, Value, Version},
    Error, Result,
};

/// Balance rules applied by the [Ledger].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub allowance: Allowance,
    /// Smallest deposit or withdrawal.
    pub min_wallet_operation: Cents,
    /// Smallest point purchase.
    pub min_point_purchase: u64,
    /// Wallet price of one purchased point. Zero makes purchases free.
    pub point_price: Cents,
    /// Wallet credit for every point won on cash-out.
    pub wallet_credit_per_point: Cents,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            allowance: Allowance::default(),
            min_wallet_operation: Cents::new(MIN_WALLET_OPERATION_CENTS),
            min_point_purchase: MIN_POINT_PURCHASE,
            point_price: Cents::ZERO,
            wallet_credit_per_point: Cents::new(WALLET_CREDIT_PER_POINT_CENTS),
        }
    }
}

/// Result of settling a finished session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The balance change was applied by this call.
    Applied(User),
    /// The session had already been settled; nothing changed.
    AlreadySettled(User),
}

impl Settlement {
    pub fn user(&self) -> &User {
        match self {
            Settlement::Applied(user) | Settlement::AlreadySettled(user) => user,
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

pub struct Ledger<S: State> {
    state: Arc<S>,
    policy: LedgerPolicy,
    retry: RetryPolicy,
}

impl<S: State> Ledger<S> {
    pub fn new(state: Arc<S>, policy: LedgerPolicy, retry: RetryPolicy) -> Self {
        Self {
            state,
            policy,
            retry,
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// Register a new user with the configured starting balances.
    pub async fn create_user(&self) -> Result<User> {
        let mut attempts = Attempts::new(&self.retry, "create_user");
        loop {
            let user = User::new(UserId::random(), self.policy.allowance, now_millis());
            let change = Change::insert(Key::User(user.user_id), Value::User(user.clone()));
            match self.state.commit(vec![change]).await {
                Ok(()) => {
                    info!(user_id = %user.user_id, points = user.points, "user created");
                    return Ok(user);
                }
                Err(err) => attempts.retry(err.into()).await?,
            }
        }
    }

    pub async fn user(&self, user_id: UserId) -> Result<User> {
        let (_, user) = self.load(user_id).await?;
        Ok(user)
    }

    pub async fn deposit(&self, user_id: UserId, amount: Cents) -> Result<User> {
        self.check_wallet_amount(amount, "deposit")?;
        let user = self
            .update(user_id, "deposit", |user| {
                user.wallet_balance = user
                    .wallet_balance
                    .checked_add(amount)
                    .ok_or_else(|| Error::InvalidParameter("deposit is too large".to_string()))?;
                Ok(())
            })
            .await?;
        info!(%user_id, %amount, balance = %user.wallet_balance, "wallet deposit");
        Ok(user)
    }

    pub async fn withdraw(&self, user_id: UserId, amount: Cents) -> Result<User> {
        self.check_wallet_amount(amount, "withdrawal")?;
        let user = self
            .update(user_id, "withdraw", |user| {
                user.wallet_balance = user.wallet_balance.checked_sub(amount).ok_or(
                    Error::InsufficientBalance {
                        available: user.wallet_balance,
                        requested: amount,
                    },
                )?;
                Ok(())
            })
            .await?;
        info!(%user_id, %amount, balance = %user.wallet_balance, "wallet withdrawal");
        Ok(user)
    }

    /// Buy points at the configured price.
    pub async fn add_points(&self, user_id: UserId, points: u64) -> Result<User> {
        if points == 0 || points < self.policy.min_point_purchase {
            return Err(Error::InvalidParameter(format!(
                "minimum {} points required",
                self.policy.min_point_purchase
            )));
        }
        let cost = self
            .policy
            .point_price
            .checked_mul(points)
            .ok_or_else(|| Error::InvalidParameter("purchase is too large".to_string()))?;

        let user = self
            .update(user_id, "add_points", |user| {
                user.wallet_balance = user.wallet_balance.checked_sub(cost).ok_or(
                    Error::InsufficientBalance {
                        available: user.wallet_balance,
                        requested: cost,
                    },
                )?;
                user.points = user
                    .points
                    .checked_add(points)
                    .ok_or_else(|| Error::InvalidParameter("purchase is too large".to_string()))?;
                Ok(())
            })
            .await?;
        info!(%user_id, points, %cost, total = user.points, "points purchased");
        Ok(user)
    }

    /// Put the stake of a new session at risk and store the session, atomically.
    ///
    /// Paid sessions reserve `bet_amount` points without debiting them; free trials consume one
    /// trial. Fails if the user already has a session in progress.
    pub async fn reserve(&self, session: &GameSession) -> Result<User> {
        let mut attempts = Attempts::new(&self.retry, "reserve");
        loop {
            let (version, mut user) = self.load(session.user_id).await?;
            if let Some(active) = user.active_game {
                return Err(Error::SessionAlreadyActive(active));
            }
            if session.is_free_trial {
                if user.free_trials_left == 0 {
                    return Err(Error::NoFreeTrialsRemaining);
                }
                user.free_trials_left -= 1;
            } else {
                let available = user.available_points();
                if available < session.bet_amount {
                    return Err(Error::InsufficientPoints {
                        available,
                        requested: session.bet_amount,
                    });
                }
                user.reserved_points += session.bet_amount;
            }
            user.active_game = Some(session.game_id);

            let changes = vec![
                Change::update(Key::User(user.user_id), version, Value::User(user.clone())),
                Change::insert(Key::Session(session.game_id), Value::Session(session.clone())),
            ];
            match self.state.commit(changes).await {
                Ok(()) => return Ok(user),
                Err(err) => attempts.retry(err.into()).await?,
            }
        }
    }

    /// Apply the balance change of a finished session together with its terminal record.
    ///
    /// `session` must already be in its terminal state and `expected` must be the version of
    /// the in-progress record it was derived from. Settling the same game twice applies the
    /// change once; the second call returns [Settlement::AlreadySettled].
    ///
    /// If the session record moved on without being settled, [Error::LedgerConflict] is
    /// returned so the caller can re-read it and decide again.
    pub async fn settle(&self, session: &GameSession, expected: Version) -> Result<Settlement> {
        if !session.state.is_terminal() {
            return Err(Error::InvalidParameter(
                "only finished sessions can be settled".to_string(),
            ));
        }

        let mut attempts = Attempts::new(&self.retry, "settle");
        loop {
            let (version, mut user) = self.load(session.user_id).await?;
            self.apply_settlement(&mut user, session)?;

            let changes = vec![
                Change::update(
                    Key::Session(session.game_id),
                    expected,
                    Value::Session(session.clone()),
                ),
                Change::update(Key::User(user.user_id), version, Value::User(user.clone())),
            ];
            match self.state.commit(changes).await {
                Ok(()) => {
                    info!(
                        user_id = %user.user_id,
                        game_id = %session.game_id,
                        state = ?session.state,
                        points = user.points,
                        "session settled"
                    );
                    return Ok(Settlement::Applied(user));
                }
                Err(StoreError::Conflict(Key::Session(_))) => {
                    let stored = load_session(self.state.as_ref(), session.game_id)
                        .await?
                        .ok_or(Error::SessionNotFound)?;
                    if stored.1.state.is_terminal() {
                        debug!(game_id = %session.game_id, "session already settled");
                        let (_, user) = self.load(session.user_id).await?;
                        return Ok(Settlement::AlreadySettled(user));
                    }
                    return Err(Error::LedgerConflict);
                }
                Err(err) => attempts.retry(err.into()).await?,
            }
        }
    }

    fn apply_settlement(&self, user: &mut User, session: &GameSession) -> Result<()> {
        if !session.is_free_trial {
            user.reserved_points = user.reserved_points.saturating_sub(session.bet_amount);
        }
        if user.active_game == Some(session.game_id) {
            user.active_game = None;
        }
        user.total_games = user.total_games.saturating_add(1);

        match session.state {
            SessionState::Lost => {
                if !session.is_free_trial {
                    user.points = user.points.checked_sub(session.bet_amount).ok_or(
                        Error::InsufficientPoints {
                            available: user.points,
                            requested: session.bet_amount,
                        },
                    )?;
                }
            }
            SessionState::CashedOut => {
                if !session.is_free_trial {
                    let won = payout::winnings(session.bet_amount, session.current_multiplier);
                    let credit = self
                        .policy
                        .wallet_credit_per_point
                        .checked_mul(won)
                        .and_then(|credit| user.wallet_balance.checked_add(credit))
                        .ok_or_else(|| {
                            Error::InvalidParameter("wallet balance overflow".to_string())
                        })?;
                    // The stake is consumed either way; winnings replace it
                    user.points = user
                        .points
                        .checked_sub(session.bet_amount)
                        .ok_or(Error::InsufficientPoints {
                            available: user.points,
                            requested: session.bet_amount,
                        })?
                        .saturating_add(won);
                    user.wallet_balance = credit;
                    user.total_winnings = user.total_winnings.saturating_add(won);
                }
            }
            SessionState::InProgress => {
                return Err(Error::InvalidParameter(
                    "only finished sessions can be settled".to_string(),
                ))
            }
        }
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<(Version, User)> {
        load_user(self.state.as_ref(), user_id)
            .await?
            .ok_or(Error::UserNotFound)
    }

    async fn update<F>(
        &self,
        user_id: UserId,
        operation: &'static str,
        mut apply: F,
    ) -> Result<User>
    where
        F: FnMut(&mut User) -> Result<()>,
    {
        let mut attempts = Attempts::new(&self.retry, operation);
        loop {
            let (version, mut user) = self.load(user_id).await?;
            apply(&mut user)?;
            let change = Change::update(Key::User(user_id), version, Value::User(user.clone()));
            match self.state.commit(vec![change]).await {
                Ok(()) => return Ok(user),
                Err(err) => attempts.retry(err.into()).await?,
            }
        }
    }

    fn check_wallet_amount(&self, amount: Cents, operation: &str) -> Result<()> {
        if amount == Cents::ZERO {
            return Err(Error::InvalidParameter(format!(
                "{operation} amount must be positive"
            )));
        }
        if amount < self.policy.min_wallet_operation {
            return Err(Error::InvalidParameter(format!(
                "minimum {operation} is {}",
                self.policy.min_wallet_operation
            )));
        }
        Ok(())
    }
}
