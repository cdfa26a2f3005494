//! Session lifecycle: start, reveal, cash-out.
//!
//! All operations on one user's sessions run under that user's lock, so two reveals (or a
//! reveal and a cash-out) can never both observe an in-progress session and both settle it.
//! The store's compare-and-set commits back this up across processes.

use minestake_types::mines::{
    Coordinate, GameId, GameSession, GameView, RevealResult, SessionState, User, UserId,
    BOARD_SIDE,
};
use rand::rngs::OsRng;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, info};

use crate::{
    ledger::{now_millis, Ledger, LedgerPolicy, Settlement},
    locks::KeyedLocks,
    minefield,
    payout::{self, BonusTable, STARTING_MULTIPLIER},
    retry::{Attempts, RetryPolicy},
    state::{load_session, load_user, Change, Key, State, Value},
    Error, Result,
};

/// Configuration of a [SessionManager].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub board_side: u8,
    pub bonus: BonusTable,
    pub ledger: LedgerPolicy,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_side: BOARD_SIDE,
            bonus: BonusTable::default(),
            ledger: LedgerPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// A freshly started session.
#[derive(Clone, Debug, PartialEq)]
pub struct Started {
    pub game: GameView,
    /// Per-click bonus, in percent.
    pub bonus_percent: f64,
    pub user: User,
}

/// Outcome of revealing one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Reveal {
    pub result: RevealResult,
    pub game_over: bool,
    pub safe_clicks: u32,
    pub current_multiplier: f64,
    pub current_winnings: u64,
    /// Per-click bonus, in percent.
    pub bonus_percent: f64,
    /// Full mine layout, once the game is over.
    pub mines: Option<Vec<Coordinate>>,
    /// Balances after settlement, once the game is over.
    pub user: Option<User>,
}

/// Outcome of cashing out.
#[derive(Clone, Debug, PartialEq)]
pub struct CashOut {
    pub winnings: u64,
    pub mines: Vec<Coordinate>,
    pub user: User,
}

/// What cashing out would pay right now. Nothing accrues before the first safe click, and a
/// lost session is worth nothing.
pub fn current_winnings(session: &GameSession) -> u64 {
    if session.safe_clicks == 0 || session.state == SessionState::Lost {
        return 0;
    }
    payout::winnings(session.bet_amount, session.current_multiplier)
}

/// Project a session for clients. The mine layout is only included once the game is over.
pub fn view(session: &GameSession) -> GameView {
    GameView {
        game_id: session.game_id,
        user_id: session.user_id,
        grid_size: session.board_side,
        mine_count: session.mine_count,
        bet_amount: session.bet_amount,
        is_free_trial: session.is_free_trial,
        safe_clicks: session.safe_clicks,
        current_multiplier: session.current_multiplier,
        current_winnings: current_winnings(session),
        state: session.state,
        revealed: session.revealed_cells.iter().copied().collect(),
        mines: session
            .state
            .is_terminal()
            .then(|| session.mine_positions.iter().copied().collect()),
        created_at: session.created_at,
    }
}

pub struct SessionManager<S: State> {
    state: Arc<S>,
    ledger: Ledger<S>,
    bonus: BonusTable,
    board_side: u8,
    retry: RetryPolicy,
    locks: KeyedLocks<UserId>,
}

impl<S: State> SessionManager<S> {
    pub fn new(state: Arc<S>, config: EngineConfig) -> Self {
        Self {
            ledger: Ledger::new(state.clone(), config.ledger, config.retry),
            state,
            bonus: config.bonus,
            board_side: config.board_side,
            retry: config.retry,
            locks: KeyedLocks::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    /// Start a session for `user_id`.
    ///
    /// A zero bet starts a free trial. Paid bets are reserved, not debited: the points only
    /// leave the account if the session is lost.
    pub async fn start_session(
        &self,
        user_id: UserId,
        bet_amount: u64,
        mine_count: u8,
    ) -> Result<Started> {
        let bonus_percent = self.bonus.bonus_percent(mine_count)?;
        let mine_positions = minefield::generate(&mut OsRng, self.board_side, mine_count)?;

        let _guard = self.locks.lock(&user_id).await;
        let session = GameSession {
            game_id: GameId::random(),
            user_id,
            board_side: self.board_side,
            mine_count,
            mine_positions,
            revealed_cells: BTreeSet::new(),
            bet_amount,
            is_free_trial: bet_amount == 0,
            safe_clicks: 0,
            current_multiplier: STARTING_MULTIPLIER,
            state: SessionState::InProgress,
            created_at: now_millis(),
        };
        let user = self.ledger.reserve(&session).await?;
        info!(
            %user_id,
            game_id = %session.game_id,
            bet = bet_amount,
            mines = mine_count,
            free_trial = session.is_free_trial,
            "session started"
        );

        Ok(Started {
            game: view(&session),
            bonus_percent,
            user,
        })
    }

    /// Reveal `cell`. Hitting a mine ends and settles the session.
    pub async fn reveal_cell(&self, game_id: GameId, cell: Coordinate) -> Result<Reveal> {
        let owner = self.owner(game_id).await?;
        let _guard = self.locks.lock(&owner).await;

        let mut attempts = Attempts::new(&self.retry, "reveal_cell");
        loop {
            let (version, mut session) = load_session(self.state.as_ref(), game_id)
                .await?
                .ok_or(Error::SessionNotFound)?;
            if !session.is_active() {
                return Err(Error::SessionNotActive);
            }
            if !cell.within(session.board_side) {
                return Err(Error::InvalidParameter(format!(
                    "cell {cell} is outside the {side}x{side} board",
                    side = session.board_side
                )));
            }
            if !session.revealed_cells.insert(cell) {
                return Err(Error::CellAlreadyRevealed(cell));
            }
            let bonus_percent = self.bonus.bonus_percent(session.mine_count)?;

            if session.is_mine(&cell) {
                session.state = SessionState::Lost;
                match self.ledger.settle(&session, version).await {
                    Ok(Settlement::Applied(user)) => {
                        info!(%game_id, %cell, "mine hit");
                        return Ok(Reveal {
                            result: RevealResult::MineHit,
                            game_over: true,
                            safe_clicks: session.safe_clicks,
                            current_multiplier: session.current_multiplier,
                            current_winnings: 0,
                            bonus_percent,
                            mines: Some(session.mine_positions.iter().copied().collect()),
                            user: Some(user),
                        });
                    }
                    Ok(Settlement::AlreadySettled(_)) => return Err(Error::SessionNotActive),
                    Err(Error::LedgerConflict) => attempts.retry(Error::LedgerConflict).await?,
                    Err(err) => return Err(err),
                }
                continue;
            }

            session.safe_clicks += 1;
            session.current_multiplier = self
                .bonus
                .apply_safe_click(session.current_multiplier, session.mine_count)?;
            let change = Change::update(
                Key::Session(game_id),
                version,
                Value::Session(session.clone()),
            );
            match self.state.commit(vec![change]).await {
                Ok(()) => {
                    let current_winnings = current_winnings(&session);
                    debug!(
                        %game_id,
                        %cell,
                        safe_clicks = session.safe_clicks,
                        multiplier = session.current_multiplier,
                        "safe cell"
                    );
                    return Ok(Reveal {
                        result: RevealResult::Safe,
                        game_over: false,
                        safe_clicks: session.safe_clicks,
                        current_multiplier: session.current_multiplier,
                        current_winnings,
                        bonus_percent,
                        mines: None,
                        user: None,
                    });
                }
                Err(err) => attempts.retry(err.into()).await?,
            }
        }
    }

    /// End the session and credit its current winnings.
    pub async fn cash_out(&self, game_id: GameId) -> Result<CashOut> {
        let owner = self.owner(game_id).await?;
        let _guard = self.locks.lock(&owner).await;

        let mut attempts = Attempts::new(&self.retry, "cash_out");
        loop {
            let (version, mut session) = load_session(self.state.as_ref(), game_id)
                .await?
                .ok_or(Error::SessionNotFound)?;
            if !session.is_active() {
                return Err(Error::SessionNotActive);
            }
            if session.safe_clicks == 0 {
                return Err(Error::NoSafeClicksYet);
            }

            session.state = SessionState::CashedOut;
            match self.ledger.settle(&session, version).await {
                Ok(Settlement::Applied(user)) => {
                    let winnings = current_winnings(&session);
                    info!(%game_id, winnings, "cashed out");
                    return Ok(CashOut {
                        winnings,
                        mines: session.mine_positions.iter().copied().collect(),
                        user,
                    });
                }
                Ok(Settlement::AlreadySettled(_)) => return Err(Error::SessionNotActive),
                Err(Error::LedgerConflict) => attempts.retry(Error::LedgerConflict).await?,
                Err(err) => return Err(err),
            }
        }
    }

    /// Current state of a session, as a client may see it.
    pub async fn session(&self, game_id: GameId) -> Result<GameView> {
        let (_, session) = load_session(self.state.as_ref(), game_id)
            .await?
            .ok_or(Error::SessionNotFound)?;
        Ok(view(&session))
    }

    /// The session `user_id` currently has in progress, if any.
    pub async fn active_session(&self, user_id: UserId) -> Result<Option<GameView>> {
        let (_, user) = load_user(self.state.as_ref(), user_id)
            .await?
            .ok_or(Error::UserNotFound)?;
        let Some(game_id) = user.active_game else {
            return Ok(None);
        };
        self.session(game_id).await.map(Some)
    }

    async fn owner(&self, game_id: GameId) -> Result<UserId> {
        let (_, session) = load_session(self.state.as_ref(), game_id)
            .await?
            .ok_or(Error::SessionNotFound)?;
        Ok(session.user_id)
    }
}
