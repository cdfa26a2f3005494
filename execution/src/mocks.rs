//! Test helpers for driving a [SessionManager] against in-memory and faulty stores.

use minestake_types::mines::{Allowance, Coordinate, GameId, User};
use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    ledger::LedgerPolicy,
    retry::RetryPolicy,
    session::{EngineConfig, SessionManager},
    state::{load_session, Change, Key, Memory, State, StoreError, Value, Version},
};

/// Retry policy that keeps failing tests fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_conflicts: 16,
        max_outages: 2,
        backoff: Duration::from_millis(1),
    }
}

/// Engine configuration whose new users start with `points`.
pub fn create_config(points: u64) -> EngineConfig {
    EngineConfig {
        ledger: LedgerPolicy {
            allowance: Allowance {
                points,
                ..Allowance::default()
            },
            ..LedgerPolicy::default()
        },
        retry: fast_retry(),
        ..EngineConfig::default()
    }
}

/// Creates a manager over a fresh [Memory] store and registers one user with `points`.
pub async fn create_manager(points: u64) -> (SessionManager<Memory>, User) {
    let manager = SessionManager::new(Arc::new(Memory::default()), create_config(points));
    let user = manager.ledger().create_user().await.unwrap();
    (manager, user)
}

/// Creates a manager over a [Flaky] store and registers one user with `points`.
pub async fn create_flaky_manager(points: u64) -> (SessionManager<Flaky<Memory>>, User) {
    let manager = SessionManager::new(
        Arc::new(Flaky::new(Memory::default())),
        create_config(points),
    );
    let user = manager.ledger().create_user().await.unwrap();
    (manager, user)
}

/// Hidden mine layout of a stored session.
pub async fn mines_of<S: State>(
    manager: &SessionManager<S>,
    game_id: GameId,
) -> BTreeSet<Coordinate> {
    let (_, session) = load_session(manager.state().as_ref(), game_id)
        .await
        .unwrap()
        .expect("session exists");
    session.mine_positions
}

/// Cells of a stored session that are neither mines nor revealed, in row-major order.
pub async fn safe_cells<S: State>(
    manager: &SessionManager<S>,
    game_id: GameId,
) -> Vec<Coordinate> {
    let (_, session) = load_session(manager.state().as_ref(), game_id)
        .await
        .unwrap()
        .expect("session exists");
    (0..session.board_side)
        .flat_map(|row| (0..session.board_side).map(move |col| Coordinate::new(row, col)))
        .filter(|cell| !session.is_mine(cell) && !session.is_revealed(cell))
        .collect()
}

/// A [State] wrapper that can simulate outages and lost races on commit.
///
/// Reads always go through.
pub struct Flaky<S> {
    inner: S,
    outage: AtomicBool,
    conflicts: AtomicUsize,
    commits: AtomicUsize,
}

impl<S: State> Flaky<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            outage: AtomicBool::new(false),
            conflicts: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    /// Fail every commit with [StoreError::Unavailable] until cleared.
    pub fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }

    /// Fail the next `count` commits with [StoreError::Conflict] on their first key.
    pub fn conflict_next(&self, count: usize) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    /// Commits that reached the inner store.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

impl<S: State> State for Flaky<S> {
    async fn get(&self, key: &Key) -> Result<Option<(Version, Value)>, StoreError> {
        self.inner.get(key).await
    }

    async fn commit(&self, changes: Vec<Change>) -> Result<(), StoreError> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".to_string()));
        }
        let conflicted = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if conflicted {
            if let Some(change) = changes.first() {
                return Err(StoreError::Conflict(change.key.clone()));
            }
        }
        self.inner.commit(changes).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
