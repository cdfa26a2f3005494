use minestake_types::mines::{GameId, GameSession, User, UserId};
use std::{
    collections::HashMap,
    future::Future,
    sync::{PoisonError, RwLock},
};
use thiserror::Error;
use tracing::warn;

/// Version of a stored record. Starts at 1 and increases on every write.
pub type Version = u64;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    User(UserId),
    Session(GameId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    User(User),
    Session(GameSession),
}

/// Precondition a [Change] places on the record it replaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expect {
    /// The key must not exist yet.
    Absent,
    /// The stored record must still be at this version.
    Version(Version),
}

#[derive(Clone, Debug)]
pub struct Change {
    pub key: Key,
    pub expect: Expect,
    pub value: Value,
}

impl Change {
    pub fn insert(key: Key, value: Value) -> Self {
        Self {
            key,
            expect: Expect::Absent,
            value,
        }
    }

    pub fn update(key: Key, version: Version, value: Value) -> Self {
        Self {
            key,
            expect: Expect::Version(version),
            value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("version conflict on {0:?}")]
    Conflict(Key),
    #[error("{0}")]
    Unavailable(String),
}

/// A durable keyed store with multi-key compare-and-set commits.
pub trait State: Send + Sync {
    fn get(
        &self,
        key: &Key,
    ) -> impl Future<Output = Result<Option<(Version, Value)>, StoreError>> + Send;

    /// Apply every change or none of them.
    ///
    /// Fails with [StoreError::Conflict] naming the first key whose precondition does not hold.
    fn commit(&self, changes: Vec<Change>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-process [State] backed by a hash map.
#[derive(Default)]
pub struct Memory {
    state: RwLock<HashMap<Key, (Version, Value)>>,
}

impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<(Version, Value)>, StoreError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.get(key).cloned())
    }

    async fn commit(&self, changes: Vec<Change>) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        // Check every precondition before touching anything
        for change in &changes {
            let current = state.get(&change.key).map(|(version, _)| *version);
            let holds = match (change.expect, current) {
                (Expect::Absent, None) => true,
                (Expect::Version(expected), Some(current)) => expected == current,
                _ => false,
            };
            if !holds {
                return Err(StoreError::Conflict(change.key.clone()));
            }
        }

        for change in changes {
            let version = match change.expect {
                Expect::Absent => 1,
                Expect::Version(version) => version + 1,
            };
            state.insert(change.key, (version, change.value));
        }
        Ok(())
    }
}

pub async fn load_user<S: State>(
    state: &S,
    user_id: UserId,
) -> Result<Option<(Version, User)>, StoreError> {
    match state.get(&Key::User(user_id)).await? {
        Some((version, Value::User(user))) => Ok(Some((version, user))),
        Some(_) => {
            warn!(%user_id, "user key holds a non-user record");
            Ok(None)
        }
        None => Ok(None),
    }
}

pub async fn load_session<S: State>(
    state: &S,
    game_id: GameId,
) -> Result<Option<(Version, GameSession)>, StoreError> {
    match state.get(&Key::Session(game_id)).await? {
        Some((version, Value::Session(session))) => Ok(Some((version, session))),
        Some(_) => {
            warn!(%game_id, "session key holds a non-session record");
            Ok(None)
        }
        None => Ok(None),
    }
}
