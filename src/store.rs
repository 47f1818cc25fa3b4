//! Optimistic Cache
//!
//! Client-side mirror of the service's sibling lists, keyed by parent id.
//! Changes land here synchronously, before any request is sent; the token
//! returned by `apply_local` restores the previous snapshot if the request
//! later fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::BoardResult;
use crate::models::Sequenced;
use crate::ordering;

/// Called with `(parent_id, snapshot)` after every change
pub type Observer<T> = Arc<dyn Fn(u32, &[T]) + Send + Sync>;

/// Snapshot taken before an optimistic change
#[derive(Debug, Clone, PartialEq)]
#[must_use = "commit or roll back the token once the request settles"]
pub struct RollbackToken<T> {
    parent_id: u32,
    previous: Vec<T>,
}

impl<T> RollbackToken<T> {
    pub fn parent_id(&self) -> u32 {
        self.parent_id
    }

    pub fn previous(&self) -> &[T] {
        &self.previous
    }
}

struct CacheState<T> {
    snapshots: HashMap<u32, Vec<T>>,
    observers: Vec<Observer<T>>,
}

/// Shared handle to the cache; clones see the same state.
///
/// A single lock covers every parent, so a cross-parent move replaces both
/// snapshots atomically.
pub struct OptimisticCache<T> {
    state: Arc<Mutex<CacheState<T>>>,
}

impl<T> Clone for OptimisticCache<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Sequenced> Default for OptimisticCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Sequenced> OptimisticCache<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                snapshots: HashMap::new(),
                observers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a re-render hook
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(u32, &[T]) + Send + Sync + 'static,
    {
        self.lock().observers.push(Arc::new(observer));
    }

    /// Replace the snapshot with server data (sorted by position)
    pub fn load(&self, parent_id: u32, siblings: Vec<T>) {
        self.store(&[(parent_id, ordering::sorted(siblings))]);
    }

    /// Current siblings of `parent_id` (empty if never loaded)
    pub fn snapshot(&self, parent_id: u32) -> Vec<T> {
        self.lock()
            .snapshots
            .get(&parent_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, parent_id: u32) -> usize {
        self.lock().snapshots.get(&parent_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, parent_id: u32) -> bool {
        self.len(parent_id) == 0
    }

    pub fn contains(&self, parent_id: u32) -> bool {
        self.lock().snapshots.contains_key(&parent_id)
    }

    /// Apply `mutation` to the current snapshot and store the result.
    ///
    /// On error nothing changes. On success the returned token holds the
    /// snapshot from before the change.
    pub fn apply_local<F>(&self, parent_id: u32, mutation: F) -> BoardResult<RollbackToken<T>>
    where
        F: FnOnce(&[T]) -> BoardResult<Vec<T>>,
    {
        let (token, observers, next) = {
            let mut state = self.lock();
            let previous = state.snapshots.get(&parent_id).cloned().unwrap_or_default();
            let next = mutation(&previous)?;
            state.snapshots.insert(parent_id, next.clone());
            (
                RollbackToken {
                    parent_id,
                    previous,
                },
                state.observers.clone(),
                next,
            )
        };
        notify(&observers, &[(parent_id, next)]);
        Ok(token)
    }

    /// `apply_local` for a change that spans two parents
    pub fn apply_local_pair<F>(
        &self,
        source_parent_id: u32,
        dest_parent_id: u32,
        mutation: F,
    ) -> BoardResult<(RollbackToken<T>, RollbackToken<T>)>
    where
        F: FnOnce(&[T], &[T]) -> BoardResult<(Vec<T>, Vec<T>)>,
    {
        let (tokens, observers, changes) = {
            let mut state = self.lock();
            let source = state
                .snapshots
                .get(&source_parent_id)
                .cloned()
                .unwrap_or_default();
            let dest = state
                .snapshots
                .get(&dest_parent_id)
                .cloned()
                .unwrap_or_default();
            let (next_source, next_dest) = mutation(&source, &dest)?;
            state.snapshots.insert(source_parent_id, next_source.clone());
            state.snapshots.insert(dest_parent_id, next_dest.clone());
            (
                (
                    RollbackToken {
                        parent_id: source_parent_id,
                        previous: source,
                    },
                    RollbackToken {
                        parent_id: dest_parent_id,
                        previous: dest,
                    },
                ),
                state.observers.clone(),
                [(source_parent_id, next_source), (dest_parent_id, next_dest)],
            )
        };
        notify(&observers, &changes);
        Ok(tokens)
    }

    /// The request behind `token` succeeded.
    ///
    /// With `canonical` the server's answer replaces the optimistic snapshot.
    pub fn commit(&self, token: RollbackToken<T>, canonical: Option<Vec<T>>) {
        match canonical {
            Some(siblings) => self.load(token.parent_id, siblings),
            None => tracing::trace!(parent_id = token.parent_id, "optimistic change committed"),
        }
    }

    /// The request behind `token` failed: restore the earlier snapshot
    pub fn rollback(&self, token: RollbackToken<T>) {
        tracing::debug!(parent_id = token.parent_id, "rolling back optimistic change");
        self.store(&[(token.parent_id, token.previous)]);
    }

    fn store(&self, changes: &[(u32, Vec<T>)]) {
        let observers = {
            let mut state = self.lock();
            for (parent_id, siblings) in changes {
                state.snapshots.insert(*parent_id, siblings.clone());
            }
            state.observers.clone()
        };
        notify(&observers, changes);
    }
}

// Runs outside the lock so observers may read the cache
fn notify<T>(observers: &[Observer<T>], changes: &[(u32, Vec<T>)]) {
    for observer in observers {
        for (parent_id, siblings) in changes {
            observer(*parent_id, siblings);
        }
    }
}
