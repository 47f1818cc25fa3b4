//! Debounced Persister
//!
//! Same-parent reorders are coalesced per parent: each `schedule` replaces
//! the pending payload and re-arms that parent's timer, and only the last
//! payload is sent once the timer expires. Cross-parent moves, creates and
//! deletes go straight to the service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::commands::SiblingApi;
use crate::error::BoardResult;
use crate::models::{MoveIntent, Position, PositionUpdate, Sequenced};
use crate::store::{OptimisticCache, RollbackToken};

/// Persistence interface the drag controller talks to
#[async_trait]
pub trait Persist<T: Sequenced>: Send + Sync {
    /// Queue a bulk position update for `parent_id`, replacing any pending one.
    ///
    /// `baseline` is rolled back if the eventual request fails.
    fn schedule(&self, parent_id: u32, positions: Vec<PositionUpdate>, baseline: Option<RollbackToken<T>>);

    /// The service already holds a newer state of `parent_id` (an accepted
    /// move or delete): drop the pending baseline so a failed flush no
    /// longer restores an order from before that change.
    fn rebase(&self, parent_id: u32);

    /// Eager cross-parent move
    async fn move_entity(&self, intent: MoveIntent) -> BoardResult<()>;

    async fn create(&self, parent_id: u32, title: &str, position: Position) -> BoardResult<T>;

    async fn delete(&self, id: u32) -> BoardResult<()>;

    async fn fetch(&self, parent_id: u32) -> BoardResult<Vec<T>>;
}

struct PendingFlush<T> {
    positions: Vec<PositionUpdate>,
    baseline: Option<RollbackToken<T>>,
    // Set once the parent changed remotely; older baselines are stale
    rebased: bool,
    generation: u64,
    timer: JoinHandle<()>,
}

struct Inner<T: Sequenced> {
    api: Arc<dyn SiblingApi<T>>,
    cache: OptimisticCache<T>,
    delay: Duration,
    pending: Mutex<HashMap<u32, PendingFlush<T>>>,
    next_generation: AtomicU64,
}

/// Per-parent debounce over a `SiblingApi`
pub struct DebouncedPersister<T: Sequenced> {
    inner: Arc<Inner<T>>,
}

impl<T: Sequenced> Clone for DebouncedPersister<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Sequenced> DebouncedPersister<T> {
    pub fn new(api: Arc<dyn SiblingApi<T>>, cache: OptimisticCache<T>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                cache,
                delay,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn cache(&self) -> &OptimisticCache<T> {
        &self.inner.cache
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Replace the pending payload for `parent_id` and restart its timer.
    ///
    /// Must be called from within a Tokio runtime. The first baseline of a
    /// debounce window is kept; later ones are dropped.
    pub fn schedule(
        &self,
        parent_id: u32,
        positions: Vec<PositionUpdate>,
        baseline: Option<RollbackToken<T>>,
    ) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut pending = self.inner.lock_pending();

        let (baseline, rebased) = match pending.remove(&parent_id) {
            Some(previous) => {
                previous.timer.abort();
                (previous.baseline.or(baseline), previous.rebased)
            }
            None => (baseline, false),
        };

        let inner = Arc::clone(&self.inner);
        let delay = self.inner.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire(parent_id, generation).await;
        });

        tracing::debug!(parent_id, count = positions.len(), ?delay, "position flush scheduled");
        pending.insert(
            parent_id,
            PendingFlush {
                positions,
                baseline,
                rebased,
                generation,
                timer,
            },
        );
    }

    /// Forget the rollback point of `parent_id`'s pending window.
    ///
    /// The pending payload still goes out; if it fails the local order is
    /// kept. A request already in flight for this parent no longer hands its
    /// baseline over either.
    pub fn rebase(&self, parent_id: u32) {
        if let Some(entry) = self.inner.lock_pending().get_mut(&parent_id) {
            if entry.baseline.take().is_some() {
                tracing::debug!(parent_id, "pending baseline dropped");
            }
            entry.rebased = true;
        }
    }

    pub fn is_pending(&self, parent_id: u32) -> bool {
        self.inner.lock_pending().contains_key(&parent_id)
    }

    pub fn pending_parents(&self) -> Vec<u32> {
        let mut parents: Vec<u32> = self.inner.lock_pending().keys().copied().collect();
        parents.sort_unstable();
        parents
    }

    /// Send the pending payload for `parent_id` now, skipping the wait
    pub async fn flush_now(&self, parent_id: u32) -> BoardResult<()> {
        let entry = self.inner.lock_pending().remove(&parent_id);
        match entry {
            Some(entry) => {
                entry.timer.abort();
                self.inner.send(parent_id, entry.positions, entry.baseline).await
            }
            None => Ok(()),
        }
    }

    /// Send every pending payload now; returns the first failure
    pub async fn flush_all(&self) -> BoardResult<()> {
        let drained: Vec<(u32, PendingFlush<T>)> = self.inner.lock_pending().drain().collect();
        let mut result = Ok(());
        for (parent_id, entry) in drained {
            entry.timer.abort();
            let sent = self.inner.send(parent_id, entry.positions, entry.baseline).await;
            if result.is_ok() {
                result = sent;
            }
        }
        result
    }
}

impl<T: Sequenced> Inner<T> {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<u32, PendingFlush<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fire(&self, parent_id: u32, generation: u64) {
        // Take the entry before sending so a later schedule never aborts
        // an in-flight request
        let entry = {
            let mut pending = self.lock_pending();
            let current = pending
                .get(&parent_id)
                .is_some_and(|entry| entry.generation == generation);
            if current {
                pending.remove(&parent_id)
            } else {
                None
            }
        };
        if let Some(entry) = entry {
            // Failures are already logged and rolled back
            let _ = self.send(parent_id, entry.positions, entry.baseline).await;
        }
    }

    async fn send(
        &self,
        parent_id: u32,
        positions: Vec<PositionUpdate>,
        baseline: Option<RollbackToken<T>>,
    ) -> BoardResult<()> {
        match self.api.bulk_set_positions(parent_id, &positions).await {
            Ok(canonical) => {
                tracing::info!(parent_id, count = positions.len(), "positions persisted");
                // A newer local change is waiting; don't overwrite it
                let superseded = self.lock_pending().contains_key(&parent_id);
                let canonical = (!superseded).then_some(canonical);
                match baseline {
                    Some(token) => self.cache.commit(token, canonical),
                    None => {
                        if let Some(siblings) = canonical {
                            self.cache.load(parent_id, siblings);
                        }
                    }
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(parent_id, error = %err, "bulk position update failed");
                let orphaned = {
                    let mut pending = self.lock_pending();
                    let orphaned = match (pending.get_mut(&parent_id), baseline) {
                        // The newer payload carries the full sequence and supersedes
                        // this one; hand it the older baseline
                        (Some(newer), Some(token)) => {
                            if newer.baseline.is_none() && !newer.rebased {
                                newer.baseline = Some(token);
                            }
                            None
                        }
                        (_, token) => token,
                    };
                    orphaned
                };
                if let Some(token) = orphaned {
                    self.cache.rollback(token);
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<T: Sequenced> Persist<T> for DebouncedPersister<T> {
    fn schedule(&self, parent_id: u32, positions: Vec<PositionUpdate>, baseline: Option<RollbackToken<T>>) {
        DebouncedPersister::schedule(self, parent_id, positions, baseline);
    }

    fn rebase(&self, parent_id: u32) {
        DebouncedPersister::rebase(self, parent_id);
    }

    async fn move_entity(&self, intent: MoveIntent) -> BoardResult<()> {
        tracing::info!(
            entity_id = intent.entity_id,
            from = intent.source_parent_id,
            to = intent.dest_parent_id,
            order = %intent.new_order,
            "moving {:?}",
            T::KIND
        );
        self.inner.api.move_single_entity(intent).await
    }

    async fn create(&self, parent_id: u32, title: &str, position: Position) -> BoardResult<T> {
        self.inner.api.create_entity(parent_id, title, position).await
    }

    async fn delete(&self, id: u32) -> BoardResult<()> {
        self.inner.api.delete_entity(id).await
    }

    async fn fetch(&self, parent_id: u32) -> BoardResult<Vec<T>> {
        self.inner.api.fetch_siblings(parent_id).await
    }
}
