//! Board Session
//!
//! Wires cache, persister and drag controller together for lists (keyed by
//! board id) and cards (keyed by list id).

use std::sync::Arc;
use std::time::Duration;

use kanban_dragdrop::DragOutcome;

use crate::commands::{HttpBoardClient, SiblingApi};
use crate::config::BoardConfig;
use crate::controller::{DragController, DropPlan};
use crate::error::{BoardError, BoardResult};
use crate::models::{Card, List, Position, Sequenced};
use crate::ordering;
use crate::persister::{DebouncedPersister, Persist};
use crate::store::OptimisticCache;

/// Cache and persister for one entity kind
pub struct Lane<T: Sequenced> {
    cache: OptimisticCache<T>,
    persister: DebouncedPersister<T>,
}

impl<T: Sequenced> Lane<T> {
    pub fn new(api: Arc<dyn SiblingApi<T>>, debounce: Duration) -> Self {
        let cache = OptimisticCache::new();
        let persister = DebouncedPersister::new(api, cache.clone(), debounce);
        Self { cache, persister }
    }

    pub fn cache(&self) -> &OptimisticCache<T> {
        &self.cache
    }

    pub fn persister(&self) -> &DebouncedPersister<T> {
        &self.persister
    }

    pub fn snapshot(&self, parent_id: u32) -> Vec<T> {
        self.cache.snapshot(parent_id)
    }

    /// Fetch the siblings of `parent_id` and replace the local snapshot
    pub async fn load(&self, parent_id: u32) -> BoardResult<Vec<T>> {
        let siblings = self.persister.fetch(parent_id).await?;
        self.cache.load(parent_id, siblings);
        Ok(self.cache.snapshot(parent_id))
    }

    /// Same as `load`; used after the cache turned out to be stale
    pub async fn resync(&self, parent_id: u32) -> BoardResult<()> {
        tracing::info!(parent_id, "resyncing {:?} siblings", T::KIND);
        self.load(parent_id).await.map(|_| ())
    }

    /// Create at the end of `parent_id`; the cache updates once the service answers.
    ///
    /// If the service placed the entity elsewhere (its siblings were not
    /// contiguous yet), pending positions are sent and the parent is reloaded.
    pub async fn create(&self, parent_id: u32, title: &str) -> BoardResult<T> {
        let position = Position::from_index(self.cache.len(parent_id));
        let created = self.persister.create(parent_id, title, position).await?;
        if created.position() == position {
            let token = self
                .cache
                .apply_local(parent_id, |seq| Ok(ordering::append(seq, created.clone())))?;
            self.cache.commit(token, None);
            return Ok(created);
        }

        tracing::info!(
            parent_id,
            requested = %position,
            placed = %created.position(),
            "{:?} created out of place",
            T::KIND
        );
        self.persister.flush_now(parent_id).await?;
        self.resync(parent_id).await?;
        let placed = self
            .cache
            .snapshot(parent_id)
            .into_iter()
            .find(|entity| entity.id() == created.id());
        Ok(placed.unwrap_or(created))
    }

    /// Delete remotely, close the local gap and queue the renumbered positions
    pub async fn delete(&self, parent_id: u32, id: u32) -> BoardResult<()> {
        self.persister.delete(id).await?;

        let mut payload = Vec::new();
        let removed = self.cache.apply_local(parent_id, |seq| {
            let next = ordering::remove(seq, id)?;
            payload = ordering::positions(&next);
            Ok(next)
        });
        match removed {
            Ok(token) => {
                self.cache.commit(token, None);
                self.persister.schedule(parent_id, payload, None);
                self.persister.rebase(parent_id);
                Ok(())
            }
            Err(BoardError::EntityNotFound { .. }) => self.resync(parent_id).await,
            Err(err) => Err(err),
        }
    }

    /// Apply a finished gesture; a stale cache is refreshed before the error returns
    pub async fn on_drop(&self, outcome: DragOutcome) -> BoardResult<DropPlan> {
        let controller = DragController::new(&self.cache, &self.persister);
        match controller.on_drop(outcome).await {
            Err(BoardError::EntityNotFound { id }) => {
                tracing::warn!(entity_id = id, "drop on stale {:?} snapshot", T::KIND);
                if let DragOutcome::Dropped(event) = outcome {
                    self.resync(event.origin.parent_id).await?;
                    let dest_parent_id = event.target.parent_id();
                    if dest_parent_id != event.origin.parent_id {
                        self.resync(dest_parent_id).await?;
                    }
                }
                Err(BoardError::EntityNotFound { id })
            }
            result => result,
        }
    }

    pub async fn flush_all(&self) -> BoardResult<()> {
        self.persister.flush_all().await
    }
}

/// Lists and cards of the boards the client shows
pub struct BoardSession {
    pub lists: Lane<List>,
    pub cards: Lane<Card>,
}

impl BoardSession {
    pub fn new<A>(api: Arc<A>, config: &BoardConfig) -> Self
    where
        A: SiblingApi<List> + SiblingApi<Card> + 'static,
    {
        let debounce = config.debounce();
        let list_api: Arc<dyn SiblingApi<List>> = api.clone();
        let card_api: Arc<dyn SiblingApi<Card>> = api;
        Self {
            lists: Lane::new(list_api, debounce),
            cards: Lane::new(card_api, debounce),
        }
    }

    /// Session over HTTP using `config`
    pub fn connect(config: &BoardConfig) -> BoardResult<Self> {
        let client = Arc::new(HttpBoardClient::new(config)?);
        Ok(Self::new(client, config))
    }

    /// Load a board's lists, then the cards of every list
    pub async fn load_board(&self, board_id: u32) -> BoardResult<()> {
        let lists = self.lists.load(board_id).await?;
        for list in &lists {
            self.cards.load(list.id).await?;
        }
        tracing::info!(board_id, lists = lists.len(), "board loaded");
        Ok(())
    }

    /// Send every pending position update
    pub async fn shutdown(&self) -> BoardResult<()> {
        let lists = self.lists.flush_all().await;
        let cards = self.cards.flush_all().await;
        lists.and(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persister::testing::{card, RecordingApi};
    use kanban_dragdrop::{DragOrigin, DropEvent, DropTarget};

    fn lane() -> (Arc<RecordingApi>, Lane<Card>) {
        let api = Arc::new(RecordingApi::default());
        let lane = Lane::new(api.clone(), Duration::from_millis(3000));
        (api, lane)
    }

    fn seed(lane: &Lane<Card>, list_id: u32, ids: &[u32]) {
        let cards = ids
            .iter()
            .enumerate()
            .map(|(i, id)| card(*id, list_id, Position::from_index(i)))
            .collect();
        lane.cache().load(list_id, cards);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_closes_gap() {
        let (api, lane) = lane();
        seed(&lane, 1, &[1, 2, 3]);

        lane.delete(1, 2).await.unwrap();

        let snapshot = lane.snapshot(1);
        let ids: Vec<u32> = snapshot.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(snapshot[1].position, Position::new(2).unwrap());
        assert!(lane.persister().is_pending(1));

        lane.flush_all().await.unwrap();
        assert_eq!(api.bulk_calls(), vec![(1, ordering::positions(&snapshot))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_appends() {
        let (_api, lane) = lane();
        seed(&lane, 1, &[1, 2]);

        let created = lane.create(1, "Write docs").await.unwrap();
        assert_eq!(created.position, Position::new(3).unwrap());
        assert_eq!(lane.snapshot(1).last(), Some(&created));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_drop_resyncs() {
        let (_api, lane) = lane();
        seed(&lane, 1, &[1, 2]);

        let outcome = DragOutcome::Dropped(DropEvent {
            entity_id: 5,
            origin: DragOrigin { parent_id: 1, index: 0 },
            target: DropTarget::Zone { parent_id: 1, index: 2 },
        });
        let err = lane.on_drop(outcome).await.unwrap_err();

        assert_eq!(err, BoardError::EntityNotFound { id: 5 });
        // The recording service has no cards
        assert!(lane.snapshot(1).is_empty());
    }

    fn ids(lane: &Lane<Card>, list_id: u32) -> Vec<u32> {
        lane.snapshot(list_id).iter().map(|c| c.id).collect()
    }

    fn dropped(entity_id: u32, parent_id: u32, index: usize, target: DropTarget) -> DragOutcome {
        DragOutcome::Dropped(DropEvent {
            entity_id,
            origin: DragOrigin { parent_id, index },
            target,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_after_move_keeps_moved_card_once() {
        let (api, lane) = lane();
        seed(&lane, 1, &[1, 2, 3]);
        seed(&lane, 2, &[4]);

        lane.on_drop(dropped(1, 1, 0, DropTarget::Container(1))).await.unwrap();
        assert_eq!(ids(&lane, 1), vec![2, 3, 1]);
        lane.on_drop(dropped(2, 1, 0, DropTarget::Container(2))).await.unwrap();
        assert_eq!(api.moves.lock().unwrap().len(), 1);

        api.failing(true);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert!(lane.persister().pending_parents().is_empty());
        assert_eq!(ids(&lane, 1), vec![3, 1]);
        assert_eq!(ids(&lane, 2), vec![4, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_after_delete_keeps_card_gone() {
        let (api, lane) = lane();
        seed(&lane, 1, &[1, 2, 3]);

        lane.on_drop(dropped(1, 1, 0, DropTarget::Container(1))).await.unwrap();
        lane.delete(1, 3).await.unwrap();
        assert_eq!(ids(&lane, 1), vec![2, 1]);

        api.failing(true);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert_eq!(api.bulk_calls().len(), 1);
        assert_eq!(ids(&lane, 1), vec![2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_out_of_place_reloads_parent() {
        let (api, lane) = lane();
        seed(&lane, 1, &[1, 2]);
        *api.placed_at.lock().unwrap() = Some(Position::FIRST);
        api.remote.lock().unwrap().insert(
            1,
            vec![
                card(1, 1, Position::new(2).unwrap()),
                card(100, 1, Position::FIRST),
                card(2, 1, Position::new(3).unwrap()),
            ],
        );

        let created = lane.create(1, "Urgent").await.unwrap();

        assert_eq!(created.id, 100);
        assert_eq!(created.position, Position::FIRST);
        assert_eq!(ids(&lane, 1), vec![100, 1, 2]);
        assert!(ordering::is_contiguous(&lane.snapshot(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_keeps_cache() {
        let (api, lane) = lane();
        seed(&lane, 1, &[1, 2]);
        api.failing(true);

        assert!(lane.delete(1, 2).await.is_err());
        assert_eq!(lane.snapshot(1).len(), 2);
        assert!(!lane.persister().is_pending(1));
    }
}
