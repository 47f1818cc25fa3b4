//! Drag Session Controller
//!
//! Turns a finished gesture into an ordering change: the cache is updated
//! first, then persistence is queued (same parent) or issued eagerly
//! (cross parent).

use kanban_dragdrop::{DragOutcome, DropEvent, DropTarget};

use crate::error::{BoardError, BoardResult};
use crate::models::{MoveIntent, Position, PositionUpdate, Sequenced};
use crate::ordering;
use crate::persister::Persist;
use crate::store::OptimisticCache;

/// What a drop resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPlan {
    Noop,
    Reorder {
        parent_id: u32,
        from: usize,
        to: usize,
    },
    MoveAcross {
        entity_id: u32,
        source_parent_id: u32,
        dest_parent_id: u32,
        dest_index: usize,
    },
}

/// Resolve `event` against a destination holding `dest_len` siblings
pub fn plan(event: &DropEvent, dest_len: usize) -> DropPlan {
    let origin = event.origin;
    let dest_parent_id = event.target.parent_id();

    if dest_parent_id == origin.parent_id {
        let to = match event.target {
            // Gaps past the source close up once it is lifted out
            DropTarget::Zone { index, .. } if index > origin.index => index - 1,
            DropTarget::Zone { index, .. } => index,
            DropTarget::Entity { index, .. } => index,
            DropTarget::Container(_) => dest_len.saturating_sub(1),
        };
        if to == origin.index {
            return DropPlan::Noop;
        }
        return DropPlan::Reorder {
            parent_id: origin.parent_id,
            from: origin.index,
            to,
        };
    }

    let dest_index = match event.target {
        DropTarget::Zone { index, .. } | DropTarget::Entity { index, .. } => index,
        DropTarget::Container(_) => dest_len,
    };
    DropPlan::MoveAcross {
        entity_id: event.entity_id,
        source_parent_id: origin.parent_id,
        dest_parent_id,
        dest_index,
    }
}

/// Applies drops to one entity kind
pub struct DragController<'a, T: Sequenced> {
    cache: &'a OptimisticCache<T>,
    persist: &'a dyn Persist<T>,
}

impl<'a, T: Sequenced> DragController<'a, T> {
    pub fn new(cache: &'a OptimisticCache<T>, persist: &'a dyn Persist<T>) -> Self {
        Self { cache, persist }
    }

    /// Execute the plan for a finished gesture and return it.
    ///
    /// Clicks, cancelled drags and idle releases have no effect.
    pub async fn on_drop(&self, outcome: DragOutcome) -> BoardResult<DropPlan> {
        let event = match outcome {
            DragOutcome::Dropped(event) => event,
            other => {
                tracing::debug!(?other, "gesture ended without a drop");
                return Ok(DropPlan::Noop);
            }
        };

        let dest_len = self.cache.len(event.target.parent_id());
        let plan = plan(&event, dest_len);
        tracing::debug!(entity_id = event.entity_id, ?plan, "drop resolved");

        match plan {
            DropPlan::Noop => {}
            DropPlan::Reorder { parent_id, from, to } => {
                self.reorder(event.entity_id, parent_id, from, to)?;
            }
            DropPlan::MoveAcross {
                entity_id,
                source_parent_id,
                dest_parent_id,
                dest_index,
            } => {
                self.move_across(entity_id, source_parent_id, dest_parent_id, dest_index)
                    .await?;
            }
        }
        Ok(plan)
    }

    fn reorder(&self, entity_id: u32, parent_id: u32, from: usize, to: usize) -> BoardResult<()> {
        let mut payload = Vec::new();
        let token = self.cache.apply_local(parent_id, |seq| {
            if let Some(entity) = seq.get(from) {
                if entity.id() != entity_id {
                    return Err(BoardError::EntityNotFound { id: entity_id });
                }
            }
            let next = ordering::reorder(seq, from, to)?;
            payload = ordering::positions(&next);
            Ok(next)
        })?;
        self.persist.schedule(parent_id, payload, Some(token));
        Ok(())
    }

    async fn move_across(
        &self,
        entity_id: u32,
        source_parent_id: u32,
        dest_parent_id: u32,
        dest_index: usize,
    ) -> BoardResult<()> {
        let mut payloads: (Vec<PositionUpdate>, Vec<PositionUpdate>) = Default::default();
        let mut new_order = Position::FIRST;
        let (source_token, dest_token) =
            self.cache
                .apply_local_pair(source_parent_id, dest_parent_id, |source, dest| {
                    let (next_source, next_dest) =
                        ordering::move_across(source, dest, entity_id, dest_parent_id, dest_index)?;
                    new_order = Position::from_index(dest_index.min(dest.len()));
                    payloads = (
                        ordering::positions(&next_source),
                        ordering::positions(&next_dest),
                    );
                    Ok((next_source, next_dest))
                })?;

        self.persist.schedule(source_parent_id, payloads.0, None);
        self.persist.schedule(dest_parent_id, payloads.1, None);

        let intent = MoveIntent {
            entity_id,
            source_parent_id,
            dest_parent_id,
            new_order,
        };
        match self.persist.move_entity(intent).await {
            Ok(()) => {
                self.cache.commit(source_token, None);
                self.cache.commit(dest_token, None);
                // Earlier reorders in either window can no longer be undone
                self.persist.rebase(source_parent_id);
                self.persist.rebase(dest_parent_id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(entity_id, error = %err, "cross-parent move failed, restoring both parents");
                self.cache.rollback(source_token);
                self.cache.rollback(dest_token);
                // Replace the queued payloads with the restored order
                for parent_id in [source_parent_id, dest_parent_id] {
                    let restored = ordering::positions(&self.cache.snapshot(parent_id));
                    self.persist.schedule(parent_id, restored, None);
                }
                Err(match err {
                    BoardError::PersistenceFailure(_) => err,
                    other => BoardError::PersistenceFailure(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Card;
    use crate::store::RollbackToken;
    use async_trait::async_trait;
    use kanban_dragdrop::DragOrigin;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakePersist {
        scheduled: Mutex<Vec<(u32, Vec<PositionUpdate>, bool)>>,
        rebased: Mutex<Vec<u32>>,
        moves: Mutex<Vec<MoveIntent>>,
        fail_moves: bool,
    }

    #[async_trait]
    impl Persist<Card> for FakePersist {
        fn schedule(
            &self,
            parent_id: u32,
            positions: Vec<PositionUpdate>,
            baseline: Option<RollbackToken<Card>>,
        ) {
            self.scheduled
                .lock()
                .unwrap()
                .push((parent_id, positions, baseline.is_some()));
        }

        fn rebase(&self, parent_id: u32) {
            self.rebased.lock().unwrap().push(parent_id);
        }

        async fn move_entity(&self, intent: MoveIntent) -> BoardResult<()> {
            self.moves.lock().unwrap().push(intent);
            if self.fail_moves {
                return Err(BoardError::PersistenceFailure("500: boom".to_string()));
            }
            Ok(())
        }

        async fn create(&self, _parent_id: u32, _title: &str, _position: Position) -> BoardResult<Card> {
            unreachable!()
        }

        async fn delete(&self, _id: u32) -> BoardResult<()> {
            unreachable!()
        }

        async fn fetch(&self, _parent_id: u32) -> BoardResult<Vec<Card>> {
            unreachable!()
        }
    }

    fn cards(list_id: u32, ids: &[u32]) -> Vec<Card> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Card {
                id: *id,
                list_id,
                title: format!("Card {}", id),
                description: None,
                position: Position::from_index(i),
            })
            .collect()
    }

    fn ids(seq: &[Card]) -> Vec<u32> {
        seq.iter().map(|c| c.id).collect()
    }

    fn dropped(entity_id: u32, parent_id: u32, index: usize, target: DropTarget) -> DragOutcome {
        DragOutcome::Dropped(DropEvent {
            entity_id,
            origin: DragOrigin { parent_id, index },
            target,
        })
    }

    fn event(parent_id: u32, index: usize, target: DropTarget) -> DropEvent {
        DropEvent {
            entity_id: 9,
            origin: DragOrigin { parent_id, index },
            target,
        }
    }

    #[test]
    fn test_plan_same_parent_zones() {
        // Gap after the source shifts down
        let down = event(1, 0, DropTarget::Zone { parent_id: 1, index: 3 });
        assert_eq!(plan(&down, 3), DropPlan::Reorder { parent_id: 1, from: 0, to: 2 });

        let up = event(1, 2, DropTarget::Zone { parent_id: 1, index: 0 });
        assert_eq!(plan(&up, 3), DropPlan::Reorder { parent_id: 1, from: 2, to: 0 });

        // Either gap next to the source is a no-op
        let before = event(1, 1, DropTarget::Zone { parent_id: 1, index: 1 });
        let after = event(1, 1, DropTarget::Zone { parent_id: 1, index: 2 });
        assert_eq!(plan(&before, 3), DropPlan::Noop);
        assert_eq!(plan(&after, 3), DropPlan::Noop);
    }

    #[test]
    fn test_plan_entity_and_container() {
        let onto = event(1, 0, DropTarget::Entity { id: 4, parent_id: 1, index: 2 });
        assert_eq!(plan(&onto, 3), DropPlan::Reorder { parent_id: 1, from: 0, to: 2 });

        let body = event(1, 2, DropTarget::Container(1));
        assert_eq!(plan(&body, 3), DropPlan::Noop);

        let other = event(1, 0, DropTarget::Container(2));
        assert_eq!(
            plan(&other, 4),
            DropPlan::MoveAcross {
                entity_id: 9,
                source_parent_id: 1,
                dest_parent_id: 2,
                dest_index: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_reorder_moves_last_to_front() {
        let cache = OptimisticCache::new();
        cache.load(1, cards(1, &[1, 2, 3]));
        let persist = FakePersist::default();
        let controller = DragController::new(&cache, &persist);

        let plan = controller
            .on_drop(dropped(3, 1, 2, DropTarget::Zone { parent_id: 1, index: 0 }))
            .await
            .unwrap();

        assert_eq!(plan, DropPlan::Reorder { parent_id: 1, from: 2, to: 0 });
        let snapshot = cache.snapshot(1);
        assert_eq!(ids(&snapshot), vec![3, 1, 2]);
        assert!(ordering::is_contiguous(&snapshot));

        let scheduled = persist.scheduled.lock().unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].0, 1);
        assert_eq!(scheduled[0].1, ordering::positions(&snapshot));
        assert!(scheduled[0].2);
    }

    #[tokio::test]
    async fn test_move_across_is_eager() {
        let cache = OptimisticCache::new();
        cache.load(1, cards(1, &[1, 2]));
        cache.load(2, cards(2, &[3]));
        let persist = FakePersist::default();
        let controller = DragController::new(&cache, &persist);

        controller
            .on_drop(dropped(1, 1, 0, DropTarget::Zone { parent_id: 2, index: 1 }))
            .await
            .unwrap();

        assert_eq!(ids(&cache.snapshot(1)), vec![2]);
        assert_eq!(ids(&cache.snapshot(2)), vec![3, 1]);
        assert_eq!(cache.snapshot(2)[1].list_id, 2);

        let moves = persist.moves.lock().unwrap();
        assert_eq!(
            *moves,
            vec![MoveIntent {
                entity_id: 1,
                source_parent_id: 1,
                dest_parent_id: 2,
                new_order: Position::new(2).unwrap(),
            }]
        );
        let parents: Vec<u32> = persist.scheduled.lock().unwrap().iter().map(|s| s.0).collect();
        assert_eq!(parents, vec![1, 2]);
        assert_eq!(*persist.rebased.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_move_restores_both_parents() {
        let cache = OptimisticCache::new();
        let source = cards(1, &[1, 2]);
        let dest = cards(2, &[3]);
        cache.load(1, source.clone());
        cache.load(2, dest.clone());
        let persist = FakePersist {
            fail_moves: true,
            ..Default::default()
        };
        let controller = DragController::new(&cache, &persist);

        let err = controller
            .on_drop(dropped(2, 1, 1, DropTarget::Container(2)))
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::PersistenceFailure(_)));
        assert_eq!(cache.snapshot(1), source);
        assert_eq!(cache.snapshot(2), dest);

        // Last payload per parent is the restored order
        let scheduled = persist.scheduled.lock().unwrap();
        assert_eq!(scheduled.len(), 4);
        assert_eq!(scheduled[2], (1, ordering::positions(&source), false));
        assert_eq!(scheduled[3], (2, ordering::positions(&dest), false));
        assert!(persist.rebased.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_origin_is_rejected() {
        let cache = OptimisticCache::new();
        let before = cards(1, &[1, 2, 3]);
        cache.load(1, before.clone());
        let persist = FakePersist::default();
        let controller = DragController::new(&cache, &persist);

        // Entity 3 is not at index 0
        let err = controller
            .on_drop(dropped(3, 1, 0, DropTarget::Zone { parent_id: 1, index: 3 }))
            .await
            .unwrap_err();
        assert_eq!(err, BoardError::EntityNotFound { id: 3 });

        let err = controller
            .on_drop(dropped(7, 1, 0, DropTarget::Container(2)))
            .await
            .unwrap_err();
        assert_eq!(err, BoardError::EntityNotFound { id: 7 });

        assert_eq!(cache.snapshot(1), before);
        assert!(persist.scheduled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_click_and_cancel_do_nothing() {
        let cache: OptimisticCache<Card> = OptimisticCache::new();
        let persist = FakePersist::default();
        let controller = DragController::new(&cache, &persist);

        for outcome in [DragOutcome::Idle, DragOutcome::Click(1), DragOutcome::Cancelled(1)] {
            assert_eq!(controller.on_drop(outcome).await.unwrap(), DropPlan::Noop);
        }
        assert!(persist.scheduled.lock().unwrap().is_empty());
        assert!(persist.moves.lock().unwrap().is_empty());
    }
}
