//! Kanban DragDrop Utilities
//!
//! Pointer-event drag-and-drop for lists and cards, independent of any UI
//! framework. The host forwards pointer events; the tracker decides whether a
//! gesture is a click, a drop, or a cancelled drag.
//! Uses movement threshold to distinguish click from drag.

use serde::{Deserialize, Serialize};

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: i32 = 5;

/// Primary (left) pointer button
pub const PRIMARY_BUTTON: i16 = 0;

/// Slot an entity was picked up from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragOrigin {
    pub parent_id: u32,
    pub index: usize,
}

/// Drop target types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropTarget {
    /// Gap between siblings (parent_id, gap index).
    ///
    /// Gaps are counted in the sequence as rendered when the drag started:
    /// 0 is before the first entity, `len` is after the last one.
    Zone { parent_id: u32, index: usize },
    /// Hovering another entity: the dragged one takes its slot
    Entity { id: u32, parent_id: u32, index: usize },
    /// Body of a parent container: append at the end
    Container(u32),
}

impl DropTarget {
    pub fn parent_id(&self) -> u32 {
        match *self {
            DropTarget::Zone { parent_id, .. } => parent_id,
            DropTarget::Entity { parent_id, .. } => parent_id,
            DropTarget::Container(parent_id) => parent_id,
        }
    }
}

/// A finished drag over a valid target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropEvent {
    pub entity_id: u32,
    pub origin: DragOrigin,
    pub target: DropTarget,
}

/// What releasing the pointer meant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOutcome {
    /// Nothing was pressed
    Idle,
    /// Released before the threshold was crossed
    Click(u32),
    /// Released over a target
    Dropped(DropEvent),
    /// Released outside any target
    Cancelled(u32),
}

/// Gesture phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragPhase {
    #[default]
    Idle,
    /// Pointer is down but has not moved far enough yet
    Pending {
        entity_id: u32,
        origin: DragOrigin,
        start_x: i32,
        start_y: i32,
    },
    Dragging {
        entity_id: u32,
        origin: DragOrigin,
        target: Option<DropTarget>,
    },
}

/// Pointer press on a draggable entity
#[derive(Clone, Copy, Debug)]
pub struct PointerDown {
    pub entity_id: u32,
    pub origin: DragOrigin,
    pub x: i32,
    pub y: i32,
    pub button: i16,
    /// Press landed on an input or button inside the entity
    pub over_control: bool,
}

/// DnD state for one board view
#[derive(Debug, Default)]
pub struct DragTracker {
    phase: DragPhase,
    just_ended: bool,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    pub fn dragging_id(&self) -> Option<u32> {
        match self.phase {
            DragPhase::Dragging { entity_id, .. } => Some(entity_id),
            _ => None,
        }
    }

    pub fn drop_target(&self) -> Option<DropTarget> {
        match self.phase {
            DragPhase::Dragging { target, .. } => target,
            _ => None,
        }
    }

    /// Record a pending drag with its start position
    pub fn pointer_down(&mut self, down: PointerDown) {
        if down.button != PRIMARY_BUTTON || down.over_control || self.is_dragging() {
            return;
        }
        self.just_ended = false;
        self.phase = DragPhase::Pending {
            entity_id: down.entity_id,
            origin: down.origin,
            start_x: down.x,
            start_y: down.y,
        };
    }

    /// Start dragging once the pointer moved past the threshold.
    /// Returns true on the move that started the drag.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        let DragPhase::Pending {
            entity_id,
            origin,
            start_x,
            start_y,
        } = self.phase
        else {
            return false;
        };

        let dx = (x - start_x).abs();
        let dy = (y - start_y).abs();
        if dx > DRAG_THRESHOLD_PX || dy > DRAG_THRESHOLD_PX {
            tracing::debug!(entity_id, parent_id = origin.parent_id, "drag started");
            self.phase = DragPhase::Dragging {
                entity_id,
                origin,
                target: None,
            };
            return true;
        }
        false
    }

    /// Pointer entered a target
    pub fn hover(&mut self, next: DropTarget) {
        if let DragPhase::Dragging {
            entity_id, target, ..
        } = &mut self.phase
        {
            // Don't allow dropping on self
            if let DropTarget::Entity { id, .. } = next {
                if id == *entity_id {
                    return;
                }
            }
            *target = Some(next);
        }
    }

    /// Pointer left the current target
    pub fn leave(&mut self) {
        if let DragPhase::Dragging { target, .. } = &mut self.phase {
            *target = None;
        }
    }

    /// Release the pointer and end the gesture
    pub fn pointer_up(&mut self) -> DragOutcome {
        let outcome = match std::mem::take(&mut self.phase) {
            DragPhase::Idle => DragOutcome::Idle,
            DragPhase::Pending { entity_id, .. } => DragOutcome::Click(entity_id),
            DragPhase::Dragging {
                entity_id,
                origin,
                target,
            } => {
                self.just_ended = true;
                match target {
                    Some(target) => DragOutcome::Dropped(DropEvent {
                        entity_id,
                        origin,
                        target,
                    }),
                    None => DragOutcome::Cancelled(entity_id),
                }
            }
        };
        tracing::debug!(?outcome, "pointer released");
        outcome
    }

    /// Abort the gesture (escape key, window blur)
    pub fn cancel(&mut self) -> DragOutcome {
        match std::mem::take(&mut self.phase) {
            DragPhase::Idle => DragOutcome::Idle,
            DragPhase::Pending { entity_id, .. } => DragOutcome::Cancelled(entity_id),
            DragPhase::Dragging { entity_id, .. } => {
                self.just_ended = true;
                DragOutcome::Cancelled(entity_id)
            }
        }
    }

    /// True once after a drag ended, so the host can swallow the click
    /// that the release would otherwise produce.
    pub fn take_just_ended(&mut self) -> bool {
        std::mem::take(&mut self.just_ended)
    }
}
