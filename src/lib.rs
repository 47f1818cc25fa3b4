//! Kanban Board Client
//!
//! Layered architecture:
//! - models, ordering: entities and pure sibling-ordering operations
//! - store: optimistic cache with rollback tokens
//! - persister: per-parent debounced persistence
//! - controller: drop events to ordering changes
//! - commands: board service bindings
//! - context: per-board session wiring everything together

pub mod commands;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod models;
pub mod ordering;
pub mod persister;
pub mod store;

pub use commands::{HttpBoardClient, SiblingApi};
pub use config::BoardConfig;
pub use context::{BoardSession, Lane};
pub use controller::{plan, DragController, DropPlan};
pub use error::{BoardError, BoardResult};
pub use models::{Board, Card, EntityKind, List, MoveIntent, Position, PositionUpdate, Sequenced};
pub use persister::{DebouncedPersister, Persist};
pub use store::{OptimisticCache, RollbackToken};

pub use kanban_dragdrop as dragdrop;
