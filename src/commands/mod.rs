//! Board Service Commands
//!
//! The calls the ordering core makes against the board service, and the
//! HTTP client that implements them.

mod http;

use async_trait::async_trait;

use crate::error::BoardResult;
use crate::models::{MoveIntent, Position, PositionUpdate, Sequenced};

pub use http::HttpBoardClient;

/// Remote operations on the siblings of one parent
#[async_trait]
pub trait SiblingApi<T: Sequenced>: Send + Sync {
    /// Siblings ordered by position
    async fn fetch_siblings(&self, parent_id: u32) -> BoardResult<Vec<T>>;

    async fn create_entity(&self, parent_id: u32, title: &str, position: Position) -> BoardResult<T>;

    /// The service leaves a gap; callers renumber
    async fn delete_entity(&self, id: u32) -> BoardResult<()>;

    /// Overwrite positions of a parent's children; safe to repeat
    async fn bulk_set_positions(
        &self,
        parent_id: u32,
        positions: &[PositionUpdate],
    ) -> BoardResult<Vec<T>>;

    /// Move one entity to another parent
    async fn move_single_entity(&self, intent: MoveIntent) -> BoardResult<()>;
}
