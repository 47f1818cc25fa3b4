//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO storage or transport dependencies.

mod board;
mod card;
mod entity;
mod list;

use serde::{Deserialize, Serialize};

pub use board::Board;
pub use card::Card;
pub use entity::{DomainError, DomainResult, Entity, Sibling};
pub use list::List;

/// One `{id, position}` pair of a bulk position update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: u32,
    pub position: u32,
}
