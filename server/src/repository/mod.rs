//! Repository Layer
//!
//! Data access abstractions and implementations.

mod board_repo;
mod db;
mod sibling_hierarchy;
mod sibling_positioning;
mod sibling_repo;
mod traits;

#[cfg(test)]
mod tests;

pub use board_repo::BoardRepository;
pub use db::{init_db, DbState, SharedConnection};
pub use sibling_hierarchy::SiblingHierarchyOperations;
pub use sibling_positioning::SiblingPositioningOperations;
pub use sibling_repo::{SiblingRepository, SiblingTable};
pub use traits::Repository;
