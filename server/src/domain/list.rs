//! List Entity
//!
//! A column on a board, ordered by position among the board's lists.

use serde::{Deserialize, Serialize};

use super::entity::{Entity, Sibling};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: u32,
    pub board_id: u32,
    pub title: String,
    /// 1-based rank within the board
    pub position: u32,
    #[serde(default)]
    pub updated_at: i64,
}

impl List {
    /// Unsaved list; position 0 means "append"
    pub fn new(board_id: u32, title: String) -> Self {
        Self {
            id: 0,
            board_id,
            title,
            position: 0,
            updated_at: 0,
        }
    }

    pub fn at(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

impl Entity for List {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Sibling for List {
    fn parent_id(&self) -> u32 {
        self.board_id
    }

    fn position(&self) -> u32 {
        self.position
    }
}
