//! Card Entity
//!
//! A task inside a list, ordered by position among the list's cards.

use serde::{Deserialize, Serialize};

use super::entity::{Entity, Sibling};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub list_id: u32,
    pub title: String,
    pub description: Option<String>,
    /// 1-based rank within the list
    pub position: u32,
    #[serde(default)]
    pub updated_at: i64,
}

impl Card {
    /// Unsaved card; position 0 means "append"
    pub fn new(list_id: u32, title: String) -> Self {
        Self {
            id: 0,
            list_id,
            title,
            description: None,
            position: 0,
            updated_at: 0,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn at(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

impl Entity for Card {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Sibling for Card {
    fn parent_id(&self) -> u32 {
        self.list_id
    }

    fn position(&self) -> u32 {
        self.position
    }
}
