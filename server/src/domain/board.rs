//! Board Entity
//!
//! Top-level container; owns lists.

use serde::{Deserialize, Serialize};

use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: u32,
    pub title: String,
    /// Unix millis
    #[serde(default)]
    pub created_at: i64,
}

impl Board {
    pub fn new(title: String) -> Self {
        Self {
            id: 0,
            title,
            created_at: 0,
        }
    }
}

impl Entity for Board {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}
