//! Board Models
//!
//! Data structures matching the board service entities, plus the
//! `Sequenced` trait that lets ordering code treat lists and cards alike.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// 1-based rank of an entity among its siblings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Position(u32);

impl Position {
    pub const FIRST: Position = Position(1);

    /// `None` for 0, positions start at 1
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Position(value))
    }

    /// Position of the entity sitting at a 0-based index
    pub fn from_index(index: usize) -> Self {
        Position(u32::try_from(index).unwrap_or(u32::MAX - 1) + 1)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// 0-based index matching this position
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The service may send positions as numbers or numeric strings
impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s.trim().parse::<u32>().map_err(serde::de::Error::custom)?,
        };
        Position::new(value).ok_or_else(|| serde::de::Error::custom("position must be >= 1"))
    }
}

/// Which kind of sibling collection an entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    List,
    Card,
}

impl EntityKind {
    /// REST collection of the entity itself
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::List => "lists",
            EntityKind::Card => "cards",
        }
    }

    /// REST collection of the parent
    pub fn parent_collection(self) -> &'static str {
        match self {
            EntityKind::List => "boards",
            EntityKind::Card => "lists",
        }
    }
}

/// An entity ranked among siblings sharing a parent
pub trait Sequenced: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> u32;
    fn parent_id(&self) -> u32;
    fn set_parent_id(&mut self, parent_id: u32);
    fn position(&self) -> Position;
    fn set_position(&mut self, position: Position);
}

/// Board (owns lists)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: u32,
    pub title: String,
}

/// List data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: u32,
    pub board_id: u32,
    pub title: String,
    pub position: Position,
}

/// Card data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: u32,
    pub list_id: u32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub position: Position,
}

impl Sequenced for List {
    const KIND: EntityKind = EntityKind::List;

    fn id(&self) -> u32 {
        self.id
    }

    fn parent_id(&self) -> u32 {
        self.board_id
    }

    fn set_parent_id(&mut self, parent_id: u32) {
        self.board_id = parent_id;
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

impl Sequenced for Card {
    const KIND: EntityKind = EntityKind::Card;

    fn id(&self) -> u32 {
        self.id
    }

    fn parent_id(&self) -> u32 {
        self.list_id
    }

    fn set_parent_id(&mut self, parent_id: u32) {
        self.list_id = parent_id;
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// One `{id, position}` pair of a bulk position update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: u32,
    pub position: Position,
}

/// Cross-parent move sent eagerly to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveIntent {
    pub entity_id: u32,
    pub source_parent_id: u32,
    pub dest_parent_id: u32,
    /// Position in the destination after the move
    pub new_order: Position,
}
