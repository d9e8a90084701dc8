//! Players and their identifiers
//!
//! This module defines the participant record stored in the game state. A
//! player is created the first time a name joins and is only ever mutated
//! afterwards: levels get completed and lives get lost.

use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use crate::level::LevelId;

/// A unique identifier for players and host devices
///
/// Each player gets an id when first joining, and each hosting device gets
/// one when creating a game.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    /// Creates a new random id (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    /// Parses an id from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Outcome of catching a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Caught {
    /// The player lost a life and is still in the game
    LostLife {
        /// Lives the player has left
        lives_left: u32,
    },
    /// The player lost their last life
    Eliminated,
    /// The player was already out, nothing changed
    AlreadyEliminated,
}

/// A participant trying to escape Granny
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: Id,
    name: String,
    lives: u32,
    completed_levels: BTreeSet<LevelId>,
    eliminated: bool,
}

impl Player {
    /// Creates a fresh player with a full set of lives
    pub fn new(name: impl Into<String>, lives: u32) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            lives,
            completed_levels: BTreeSet::new(),
            eliminated: false,
        }
    }

    /// The player's unique id
    pub fn id(&self) -> Id {
        self.id
    }

    /// The name the player joined with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lives the player has left
    pub fn lives(&self) -> u32 {
        self.lives
    }

    /// Ids of the levels this player has completed
    pub fn completed_levels(&self) -> &BTreeSet<LevelId> {
        &self.completed_levels
    }

    /// Number of completed levels
    pub fn completed_count(&self) -> usize {
        self.completed_levels.len()
    }

    /// Whether the given level is already completed
    pub fn has_completed(&self, level: LevelId) -> bool {
        self.completed_levels.contains(&level)
    }

    /// Whether the player has run out of lives
    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    /// Marks a level as completed, returning `false` if it already was
    pub(crate) fn complete_level(&mut self, level: LevelId) -> bool {
        self.completed_levels.insert(level)
    }

    /// Takes one life away
    ///
    /// Once eliminated, the player is never touched again.
    pub(crate) fn catch(&mut self) -> Caught {
        if self.eliminated {
            return Caught::AlreadyEliminated;
        }
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.eliminated = true;
            Caught::Eliminated
        } else {
            Caught::LostLife {
                lives_left: self.lives,
            }
        }
    }
}
