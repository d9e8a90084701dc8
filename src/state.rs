//! Shared game state
//!
//! This module contains the authoritative snapshot of a game session. The
//! whole struct is what gets persisted and polled; every device keeps its own
//! copy and replaces it wholesale whenever the persisted record changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    config::{self, GameConfig, SoundSettings},
    constants::game::MAX_PLAYER_COUNT,
    game_code::GameCode,
    level::{Code, Level, LevelId},
    names,
    player::{Id, Player},
};

/// Whether and how a game has ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Players are still hunting for codes
    InProgress,
    /// A player completed every level first
    Winner(String),
    /// Every player was caught
    GrannyWins,
}

/// Result of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    /// Id of the player the name resolved to
    pub player: Id,
    /// Whether the name already belonged to a player
    pub rejoined: bool,
}

/// Violations of the game state invariants
///
/// These are only ever produced for states read from the outside, such as a
/// persisted record or a share link.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// `numLevels` does not match the number of levels
    #[error("expected {expected} levels, found {found}")]
    LevelCount {
        /// Declared number of levels
        expected: u32,
        /// Levels actually present
        found: usize,
    },
    /// Level ids are not `1..=numLevels` in order
    #[error("level at position {position} has id {id}")]
    LevelOrder {
        /// Zero-based position in the level list
        position: usize,
        /// Id found at that position
        id: LevelId,
    },
    /// A player completed a level that does not exist
    #[error("player {player} completed unknown level {level}")]
    UnknownLevel {
        /// Name of the player
        player: String,
        /// The unknown level id
        level: LevelId,
    },
    /// A player has more lives than the game allows
    #[error("player {player} has {lives} lives out of {max}")]
    TooManyLives {
        /// Name of the player
        player: String,
        /// Lives the player has
        lives: u32,
        /// Lives allowed by the game
        max: u32,
    },
    /// An eliminated player still has lives, or a player without lives is not eliminated
    #[error("player {player} has an inconsistent elimination state")]
    Elimination {
        /// Name of the player
        player: String,
    },
    /// Two players share an id or a name
    #[error("player {player} appears more than once")]
    DuplicatePlayer {
        /// Name of the player
        player: String,
    },
    /// The winner is not one of the players
    #[error("winner {winner} is not a player")]
    UnknownWinner {
        /// Recorded winner
        winner: String,
    },
}

/// The complete state of one game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    game_code: GameCode,
    num_levels: u32,
    num_lives: u32,
    levels: Vec<Level>,
    players: Vec<Player>,
    started: bool,
    winner: Option<String>,
    host_id: Id,
    sound_settings: SoundSettings,
}

impl GameState {
    /// Creates a new game from a host configuration
    ///
    /// A fresh game code and host id are generated and the player list starts
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns a [`config::Error`] if the configuration does not validate.
    pub fn create(config: &GameConfig) -> Result<Self, config::Error> {
        config.check()?;

        let levels = config
            .levels
            .iter()
            .zip(1..)
            .map(|(level, id)| -> Result<Level, config::Error> {
                Ok(Level {
                    id,
                    code: Code::parse(&level.code)?,
                    clue: level.clue.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let state = Self {
            game_code: GameCode::new(),
            num_levels: levels.len() as u32,
            num_lives: config.num_lives,
            levels,
            players: Vec::new(),
            started: true,
            winner: None,
            host_id: Id::new(),
            sound_settings: config.sound_settings,
        };

        info!(
            game_code = %state.game_code,
            levels = state.num_levels,
            lives = state.num_lives,
            "game created"
        );

        Ok(state)
    }

    /// The code players use to join
    pub fn game_code(&self) -> &GameCode {
        &self.game_code
    }

    /// Number of levels to complete
    pub fn num_levels(&self) -> u32 {
        self.num_levels
    }

    /// Lives each player starts with
    pub fn num_lives(&self) -> u32 {
        self.num_lives
    }

    /// Levels in play order
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Players in join order
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Whether the game has been started
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Name of the first player to complete every level
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Token of the device that created the game
    pub fn host_id(&self) -> Id {
        self.host_id
    }

    /// Ambient sound settings chosen by the host
    pub fn sound_settings(&self) -> &SoundSettings {
        &self.sound_settings
    }

    /// Looks up a player by id
    pub fn player(&self, id: Id) -> Option<&Player> {
        self.players.iter().find(|p| p.id() == id)
    }

    /// Looks up a player by exact name
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name() == name)
    }

    pub(crate) fn player_mut(&mut self, id: Id) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    /// Records the winner unless one is already set
    ///
    /// Returns `true` if `name` became the winner.
    pub(crate) fn claim_victory(&mut self, name: &str) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(name.to_owned());
        true
    }

    /// Resolves a name to a player, creating the player on first join
    ///
    /// Names are trimmed before use, and an existing player with exactly the
    /// same name is resumed with all of their progress.
    ///
    /// # Errors
    ///
    /// * `names::Error::Empty`, `TooLong`, `Sinful` - The name is rejected
    /// * `names::Error::MaximumPlayers` - The game is full and the name is new
    pub fn join(&mut self, name: &str) -> Result<Join, names::Error> {
        let name = names::clean(name)?;

        if let Some(existing) = self.player_by_name(name) {
            return Ok(Join {
                player: existing.id(),
                rejoined: true,
            });
        }

        if self.players.len() >= MAX_PLAYER_COUNT {
            return Err(names::Error::MaximumPlayers);
        }

        let player = Player::new(name, self.num_lives);
        let id = player.id();
        self.players.push(player);

        info!(game_code = %self.game_code, player = name, "player joined");

        Ok(Join {
            player: id,
            rejoined: false,
        })
    }

    /// Evaluates whether the game is over
    ///
    /// A recorded winner ends the game; otherwise it ends once at least one
    /// player exists and all of them are eliminated.
    pub fn outcome(&self) -> Outcome {
        if let Some(winner) = &self.winner {
            return Outcome::Winner(winner.clone());
        }
        if !self.players.is_empty() && self.players.iter().all(Player::is_eliminated) {
            return Outcome::GrannyWins;
        }
        Outcome::InProgress
    }

    /// Whether the game has ended
    pub fn is_over(&self) -> bool {
        self.outcome() != Outcome::InProgress
    }

    /// Checks every invariant of the game state
    ///
    /// # Errors
    ///
    /// Returns the first [`Inconsistency`] found.
    pub fn verify(&self) -> Result<(), Inconsistency> {
        if self.levels.len() != self.num_levels as usize {
            return Err(Inconsistency::LevelCount {
                expected: self.num_levels,
                found: self.levels.len(),
            });
        }
        for (position, (level, expected)) in self.levels.iter().zip(1..).enumerate() {
            if level.id != expected {
                return Err(Inconsistency::LevelOrder {
                    position,
                    id: level.id,
                });
            }
        }

        for (index, player) in self.players.iter().enumerate() {
            let name = player.name().to_owned();
            if self.players[..index]
                .iter()
                .any(|other| other.id() == player.id() || other.name() == player.name())
            {
                return Err(Inconsistency::DuplicatePlayer { player: name });
            }
            if let Some(&level) = player
                .completed_levels()
                .iter()
                .find(|&&level| level == 0 || level > self.num_levels)
            {
                return Err(Inconsistency::UnknownLevel {
                    player: name,
                    level,
                });
            }
            if player.lives() > self.num_lives {
                return Err(Inconsistency::TooManyLives {
                    player: name,
                    lives: player.lives(),
                    max: self.num_lives,
                });
            }
            if player.is_eliminated() != (player.lives() == 0) {
                return Err(Inconsistency::Elimination { player: name });
            }
        }

        if let Some(winner) = &self.winner {
            if self.player_by_name(winner).is_none() {
                return Err(Inconsistency::UnknownWinner {
                    winner: winner.clone(),
                });
            }
        }

        Ok(())
    }
}
