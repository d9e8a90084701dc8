//! Display models for every role
//!
//! The front end never reads the game state directly. Instead it receives a
//! [`View`] built for the role of the device (Granny, an active player, an
//! eliminated player or a bystander) and redraws it wholesale on every
//! change, plus short-lived [`Feedback`] messages after player actions.

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::Serialize;
use serde_with::skip_serializing_none;
use web_time::Duration;

use crate::{
    constants::timing::{ERROR_LIFETIME, INCORRECT_CODE_LIFETIME},
    level::LevelId,
    player::{Caught, Id, Player},
    progression::Submission,
    state::{GameState, Outcome},
};

/// The part a device plays in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    /// The hosting device hunting the players
    Granny,
    /// A device that joined as the given player
    Player(Id),
    /// A device that has neither hosted nor joined
    Spectator,
}

/// Coarse status of a player, used for the summary on Granny's screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize)]
pub enum PlayerStatus {
    /// Still hunting for codes
    Active,
    /// Completed every level
    Finished,
    /// Out of lives
    Eliminated,
}

impl PlayerStatus {
    fn of(player: &Player, num_levels: u32) -> Self {
        if player.is_eliminated() {
            Self::Eliminated
        } else if player.completed_count() == num_levels as usize {
            Self::Finished
        } else {
            Self::Active
        }
    }
}

/// The end-of-game banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GameOver {
    /// A player completed every level first
    Winner(String),
    /// Every player was caught
    GrannyWins,
}

impl GameOver {
    /// Converts a game outcome into a banner, if the game is over
    pub fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::InProgress => None,
            Outcome::Winner(name) => Some(Self::Winner(name)),
            Outcome::GrannyWins => Some(Self::GrannyWins),
        }
    }

    /// Text shown on the banner
    pub fn banner(&self) -> String {
        match self {
            Self::Winner(name) => format!("🎉 {name} WINS! 🎉"),
            Self::GrannyWins => "💀 Everyone was caught! Granny wins! 💀".to_owned(),
        }
    }
}

/// One row of the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Player name
    pub name: String,
    /// Lives left
    pub lives: u32,
    /// Number of completed levels
    pub completed: usize,
    /// Total number of levels
    pub num_levels: u32,
    /// Whether the player is out
    pub eliminated: bool,
    /// Whether the player won
    pub winner: bool,
}

/// Completion state of one level for the progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelProgress {
    /// The level
    pub level: LevelId,
    /// Whether the player completed it
    pub completed: bool,
}

/// A clue of a level the player still has to complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clue {
    /// The level the clue belongs to
    pub level: LevelId,
    /// The clue text
    pub text: String,
}

/// What an active player sees
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    /// The player's name
    pub name: String,
    /// Lives left
    pub lives: u32,
    /// Lives the player started with
    pub num_lives: u32,
    /// One entry per level, in level order
    pub progress: Vec<LevelProgress>,
    /// Clues of the levels not completed yet
    pub clues: Vec<Clue>,
    /// Leaderboard of every player
    pub standings: Vec<Standing>,
    /// Banner, once the game is over
    pub game_over: Option<GameOver>,
}

impl PlayerView {
    /// Whether every level is completed
    pub fn all_completed(&self) -> bool {
        self.clues.is_empty()
    }
}

/// A complete, role-specific snapshot for the front end
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum View {
    /// Granny's screen: the leaderboard and a status summary
    Granny {
        /// Leaderboard of every player
        standings: Vec<Standing>,
        /// Number of players per status
        counts: EnumMap<PlayerStatus, usize>,
        /// Banner, once the game is over
        game_over: Option<GameOver>,
    },
    /// An active player's screen
    Player(PlayerView),
    /// The screen of a player who ran out of lives
    Eliminated {
        /// The player's name
        name: String,
        /// Leaderboard of every player
        standings: Vec<Standing>,
        /// Banner, once the game is over
        game_over: Option<GameOver>,
    },
    /// A device that has not joined: the leaderboard only
    Spectator {
        /// Leaderboard of every player
        standings: Vec<Standing>,
        /// Banner, once the game is over
        game_over: Option<GameOver>,
    },
}

impl View {
    /// The banner of any view, once the game is over
    pub fn game_over(&self) -> Option<&GameOver> {
        match self {
            Self::Granny { game_over, .. }
            | Self::Eliminated { game_over, .. }
            | Self::Spectator { game_over, .. } => game_over.as_ref(),
            Self::Player(view) => view.game_over.as_ref(),
        }
    }

    /// The leaderboard of any view
    pub fn standings(&self) -> &[Standing] {
        match self {
            Self::Granny { standings, .. }
            | Self::Eliminated { standings, .. }
            | Self::Spectator { standings, .. } => standings,
            Self::Player(view) => &view.standings,
        }
    }

    /// Converts the view to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

impl GameState {
    /// Leaderboard sorted by completed levels, then by lives left
    ///
    /// Ties keep join order.
    pub fn standings(&self) -> Vec<Standing> {
        let winner = self.winner();
        self.players()
            .iter()
            .sorted_by(|a, b| {
                b.completed_count()
                    .cmp(&a.completed_count())
                    .then_with(|| b.lives().cmp(&a.lives()))
            })
            .map(|player| Standing {
                name: player.name().to_owned(),
                lives: player.lives(),
                completed: player.completed_count(),
                num_levels: self.num_levels(),
                eliminated: player.is_eliminated(),
                winner: winner == Some(player.name()),
            })
            .collect_vec()
    }

    /// Builds the view for a role
    ///
    /// A player id that is not part of the game falls back to the spectator
    /// view.
    pub fn view(&self, role: Role) -> View {
        let standings = self.standings();
        let game_over = GameOver::from_outcome(self.outcome());

        match role {
            Role::Granny => {
                let mut counts: EnumMap<PlayerStatus, usize> = EnumMap::default();
                for player in self.players() {
                    counts[PlayerStatus::of(player, self.num_levels())] += 1;
                }
                View::Granny {
                    standings,
                    counts,
                    game_over,
                }
            }
            Role::Player(id) => match self.player(id) {
                Some(player) if player.is_eliminated() => View::Eliminated {
                    name: player.name().to_owned(),
                    standings,
                    game_over,
                },
                Some(player) => View::Player(PlayerView {
                    name: player.name().to_owned(),
                    lives: player.lives(),
                    num_lives: self.num_lives(),
                    progress: self
                        .levels()
                        .iter()
                        .map(|level| LevelProgress {
                            level: level.id,
                            completed: player.has_completed(level.id),
                        })
                        .collect(),
                    clues: self
                        .levels()
                        .iter()
                        .filter(|level| !player.has_completed(level.id))
                        .map(|level| Clue {
                            level: level.id,
                            text: level.clue.clone(),
                        })
                        .collect(),
                    standings,
                    game_over,
                }),
                None => View::Spectator {
                    standings,
                    game_over,
                },
            },
            Role::Spectator => View::Spectator {
                standings,
                game_over,
            },
        }
    }
}

/// Short message shown after a player action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Feedback {
    /// A code completed a level
    LevelCompleted(LevelId),
    /// A well-formed code matched nothing
    Incorrect,
    /// The input was not a 1-4 digit code
    InvalidCode,
    /// The player lost a life
    Caught {
        /// Lives left
        lives_left: u32,
    },
    /// The player lost their last life
    Eliminated,
}

impl Feedback {
    /// Feedback for a code submission
    pub fn from_submission(submission: Submission) -> Self {
        match submission {
            Submission::Completed { level, .. } => Self::LevelCompleted(level),
            Submission::Incorrect => Self::Incorrect,
        }
    }

    /// Feedback for a catch, if anything changed
    pub fn from_caught(caught: Caught) -> Option<Self> {
        match caught {
            Caught::LostLife { lives_left } => Some(Self::Caught { lives_left }),
            Caught::Eliminated => Some(Self::Eliminated),
            Caught::AlreadyEliminated => None,
        }
    }

    /// Text to display
    pub fn message(&self) -> String {
        match self {
            Self::LevelCompleted(level) => format!("Level {level} completed! ✅"),
            Self::Incorrect => "Incorrect code ❌".to_owned(),
            Self::InvalidCode => "Enter a 4-digit code".to_owned(),
            Self::Caught { lives_left } => format!("Caught! {lives_left} lives left"),
            Self::Eliminated => "You have been eliminated! 💀".to_owned(),
        }
    }

    /// Whether the message reports a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Incorrect | Self::InvalidCode)
    }

    /// How long the message stays visible, `None` meaning until replaced
    pub fn lifetime(&self) -> Option<Duration> {
        match self {
            Self::Incorrect => Some(INCORRECT_CODE_LIFETIME),
            Self::InvalidCode => Some(ERROR_LIFETIME),
            _ => None,
        }
    }
}
