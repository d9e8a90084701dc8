//! Code submission and catching
//!
//! This module implements the rules that move a player through the game:
//! entering level codes, getting caught by Granny and winning by completing
//! every level first. All functions work on an in-memory [`GameState`]; the
//! caller is responsible for persisting it afterwards.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    level::{self, Code, LevelId},
    player::{Caught, Id},
    state::GameState,
};

/// Outcome of submitting a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Submission {
    /// The code completed a level
    Completed {
        /// The level that was completed
        level: LevelId,
        /// Whether this completion made the player the winner
        won: bool,
    },
    /// The code matches no level the player still has to complete
    Incorrect,
}

impl Submission {
    /// Whether the state changed and needs to be persisted
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Errors that can occur while progressing through the game
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The submitted input is not a 1-4 digit code
    #[error("enter a 4-digit code")]
    InvalidCode(#[from] level::Error),
    /// The player is not part of this game
    #[error("player is not part of this game")]
    UnknownPlayer,
}

impl GameState {
    /// Submits a code on behalf of a player
    ///
    /// The input is zero-padded to four digits and compared against the
    /// levels in order; the first level with that code that the player has
    /// not completed yet gets completed. Completing the last level makes the
    /// player the winner unless someone else already is.
    ///
    /// # Errors
    ///
    /// * `Error::InvalidCode` - The input is not a 1-4 digit number
    /// * `Error::UnknownPlayer` - No player has the given id
    pub fn submit_code(&mut self, player_id: Id, input: &str) -> Result<Submission, Error> {
        let code = Code::parse(input)?;
        let num_levels = self.num_levels() as usize;

        let player = self.player(player_id).ok_or(Error::UnknownPlayer)?;
        let Some(level) = self
            .levels()
            .iter()
            .find(|level| level.code == code && !player.has_completed(level.id))
            .map(|level| level.id)
        else {
            debug!(player = player.name(), "incorrect code submitted");
            return Ok(Submission::Incorrect);
        };

        let player = self.player_mut(player_id).ok_or(Error::UnknownPlayer)?;
        player.complete_level(level);
        let finished = player.completed_count() == num_levels;
        let name = player.name().to_owned();

        info!(player = %name, level, "level completed");

        let won = finished && self.claim_victory(&name);
        if won {
            info!(player = %name, "player won the game");
        }

        Ok(Submission::Completed { level, won })
    }

    /// Records that Granny caught a player
    ///
    /// Eliminated players are left untouched.
    ///
    /// # Errors
    ///
    /// * `Error::UnknownPlayer` - No player has the given id
    pub fn catch_player(&mut self, player_id: Id) -> Result<Caught, Error> {
        let player = self.player_mut(player_id).ok_or(Error::UnknownPlayer)?;
        let caught = player.catch();

        match caught {
            Caught::LostLife { lives_left } => {
                info!(player = player.name(), lives_left, "player caught");
            }
            Caught::Eliminated => info!(player = player.name(), "player eliminated"),
            Caught::AlreadyEliminated => {}
        }

        Ok(caught)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        config::{GameConfig, SoundSettings},
        state::{Outcome, tests::sample_state},
    };

    #[test]
    fn test_submit_pads_input() {
        let mut state = sample_state();
        let id = state.join("Alice").unwrap().player;

        assert_eq!(
            state.submit_code(id, "1"),
            Ok(Submission::Completed {
                level: 1,
                won: false
            })
        );
        assert_eq!(
            state.submit_code(id, "012"),
            Ok(Submission::Completed {
                level: 2,
                won: false
            })
        );
    }

    #[test]
    fn test_submit_rejects_malformed_input() {
        let mut state = sample_state();
        let id = state.join("Alice").unwrap().player;

        assert_eq!(
            state.submit_code(id, ""),
            Err(Error::InvalidCode(level::Error::Empty))
        );
        assert_eq!(
            state.submit_code(id, "12345"),
            Err(Error::InvalidCode(level::Error::TooLong))
        );
        assert_eq!(
            state.submit_code(id, "abcd"),
            Err(Error::InvalidCode(level::Error::NotNumeric))
        );
        assert!(state.player(id).unwrap().completed_levels().is_empty());
    }

    #[test]
    fn test_submit_unknown_player() {
        let mut state = sample_state();
        assert_eq!(
            state.submit_code(Id::new(), "0001"),
            Err(Error::UnknownPlayer)
        );
        assert_eq!(state.catch_player(Id::new()), Err(Error::UnknownPlayer));
    }

    #[test]
    fn test_resubmitting_completed_code_is_incorrect() {
        let mut state = sample_state();
        let id = state.join("Alice").unwrap().player;

        assert!(state.submit_code(id, "0012").unwrap().is_completed());
        let before = state.clone();

        assert_eq!(state.submit_code(id, "0012"), Ok(Submission::Incorrect));
        assert_eq!(state, before);
        assert_eq!(
            state
                .player(id)
                .unwrap()
                .completed_levels()
                .iter()
                .copied()
                .collect::<Vec<_>>(),
            vec![2]
        );
    }

    #[test]
    fn test_duplicate_codes_complete_in_level_order() {
        let config = GameConfig::new(1, SoundSettings::default())
            .with_level("5555", "First")
            .with_level("4444", "Second")
            .with_level("5555", "Third");
        let mut state = GameState::create(&config).unwrap();
        let id = state.join("Alice").unwrap().player;

        assert_eq!(
            state.submit_code(id, "5555"),
            Ok(Submission::Completed {
                level: 1,
                won: false
            })
        );
        assert_eq!(
            state.submit_code(id, "5555"),
            Ok(Submission::Completed {
                level: 3,
                won: false
            })
        );
        assert_eq!(state.submit_code(id, "5555"), Ok(Submission::Incorrect));
    }

    #[test]
    fn test_scenario_submit_and_caught() {
        let mut state = sample_state();
        let id = state.join("Alice").unwrap().player;

        assert!(state.submit_code(id, "0012").unwrap().is_completed());
        assert_eq!(state.submit_code(id, "0012"), Ok(Submission::Incorrect));

        assert_eq!(state.catch_player(id), Ok(Caught::LostLife { lives_left: 1 }));
        assert_eq!(state.catch_player(id), Ok(Caught::Eliminated));
        let eliminated = state.clone();

        assert_eq!(state.catch_player(id), Ok(Caught::AlreadyEliminated));
        assert_eq!(state, eliminated);

        let player = state.player(id).unwrap();
        assert_eq!(player.lives(), 0);
        assert!(player.is_eliminated());
        assert_eq!(state.outcome(), Outcome::GrannyWins);
    }

    #[test]
    fn test_first_finisher_wins() {
        let mut state = sample_state();
        let a = state.join("A").unwrap().player;
        let b = state.join("B").unwrap().player;

        state.submit_code(a, "1").unwrap();
        state.submit_code(b, "1").unwrap();
        state.submit_code(a, "12").unwrap();
        state.submit_code(b, "12").unwrap();

        assert_eq!(
            state.submit_code(a, "123"),
            Ok(Submission::Completed {
                level: 3,
                won: true
            })
        );
        assert_eq!(
            state.submit_code(b, "123"),
            Ok(Submission::Completed {
                level: 3,
                won: false
            })
        );

        assert_eq!(state.winner(), Some("A"));
        assert_eq!(state.outcome(), Outcome::Winner("A".to_string()));
        assert_eq!(state.player(b).unwrap().completed_count(), 3);
    }

    #[test]
    fn test_completion_is_monotonic() {
        let mut state = sample_state();
        let id = state.join("Alice").unwrap().player;
        let mut previous = 0;

        for input in ["1", "9999", "1", "12", "0012", "123", "1", "0"] {
            let _ = state.submit_code(id, input);
            let count = state.player(id).unwrap().completed_count();
            assert!(count >= previous);
            previous = count;
        }
        assert_eq!(previous, 3);
    }

    #[test]
    fn test_eliminated_player_can_still_submit() {
        let mut state = sample_state();
        let id = state.join("Alice").unwrap().player;
        state.catch_player(id).unwrap();
        state.catch_player(id).unwrap();

        assert!(state.submit_code(id, "1").unwrap().is_completed());
        assert_eq!(state.player(id).unwrap().lives(), 0);
    }
}
