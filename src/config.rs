//! Host setup configuration
//!
//! This module defines what a host fills in before starting a game: the
//! levels with their codes and clues, the number of lives and the ambient
//! sound settings. Everything is validated with `garde` before a game state
//! is created from it.

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{
        game::{MAX_LEVELS, MAX_LIVES},
        level::MAX_CLUE_LENGTH,
        sound::{
            DEFAULT_INTERVAL_MAX_SECS, DEFAULT_INTERVAL_MIN_SECS, DEFAULT_VOLUME,
            MAX_INTERVAL_SECS, MAX_VOLUME, MIN_INTERVAL_SECS,
        },
    },
    level::Code,
};

/// Errors that can occur when validating a game configuration
#[derive(Error, Debug)]
pub enum Error {
    /// One or more fields are out of range or missing
    #[error("invalid game configuration: {0}")]
    Invalid(#[from] garde::Report),
    /// A level code could not be read
    #[error("invalid level code: {0}")]
    Code(#[from] crate::level::Error),
    /// The sound interval bounds are in the wrong order
    #[error("sound interval minimum {min}s exceeds maximum {max}s")]
    IntervalOrder {
        /// Configured lower bound
        min: u32,
        /// Configured upper bound
        max: u32,
    },
}

/// Validates that a level code typed by the host is a 1-4 digit number
fn valid_code(value: &str, _context: &()) -> garde::Result {
    Code::parse(value)
        .map(|_| ())
        .map_err(|e| garde::Error::new(e.to_string()))
}

/// Settings of the ambient sound scheduler
///
/// Intervals are in seconds and the volume is a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SoundSettings {
    /// Shortest wait between two cues
    #[garde(range(max = MAX_INTERVAL_SECS))]
    pub interval_min: u32,
    /// Longest wait between two cues, at least one second
    #[garde(range(min = MIN_INTERVAL_SECS, max = MAX_INTERVAL_SECS))]
    pub interval_max: u32,
    /// Loudness from 0 to 100
    #[garde(range(max = MAX_VOLUME))]
    pub volume: u32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            interval_min: DEFAULT_INTERVAL_MIN_SECS,
            interval_max: DEFAULT_INTERVAL_MAX_SECS,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl SoundSettings {
    /// Moves the lower bound, dragging the upper bound along if needed
    ///
    /// This mirrors the setup sliders: raising the minimum above the maximum
    /// raises the maximum too, so the pair always stays ordered.
    pub fn set_interval_min(&mut self, seconds: u32) {
        let seconds = seconds.min(MAX_INTERVAL_SECS);
        self.interval_min = seconds;
        if seconds > self.interval_max {
            self.interval_max = seconds;
        }
    }

    /// Moves the upper bound, dragging the lower bound along if needed
    pub fn set_interval_max(&mut self, seconds: u32) {
        let seconds = seconds.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS);
        self.interval_max = seconds;
        if seconds < self.interval_min {
            self.interval_min = seconds;
        }
    }

    /// Sets the volume, clamped to 100
    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume.min(MAX_VOLUME);
    }

    /// Checks the range limits and that the bounds are ordered
    ///
    /// # Errors
    ///
    /// * `Error::Invalid` - A value exceeds its limit
    /// * `Error::IntervalOrder` - `interval_min` is greater than `interval_max`
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        if self.interval_min > self.interval_max {
            return Err(Error::IntervalOrder {
                min: self.interval_min,
                max: self.interval_max,
            });
        }
        Ok(())
    }
}

/// Code and clue of a level as entered by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LevelConfig {
    /// The secret code, 1 to 4 digits
    #[garde(custom(valid_code))]
    pub code: String,
    /// Hint telling players where to find the code
    #[garde(length(min = 1, max = MAX_CLUE_LENGTH))]
    pub clue: String,
}

impl LevelConfig {
    /// Creates a level configuration
    pub fn new(code: impl Into<String>, clue: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            clue: clue.into(),
        }
    }
}

/// Everything needed to create a new game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Levels in play order
    #[garde(length(min = 1, max = MAX_LEVELS), dive)]
    pub levels: Vec<LevelConfig>,
    /// Lives every player starts with
    #[garde(range(min = 1, max = MAX_LIVES))]
    pub num_lives: u32,
    /// Ambient sound settings
    #[garde(dive)]
    pub sound_settings: SoundSettings,
}

impl GameConfig {
    /// Creates a configuration without levels
    pub fn new(num_lives: u32, sound_settings: SoundSettings) -> Self {
        Self {
            levels: Vec::new(),
            num_lives,
            sound_settings,
        }
    }

    /// Appends a level
    #[must_use]
    pub fn with_level(mut self, code: impl Into<String>, clue: impl Into<String>) -> Self {
        self.levels.push(LevelConfig::new(code, clue));
        self
    }

    /// Validates every field of the configuration
    ///
    /// # Errors
    ///
    /// * `Error::Invalid` - A field is missing or out of range
    /// * `Error::IntervalOrder` - The sound interval bounds are reversed
    pub fn check(&self) -> Result<(), Error> {
        self.validate()?;
        self.sound_settings.check()
    }
}
