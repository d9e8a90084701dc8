//! Levels and their secret codes
//!
//! A level is one puzzle of the game: players find a 4-digit code somewhere in
//! the play area and a clue tells them where to look.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::constants::level::CODE_LENGTH;

/// Identifier of a level, counting from 1 in level order
pub type LevelId = u32;

/// A 4-digit level code
///
/// Codes are always stored zero-padded, so `"7"` and `"0007"` parse to the
/// same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct Code(String);

/// Errors that can occur when reading a code typed by a player or host
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Nothing was entered
    #[error("code cannot be empty")]
    Empty,
    /// The input contains something other than digits
    #[error("code may only contain digits")]
    NotNumeric,
    /// The input has more than four digits
    #[error("code has more than 4 digits")]
    TooLong,
}

impl Code {
    /// Parses player or host input into a code
    ///
    /// Surrounding whitespace is ignored and inputs shorter than four digits
    /// are left-padded with zeros.
    ///
    /// # Errors
    ///
    /// * `Error::Empty` - The trimmed input is empty
    /// * `Error::NotNumeric` - The input contains a non-digit character
    /// * `Error::TooLong` - The input has more than four digits
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::Empty);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::NotNumeric);
        }
        if trimmed.len() > CODE_LENGTH {
            return Err(Error::TooLong);
        }
        Ok(Self(format!("{trimmed:0>CODE_LENGTH$}")))
    }

    /// Returns the padded code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Code {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A single puzzle of the game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// Position of the level, starting at 1
    pub id: LevelId,
    /// The secret code that completes the level
    pub code: Code,
    /// Hint telling players where to find the code
    pub clue: String,
}
