//! Game code generation and parsing
//!
//! Game codes are short uppercase base-36 strings that players type on the
//! join screen. Parsing is case-insensitive so a code read aloud and typed in
//! lowercase still matches.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

use crate::constants::game::GAME_CODE_LENGTH;

/// Characters a game code is drawn from
const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A human-shareable identifier for a game session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct GameCode(String);

/// Errors that can occur when parsing a game code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The code is empty after trimming
    #[error("game code cannot be empty")]
    Empty,
    /// The code does not have the expected number of characters
    #[error("game code must be 6 characters long")]
    Length,
    /// The code contains characters outside of `0-9` and `A-Z`
    #[error("game code may only contain letters and digits")]
    Character,
}

impl GameCode {
    /// Creates a new random game code
    pub fn new() -> Self {
        Self(
            (0..GAME_CODE_LENGTH)
                .map(|_| char::from(ALPHABET[fastrand::usize(..ALPHABET.len())]))
                .collect(),
        )
    }

    /// Returns the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GameCode {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for GameCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GameCode {
    type Err = Error;

    /// Parses a game code, ignoring surrounding whitespace and case
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the trimmed input is empty, has the wrong
    /// length, or contains characters that never appear in a game code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Character);
        }
        if trimmed.len() != GAME_CODE_LENGTH {
            return Err(Error::Length);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_game_code_new_shape() {
        for _ in 0..100 {
            let code = GameCode::new();
            assert_eq!(code.as_str().len(), GAME_CODE_LENGTH);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
            );
        }
    }

    #[test]
    fn test_game_code_parse_case_insensitive() {
        let code = GameCode::from_str("  ab12cd ").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
        assert_eq!(code, GameCode::from_str("AB12CD").unwrap());
    }

    #[test]
    fn test_game_code_parse_errors() {
        assert_eq!(GameCode::from_str(""), Err(Error::Empty));
        assert_eq!(GameCode::from_str("   "), Err(Error::Empty));
        assert_eq!(GameCode::from_str("ABC"), Err(Error::Length));
        assert_eq!(GameCode::from_str("ABCDEFG"), Err(Error::Length));
        assert_eq!(GameCode::from_str("AB-12C"), Err(Error::Character));
    }

    #[test]
    fn test_game_code_serialization() {
        let code = GameCode::from_str("X1Y2Z3").unwrap();
        let serialized = serde_json::to_string(&code).unwrap();
        assert_eq!(serialized, "\"X1Y2Z3\"");

        let deserialized: GameCode = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, code);
    }

    #[test]
    fn test_game_code_deserialization_error() {
        let result: Result<GameCode, _> = serde_json::from_str("\"??????\"");
        assert!(result.is_err());

        let result: Result<GameCode, _> = serde_json::from_str("123456");
        assert!(result.is_err());
    }

    #[test]
    fn test_game_code_display() {
        let code = GameCode::from_str("q9w8e7").unwrap();
        assert_eq!(code.to_string(), "Q9W8E7");
    }
}
