//! Player name validation
//!
//! Names are the only identity key of a player, so they are cleaned the same
//! way every time: surrounding whitespace is trimmed before the name is
//! checked for length and content or compared with existing players.

use rustrict::{Censor, Type};
use serde::Serialize;
use thiserror::Error;

use crate::constants::name::MAX_LENGTH;

/// Errors that can occur during name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains a severe slur
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
    /// The game already holds the maximum number of players
    #[error("maximum number of players reached")]
    MaximumPlayers,
}

/// Cleans and validates a requested player name
///
/// # Returns
///
/// The trimmed name on success.
///
/// # Errors
///
/// * `Error::Empty` - Name is empty after trimming whitespace
/// * `Error::TooLong` - Trimmed name exceeds 30 bytes
/// * `Error::Sinful` - Name contains a severely offensive term
///
/// Profane or sexual matches are accepted, since many real names and
/// surnames trip the filter in those categories.
pub fn clean(name: &str) -> Result<&str, Error> {
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.len() > MAX_LENGTH {
        return Err(Error::TooLong);
    }
    if Censor::from_str(name)
        .analyze()
        .is(Type::OFFENSIVE & Type::SEVERE)
    {
        return Err(Error::Sinful);
    }
    Ok(name)
}
