//! Share links
//!
//! A share link carries the complete game state in its `game` query
//! parameter, base64 encoded, so a device that has never seen the game can
//! bootstrap its local copy just by opening the link.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
};
use thiserror::Error;

use crate::{
    constants::storage::SHARE_QUERY_PARAM,
    state::{GameState, Inconsistency},
};

/// Errors that can occur when reading a share link
#[derive(Error, Debug)]
pub enum Error {
    /// The parameter is not valid base64
    #[error("share link is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded payload is not a game state
    #[error("share link does not contain a game: {0}")]
    Json(#[from] serde_json::Error),
    /// The decoded game breaks an invariant
    #[error("share link contains an inconsistent game: {0}")]
    Inconsistent(#[from] Inconsistency),
}

/// Encodes a game state for a share link
///
/// # Panics
///
/// Panics if serialization fails, which cannot happen for a game state.
pub fn encode(state: &GameState) -> String {
    let json = serde_json::to_string(state).expect("default serializer cannot fail");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes and verifies the payload of a share link
///
/// Both the URL-safe and the standard alphabet are accepted, padded or not.
/// Spaces are read as `+`, since form decoding turns an unescaped `+` into a
/// space.
pub fn decode(payload: &str) -> Result<GameState, Error> {
    let payload = payload.trim().replace(' ', "+");
    let bytes = if payload.contains(['+', '/']) {
        if payload.ends_with('=') {
            STANDARD.decode(&payload)?
        } else {
            STANDARD_NO_PAD.decode(&payload)?
        }
    } else if payload.ends_with('=') {
        URL_SAFE.decode(&payload)?
    } else {
        URL_SAFE_NO_PAD.decode(&payload)?
    };

    let state: GameState = serde_json::from_slice(&bytes)?;
    state.verify()?;
    Ok(state)
}

/// Builds a share link on top of `base`
///
/// Any query or fragment already present in `base` is dropped.
pub fn share_url(base: &str, state: &GameState) -> String {
    let end = base.find(['?', '#']).unwrap_or(base.len());
    format!("{}?{SHARE_QUERY_PARAM}={}", &base[..end], encode(state))
}

/// Extracts the raw `game` parameter from a URL, if present and non-empty
pub fn game_param(url: &str) -> Option<&str> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SHARE_QUERY_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
