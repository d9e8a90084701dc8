//! # Granny Game Library
//!
//! This library provides the core game logic for "Granny", a catch-the-players
//! party game. One device hosts the game as Granny and hunts the players, while
//! every player works through a sequence of 4-digit code puzzles. The crate
//! handles the shared game state, player identity, code progression, polling
//! based synchronization between devices and the randomized ambient sound
//! schedule. Rendering, audio synthesis and storage are supplied by the
//! embedding front end through small traits.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
use serde::{Deserialize, Serialize};

pub mod app;
pub mod config;
pub mod constants;
pub mod game_code;
pub mod level;
mod names;
pub mod player;
pub mod progression;
pub mod session;
pub mod share;
pub mod sound;
pub mod state;
pub mod store;
pub mod sync;
pub mod view;

pub use names::Error as NameError;

/// Alarm messages for timed events
///
/// Components never block or sleep. Instead they hand an alarm and a delay to
/// the scheduling callback provided by the host environment, which feeds the
/// alarm back through [`app::App::receive_alarm`] once the delay elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Synchronization loop alarms
    Sync(sync::AlarmMessage),
    /// Ambient sound alarms
    Sound(sound::AlarmMessage),
}

impl AlarmMessage {
    /// Returns the epoch the alarm was scheduled under
    pub fn epoch(&self) -> u64 {
        match self {
            Self::Sync(sync::AlarmMessage::Poll { epoch })
            | Self::Sound(
                sound::AlarmMessage::PlayCue { epoch } | sound::AlarmMessage::Countdown { epoch },
            ) => *epoch,
        }
    }
}
