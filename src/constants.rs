//! Configuration constants for the Granny game
//!
//! This module contains the limits, timings and storage keys used throughout
//! the game so that every component agrees on the same boundaries.

/// Game session limits
pub mod game {
    /// Maximum number of levels a host can configure
    pub const MAX_LEVELS: usize = 20;
    /// Maximum number of lives a player can start with
    pub const MAX_LIVES: u32 = 10;
    /// Maximum number of players in a single game session
    pub const MAX_PLAYER_COUNT: usize = 100;
    /// Number of characters in a generated game code
    pub const GAME_CODE_LENGTH: usize = 6;
}

/// Level configuration constants
pub mod level {
    /// Number of digits in a level code
    pub const CODE_LENGTH: usize = 4;
    /// Maximum length of a clue in bytes
    pub const MAX_CLUE_LENGTH: usize = 500;
}

/// Player name constants
pub mod name {
    /// Maximum length of a player name in bytes
    pub const MAX_LENGTH: usize = 30;
}

/// Ambient sound constants
pub mod sound {
    /// Shortest wait between two cues, in seconds
    pub const MIN_INTERVAL_SECS: u32 = 1;
    /// Upper bound for either end of the sound interval, in seconds
    pub const MAX_INTERVAL_SECS: u32 = 600;
    /// Maximum volume setting
    pub const MAX_VOLUME: u32 = 100;
    /// Default lower bound of the interval between cues, in seconds
    pub const DEFAULT_INTERVAL_MIN_SECS: u32 = 30;
    /// Default upper bound of the interval between cues, in seconds
    pub const DEFAULT_INTERVAL_MAX_SECS: u32 = 90;
    /// Default volume setting
    pub const DEFAULT_VOLUME: u32 = 50;
    /// Scale applied to the volume so cues never play at full gain
    pub const GAIN_SCALE: f32 = 0.3;
    /// Shortest cue duration in seconds
    pub const MIN_CUE_SECS: f32 = 2.0;
    /// Random extension added on top of the shortest cue duration
    pub const CUE_SPREAD_SECS: f32 = 1.5;
    /// Duration of the preview cue in seconds
    pub const PREVIEW_CUE_SECS: f32 = 2.5;
    /// Fade-in time of every cue in seconds
    pub const FADE_IN_SECS: f32 = 0.5;
    /// Time the oscillators keep running after the fade-out, in seconds
    pub const TAIL_SECS: f32 = 0.5;
}

/// Timer intervals
pub mod timing {
    use web_time::Duration;

    /// Interval between two polls of the persisted state
    pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
    /// Interval between two countdown display refreshes
    pub const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(1);
    /// How long an inline error message stays visible
    pub const ERROR_LIFETIME: Duration = Duration::from_secs(3);
    /// How long the incorrect code feedback stays visible
    pub const INCORRECT_CODE_LIFETIME: Duration = Duration::from_secs(2);
}

/// Keys of the local storage records
pub mod storage {
    /// Key of the persisted game state
    pub const GAME_STATE_KEY: &str = "grannyGameState";
    /// Key of the record identifying the player on this device
    pub const CURRENT_PLAYER_KEY: &str = "grannyCurrentPlayer";
    /// Key of the flag marking this device as the host
    pub const IS_HOST_KEY: &str = "grannyIsHost";
    /// Key of the host token of this device
    pub const HOST_ID_KEY: &str = "grannyHostId";
    /// Query parameter carrying an encoded game in share links
    pub const SHARE_QUERY_PARAM: &str = "game";
}
