//! Device session
//!
//! A [`Session`] is everything one device knows about the game it takes part
//! in: the last snapshot of the shared record, the player it joined as and
//! whether it hosts the game. Every action reloads the shared record, applies
//! the change to that fresh copy and writes the whole state back, so the
//! window for overwriting another device's change stays small.

use derive_more::Display;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::{self, GameConfig},
    game_code::{self, GameCode},
    names,
    player::{Caught, Id, Player},
    progression::{self, Submission},
    share,
    state::{GameState, Join},
    store::{self, GameStore, Snapshot, Storage},
    view::{Role, View},
};

/// A form field the user left empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Field {
    /// The game code on the join screen
    #[display("game code")]
    GameCode,
    /// The player name on the join screen
    #[display("name")]
    Name,
}

/// Broad category of a session error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user typed something that cannot be accepted
    Validation,
    /// The game or player the user referred to does not exist
    Lookup,
    /// Persisted or shared data could not be read or written
    Storage,
}

/// Errors that can occur during a session action
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is empty
    #[error("please enter a {0}")]
    MissingField(Field),
    /// The host configuration is invalid
    #[error(transparent)]
    Config(#[from] config::Error),
    /// The player name is rejected
    #[error(transparent)]
    Name(#[from] names::Error),
    /// The typed game code is malformed
    #[error(transparent)]
    GameCode(#[from] game_code::Error),
    /// A code submission or catch failed
    #[error(transparent)]
    Progression(#[from] progression::Error),
    /// There is no game on this device
    #[error("no game found")]
    NoGame,
    /// The typed game code is not the code of the stored game
    #[error("invalid game code, the host's game code is {expected}")]
    WrongGameCode {
        /// Code of the stored game
        expected: GameCode,
    },
    /// The device has not joined the game
    #[error("you have not joined this game")]
    NotJoined,
    /// Reading or writing a record failed
    #[error(transparent)]
    Storage(#[from] store::Error),
    /// A share link could not be read
    #[error(transparent)]
    Share(#[from] share::Error),
}

impl Error {
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_)
            | Self::Config(_)
            | Self::Name(_)
            | Self::GameCode(_)
            | Self::Progression(progression::Error::InvalidCode(_)) => ErrorKind::Validation,
            Self::Progression(progression::Error::UnknownPlayer)
            | Self::NoGame
            | Self::WrongGameCode { .. }
            | Self::NotJoined => ErrorKind::Lookup,
            Self::Storage(_) | Self::Share(_) => ErrorKind::Storage,
        }
    }
}

/// Trims a form field, rejecting it if nothing is left
fn required(value: &str, field: Field) -> Result<&str, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::MissingField(field));
    }
    Ok(value)
}

/// The game as seen by one device
#[derive(Debug)]
pub struct Session<S> {
    store: GameStore<S>,
    snapshot: Option<Snapshot>,
    current_player: Option<Id>,
    host_id: Option<Id>,
}

impl<S: Storage> Session<S> {
    /// Creates a session that knows no game yet
    ///
    /// Call [`Session::restore`] to pick up records left by an earlier run.
    pub fn new(storage: S) -> Self {
        Self {
            store: GameStore::new(storage),
            snapshot: None,
            current_player: None,
            host_id: None,
        }
    }

    /// The typed store backing this session
    pub fn store(&self) -> &GameStore<S> {
        &self.store
    }

    /// The local copy of the game, if any
    pub fn state(&self) -> Option<&GameState> {
        self.snapshot.as_ref().map(|snapshot| &snapshot.state)
    }

    /// The player this device joined as, as of the local copy
    pub fn current_player(&self) -> Option<&Player> {
        self.state()?.player(self.current_player?)
    }

    /// Reloads every record this device keeps
    ///
    /// The stored player record is matched against the game by id only. A
    /// record that matches no player, such as one left over from an earlier
    /// game, leaves the device as a spectator until it joins again.
    ///
    /// Returns whether a game was found.
    pub fn restore(&mut self) -> Result<bool, Error> {
        self.snapshot = self.store.load_game()?;
        self.host_id = self.store.host_marker()?;
        let record = self.store.load_player()?;

        self.current_player = match (&self.snapshot, record) {
            (Some(snapshot), Some(record)) => snapshot.state.player(record.id()).map(Player::id),
            _ => None,
        };

        debug!(
            found = self.snapshot.is_some(),
            role = ?self.role(),
            "session restored"
        );
        Ok(self.snapshot.is_some())
    }

    /// Creates and persists a new game hosted by this device
    ///
    /// Any previous player identity on this device is forgotten.
    pub fn host(&mut self, config: &GameConfig) -> Result<&GameState, Error> {
        let state = GameState::create(config)?;

        self.store.clear_player()?;
        self.store.mark_host(state.host_id())?;
        self.current_player = None;
        self.host_id = Some(state.host_id());
        self.commit(state)?;

        info!(game_code = ?self.state().map(GameState::game_code), "hosting game");
        self.state().ok_or(Error::NoGame)
    }

    /// Builds a share link for the local game on top of `base`
    pub fn share_link(&self, base: &str) -> Result<String, Error> {
        let state = self.state().ok_or(Error::NoGame)?;
        Ok(share::share_url(base, state))
    }

    /// Bootstraps the local copy from a share link
    ///
    /// A link to the game already stored on this device does not replace
    /// the stored record, since that copy is at least as recent as the link.
    ///
    /// Returns `false` if the URL carries no game.
    pub fn open_link(&mut self, url: &str) -> Result<bool, Error> {
        let Some(payload) = share::game_param(url) else {
            return Ok(false);
        };
        let linked = share::decode(payload)?;

        let stored = match self.store.load_game() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "replacing unreadable game record with linked game");
                None
            }
        };

        let snapshot = match stored {
            Some(stored) if stored.state.game_code() == linked.game_code() => stored,
            _ => {
                let raw = self.store.persist_game(&linked)?;
                Snapshot { raw, state: linked }
            }
        };

        self.host_id = self.store.host_marker()?;
        self.current_player = self
            .store
            .load_player()?
            .and_then(|record| snapshot.state.player(record.id()).map(Player::id));

        info!(game_code = %snapshot.state.game_code(), "opened share link");
        self.snapshot = Some(snapshot);
        Ok(true)
    }

    /// Joins the stored game, checking the typed game code first
    pub fn join(&mut self, game_code: &str, name: &str) -> Result<Join, Error> {
        let game_code = required(game_code, Field::GameCode)?;
        let name = required(name, Field::Name)?;
        let game_code: GameCode = game_code.parse()?;

        let snapshot = self.fetch()?;
        if snapshot.state.game_code() != &game_code {
            return Err(Error::WrongGameCode {
                expected: snapshot.state.game_code().clone(),
            });
        }

        self.join_fetched(snapshot, name)
    }

    /// Joins the game bootstrapped from a share link
    pub fn join_from_link(&mut self, name: &str) -> Result<Join, Error> {
        let name = required(name, Field::Name)?;
        let snapshot = self.fetch()?;
        self.join_fetched(snapshot, name)
    }

    fn join_fetched(&mut self, mut snapshot: Snapshot, name: &str) -> Result<Join, Error> {
        let join = snapshot.state.join(name)?;
        self.current_player = Some(join.player);

        if join.rejoined {
            info!(player = name, "player rejoined");
            if let Some(player) = snapshot.state.player(join.player) {
                self.store.save_player(player)?;
            }
            self.snapshot = Some(snapshot);
        } else {
            self.commit(snapshot.state)?;
        }
        Ok(join)
    }

    /// Submits a code for the player this device joined as
    ///
    /// Only a completed level is written back.
    pub fn submit_code(&mut self, input: &str) -> Result<Submission, Error> {
        let player = self.current_player.ok_or(Error::NotJoined)?;
        let mut snapshot = self.fetch()?;

        let submission = snapshot.state.submit_code(player, input)?;
        if submission.is_completed() {
            self.commit(snapshot.state)?;
        } else {
            self.snapshot = Some(snapshot);
        }
        Ok(submission)
    }

    /// Records that Granny caught the player this device joined as
    pub fn player_caught(&mut self) -> Result<Caught, Error> {
        let player = self.current_player.ok_or(Error::NotJoined)?;
        let mut snapshot = self.fetch()?;

        let caught = snapshot.state.catch_player(player)?;
        if caught == Caught::AlreadyEliminated {
            self.snapshot = Some(snapshot);
        } else {
            self.commit(snapshot.state)?;
        }
        Ok(caught)
    }

    /// Reloads the shared record and reports whether it changed
    ///
    /// Records are compared as written, byte for byte.
    pub fn poll(&mut self) -> Result<bool, Error> {
        let latest = self.store.load_game()?;
        let changed = match (&self.snapshot, &latest) {
            (Some(current), Some(latest)) => current.raw != latest.raw,
            (None, None) => false,
            _ => true,
        };

        if changed {
            debug!("game record changed");
            self.snapshot = latest;
        }
        Ok(changed)
    }

    /// The role of this device in the local game
    pub fn role(&self) -> Role {
        let Some(state) = self.state() else {
            return Role::Spectator;
        };
        if self.host_id == Some(state.host_id()) {
            return Role::Granny;
        }
        match self.current_player {
            Some(id) if state.player(id).is_some() => Role::Player(id),
            _ => Role::Spectator,
        }
    }

    /// Whether this device hosts the local game
    pub fn is_granny(&self) -> bool {
        self.role() == Role::Granny
    }

    /// The view for this device's role
    pub fn view(&self) -> Option<View> {
        Some(self.state()?.view(self.role()))
    }

    fn fetch(&self) -> Result<Snapshot, Error> {
        self.store.load_game()?.ok_or(Error::NoGame)
    }

    fn commit(&mut self, state: GameState) -> Result<(), Error> {
        let raw = self.store.persist_game(&state)?;
        if let Some(player) = self.current_player.and_then(|id| state.player(id)) {
            self.store.save_player(player)?;
        }
        self.snapshot = Some(Snapshot { raw, state });
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{
        constants::storage::{CURRENT_PLAYER_KEY, GAME_STATE_KEY},
        state::{Outcome, tests::sample_config},
        store::MemoryStorage,
    };

    fn hosted() -> (MemoryStorage, Session<MemoryStorage>) {
        let storage = MemoryStorage::new();
        let mut granny = Session::new(storage.clone());
        granny.host(&sample_config()).unwrap();
        (storage, granny)
    }

    fn code_of(session: &Session<MemoryStorage>) -> String {
        session.state().unwrap().game_code().to_string()
    }

    #[test]
    fn test_host_marks_device() {
        let (storage, granny) = hosted();
        assert!(granny.is_granny());
        assert!(matches!(granny.view(), Some(View::Granny { .. })));

        let mut reloaded = Session::new(storage);
        assert!(reloaded.restore().unwrap());
        assert_eq!(reloaded.role(), Role::Granny);
        assert_eq!(reloaded.state(), granny.state());
    }

    #[test]
    fn test_join_requires_fields() {
        let (storage, granny) = hosted();
        let mut player = Session::new(storage);

        assert!(matches!(
            player.join(" ", "Alice"),
            Err(Error::MissingField(Field::GameCode))
        ));
        let err = player.join(&code_of(&granny), "").unwrap_err();
        assert!(matches!(err, Error::MissingField(Field::Name)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "please enter a name");
    }

    #[test]
    fn test_join_without_game() {
        let mut player = Session::new(MemoryStorage::new());
        let err = player.join("ABC123", "Alice").unwrap_err();
        assert!(matches!(err, Error::NoGame));
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_join_wrong_code() {
        let (storage, granny) = hosted();
        let mut player = Session::new(storage);

        let mut wrong = code_of(&granny);
        wrong.replace_range(..1, if wrong.starts_with('Z') { "Y" } else { "Z" });

        let err = player.join(&wrong, "Alice").unwrap_err();
        assert!(
            matches!(&err, Error::WrongGameCode { expected } if expected.to_string() == code_of(&granny))
        );
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }

    #[test]
    fn test_join_is_case_insensitive() {
        let (storage, granny) = hosted();
        let mut player = Session::new(storage);

        let join = player
            .join(&code_of(&granny).to_lowercase(), " Alice ")
            .unwrap();
        assert!(!join.rejoined);
        assert_eq!(player.role(), Role::Player(join.player));
        assert_eq!(player.current_player().unwrap().name(), "Alice");
    }

    #[test]
    fn test_rejoin_after_reload() {
        let (storage, granny) = hosted();
        let mut player = Session::new(storage.clone());
        let first = player.join(&code_of(&granny), "Alice").unwrap();
        player.submit_code("12").unwrap();

        let mut reloaded = Session::new(storage.clone());
        reloaded.restore().unwrap();
        assert_eq!(reloaded.current_player().unwrap().id(), first.player);

        let mut other_tab = Session::new(storage);
        let second = other_tab.join(&code_of(&granny), "Alice").unwrap();
        assert!(second.rejoined);
        assert_eq!(second.player, first.player);
        assert!(other_tab.current_player().unwrap().has_completed(2));
        assert_eq!(other_tab.state().unwrap().players().len(), 1);
    }

    #[test]
    fn test_restore_ignores_record_from_earlier_game() {
        let (first_storage, first_game) = hosted();
        let mut device = Session::new(first_storage.clone());
        let mine = device.join(&code_of(&first_game), "Alice").unwrap().player;

        let (second_storage, mut second_game) = hosted();
        let theirs = Session::new(second_storage)
            .join(&code_of(&second_game), "Alice")
            .unwrap()
            .player;
        assert!(second_game.poll().unwrap());
        let link = second_game.share_link("https://granny.test/").unwrap();

        let storage = MemoryStorage::new();
        let record = first_storage.get_item(CURRENT_PLAYER_KEY).unwrap().unwrap();
        storage.set_item(CURRENT_PLAYER_KEY, &record).unwrap();

        let mut linked = Session::new(storage.clone());
        assert!(linked.open_link(&link).unwrap());
        assert_eq!(linked.role(), Role::Spectator);

        let mut reloaded = Session::new(storage);
        assert!(reloaded.restore().unwrap());
        let alice = reloaded.state().unwrap().player_by_name("Alice").unwrap();
        assert_eq!(alice.id(), theirs);
        assert_eq!(reloaded.role(), Role::Spectator);
        assert!(reloaded.current_player().is_none());
        assert_ne!(mine, theirs);
    }

    #[test]
    fn test_actions_require_join() {
        let (_, mut granny) = hosted();
        assert!(matches!(granny.submit_code("1"), Err(Error::NotJoined)));
        assert!(matches!(granny.player_caught(), Err(Error::NotJoined)));
    }

    #[test]
    fn test_submit_and_caught_persist() {
        let (storage, granny) = hosted();
        let mut player = Session::new(storage.clone());
        player.join(&code_of(&granny), "Alice").unwrap();

        assert!(player.submit_code("0012").unwrap().is_completed());
        assert_eq!(player.submit_code("0012").unwrap(), Submission::Incorrect);
        let err = player.submit_code("12a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(
            player.player_caught().unwrap(),
            Caught::LostLife { lives_left: 1 }
        );
        assert_eq!(player.player_caught().unwrap(), Caught::Eliminated);
        assert_eq!(player.player_caught().unwrap(), Caught::AlreadyEliminated);
        assert!(matches!(player.view(), Some(View::Eliminated { .. })));

        let stored = GameStore::new(storage).load_game().unwrap().unwrap().state;
        let alice = stored.player_by_name("Alice").unwrap();
        assert!(alice.is_eliminated());
        assert_eq!(alice.lives(), 0);
        assert!(alice.has_completed(2));
        assert_eq!(stored.outcome(), Outcome::GrannyWins);
    }

    #[test]
    fn test_poll_detects_foreign_writes() {
        let (storage, mut granny) = hosted();
        assert!(!granny.poll().unwrap());

        let mut player = Session::new(storage);
        player.join(&code_of(&granny), "Alice").unwrap();

        assert!(granny.poll().unwrap());
        assert_eq!(granny.state().unwrap().players().len(), 1);
        assert!(!granny.poll().unwrap());

        assert_eq!(player.submit_code("9999").unwrap(), Submission::Incorrect);
        assert!(!granny.poll().unwrap());
    }

    #[test]
    fn test_poll_reports_corrupt_record() {
        let (storage, mut granny) = hosted();
        storage.set_item(GAME_STATE_KEY, "garbage").unwrap();

        let err = granny.poll().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(granny.state().is_some());
    }

    #[test]
    fn test_share_link_bootstraps_other_device() {
        let (_, granny) = hosted();
        let link = granny.share_link("https://granny.test/").unwrap();

        let storage = MemoryStorage::new();
        let mut device = Session::new(storage.clone());
        assert!(device.open_link(&link).unwrap());
        assert_eq!(device.role(), Role::Spectator);
        assert_eq!(device.state(), granny.state());

        let join = device.join_from_link("Bob").unwrap();
        assert_eq!(device.role(), Role::Player(join.player));

        let stored = GameStore::new(storage).load_game().unwrap().unwrap().state;
        assert!(stored.player_by_name("Bob").is_some());
    }

    #[test]
    fn test_link_does_not_roll_back_stored_game() {
        let (storage, granny) = hosted();
        let link = granny.share_link("https://granny.test/").unwrap();

        let mut player = Session::new(storage.clone());
        player.join(&code_of(&granny), "Alice").unwrap();

        let mut device = Session::new(storage);
        assert!(device.open_link(&link).unwrap());
        assert!(device.state().unwrap().player_by_name("Alice").is_some());
        assert_eq!(device.current_player().unwrap().name(), "Alice");
    }

    #[test]
    fn test_open_link_without_game() {
        let mut device = Session::new(MemoryStorage::new());
        assert!(!device.open_link("https://granny.test/").unwrap());
        assert!(device.state().is_none());
        assert!(matches!(device.join_from_link("Bob"), Err(Error::NoGame)));

        let err = device.open_link("https://granny.test/?game=%%%").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_share_link_requires_game() {
        let device = Session::new(MemoryStorage::new());
        assert!(matches!(device.share_link("https://x.test/"), Err(Error::NoGame)));
        assert_eq!(device.view(), None);
        assert_eq!(device.role(), Role::Spectator);
    }

    #[test]
    fn test_hosting_forgets_player_identity() {
        let (storage, granny) = hosted();
        let mut device = Session::new(storage);
        device.join(&code_of(&granny), "Alice").unwrap();

        device.host(&sample_config()).unwrap();
        assert!(device.is_granny());
        assert!(device.current_player().is_none());
        assert_eq!(device.store().load_player().unwrap(), None);
    }
}
