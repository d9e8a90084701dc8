//! Persistence of the shared game state
//!
//! A game is stored as a single JSON record that every device reads and
//! overwrites wholesale. Writers are not coordinated, so the last write wins.
//! Alongside the game record each device keeps a few private records: the
//! player it joined as and, on the hosting device, a host marker.
//!
//! The raw key-value access is abstracted by [`Storage`], modelled on
//! browser local storage, with an in-memory and a file-backed implementation.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    constants::storage::{CURRENT_PLAYER_KEY, GAME_STATE_KEY, HOST_ID_KEY, IS_HOST_KEY},
    player::{Id, Player},
    state::{GameState, Inconsistency},
};

/// Errors that can occur while reading or writing persisted records
#[derive(Error, Debug)]
pub enum Error {
    /// The file system refused an operation
    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),
    /// A custom backend reported a failure
    #[error("storage backend failed: {0}")]
    Backend(String),
    /// A record is not valid JSON of the expected shape
    #[error("record {key} is corrupt: {source}")]
    Corrupt {
        /// Key of the record
        key: &'static str,
        /// Underlying parse error
        source: serde_json::Error,
    },
    /// The game record parsed but breaks an invariant
    #[error("persisted game is inconsistent: {0}")]
    Inconsistent(#[from] Inconsistency),
}

/// String key-value storage
///
/// Implementations must replace a value atomically: a reader sees either the
/// old or the new value, never a mix.
pub trait Storage {
    /// Reads the value stored under `key`
    fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    /// Stores `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removes the value stored under `key`, if any
    fn remove_item(&self, key: &str) -> Result<(), Error>;
}

/// In-memory storage
///
/// Clones share the same slots, so several sessions created from clones of
/// one `MemoryStorage` behave like several tabs of the same browser.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty storage
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        self.items
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Error> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Storage keeping one file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens a storage directory, creating it if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The directory the records live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Error> {
        let target = self.path(key);
        let temp = self.dir.join(format!(".{key}.{}.tmp", Id::new()));
        fs::write(&temp, value)?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Error> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// A game record together with the exact text it was parsed from
///
/// The raw text is what the synchronization loop compares to detect changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The persisted JSON
    pub raw: String,
    /// The parsed and verified state
    pub state: GameState,
}

/// Typed access to the records of one device
#[derive(Debug, Clone)]
pub struct GameStore<S> {
    storage: S,
}

impl<S: Storage> GameStore<S> {
    /// Wraps a storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<(String, T)>, Error> {
        let Some(raw) = self.storage.get_item(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some((raw, value))),
            Err(source) => {
                warn!(key, error = %source, "rejected corrupt record");
                Err(Error::Corrupt { key, source })
            }
        }
    }

    fn write<T: Serialize>(&self, key: &'static str, value: &T) -> Result<String, Error> {
        let raw = serde_json::to_string(value).map_err(|source| Error::Corrupt { key, source })?;
        self.storage.set_item(key, &raw)?;
        Ok(raw)
    }

    /// Loads the persisted game, if there is one
    ///
    /// # Errors
    ///
    /// * `Error::Corrupt` - The record is not a game state
    /// * `Error::Inconsistent` - The record breaks a game invariant
    pub fn load_game(&self) -> Result<Option<Snapshot>, Error> {
        let Some((raw, state)) = self.read::<GameState>(GAME_STATE_KEY)? else {
            return Ok(None);
        };
        if let Err(inconsistency) = state.verify() {
            warn!(error = %inconsistency, "rejected inconsistent game record");
            return Err(inconsistency.into());
        }
        Ok(Some(Snapshot { raw, state }))
    }

    /// Overwrites the persisted game
    ///
    /// Returns the text that was written.
    pub fn persist_game(&self, state: &GameState) -> Result<String, Error> {
        let raw = self.write(GAME_STATE_KEY, state)?;
        debug!(game_code = %state.game_code(), bytes = raw.len(), "game persisted");
        Ok(raw)
    }

    /// Loads the player this device joined as
    pub fn load_player(&self) -> Result<Option<Player>, Error> {
        Ok(self.read(CURRENT_PLAYER_KEY)?.map(|(_, player)| player))
    }

    /// Remembers the player this device joined as
    pub fn save_player(&self, player: &Player) -> Result<(), Error> {
        self.write(CURRENT_PLAYER_KEY, player).map(|_| ())
    }

    /// Forgets the player this device joined as
    pub fn clear_player(&self) -> Result<(), Error> {
        self.storage.remove_item(CURRENT_PLAYER_KEY)
    }

    /// Marks this device as the host of the game with the given host id
    pub fn mark_host(&self, host_id: Id) -> Result<(), Error> {
        self.storage.set_item(IS_HOST_KEY, "true")?;
        self.storage.set_item(HOST_ID_KEY, &host_id.to_string())
    }

    /// The host id this device holds, if it is marked as a host
    ///
    /// A marker that cannot be parsed counts as absent.
    pub fn host_marker(&self) -> Result<Option<Id>, Error> {
        if self.storage.get_item(IS_HOST_KEY)?.as_deref() != Some("true") {
            return Ok(None);
        }
        Ok(self
            .storage
            .get_item(HOST_ID_KEY)?
            .and_then(|id| id.parse().ok()))
    }

    /// Removes the host marker
    pub fn clear_host_marker(&self) -> Result<(), Error> {
        self.storage.remove_item(IS_HOST_KEY)?;
        self.storage.remove_item(HOST_ID_KEY)
    }
}
