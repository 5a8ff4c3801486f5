//! Resolution of the player a score is attributed to.
//!
//! Nothing here talks to the network: a signed-in [`Session`] is installed by the caller and
//! guests are persisted in a small local JSON file.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, RwLock},
};

use rand::{Rng, distr::Alphanumeric, rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::models::SessionUser;

const GUEST_ID_PREFIX: &str = "guest_";
const GUEST_ID_RANDOM_LEN: usize = 16;
/// Display name given to guests until they pick one.
pub const DEFAULT_GUEST_NAME: &str = "Guest";

/// Who a score is submitted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub is_guest: bool,
}

/// No usable identity could be produced.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The resolved identity lacks an id or a display name.
    #[error("no identity available: {reason}")]
    Missing { reason: &'static str },
    #[error("failed to read guest store `{path}`")]
    GuestStoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write guest store `{path}`")]
    GuestStoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("guest store `{path}` is not valid JSON")]
    GuestStoreDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("guest store lock poisoned")]
    Poisoned,
}

/// Source of the current player identity.
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self) -> Result<PlayerInfo, IdentityError>;

    /// Bearer token to attach to requests, when the player is signed in.
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// Token and account summary returned by the register and login endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

impl Session {
    fn player(&self) -> Result<PlayerInfo, IdentityError> {
        if self.user.id.trim().is_empty() {
            return Err(IdentityError::Missing {
                reason: "session user has no id",
            });
        }
        if self.user.name.trim().is_empty() {
            return Err(IdentityError::Missing {
                reason: "session user has no name",
            });
        }
        Ok(PlayerInfo {
            id: self.user.id.clone(),
            name: self.user.name.clone(),
            is_guest: false,
        })
    }
}

/// Identity of a signed-in user.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    session: Session,
}

impl AuthenticatedIdentity {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl IdentityProvider for AuthenticatedIdentity {
    fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
        self.session.player()
    }

    fn bearer_token(&self) -> Option<String> {
        Some(self.session.token.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GuestRecord {
    id: String,
    name: String,
}

impl GuestRecord {
    fn generate() -> Self {
        let suffix: String = rng()
            .sample_iter(&Alphanumeric)
            .take(GUEST_ID_RANDOM_LEN)
            .map(char::from)
            .collect();
        Self {
            id: format!("{GUEST_ID_PREFIX}{suffix}"),
            name: DEFAULT_GUEST_NAME.to_owned(),
        }
    }
}

/// JSON file holding the guest id and display name between runs.
#[derive(Debug, Clone)]
pub struct GuestStore {
    path: PathBuf,
}

impl GuestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<GuestRecord>, IdentityError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(IdentityError::GuestStoreRead {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| IdentityError::GuestStoreDecode {
                path: self.path.clone(),
                source,
            })
    }

    fn save(&self, record: &GuestRecord) -> Result<(), IdentityError> {
        let write_error = |source: io::Error| IdentityError::GuestStoreWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(record).map_err(|source| {
            IdentityError::GuestStoreDecode {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(write_error)
    }
}

/// Anonymous player backed by a [`GuestStore`]. The id is created on first use and kept forever.
#[derive(Debug)]
pub struct GuestIdentity {
    store: GuestStore,
    cached: Mutex<Option<GuestRecord>>,
}

impl GuestIdentity {
    pub fn new(store: GuestStore) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Change the guest display name; a blank name restores [`DEFAULT_GUEST_NAME`].
    pub fn set_name(&self, name: &str) -> Result<(), IdentityError> {
        let mut cached = self.cached.lock().map_err(|_| IdentityError::Poisoned)?;
        let mut record = self.current(&mut cached)?;
        record.name = match name.trim() {
            "" => DEFAULT_GUEST_NAME.to_owned(),
            trimmed => trimmed.to_owned(),
        };
        self.store.save(&record)?;
        *cached = Some(record);
        Ok(())
    }

    fn current(&self, cached: &mut Option<GuestRecord>) -> Result<GuestRecord, IdentityError> {
        if let Some(record) = cached.as_ref() {
            return Ok(record.clone());
        }

        let record = match self.store.load()? {
            Some(record) => {
                debug!(guest_id = %record.id, "loaded guest identity");
                record
            }
            None => {
                let record = GuestRecord::generate();
                self.store.save(&record)?;
                info!(guest_id = %record.id, path = %self.store.path.display(), "created guest identity");
                record
            }
        };
        *cached = Some(record.clone());
        Ok(record)
    }
}

impl IdentityProvider for GuestIdentity {
    fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
        let mut cached = self.cached.lock().map_err(|_| IdentityError::Poisoned)?;
        let record = self.current(&mut cached)?;
        if record.id.trim().is_empty() {
            return Err(IdentityError::Missing {
                reason: "guest store has an empty id",
            });
        }
        let name = if record.name.trim().is_empty() {
            DEFAULT_GUEST_NAME.to_owned()
        } else {
            record.name
        };
        Ok(PlayerInfo {
            id: record.id,
            name,
            is_guest: true,
        })
    }
}

/// Signed-in user when a session is installed, the local guest otherwise.
#[derive(Debug)]
pub struct SessionIdentity {
    session: RwLock<Option<Session>>,
    guest: GuestIdentity,
}

impl SessionIdentity {
    pub fn new(guest: GuestIdentity) -> Self {
        Self {
            session: RwLock::new(None),
            guest,
        }
    }

    pub fn sign_in(&self, session: Session) -> Result<(), IdentityError> {
        let mut guard = self.session.write().map_err(|_| IdentityError::Poisoned)?;
        *guard = Some(session);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), IdentityError> {
        let mut guard = self.session.write().map_err(|_| IdentityError::Poisoned)?;
        *guard = None;
        Ok(())
    }

    pub fn guest(&self) -> &GuestIdentity {
        &self.guest
    }
}

impl IdentityProvider for SessionIdentity {
    fn resolve(&self) -> Result<PlayerInfo, IdentityError> {
        let guard = self.session.read().map_err(|_| IdentityError::Poisoned)?;
        match guard.as_ref() {
            Some(session) => session.player(),
            None => self.guest.resolve(),
        }
    }

    fn bearer_token(&self) -> Option<String> {
        self.session
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|session| session.token.clone()))
    }
}
