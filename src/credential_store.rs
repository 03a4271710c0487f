use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::models::{Session, User};

/// Entry holding the raw bearer token.
pub const TOKEN_KEY: &str = "access_token";
/// Entry holding the JSON-serialized user profile.
pub const USER_KEY: &str = "user";

// 1. CredentialStore Contract
/// CredentialStore
///
/// Durable persistence of the current session, surviving process restarts.
/// The layout is two independent entries (`access_token` and `user`) that are
/// either both absent or both present and consistent.
///
/// `load` never fails: stored data that does not form a valid `Session` is
/// treated as absent and the store clears itself. Only the session layer writes
/// to a store.
pub trait CredentialStore: Send + Sync {
    /// Persists both entries of the session.
    fn save(&self, session: &Session) -> io::Result<()>;

    /// Returns the stored session, or `None` when absent or corrupt.
    fn load(&self) -> Option<Session>;

    /// Removes both entries. Clearing an empty store is a no-op.
    fn clear(&self) -> io::Result<()>;
}

/// decode_entries
///
/// Shared validation for every backend: both entries must be present, the token
/// must be non-blank and the profile must parse. Returns `Err(())` when the
/// entries exist but are unusable, so the caller knows to self-heal.
fn decode_entries(token: Option<String>, user: Option<String>) -> Result<Option<Session>, ()> {
    match (token, user) {
        (None, None) => Ok(None),
        (Some(token), Some(user)) => {
            if token.trim().is_empty() {
                return Err(());
            }
            let user: User = serde_json::from_str(&user).map_err(|_| ())?;
            Ok(Some(Session::new(token, user)))
        }
        // Half a session is corrupt state.
        _ => Err(()),
    }
}

fn encode_user(session: &Session) -> io::Result<String> {
    serde_json::to_string(&session.user).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
}

// 2. The Real Implementation (Filesystem)
/// FileCredentialStore
///
/// Keeps each entry as its own file inside a directory, the desktop analogue of
/// browser local storage. Writes go through a temporary file and a rename so a
/// crash never leaves a half-written entry behind.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                // An unreadable entry is as good as a corrupt one.
                tracing::warn!(entry = key, error = %e, "credential entry unreadable");
                Some(String::new())
            }
        }
    }

    fn write_entry(&self, key: &str, value: &str) -> io::Result<()> {
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.entry_path(key)).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }

    fn remove_entry(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, session: &Session) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let user = encode_user(session)?;
        self.write_entry(TOKEN_KEY, &session.token)?;

        // The new token must never sit next to a previous session's profile.
        if let Err(e) = self.write_entry(USER_KEY, &user) {
            tracing::warn!(error = %e, "failed to write user entry, clearing credential store");
            if let Err(clear_err) = self.clear() {
                tracing::warn!(error = %clear_err, "failed to clear partially written session");
            }
            return Err(e);
        }
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        let token = self.read_entry(TOKEN_KEY);
        let user = self.read_entry(USER_KEY);

        match decode_entries(token, user) {
            Ok(session) => session,
            Err(()) => {
                tracing::warn!(dir = %self.dir.display(), "invalid stored session, clearing credential store");
                if let Err(e) = self.clear() {
                    tracing::warn!(error = %e, "failed to clear corrupt credential store");
                }
                None
            }
        }
    }

    fn clear(&self) -> io::Result<()> {
        self.remove_entry(TOKEN_KEY)?;
        self.remove_entry(USER_KEY)
    }
}

// 3. The In-Memory Implementation (For Tests)
/// MemoryCredentialStore
///
/// Raw key-value entries behind a mutex. Clones share the same entries, so a
/// test can keep a handle and inspect or corrupt what the session layer wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `session`, as after a previous run.
    pub fn with_session(session: &Session) -> Self {
        let store = Self::new();
        // Serializing a `User` into a String cannot fail.
        let _ = store.save(session);
        store
    }

    /// Reads a raw entry.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Overwrites a raw entry without any validation.
    pub fn set_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Entries stay consistent even if a holder panicked mid-test.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, session: &Session) -> io::Result<()> {
        let user = encode_user(session)?;
        let mut entries = self.lock();
        entries.insert(TOKEN_KEY.to_string(), session.token.clone());
        entries.insert(USER_KEY.to_string(), user);
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        let (token, user) = {
            let entries = self.lock();
            (entries.get(TOKEN_KEY).cloned(), entries.get(USER_KEY).cloned())
        };

        match decode_entries(token, user) {
            Ok(session) => session,
            Err(()) => {
                tracing::warn!("invalid stored session, clearing credential store");
                let _ = self.clear();
                None
            }
        }
    }

    fn clear(&self) -> io::Result<()> {
        let mut entries = self.lock();
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        Ok(())
    }
}

/// CredentialStoreState
///
/// The shared handle type the session layer holds.
pub type CredentialStoreState = Arc<dyn CredentialStore>;
