//! Authentication session.
//!
//! Holds the bearer token issued by the server's OAuth flow and the
//! signed-in user's profile. The token is persisted through a
//! [`SessionStorage`] under [`TOKEN_KEY`] so it survives restarts.
//!
//! Login is two-step: the user opens [`Session::login_url`] in a browser,
//! and the server's success redirect (carrying `?token=...`) is handed to
//! [`Session::complete_login`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tasksync_proto::user::UserProfile;
use url::Url;

/// Storage key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Errors from session persistence and login completion.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The login redirect did not carry a non-empty `token` parameter.
    #[error("login redirect carries no token")]
    MissingToken,

    /// The login redirect is not a valid URL.
    #[error("invalid login redirect URL: {0}")]
    InvalidRedirect(#[from] url::ParseError),

    /// Reading or writing the storage file failed.
    #[error("session storage I/O error at {path}: {source}")]
    Io {
        /// Storage file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The storage file exists but is not a valid string table.
    #[error("malformed session storage: {0}")]
    Malformed(String),
}

/// Minimal key-value persistence for session data.
pub trait SessionStorage: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the value cannot be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the change cannot be persisted.
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

/// In-memory storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage backed by a TOML table of strings on disk.
///
/// Every write rewrites the whole file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens `path`, treating a missing file as empty storage.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the file exists but cannot be read,
    /// or [`SessionError::Malformed`] if it does not parse.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                toml::from_str(&contents).map_err(|e| SessionError::Malformed(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SessionError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    /// `<data_dir>/tasksync/storage.toml`, if the platform has a data dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("tasksync").join("storage.toml"))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents =
            toml::to_string(&self.entries).map_err(|e| SessionError::Malformed(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(io_err)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// The signed-in state: bearer token plus cached profile.
pub struct Session {
    storage: Box<dyn SessionStorage>,
    token: Option<String>,
    profile: Option<UserProfile>,
}

impl Session {
    /// Rehydrates the session from `storage`.
    pub fn restore(storage: impl SessionStorage + 'static) -> Self {
        let token = storage.get(TOKEN_KEY).filter(|t| !t.is_empty());
        tracing::debug!(has_token = token.is_some(), "session restored");
        Self {
            storage: Box::new(storage),
            token,
            profile: None,
        }
    }

    /// URL that starts the browser login flow.
    #[must_use]
    pub fn login_url(api_base: &str) -> String {
        format!("{}/auth/google", api_base.trim_end_matches('/'))
    }

    /// Completes login from the server's success redirect URL.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidRedirect`] for an unparseable URL,
    /// [`SessionError::MissingToken`] when the `token` parameter is absent
    /// or empty, or a storage error.
    pub fn complete_login(&mut self, redirect: &str) -> Result<(), SessionError> {
        let url = Url::parse(redirect.trim())?;
        let token = url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or(SessionError::MissingToken)?;
        self.set_token(token)
    }

    /// Stores `token` and persists it.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingToken`] for an empty token, or a storage error.
    pub fn set_token(&mut self, token: String) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::MissingToken);
        }
        self.storage.set(TOKEN_KEY, &token)?;
        self.token = Some(token);
        self.profile = None;
        tracing::info!("session token stored");
        Ok(())
    }

    /// The bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether a token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Caches the signed-in user's profile.
    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
    }

    /// The cached profile.
    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Clears the token from memory and storage, and drops the profile.
    ///
    /// # Errors
    ///
    /// Returns a storage error; in-memory state is cleared regardless.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.token = None;
        self.profile = None;
        tracing::info!("session cleared");
        self.storage.remove(TOKEN_KEY)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
