//! Credential storage.
//!
//! The session only needs to get and set opaque strings by name. Structured
//! values (the user credentials) are stored as JSON strings.

use pogo_core::AuthProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Name of the stored access token.
pub const AUTH_TOKEN: &str = "auth_token";
/// Name of the provider of the last login.
pub const LAST_PROVIDER: &str = "last_provider";
/// Name of the stored username and secret.
pub const USER_CREDENTIALS: &str = "user_credentials";
/// Name of the remember-login flag.
pub const REMEMBER_LOGIN: &str = "remember_login";

/// Errors from a credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Reading or writing the store failed.
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Stored data could not be parsed.
    #[error("credential store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// A stored value is not valid for its name.
    #[error("invalid stored value for {name}")]
    Invalid {
        /// Credential name.
        name: &'static str,
    },
    /// The store lock was poisoned.
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Username and secret of the last successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    /// Account name.
    pub username: String,
    /// Password or provider secret.
    pub secret: String,
}

/// Get/set of opaque credentials by logical name.
pub trait CredentialStore: Send + Sync {
    /// Stored value for `name`.
    fn get(&self, name: &str) -> Result<Option<String>, CredentialError>;
    /// Store `value` under `name`; `None` removes it.
    fn set(&self, name: &str, value: Option<&str>) -> Result<(), CredentialError>;
}

/// Typed accessors over any [`CredentialStore`].
pub trait CredentialStoreExt: CredentialStore {
    /// Provider of the last login.
    fn last_provider(&self) -> Result<Option<AuthProvider>, CredentialError> {
        self.get(LAST_PROVIDER)?
            .map(|raw| {
                raw.parse()
                    .map_err(|_| CredentialError::Invalid { name: LAST_PROVIDER })
            })
            .transpose()
    }

    /// Stored username and secret.
    fn user_credentials(&self) -> Result<Option<UserCredentials>, CredentialError> {
        self.get(USER_CREDENTIALS)?
            .map(|raw| serde_json::from_str(&raw).map_err(CredentialError::from))
            .transpose()
    }

    /// Store or clear the username and secret.
    fn set_user_credentials(&self, creds: Option<&UserCredentials>) -> Result<(), CredentialError> {
        let raw = creds.map(serde_json::to_string).transpose()?;
        self.set(USER_CREDENTIALS, raw.as_deref())
    }

    /// Whether credentials survive logout.
    fn remember_login(&self) -> Result<bool, CredentialError> {
        Ok(self.get(REMEMBER_LOGIN)?.as_deref() == Some("true"))
    }
}

impl<S: CredentialStore + ?Sized> CredentialStoreExt for S {}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, CredentialError> {
        let values = self.values.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(values.get(name).cloned())
    }

    fn set(&self, name: &str, value: Option<&str>) -> Result<(), CredentialError> {
        let mut values = self.values.lock().map_err(|_| CredentialError::Poisoned)?;
        match value {
            Some(value) => values.insert(name.to_string(), value.to_string()),
            None => values.remove(name),
        };
        Ok(())
    }
}

/// Store persisted as a JSON object on disk; every write rewrites the file.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileCredentialStore {
    /// Open the store at `path`; a missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, CredentialError> {
        let values = self.values.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(values.get(name).cloned())
    }

    fn set(&self, name: &str, value: Option<&str>) -> Result<(), CredentialError> {
        let mut values = self.values.lock().map_err(|_| CredentialError::Poisoned)?;
        match value {
            Some(value) => values.insert(name.to_string(), value.to_string()),
            None => values.remove(name),
        };
        self.persist(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.last_provider().unwrap(), None);
        store.set(LAST_PROVIDER, Some("google")).unwrap();
        assert_eq!(store.last_provider().unwrap(), Some(AuthProvider::Google));

        let creds = UserCredentials {
            username: "ash".into(),
            secret: "pikachu".into(),
        };
        store.set_user_credentials(Some(&creds)).unwrap();
        assert_eq!(store.user_credentials().unwrap(), Some(creds));
        store.set_user_credentials(None).unwrap();
        assert_eq!(store.user_credentials().unwrap(), None);

        assert!(!store.remember_login().unwrap());
        store.set(REMEMBER_LOGIN, Some("true")).unwrap();
        assert!(store.remember_login().unwrap());
    }

    #[test]
    fn invalid_provider_is_reported() {
        let store = MemoryCredentialStore::new();
        store.set(LAST_PROVIDER, Some("myspace")).unwrap();
        assert!(matches!(
            store.last_provider(),
            Err(CredentialError::Invalid { name: LAST_PROVIDER })
        ));
    }

    #[test]
    fn file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        {
            let store = FileCredentialStore::open(&path).unwrap();
            store.set(AUTH_TOKEN, Some("tok")).unwrap();
        }
        let store = FileCredentialStore::open(&path).unwrap();
        assert_eq!(store.get(AUTH_TOKEN).unwrap().as_deref(), Some("tok"));
        store.set(AUTH_TOKEN, None).unwrap();
        assert_eq!(FileCredentialStore::open(&path).unwrap().get(AUTH_TOKEN).unwrap(), None);
    }
}
