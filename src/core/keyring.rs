//! API key storage.
//!
//! The chat client itself only ever sees a key string; this module is the
//! collaborator that loads, saves and deletes it.

use std::error::Error;
use std::fmt;
use std::sync::Mutex;

use keyring::Entry;
use tracing::debug;

use crate::core::error::ChatError;

pub const KEYRING_SERVICE: &str = "routechat";
pub const KEYRING_USER: &str = "openrouter";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was temporarily
/// unavailable (for example when the keychain service is locked). Permanent
/// errors surface the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

pub trait CredentialStore: Send + Sync {
    /// The stored key, or `None` when nothing has been saved.
    fn load_key(&self) -> Result<Option<String>, KeyringAccessError>;
    fn save_key(&self, key: &str) -> Result<(), KeyringAccessError>;
    /// Remove the stored key. Deleting a missing key is not an error.
    fn delete_key(&self) -> Result<(), KeyringAccessError>;
}

/// Stores the key in the platform keyring.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    user: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE, KEYRING_USER)
    }
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> Result<Entry, KeyringAccessError> {
        Ok(Entry::new(&self.service, &self.user)?)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load_key(&self) -> Result<Option<String>, KeyringAccessError> {
        match self.entry()?.get_password() {
            Ok(key) => Ok(Some(key)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_key(&self, key: &str) -> Result<(), KeyringAccessError> {
        Ok(self.entry()?.set_password(key)?)
    }

    fn delete_key(&self) -> Result<(), KeyringAccessError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    key: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Mutex::new(Some(key.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_key(&self) -> Result<Option<String>, KeyringAccessError> {
        Ok(self.key.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save_key(&self, key: &str) -> Result<(), KeyringAccessError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = Some(key.to_string());
        Ok(())
    }

    fn delete_key(&self) -> Result<(), KeyringAccessError> {
        *self.key.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Find an API key: the store first, then the `env_value` fallback.
///
/// Keyring outages are logged and fall through to the fallback so that an
/// environment key still works on machines without a secret service.
pub fn resolve_api_key(
    store: &dyn CredentialStore,
    env_value: Option<String>,
) -> Result<String, ChatError> {
    match store.load_key() {
        Ok(Some(key)) if !key.trim().is_empty() => return Ok(key),
        Ok(_) => {}
        Err(err) => debug!("keyring unavailable: {err}"),
    }

    env_value
        .filter(|key| !key.trim().is_empty())
        .ok_or(ChatError::ApiKeyMissing)
}
