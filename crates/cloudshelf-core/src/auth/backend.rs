use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};

/// Well-known key the credential is stored under.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Keychain service name
const SERVICE_NAME: &str = "cloudshelf";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Durable side-store for the bearer credential.
///
/// Implementations persist a single value across process restarts. Errors are
/// reported to the caller, but `CredentialStore` treats all of them as
/// non-fatal.
pub trait TokenBackend: Send + Sync {
    /// Read the persisted token, `Ok(None)` if nothing is stored.
    fn load(&self) -> Result<Option<String>>;

    /// Persist `token`, replacing any previous value.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the persisted token. Removing a missing token succeeds.
    fn delete(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    access_token: String,
    saved_at: DateTime<Utc>,
}

/// Token persisted as JSON in the cache directory.
pub struct FileBackend {
    cache_dir: PathBuf,
}

impl FileBackend {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl TokenBackend for FileBackend {
    fn load(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let stored: StoredToken =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(stored.access_token))
    }

    fn save(&self, token: &str) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let stored = StoredToken {
            access_token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// Token persisted in the OS keychain.
///
/// macOS Keychain and Windows Credential Manager survive reboots. On Linux the
/// entry lives in the kernel session keyring, so it lasts for the login
/// session.
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a custom keychain service name (useful to isolate profiles).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, ACCESS_TOKEN_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for KeyringBackend {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn delete(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

/// Process-local side-store. Nothing survives a restart, but the value does
/// survive dropping and rebuilding a `CredentialStore` over the same backend.
#[derive(Default)]
pub struct MemoryBackend {
    value: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>> {
        let value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        Ok(value.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        let mut value = self.value.lock().unwrap_or_else(|e| e.into_inner());
        *value = None;
        Ok(())
    }
}

impl<T: TokenBackend + ?Sized> TokenBackend for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>> {
        (**self).load()
    }

    fn save(&self, token: &str) -> Result<()> {
        (**self).save(token)
    }

    fn delete(&self) -> Result<()> {
        (**self).delete()
    }
}
