use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Key under which the token is persisted.
pub const TOKEN_KEY: &str = "eah_jwt";

/// Bearer token for the signed-in user. Cloning is cheap; `Debug` never
/// prints the token itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Expiry read from the JWT `exp` claim. The signature is not checked;
    /// the backend remains the authority, this only lets the client skip a
    /// request that is bound to fail. Opaque tokens yield `None`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<ExpiryClaims>(&self.0, &DecodingKey::from_secret(&[]), &validation).ok()?;
        DateTime::from_timestamp(data.claims.exp?, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Persistence for the single active session token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
    /// Removing an absent token is not an error.
    fn clear(&self) -> Result<()>;
}

/// Token kept only for the lifetime of the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(Credential::new(token))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

/// Token persisted as a small JSON key/value file, so other keys written
/// next to it survive a logout.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> std::io::Result<BTreeMap<String, String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }

    /// A file that no longer parses is treated as empty and gets
    /// overwritten on the next write.
    fn entries_or_empty(&self) -> Result<BTreeMap<String, String>> {
        match self.read_entries() {
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "ignoring unreadable session file: {}", e);
                Ok(BTreeMap::new())
            }
            other => Ok(other?),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        let entries = self.entries_or_empty()?;
        Ok(entries
            .get(TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .map(|t| Credential::new(t.as_str())))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let mut entries = self.entries_or_empty()?;
        entries.insert(TOKEN_KEY.to_string(), credential.token().to_string());
        self.write_entries(&entries)?;
        debug!(path = %self.path.display(), "session token saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let (mut entries, corrupt) = match self.read_entries() {
            Ok(entries) => (entries, false),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "discarding unreadable session file: {}", e);
                (BTreeMap::new(), true)
            }
            Err(e) => return Err(e.into()),
        };
        if entries.remove(TOKEN_KEY).is_none() && !corrupt {
            return Ok(());
        }
        if entries.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_entries(&entries)?;
        }
        debug!(path = %self.path.display(), "session token cleared");
        Ok(())
    }
}
