//! Encrypted key-value storage.
//!
//! Values are serialized to JSON and sealed with AES-256-GCM under a key
//! derived from a passphrase with PBKDF2. The derived key is cached in
//! memory until [`SecureStorage::lock`] is called. Each item's storage key
//! is bound in as associated data, so a ciphertext copied to another key
//! will not open.
//!
//! Backend layout for namespace `ns`:
//! - `ns:__salt`: base64 PBKDF2 salt (plaintext)
//! - `ns:__check`: verification token used to reject a wrong passphrase
//! - `ns:<key>`: `{"v":1,"data":"<base64>","expires_at":<unix ms|null>}`

use crate::cipher::{EncryptedData, decrypt, decrypt_with_aad, encrypt, encrypt_with_aad};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KdfParams, Salt, derive_key};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

const SALT_KEY: &str = "__salt";
const CHECK_KEY: &str = "__check";
const ITEM_VERSION: u8 = 1;
const VERIFICATION_PLAINTEXT: &[u8] = b"confpass-secure-storage-check-v1";

// ============================================================================
// Backends
// ============================================================================

/// Raw string key-value store underneath [`SecureStorage`].
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> CryptoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> CryptoResult<()>;
    fn remove(&self, key: &str) -> CryptoResult<()>;
    fn keys(&self) -> CryptoResult<Vec<String>>;
}

/// In-process backend.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> CryptoError {
    CryptoError::Storage(format!("lock poisoned: {e}"))
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> CryptoResult<Option<String>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CryptoResult<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> CryptoResult<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> CryptoResult<Vec<String>> {
        Ok(self.entries.read().map_err(poisoned)?.keys().cloned().collect())
    }
}

/// Backend persisting a JSON object to a single file.
///
/// Writes go to a sibling temp file which is then renamed over the target.
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> CryptoResult<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(CryptoError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> CryptoResult<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|e| {
            CryptoError::Storage(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            CryptoError::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> CryptoResult<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut entries = self.load()?;
        f(&mut entries);
        self.store(&entries)
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> CryptoResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> CryptoResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> CryptoResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> CryptoResult<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}

// ============================================================================
// SecureStorage
// ============================================================================

#[derive(Serialize, Deserialize)]
struct StoredItem {
    v: u8,
    data: String,
    expires_at: Option<i64>,
}

/// Passphrase-protected key-value store over a [`StorageBackend`].
pub struct SecureStorage {
    backend: Box<dyn StorageBackend>,
    namespace: String,
    params: KdfParams,
    key: RwLock<Option<DerivedKey>>,
}

impl SecureStorage {
    /// Opens (or initializes) the namespace and unlocks it with `passphrase`.
    ///
    /// The first open creates the salt and verification token; later opens
    /// fail with [`CryptoError::InvalidPassphrase`] if the passphrase differs.
    pub fn open(
        backend: Box<dyn StorageBackend>,
        namespace: &str,
        passphrase: &str,
        params: KdfParams,
    ) -> CryptoResult<Self> {
        if namespace.is_empty() || namespace.contains(':') {
            return Err(CryptoError::Config(format!(
                "invalid storage namespace: {namespace:?}"
            )));
        }
        let storage = Self {
            backend,
            namespace: namespace.to_string(),
            params,
            key: RwLock::new(None),
        };
        storage.unlock(passphrase)?;
        Ok(storage)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    fn load_or_create_salt(&self) -> CryptoResult<Salt> {
        let salt_key = self.full_key(SALT_KEY);
        if let Some(encoded) = self.backend.get(&salt_key)? {
            let raw = STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::InvalidFormat(format!("stored salt: {e}")))?;
            return Salt::from_slice(&raw);
        }
        let salt = Salt::random();
        self.backend.set(&salt_key, &STANDARD.encode(salt.as_bytes()))?;
        debug!("created storage salt for namespace {}", self.namespace);
        Ok(salt)
    }

    /// Derives and caches the storage key.
    pub fn unlock(&self, passphrase: &str) -> CryptoResult<()> {
        let salt = self.load_or_create_salt()?;
        let key = derive_key(passphrase, &salt, &self.params)?;

        let check_key = self.full_key(CHECK_KEY);
        match self.backend.get(&check_key)? {
            Some(token) => {
                let encrypted = EncryptedData::from_base64(&token)?;
                let plaintext =
                    decrypt(&key, &encrypted).map_err(|_| CryptoError::InvalidPassphrase)?;
                if plaintext != VERIFICATION_PLAINTEXT {
                    return Err(CryptoError::InvalidPassphrase);
                }
            }
            None => {
                let token = encrypt(&key, VERIFICATION_PLAINTEXT)?;
                self.backend.set(&check_key, &token.to_base64())?;
            }
        }

        *self.key.write().map_err(poisoned)? = Some(key);
        debug!("secure storage namespace {} unlocked", self.namespace);
        Ok(())
    }

    /// Drops the cached key. Reads and writes fail until [`SecureStorage::unlock`].
    pub fn lock(&self) {
        if let Ok(mut guard) = self.key.write() {
            *guard = None;
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.key.read().map(|k| k.is_some()).unwrap_or(false)
    }

    fn current_key(&self) -> CryptoResult<DerivedKey> {
        self.key
            .read()
            .map_err(poisoned)?
            .clone()
            .ok_or(CryptoError::Locked)
    }

    /// Encrypts and stores `value`, optionally expiring after `ttl`.
    pub fn set_item<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CryptoResult<()> {
        validate_item_key(key)?;
        let storage_key = self.full_key(key);
        let secret = self.current_key()?;

        let json = serde_json::to_vec(value)?;
        let encrypted = encrypt_with_aad(&secret, &json, storage_key.as_bytes())?;
        let expires_at = ttl.map(|ttl| {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            chrono::Utc::now().timestamp_millis().saturating_add(ttl_ms)
        });

        let item = StoredItem {
            v: ITEM_VERSION,
            data: encrypted.to_base64(),
            expires_at,
        };
        self.backend.set(&storage_key, &serde_json::to_string(&item)?)
    }

    /// Reads and decrypts an item.
    ///
    /// Returns `None` for missing and expired items. Items that fail to parse,
    /// authenticate or deserialize into `T` are removed and also reported as
    /// `None`.
    pub fn get_item<T: DeserializeOwned>(&self, key: &str) -> CryptoResult<Option<T>> {
        validate_item_key(key)?;
        let storage_key = self.full_key(key);
        let secret = self.current_key()?;

        let Some(raw) = self.backend.get(&storage_key)? else {
            return Ok(None);
        };

        let item: StoredItem = match serde_json::from_str(&raw) {
            Ok(item) => item,
            Err(e) => {
                warn!("discarding unreadable storage item {storage_key}: {e}");
                self.backend.remove(&storage_key)?;
                return Ok(None);
            }
        };

        if item.v != ITEM_VERSION {
            warn!("discarding storage item {storage_key} with version {}", item.v);
            self.backend.remove(&storage_key)?;
            return Ok(None);
        }

        if let Some(expires_at) = item.expires_at {
            if chrono::Utc::now().timestamp_millis() >= expires_at {
                debug!("storage item {storage_key} expired");
                self.backend.remove(&storage_key)?;
                return Ok(None);
            }
        }

        let plaintext = match EncryptedData::from_base64(&item.data)
            .and_then(|data| decrypt_with_aad(&secret, &data, storage_key.as_bytes()))
        {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!("discarding storage item {storage_key}: {e}");
                self.backend.remove(&storage_key)?;
                return Ok(None);
            }
        };

        match serde_json::from_slice(&plaintext) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("discarding storage item {storage_key} of unexpected shape: {e}");
                self.backend.remove(&storage_key)?;
                Ok(None)
            }
        }
    }

    /// Whether an unexpired item is stored under `key`. Expired items are
    /// removed. Does not decrypt, so it works while locked.
    pub fn contains(&self, key: &str) -> CryptoResult<bool> {
        validate_item_key(key)?;
        let storage_key = self.full_key(key);
        let Some(raw) = self.backend.get(&storage_key)? else {
            return Ok(false);
        };
        let now = chrono::Utc::now().timestamp_millis();
        let expired = serde_json::from_str::<StoredItem>(&raw)
            .map(|item| item.expires_at.is_some_and(|at| now >= at))
            .unwrap_or(false);
        if expired {
            debug!("storage item {storage_key} expired");
            self.backend.remove(&storage_key)?;
        }
        Ok(!expired)
    }

    pub fn remove_item(&self, key: &str) -> CryptoResult<()> {
        validate_item_key(key)?;
        self.backend.remove(&self.full_key(key))
    }

    /// Item keys in this namespace, without the namespace prefix.
    pub fn keys(&self) -> CryptoResult<Vec<String>> {
        let prefix = format!("{}:", self.namespace);
        Ok(self
            .backend
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .filter(|k| k != SALT_KEY && k != CHECK_KEY)
            .collect())
    }

    /// Removes every item in this namespace. The salt and verification token stay.
    pub fn clear(&self) -> CryptoResult<()> {
        for key in self.keys()? {
            self.backend.remove(&self.full_key(&key))?;
        }
        Ok(())
    }

    /// Removes expired items and returns how many were dropped.
    pub fn purge_expired(&self) -> CryptoResult<usize> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut removed = 0;
        for key in self.keys()? {
            let storage_key = self.full_key(&key);
            let Some(raw) = self.backend.get(&storage_key)? else {
                continue;
            };
            let expired = serde_json::from_str::<StoredItem>(&raw)
                .map(|item| item.expires_at.is_some_and(|at| now >= at))
                .unwrap_or(false);
            if expired {
                self.backend.remove(&storage_key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn validate_item_key(key: &str) -> CryptoResult<()> {
    if key.is_empty() || key == SALT_KEY || key == CHECK_KEY {
        return Err(CryptoError::Config(format!("reserved or empty storage key: {key:?}")));
    }
    Ok(())
}
