use crate::credentials::Credentials;
use crate::crypto::{random_bytes, Aes256GcmAead, AES256_KEY_SIZE};
use crate::error::{BoxError, Error, Result};
use crate::kms::{ClientFactory, ConnectResult, SymmetricCryptoClient, SymmetricEncryptResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use zeroize::Zeroizing;

#[derive(Default)]
struct KeyRing {
    keys: HashMap<String, Zeroizing<Vec<u8>>>,
    aliases: HashMap<String, Alias>,
}

struct Alias {
    target: String,
    /// Every key the alias has pointed to, current one included
    history: Vec<String>,
}

impl KeyRing {
    /// Key used for encryption under `id`, and the keys `id` may decrypt with
    fn resolve(&self, id: &str) -> Option<(String, Vec<String>)> {
        if let Some(alias) = self.aliases.get(id) {
            return Some((alias.target.clone(), alias.history.clone()));
        }

        self.keys
            .contains_key(id)
            .then(|| (id.to_string(), vec![id.to_string()]))
    }
}

/// A KMS that lives in process memory
///
/// Keys are plain 32-byte AES keys; aliases can be re-pointed to newer keys to emulate
/// rotation, and keep the right to decrypt under every key they pointed to before.
/// Intended for development and tests only.
pub struct StaticSymmetricCrypto {
    ring: RwLock<KeyRing>,
    aead: Aes256GcmAead,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl std::fmt::Debug for StaticSymmetricCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StaticSymmetricCrypto")
            .field("keys", &ring.keys.len())
            .field("aliases", &ring.aliases.len())
            .finish()
    }
}

impl Default for StaticSymmetricCrypto {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticSymmetricCrypto {
    /// Creates an empty KMS
    pub fn new() -> Self {
        Self {
            ring: RwLock::new(KeyRing::default()),
            aead: Aes256GcmAead::new(),
            encrypt_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a key with random material and returns its id
    pub fn create_key(&self) -> String {
        let id = format!("abj{}", uuid::Uuid::new_v4().simple());
        self.ring
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .insert(id.clone(), Zeroizing::new(random_bytes(AES256_KEY_SIZE)));
        id
    }

    /// Registers a key with the given material
    pub fn add_key(&self, id: impl Into<String>, material: Vec<u8>) -> Result<()> {
        if material.len() != AES256_KEY_SIZE {
            return Err(Error::InvalidInput(format!(
                "static KMS key must be {} bytes, got {}",
                AES256_KEY_SIZE,
                material.len()
            )));
        }

        self.ring
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .insert(id.into(), Zeroizing::new(material));
        Ok(())
    }

    /// Points `alias` at `key_id`, creating the alias if needed
    pub fn set_alias(&self, alias: impl Into<String>, key_id: &str) -> Result<()> {
        let mut ring = self.ring.write().unwrap_or_else(PoisonError::into_inner);
        if !ring.keys.contains_key(key_id) {
            return Err(Error::InvalidInput(format!("unknown key: {}", key_id)));
        }

        let alias = ring.aliases.entry(alias.into()).or_insert_with(|| Alias {
            target: key_id.to_string(),
            history: Vec::new(),
        });
        alias.target = key_id.to_string();
        if !alias.history.iter().any(|k| k == key_id) {
            alias.history.push(key_id.to_string());
        }
        Ok(())
    }

    /// Number of encrypt RPCs served so far
    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    /// Number of decrypt RPCs served so far
    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    /// Factory that hands out this KMS whatever the credentials
    pub fn factory(self: &Arc<Self>) -> Arc<ClientFactory> {
        let kms = Arc::clone(self);
        let factory = move |_: &Credentials| -> ConnectResult { Ok(kms.clone()) };
        Arc::new(factory)
    }
}

// Ciphertext layout: key id length (1 byte) || key id || nonce || sealed key || tag.
// The key id is also the associated data.
fn split_ciphertext(ciphertext: &[u8]) -> std::result::Result<(&str, &[u8]), BoxError> {
    let (&len, rest) = ciphertext.split_first().ok_or("ciphertext is empty")?;
    let len = usize::from(len);
    if rest.len() < len {
        return Err("ciphertext is truncated".into());
    }

    let (id, sealed) = rest.split_at(len);
    let id = std::str::from_utf8(id).map_err(|_| "ciphertext carries a malformed key id")?;
    Ok((id, sealed))
}

#[async_trait]
impl SymmetricCryptoClient for StaticSymmetricCrypto {
    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
    ) -> std::result::Result<SymmetricEncryptResponse, BoxError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);

        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        let (resolved, _) = ring
            .resolve(key_id)
            .ok_or_else(|| format!("key not found: {}", key_id))?;
        let material = ring
            .keys
            .get(&resolved)
            .ok_or_else(|| format!("key not found: {}", resolved))?;
        let id_len = u8::try_from(resolved.len()).map_err(|_| "key id is too long")?;

        let sealed = self.aead.seal(plaintext, material, resolved.as_bytes())?;

        let mut ciphertext = Vec::with_capacity(1 + resolved.len() + sealed.len());
        ciphertext.push(id_len);
        ciphertext.extend_from_slice(resolved.as_bytes());
        ciphertext.extend_from_slice(&sealed);

        Ok(SymmetricEncryptResponse {
            key_id: resolved,
            ciphertext,
        })
    }

    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext: &[u8],
    ) -> std::result::Result<Vec<u8>, BoxError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);
        let (_, readable) = ring
            .resolve(key_id)
            .ok_or_else(|| format!("key not found: {}", key_id))?;

        let (wrapped_by, sealed) = split_ciphertext(ciphertext)?;
        if !readable.iter().any(|k| k == wrapped_by) {
            return Err(format!(
                "key {} cannot decrypt ciphertext produced by key {}",
                key_id, wrapped_by
            )
            .into());
        }

        let material = ring
            .keys
            .get(wrapped_by)
            .ok_or_else(|| format!("key not found: {}", wrapped_by))?;

        Ok(self.aead.open(sealed, material, wrapped_by.as_bytes())?)
    }
}
