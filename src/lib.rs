//! # Yandex.Cloud KMS envelope wrapper
//!
//! Envelope encryption where the master key never leaves the KMS.
//!
//! Every call to [`KeyWrapper::encrypt`] seals the payload locally with AES-256-GCM under a
//! freshly generated data key, then asks the KMS to wrap that data key under the configured
//! key id. [`KeyWrapper::decrypt`] reverses the two steps. Only the 32-byte data key ever
//! travels to the KMS.
//!
//! The wrapper is configured once from environment variables and a config map (environment
//! first). The first successful configuration builds the KMS client and round-trips a test
//! value through it, so a bad key id or bad credentials fail at startup rather than on the
//! first real write.
//!
//! When the key id is an alias, the KMS reports the underlying key on every encryption.
//! [`KeyWrapper::key_id`] exposes the latest one, which lets callers notice rotation and
//! re-encrypt older data if they want to. The wrapper never does that on its own.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use yandexcloudkms::kms::StaticSymmetricCrypto;
//! use yandexcloudkms::{KeyWrapper, Wrapper};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // An in-process KMS; production code plugs its own transport into the factory
//! let kms = Arc::new(StaticSymmetricCrypto::new());
//! let key_id = kms.create_key();
//!
//! let wrapper = Wrapper::new(kms.factory());
//!
//! let mut config = HashMap::new();
//! config.insert("kms_key_id".to_string(), key_id);
//! let info = wrapper.set_config(Some(&config)).await?;
//! println!("using key {}", info["kms_key_id"]);
//!
//! let blob = wrapper.encrypt(Some(&b"secret data"[..]), b"user:42").await?;
//! let plaintext = wrapper.decrypt(Some(&blob), b"user:42").await?;
//! assert_eq!(plaintext, b"secret data");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod kms;
pub mod tracker;
pub mod wrapper;

// Re-export key types
pub use crate::config::{EnvSource, ProcessEnv, WrapperConfig};
pub use crate::credentials::{Credentials, ServiceAccountKey};
pub use crate::envelope::{AesGcmEnvelope, EncryptedBlob, EnvelopeCipher, EnvelopeInfo};
pub use crate::error::{BoxError, Error, Result};
pub use crate::kms::{ClientFactory, ConnectResult, SymmetricCryptoClient, SymmetricEncryptResponse};
pub use crate::tracker::KeyIdTracker;
pub use crate::wrapper::{Wrapper, WrapperBuilder};

/// Wrapper type reported by the Yandex.Cloud KMS wrapper
pub const YANDEXCLOUD_KMS: &str = "yandexcloudkms";

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// A pluggable key-management backend
#[async_trait]
pub trait KeyWrapper: Send + Sync + fmt::Debug {
    /// Constant identifying the backend kind
    fn wrapper_type(&self) -> &'static str;

    /// Last key id reported by the backend, empty if none yet
    fn key_id(&self) -> String;

    /// Key id used for HMAC operations, empty when the backend has none
    fn hmac_key_id(&self) -> String;

    /// Applies configuration and returns non-sensitive information about it
    async fn set_config(
        &self,
        config: Option<&HashMap<String, String>>,
    ) -> Result<HashMap<String, String>>;

    /// Encrypts `plaintext`, binding it to `aad`
    async fn encrypt(&self, plaintext: Option<&[u8]>, aad: &[u8]) -> Result<EncryptedBlob>;

    /// Decrypts a blob produced by [`KeyWrapper::encrypt`] with the same `aad`
    async fn decrypt(&self, blob: Option<&EncryptedBlob>, aad: &[u8]) -> Result<Vec<u8>>;
}
