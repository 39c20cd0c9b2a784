//! Remote KMS capability
//!
//! The wrapper only needs the two symmetric-crypto RPCs of the KMS. The transport is
//! supplied through a [`ClientFactory`], which turns resolved [`Credentials`] into a
//! connected [`SymmetricCryptoClient`]:
//!
//! - `StaticSymmetricCrypto` is an in-process KMS for development and tests
//! - any other transport can be plugged in by implementing `SymmetricCryptoClient`

mod static_kms;

use crate::credentials::Credentials;
use crate::error::BoxError;
use async_trait::async_trait;
use std::sync::Arc;

pub use static_kms::StaticSymmetricCrypto;

/// Response of a symmetric encrypt call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricEncryptResponse {
    /// Key that actually performed the encryption. Differs from the requested id when
    /// the request named an alias.
    pub key_id: String,

    /// Wrapped plaintext
    pub ciphertext: Vec<u8>,
}

/// Symmetric encrypt/decrypt RPCs of the KMS
#[async_trait]
pub trait SymmetricCryptoClient: Send + Sync {
    /// Encrypts `plaintext` under `key_id`
    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
    ) -> std::result::Result<SymmetricEncryptResponse, BoxError>;

    /// Decrypts `ciphertext` with `key_id`
    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext: &[u8],
    ) -> std::result::Result<Vec<u8>, BoxError>;
}

/// Outcome of building a client: the connected client or the transport error
pub type ConnectResult = std::result::Result<Arc<dyn SymmetricCryptoClient>, BoxError>;

/// Builds a connected client from credentials
pub type ClientFactory = dyn Fn(&Credentials) -> ConnectResult + Send + Sync;
