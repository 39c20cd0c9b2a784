//! Local envelope layer
//!
//! The envelope seals a payload under a freshly generated one-time data key. Only that
//! data key is sent to the remote KMS for wrapping; the bulk data never leaves the process.

mod seal;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

pub use seal::AesGcmEnvelope;

/// Output of [`EnvelopeCipher::seal`]
pub struct EnvelopeInfo {
    /// Plaintext one-time data key, wiped on drop
    pub key: Zeroizing<Vec<u8>>,
    /// Initialization vector used for the payload
    pub iv: Vec<u8>,
    /// Sealed payload, authentication tag included
    pub ciphertext: Vec<u8>,
}

impl fmt::Debug for EnvelopeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeInfo")
            .field("key", &"[REDACTED]")
            .field("iv", &self.iv)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Local authenticated encryption under a random data key
pub trait EnvelopeCipher: Send + Sync + fmt::Debug {
    /// Generates a data key and IV and seals `plaintext` bound to `aad`
    fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<EnvelopeInfo>;

    /// Opens a sealed payload; fails on any authentication mismatch
    fn open(&self, key: &[u8], iv: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>>;
}

/// The persisted result of an encryption
///
/// `wrapped_data_key` unwraps through the KMS to the data key that, with `iv`, opens
/// `ciphertext`. `key_id` is the key the KMS reported when wrapping; it is kept so that
/// callers can find blobs written under an older key, but decryption does not use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub key_id: String,
    pub wrapped_data_key: Vec<u8>,
}
