use crate::crypto::{fill_random, Aes256GcmAead, AES256_KEY_SIZE, GCM_NONCE_SIZE};
use crate::envelope::{EnvelopeCipher, EnvelopeInfo};
use crate::error::Result;
use zeroize::Zeroizing;

/// AES-256-GCM envelope: 32-byte data key, 12-byte IV, tag appended to the ciphertext
#[derive(Default, Debug, Clone)]
pub struct AesGcmEnvelope {
    aead: Aes256GcmAead,
}

impl AesGcmEnvelope {
    /// Creates a new AES-256-GCM envelope
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvelopeCipher for AesGcmEnvelope {
    fn seal(&self, plaintext: &[u8], aad: &[u8]) -> Result<EnvelopeInfo> {
        let mut key = Zeroizing::new(vec![0_u8; AES256_KEY_SIZE]);
        fill_random(&mut key);

        let mut iv = vec![0_u8; GCM_NONCE_SIZE];
        fill_random(&mut iv);

        let ciphertext = self.aead.seal_detached(plaintext, &key, &iv, aad)?;

        Ok(EnvelopeInfo { key, iv, ciphertext })
    }

    fn open(&self, key: &[u8], iv: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.aead.open_detached(ciphertext, key, iv, aad)
    }
}
