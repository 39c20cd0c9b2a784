use crate::crypto::aead::{fill_random, GCM_MAX_DATA_SIZE};
use crate::crypto::{AES256_KEY_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::error::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key as AesKey, Nonce,
};

/// AES-256-GCM with associated data
///
/// `seal`/`open` work on the self-contained `nonce || ciphertext || tag` layout;
/// the `_detached` variants keep the nonce separate, which is what the envelope
/// needs for its IV field.
#[derive(Default, Debug, Clone)]
pub struct Aes256GcmAead;

impl Aes256GcmAead {
    /// Creates a new instance of the AES-256-GCM implementation
    pub fn new() -> Self {
        Self
    }

    /// Encrypts `data` under a fresh random nonce and returns `nonce || ciphertext || tag`
    pub fn seal(&self, data: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0_u8; GCM_NONCE_SIZE];
        fill_random(&mut nonce);

        let sealed = self.seal_detached(data, key, &nonce, aad)?;

        let mut out = Vec::with_capacity(GCM_NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypts the `nonce || ciphertext || tag` layout produced by [`Self::seal`]
    pub fn open(&self, data: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if data.len() < GCM_NONCE_SIZE + GCM_TAG_SIZE {
            return Err(Error::Open(
                "data length is too short for GCM (nonce + tag)".into(),
            ));
        }

        let (nonce, sealed) = data.split_at(GCM_NONCE_SIZE);
        self.open_detached(sealed, key, nonce, aad)
    }

    /// Encrypts `data` with the given nonce, returning `ciphertext || tag`
    pub fn seal_detached(
        &self,
        data: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if data.len() as u64 > GCM_MAX_DATA_SIZE {
            return Err(Error::Seal("data too large for GCM".into()));
        }
        if key.len() != AES256_KEY_SIZE {
            return Err(Error::Seal(format!(
                "invalid key length {}, expected {}",
                key.len(),
                AES256_KEY_SIZE
            )));
        }
        if nonce.len() != GCM_NONCE_SIZE {
            return Err(Error::Seal(format!("invalid nonce length {}", nonce.len())));
        }

        let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(key));

        cipher
            .encrypt(Nonce::from_slice(nonce), Payload { msg: data, aad })
            .map_err(|e| Error::Seal(format!("encryption failed: {}", e)))
    }

    /// Decrypts `ciphertext || tag` with the given nonce
    pub fn open_detached(
        &self,
        data: &[u8],
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if key.len() != AES256_KEY_SIZE {
            return Err(Error::Open(format!(
                "invalid key length {}, expected {}",
                key.len(),
                AES256_KEY_SIZE
            )));
        }
        if nonce.len() != GCM_NONCE_SIZE {
            return Err(Error::Open(format!("invalid nonce length {}", nonce.len())));
        }
        if data.len() < GCM_TAG_SIZE {
            return Err(Error::Open("ciphertext is shorter than the GCM tag".into()));
        }

        let cipher = Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(key));

        cipher
            .decrypt(Nonce::from_slice(nonce), Payload { msg: data, aad })
            .map_err(|e| Error::Open(format!("decryption failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random_bytes;

    #[test]
    fn seal_layout_and_open() {
        let aead = Aes256GcmAead::new();
        let key = random_bytes(AES256_KEY_SIZE);

        let sealed = aead.seal(b"hello", &key, b"ctx").expect("seal");
        assert_eq!(sealed.len(), GCM_NONCE_SIZE + 5 + GCM_TAG_SIZE);

        let opened = aead.open(&sealed, &key, b"ctx").expect("open");
        assert_eq!(opened, b"hello");
    }

    #[test]
    fn open_rejects_other_aad() {
        let aead = Aes256GcmAead::new();
        let key = random_bytes(AES256_KEY_SIZE);
        let sealed = aead.seal(b"hello", &key, b"ctx").expect("seal");

        assert!(matches!(aead.open(&sealed, &key, b"other"), Err(Error::Open(_))));
    }

    #[test]
    fn short_input_is_open_error() {
        let aead = Aes256GcmAead::new();
        let key = random_bytes(AES256_KEY_SIZE);

        assert!(matches!(aead.open(&[0_u8; 8], &key, b""), Err(Error::Open(_))));
    }

    #[test]
    fn wrong_key_length_does_not_panic() {
        let aead = Aes256GcmAead::new();

        assert!(matches!(
            aead.seal_detached(b"x", &[0_u8; 16], &[0_u8; GCM_NONCE_SIZE], b""),
            Err(Error::Seal(_))
        ));
        assert!(matches!(
            aead.open_detached(&[0_u8; 32], &[0_u8; 31], &[0_u8; GCM_NONCE_SIZE], b""),
            Err(Error::Open(_))
        ));
    }
}
