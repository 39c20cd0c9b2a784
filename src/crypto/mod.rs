//! AES-256-GCM primitives shared by the local envelope and the static KMS

mod aead;
pub mod aes256gcm;

pub use aead::{fill_random, random_bytes, AES256_KEY_SIZE, GCM_NONCE_SIZE, GCM_TAG_SIZE};
pub use aes256gcm::Aes256GcmAead;
