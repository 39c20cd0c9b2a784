use rand::{rngs::OsRng, RngCore};

/// Size of an AES-256 key in bytes
pub const AES256_KEY_SIZE: usize = 32;

// Constants for GCM mode
const GCM_BLOCK_SIZE: usize = 16;
pub const GCM_NONCE_SIZE: usize = 12;
pub const GCM_TAG_SIZE: usize = 16;

// ((1 << 32) - 2) * GCM_BLOCK_SIZE
pub(crate) const GCM_MAX_DATA_SIZE: u64 = ((1 << 32) - 2) * GCM_BLOCK_SIZE as u64;

/// Fills a buffer with random bytes using a cryptographically secure RNG
pub fn fill_random(buffer: &mut [u8]) {
    OsRng.fill_bytes(buffer);
}

/// Returns `size` cryptographically secure random bytes
pub fn random_bytes(size: usize) -> Vec<u8> {
    let mut bytes = vec![0_u8; size];
    fill_random(&mut bytes);
    bytes
}
