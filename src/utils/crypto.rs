//! # XTEA Block Cipher
//!
//! The payload cipher of the wire protocol: XTEA with 32 cycles over 8-byte
//! blocks, each block read as two little-endian `u32` words.
//!
//! ## Known weakness
//! Blocks are enciphered independently (ECB). Equal plaintext blocks give
//! equal ciphertext blocks and blocks can be reordered without detection.
//! The remote peer expects exactly this, so it is kept for interoperability.
//!
//! ## Usage
//! ```rust
//! use gamewire::utils::crypto::{decrypt, encrypt, CipherKey};
//!
//! let key = CipherKey::new([1, 2, 3, 4]);
//! let mut buffer = [0u8; 32];
//! buffer[6..11].copy_from_slice(b"hello");
//!
//! let mut length = 11;
//! encrypt(&mut buffer, &mut length, 6, &key).unwrap();
//! assert_eq!(length, 14);
//!
//! decrypt(&mut buffer, length, 6, &key).unwrap();
//! assert_eq!(&buffer[6..11], b"hello");
//! ```

use crate::error::{constants, ProtocolError, Result};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Cipher block size in bytes
pub const BLOCK_SIZE: usize = 8;

const DELTA: u32 = 0x9E37_79B9;
const CYCLES: u32 = 32;

/// Four-word XTEA key, fixed for the lifetime of a session.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u32; 4]);

impl CipherKey {
    pub fn new(words: [u32; 4]) -> Self {
        Self(words)
    }

    /// Builds a key from 16 bytes, four little-endian words in order.
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self(words)
    }

    /// Generates a fresh key from the operating system RNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 16];
        getrandom::fill(&mut bytes).map_err(|e| {
            ProtocolError::CipherFailure(format!("{}: {e}", constants::ERR_KEY_GENERATION))
        })?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        Ok(key)
    }

    pub fn words(&self) -> &[u32; 4] {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }
}

impl From<[u32; 4]> for CipherKey {
    fn from(words: [u32; 4]) -> Self {
        Self(words)
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

/// Length of `[start, length)` once padded to whole blocks, as an end offset.
pub fn padded_len(start: usize, length: usize) -> usize {
    let region = length.saturating_sub(start);
    start + region.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// Encrypts `buffer[start..length]` in place.
///
/// `length` is raised to the next block boundary; the bytes it covers are
/// enciphered as they are. Nothing is touched on failure.
///
/// # Errors
/// `CipherFailure` when the region is empty or its padded end passes
/// `buffer.len()`.
pub fn encrypt(buffer: &mut [u8], length: &mut usize, start: usize, key: &CipherKey) -> Result<()> {
    if *length <= start {
        return Err(ProtocolError::CipherFailure(
            constants::ERR_EMPTY_CIPHER_REGION.to_string(),
        ));
    }

    let end = padded_len(start, *length);
    if end > buffer.len() {
        return Err(ProtocolError::CipherFailure(
            constants::ERR_PADDING_OVERFLOW.to_string(),
        ));
    }

    for block in buffer[start..end].chunks_exact_mut(BLOCK_SIZE) {
        encipher_block(block, key);
    }
    *length = end;
    Ok(())
}

/// Decrypts `buffer[start..length]` in place.
///
/// # Errors
/// `CipherFailure` when the region is empty, not a whole number of blocks,
/// or runs past the buffer. Nothing is touched on failure.
pub fn decrypt(buffer: &mut [u8], length: usize, start: usize, key: &CipherKey) -> Result<()> {
    if length <= start {
        return Err(ProtocolError::CipherFailure(
            constants::ERR_EMPTY_CIPHER_REGION.to_string(),
        ));
    }
    if (length - start) % BLOCK_SIZE != 0 {
        return Err(ProtocolError::CipherFailure(
            constants::ERR_UNALIGNED_CIPHER_REGION.to_string(),
        ));
    }
    if length > buffer.len() {
        return Err(ProtocolError::CipherFailure(
            constants::ERR_REGION_OUT_OF_BOUNDS.to_string(),
        ));
    }

    for block in buffer[start..length].chunks_exact_mut(BLOCK_SIZE) {
        decipher_block(block, key);
    }
    Ok(())
}

#[inline]
fn load_words(block: &[u8]) -> (u32, u32) {
    (
        u32::from_le_bytes([block[0], block[1], block[2], block[3]]),
        u32::from_le_bytes([block[4], block[5], block[6], block[7]]),
    )
}

#[inline]
fn store_words(block: &mut [u8], v0: u32, v1: u32) {
    block[..4].copy_from_slice(&v0.to_le_bytes());
    block[4..8].copy_from_slice(&v1.to_le_bytes());
}

#[inline]
fn mix(v: u32) -> u32 {
    ((v << 4) ^ (v >> 5)).wrapping_add(v)
}

fn encipher_block(block: &mut [u8], key: &CipherKey) {
    let k = key.words();
    let (mut v0, mut v1) = load_words(block);
    let mut sum: u32 = 0;

    for _ in 0..CYCLES {
        v0 = v0.wrapping_add(mix(v1) ^ sum.wrapping_add(k[(sum & 3) as usize]));
        sum = sum.wrapping_add(DELTA);
        v1 = v1.wrapping_add(mix(v0) ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]));
    }

    store_words(block, v0, v1);
}

fn decipher_block(block: &mut [u8], key: &CipherKey) {
    let k = key.words();
    let (mut v0, mut v1) = load_words(block);
    let mut sum: u32 = DELTA.wrapping_mul(CYCLES);

    for _ in 0..CYCLES {
        v1 = v1.wrapping_sub(mix(v0) ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]));
        sum = sum.wrapping_sub(DELTA);
        v0 = v0.wrapping_sub(mix(v1) ^ sum.wrapping_add(k[(sum & 3) as usize]));
    }

    store_words(block, v0, v1);
}
