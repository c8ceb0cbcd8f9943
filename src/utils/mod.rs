//! # Utility Modules
//!
//! Cipher, checksum, logging and metrics support for the packet buffer.
//!
//! ## Components
//! - **Checksum**: Adler-32 over the encrypted region
//! - **Crypto**: XTEA block cipher and session keys
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters
//!
//! ## Security
//! - Keys come from the OS RNG (getrandom) and are zeroed on drop (zeroize)
//! - XTEA runs block by block with no chaining; see [`crypto`]

pub mod checksum;
pub mod crypto;
pub mod logging;
pub mod metrics;

pub use checksum::adler32;
pub use crypto::CipherKey;
