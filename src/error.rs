//! # Error Types
//!
//! Error handling for the packet buffer, cipher and frame codec.
//!
//! Every failure is local to the frame being built or parsed. Nothing here is
//! retried automatically; the transport decides whether a rejected frame
//! means a resend or a reconnect.
//!
//! ## Error Categories
//! - **Bounds**: `CapacityExceeded` on writes, `DataShortage` on reads
//! - **Integrity**: `ChecksumMismatch` when the stored Adler-32 disagrees
//! - **Cipher**: `CipherFailure` for degenerate or misaligned regions
//! - **Framing**: `InvalidHeader`, `OversizedPacket`
//! - **Session**: key not yet established, or established twice
//! - **Configuration / I/O**: config file loading, codec plumbing
//!
//! ## Example Usage
//! ```rust
//! use gamewire::core::packet::PacketBuffer;
//! use gamewire::error::{ProtocolError, Result};
//! use tracing::{error, info};
//!
//! fn read_opcode(frame: &[u8]) -> Result<u8> {
//!     let mut packet = PacketBuffer::new_reader(frame);
//!     packet.get_byte()
//! }
//!
//! match read_opcode(&[]) {
//!     Ok(opcode) => info!(opcode, "Parsed opcode"),
//!     Err(e @ ProtocolError::DataShortage { .. }) => error!(error = %e, "Truncated frame"),
//!     Err(e) => error!(error = %e, "Unexpected failure"),
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants shared by the cipher and packet paths.
pub mod constants {
    /// Cipher errors
    pub const ERR_EMPTY_CIPHER_REGION: &str = "cipher region is empty";
    pub const ERR_UNALIGNED_CIPHER_REGION: &str = "cipher region is not a multiple of the block size";
    pub const ERR_PADDING_OVERFLOW: &str = "padded cipher region exceeds buffer capacity";
    pub const ERR_REGION_OUT_OF_BOUNDS: &str = "cipher region extends past the buffer";

    /// Key generation
    pub const ERR_KEY_GENERATION: &str = "Failed to gather entropy for cipher key";
}

/// Primary error type for all codec operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Capacity exceeded: {requested} bytes at offset {offset} (capacity {capacity})")]
    CapacityExceeded {
        offset: usize,
        requested: usize,
        capacity: usize,
    },

    #[error("Data shortage: {requested} bytes requested at offset {offset}, {available} available")]
    DataShortage {
        offset: usize,
        requested: usize,
        available: usize,
    },

    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("Cipher failure: {0}")]
    CipherFailure(String),

    #[error("Invalid string: {0}")]
    InvalidString(String),

    #[error("Invalid frame header")]
    InvalidHeader,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Session cipher key has not been established")]
    KeyNotEstablished,

    #[error("Session cipher key is already established")]
    KeyAlreadyEstablished,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// True for failures that mean the frame itself is bad and must be discarded
    pub fn is_frame_fatal(&self) -> bool {
        matches!(
            self,
            ProtocolError::DataShortage { .. }
                | ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::CipherFailure(_)
                | ProtocolError::InvalidHeader
                | ProtocolError::OversizedPacket(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
