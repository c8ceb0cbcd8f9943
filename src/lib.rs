//! # gamewire
//!
//! Encoder and decoder for the frames of a client/server game protocol.
//!
//! A frame is a 2-byte length prefix, an Adler-32 checksum and an
//! XTEA-encrypted body that starts with its own payload length. The crate
//! builds and parses those frames in a fixed-capacity [`PacketBuffer`]; it
//! does no network I/O and knows nothing about the meaning of the fields.
//!
//! ## Modules
//! - [`core`]: packet buffer and stream framing codec
//! - [`protocol`]: session key ownership
//! - [`utils`]: cipher, checksum, logging, metrics
//! - [`config`]: wire constants and runtime configuration
//! - [`error`]: error taxonomy
//!
//! ## Example
//! ```rust
//! use gamewire::{CipherKey, PacketBuffer};
//!
//! # fn main() -> gamewire::Result<()> {
//! let key = CipherKey::new([0x0123_4567, 0x89AB_CDEF, 0xFEDC_BA98, 0x7654_3210]);
//!
//! let mut packet = PacketBuffer::new_writer(64);
//! packet.add_u16(1000)?;
//! packet.add_string("hi")?;
//! packet.prepare_to_send(&key)?;
//! let wire = packet.snapshot();
//!
//! let mut inbound = PacketBuffer::new_reader(&wire);
//! inbound.prepare_to_read(&key)?;
//! assert_eq!(inbound.get_u16()?, 6);
//! assert_eq!(inbound.get_u16()?, 1000);
//! assert_eq!(inbound.get_string()?, "hi");
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::core::codec::FrameCodec;
pub use crate::core::packet::PacketBuffer;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::session::{KeyProvider, Session};
pub use crate::utils::crypto::CipherKey;
