//! # Core Codec Components
//!
//! The packet buffer and stream framing.
//!
//! ## Components
//! - **Packet**: Fixed-capacity buffer with cursor, typed accessors and frame sealing
//! - **Codec**: Tokio codec that splits a byte stream on the 2-byte length prefix
//!
//! ## Wire Format
//! ```text
//! [Length(2)] [Adler32(4)] [PayloadLength(2)] [Payload(N)]
//! ```
//!
//! ## Limits
//! - Frame length is a u16, so no frame exceeds 65537 bytes
//! - Storage is allocated once per buffer and never grows

pub mod codec;
pub mod packet;
