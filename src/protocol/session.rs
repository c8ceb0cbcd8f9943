//! # Session Keys
//!
//! A session owns the cipher key negotiated for one connection. The key is
//! written once, when the handshake completes, and read by every packet
//! buffer of the session afterwards, possibly from several tasks at once.
//!
//! ## Usage
//! ```rust
//! use gamewire::protocol::session::Session;
//! use gamewire::utils::crypto::CipherKey;
//! use std::sync::Arc;
//!
//! # fn main() -> gamewire::error::Result<()> {
//! let session = Arc::new(Session::new(1024));
//! session.establish(CipherKey::new([7, 7, 7, 7]))?;
//!
//! let mut packet = session.new_writer();
//! packet.add_string("ping")?;
//! let frame = session.seal(packet)?;
//!
//! let mut inbound = session.open(&frame)?;
//! assert_eq!(inbound.get_u16()?, 6);
//! assert_eq!(inbound.get_string()?, "ping");
//! # Ok(())
//! # }
//! ```

use std::sync::OnceLock;

use tracing::{debug, instrument, warn};

use crate::config::{PacketConfig, DEFAULT_CAPACITY};
use crate::core::packet::PacketBuffer;
use crate::error::{ProtocolError, Result};
use crate::utils::crypto::CipherKey;
use crate::utils::metrics::{global_metrics, Timer};

/// Anything that can hand out the cipher key of a session.
pub trait KeyProvider {
    fn cipher_key(&self) -> Result<&CipherKey>;
}

impl KeyProvider for CipherKey {
    fn cipher_key(&self) -> Result<&CipherKey> {
        Ok(self)
    }
}

/// Per-connection state shared by all packet buffers of that connection.
#[derive(Debug)]
pub struct Session {
    key: OnceLock<CipherKey>,
    capacity: usize,
}

impl Session {
    /// Creates a session whose key is not known yet.
    pub fn new(capacity: usize) -> Self {
        Self {
            key: OnceLock::new(),
            capacity,
        }
    }

    /// Creates a session with its key already established.
    pub fn with_key(key: CipherKey, capacity: usize) -> Self {
        let session = Self::new(capacity);
        // A fresh cell cannot already be set.
        let _ = session.key.set(key);
        session
    }

    pub fn from_config(config: &PacketConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Stores the key negotiated by the handshake.
    ///
    /// # Errors
    /// `KeyAlreadyEstablished` on any call after the first.
    pub fn establish(&self, key: CipherKey) -> Result<()> {
        self.key.set(key).map_err(|_| {
            warn!("Attempted to replace an established session key");
            ProtocolError::KeyAlreadyEstablished
        })?;
        debug!("Session key established");
        Ok(())
    }

    pub fn is_established(&self) -> bool {
        self.key.get().is_some()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A write-mode buffer sized for this session.
    pub fn new_writer(&self) -> PacketBuffer {
        PacketBuffer::new_writer(self.capacity)
    }

    /// Finalises `packet` under the session key and returns the frame bytes.
    #[instrument(level = "debug", skip(self, packet), fields(payload = packet.len()))]
    pub fn seal(&self, mut packet: PacketBuffer) -> Result<Vec<u8>> {
        let _timer = Timer::start("seal_frame");
        let metrics = global_metrics();

        if let Err(e) = packet.prepare_to_send_with(self) {
            if matches!(e, ProtocolError::CipherFailure(_)) {
                metrics.cipher_failure();
            }
            return Err(e);
        }

        let frame = packet.snapshot();
        metrics.frame_sealed(frame.len() as u64);
        Ok(frame)
    }

    /// Validates and decrypts a received frame.
    ///
    /// The checksum is verified before decryption. On success the returned
    /// buffer's cursor sits on the payload length field.
    #[instrument(level = "debug", skip(self, frame), fields(frame_len = frame.len()))]
    pub fn open(&self, frame: &[u8]) -> Result<PacketBuffer> {
        let _timer = Timer::start("open_frame");
        let metrics = global_metrics();
        let key = self.cipher_key()?;

        let mut packet = PacketBuffer::new_reader(frame);
        if let Err(e) = packet.verify_checksum() {
            metrics.checksum_failure();
            return Err(e);
        }
        if let Err(e) = packet.prepare_to_read(key) {
            metrics.cipher_failure();
            return Err(e);
        }

        metrics.frame_opened(frame.len() as u64);
        Ok(packet)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl KeyProvider for Session {
    fn cipher_key(&self) -> Result<&CipherKey> {
        self.key.get().ok_or(ProtocolError::KeyNotEstablished)
    }
}
