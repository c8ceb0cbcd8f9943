//! # Packet Buffer
//!
//! A fixed-capacity byte buffer with a cursor, used to build exactly one
//! outbound frame or to parse exactly one inbound frame.
//!
//! ## Wire Format
//! ```text
//! offset 0      2            6               8
//!        [len:2][adler32:4] [payload_len:2] [payload ...]
//!                           |<------- XTEA, padded to 8 ------->|
//! ```
//! All integers are little-endian. `len` counts everything after itself.
//!
//! ## Bounds
//! Writes fail with `CapacityExceeded` when `cursor + n` passes the
//! capacity; reads and peeks fail with `DataShortage` when `cursor + n`
//! passes the logical length. A failed call changes nothing.
//!
//! ## Example
//! ```rust
//! use gamewire::core::packet::PacketBuffer;
//! use gamewire::utils::crypto::CipherKey;
//!
//! # fn main() -> gamewire::error::Result<()> {
//! let key = CipherKey::new([1, 2, 3, 4]);
//!
//! let mut out = PacketBuffer::new_writer(64);
//! out.add_byte(0x0A)?;
//! out.add_string("hello")?;
//! out.prepare_to_send(&key)?;
//!
//! let mut inbound = PacketBuffer::new_reader(out.as_slice());
//! inbound.verify_checksum()?;
//! inbound.prepare_to_read(&key)?;
//! assert_eq!(inbound.get_u16()?, 8); // payload length
//! assert_eq!(inbound.get_byte()?, 0x0A);
//! assert_eq!(inbound.get_string()?, "hello");
//! # Ok(())
//! # }
//! ```

use crate::config::{CHECKSUM_OFFSET, DEFAULT_CAPACITY, HEADER_SIZE, PAYLOAD_LENGTH_OFFSET};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::session::KeyProvider;
use crate::utils::checksum::adler32;
use crate::utils::crypto::{self, CipherKey};
use tracing::{debug, trace, warn};

/// One frame's worth of bytes plus a read/write cursor.
#[derive(Clone, PartialEq, Eq)]
pub struct PacketBuffer {
    storage: Box<[u8]>,
    cursor: usize,
    length: usize,
}

impl PacketBuffer {
    /// Creates an empty buffer for building an encrypted frame.
    ///
    /// Cursor and length start at 8, past the header. A capacity smaller than
    /// the header is raised to the header size.
    pub fn new_writer(capacity: usize) -> Self {
        let capacity = capacity.max(HEADER_SIZE);
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            cursor: HEADER_SIZE,
            length: HEADER_SIZE,
        }
    }

    /// Creates an empty buffer with no header reservation, for frames sent
    /// in the clear.
    pub fn new_unencrypted_writer(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
            length: 0,
        }
    }

    /// Wraps a received frame for parsing. Capacity equals `bytes.len()`.
    pub fn new_reader(bytes: &[u8]) -> Self {
        Self {
            storage: bytes.to_vec().into_boxed_slice(),
            cursor: 0,
            length: bytes.len(),
        }
    }

    /// Copies a received frame into a buffer of `capacity` bytes.
    ///
    /// # Errors
    /// `CapacityExceeded` if `bytes` does not fit.
    pub fn new_reader_with_capacity(capacity: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() > capacity {
            return Err(ProtocolError::CapacityExceeded {
                offset: 0,
                requested: bytes.len(),
                capacity,
            });
        }
        let mut storage = vec![0u8; capacity].into_boxed_slice();
        storage[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            storage,
            cursor: 0,
            length: bytes.len(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Logical length: valid bytes counted from offset 0.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Bytes left to read before the logical length.
    pub fn remaining(&self) -> usize {
        self.length.saturating_sub(self.cursor)
    }

    /// Borrows the logical bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.length]
    }

    /// Owned copy of exactly `len()` bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    fn ensure_readable(&self, count: usize) -> Result<()> {
        match self.cursor.checked_add(count) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(ProtocolError::DataShortage {
                offset: self.cursor,
                requested: count,
                available: self.remaining(),
            }),
        }
    }

    fn ensure_writable(&self, count: usize) -> Result<()> {
        match self.cursor.checked_add(count) {
            Some(end) if end <= self.capacity() => Ok(()),
            _ => Err(ProtocolError::CapacityExceeded {
                offset: self.cursor,
                requested: count,
                capacity: self.capacity(),
            }),
        }
    }

    fn peek_array<const N: usize>(&self) -> Result<[u8; N]> {
        self.ensure_readable(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.storage[self.cursor..self.cursor + N]);
        Ok(out)
    }

    fn advance(&mut self, count: usize) {
        self.cursor += count;
        if self.cursor > self.length {
            self.length = self.cursor;
        }
    }

    // ---- reads ----

    pub fn get_byte(&mut self) -> Result<u8> {
        let value = self.peek_byte()?;
        self.cursor += 1;
        Ok(value)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        let value = self.peek_u16()?;
        self.cursor += 2;
        Ok(value)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let value = self.peek_u32()?;
        self.cursor += 4;
        Ok(value)
    }

    pub fn get_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let value = self.peek_bytes(count)?;
        self.cursor += count;
        Ok(value)
    }

    /// Reads a u16 character count followed by that many Latin-1 characters.
    pub fn get_string(&mut self) -> Result<String> {
        let (value, consumed) = self.decode_string()?;
        self.cursor += consumed;
        Ok(value)
    }

    // ---- peeks ----

    pub fn peek_byte(&self) -> Result<u8> {
        Ok(self.peek_array::<1>()?[0])
    }

    pub fn peek_u16(&self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.peek_array()?))
    }

    pub fn peek_u32(&self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.peek_array()?))
    }

    pub fn peek_bytes(&self, count: usize) -> Result<Vec<u8>> {
        self.ensure_readable(count)?;
        Ok(self.storage[self.cursor..self.cursor + count].to_vec())
    }

    pub fn peek_string(&self) -> Result<String> {
        self.decode_string().map(|(value, _)| value)
    }

    fn decode_string(&self) -> Result<(String, usize)> {
        let count = usize::from(self.peek_u16()?);
        let total = 2 + count;
        self.ensure_readable(total)?;
        let start = self.cursor + 2;
        let value = self.storage[start..start + count]
            .iter()
            .map(|&byte| char::from(byte))
            .collect();
        Ok((value, total))
    }

    // ---- writes ----

    pub fn add_byte(&mut self, value: u8) -> Result<()> {
        self.add_bytes(&[value])
    }

    pub fn add_u16(&mut self, value: u16) -> Result<()> {
        self.add_bytes(&value.to_le_bytes())
    }

    pub fn add_u32(&mut self, value: u32) -> Result<()> {
        self.add_bytes(&value.to_le_bytes())
    }

    pub fn add_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.ensure_writable(value.len())?;
        self.storage[self.cursor..self.cursor + value.len()].copy_from_slice(value);
        self.advance(value.len());
        Ok(())
    }

    /// Writes a u16 character count followed by one Latin-1 byte per char.
    ///
    /// # Errors
    /// `InvalidString` for a char above U+00FF, `CapacityExceeded` for more
    /// than 65535 chars or when prefix plus body does not fit.
    pub fn add_string(&mut self, value: &str) -> Result<()> {
        let encoded = value
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| {
                    ProtocolError::InvalidString(format!(
                        "character {c:?} has no single-byte encoding"
                    ))
                })
            })
            .collect::<Result<Vec<u8>>>()?;

        let count = u16::try_from(encoded.len()).map_err(|_| ProtocolError::CapacityExceeded {
            offset: self.cursor,
            requested: 2 + encoded.len(),
            capacity: self.capacity(),
        })?;

        self.ensure_writable(2 + encoded.len())?;
        self.add_u16(count)?;
        self.add_bytes(&encoded)
    }

    /// Moves the cursor forward without writing.
    pub fn add_padding(&mut self, count: usize) -> Result<()> {
        self.ensure_writable(count)?;
        self.advance(count);
        Ok(())
    }

    /// Overwrites bytes at an absolute index without moving the cursor.
    ///
    /// Only writes when `len() - index >= value.len()`. Otherwise the call
    /// does nothing and reports nothing; callers that need to know must check
    /// `len()` themselves.
    pub fn replace_bytes(&mut self, index: usize, value: &[u8]) {
        match self.length.checked_sub(index) {
            Some(room) if room >= value.len() => {
                self.storage[index..index + value.len()].copy_from_slice(value);
            }
            _ => trace!(
                index,
                count = value.len(),
                length = self.length,
                "replace_bytes outside logical length ignored"
            ),
        }
    }

    /// Rewinds cursor and length to just past the header.
    pub fn reset(&mut self) {
        let start = HEADER_SIZE.min(self.capacity());
        self.cursor = start;
        self.length = start;
    }

    // ---- framing ----

    fn write_u16_at(&mut self, index: usize, value: usize) -> Result<()> {
        let value = u16::try_from(value).map_err(|_| ProtocolError::OversizedPacket(self.length))?;
        self.storage[index..index + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Writes `len() - 2` into the frame length field at offset 0.
    pub fn insert_header(&mut self) -> Result<()> {
        if self.length < 2 {
            return Err(ProtocolError::InvalidHeader);
        }
        self.write_u16_at(0, self.length - 2)
    }

    /// Writes `len() - 8` into the logical payload length field at offset 6.
    pub fn insert_payload_length(&mut self) -> Result<()> {
        if self.length < HEADER_SIZE {
            return Err(ProtocolError::InvalidHeader);
        }
        self.write_u16_at(PAYLOAD_LENGTH_OFFSET, self.length - HEADER_SIZE)
    }

    // ---- integrity ----

    fn stored_checksum(&self) -> Option<u32> {
        let bytes = self.storage.get(CHECKSUM_OFFSET..PAYLOAD_LENGTH_OFFSET)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn computed_checksum(&self) -> Option<u32> {
        self.storage
            .get(PAYLOAD_LENGTH_OFFSET..self.length)
            .map(adler32)
    }

    /// Writes the Adler-32 of `[6, len())` at offset 2.
    pub fn add_checksum(&mut self) -> Result<()> {
        let checksum = self
            .computed_checksum()
            .ok_or(ProtocolError::InvalidHeader)?;
        self.storage[CHECKSUM_OFFSET..PAYLOAD_LENGTH_OFFSET].copy_from_slice(&checksum.to_le_bytes());
        Ok(())
    }

    /// True when the stored checksum matches the bytes. Never mutates.
    pub fn check_checksum(&self) -> bool {
        match (self.stored_checksum(), self.computed_checksum()) {
            (Some(stored), Some(computed)) => stored == computed,
            _ => false,
        }
    }

    /// Like [`check_checksum`](Self::check_checksum) but reports both values.
    pub fn verify_checksum(&self) -> Result<()> {
        let stored = self.stored_checksum().ok_or(ProtocolError::InvalidHeader)?;
        let computed = self
            .computed_checksum()
            .ok_or(ProtocolError::InvalidHeader)?;
        if stored != computed {
            warn!(stored, computed, length = self.length, "Frame checksum mismatch");
            return Err(ProtocolError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }

    // ---- cipher ----

    /// Encrypts `[6, len())`, padding the length to a block boundary.
    pub fn encrypt(&mut self, key: &CipherKey) -> Result<()> {
        crypto::encrypt(&mut self.storage, &mut self.length, PAYLOAD_LENGTH_OFFSET, key)
    }

    /// Decrypts `[6, len())` in place.
    pub fn decrypt(&mut self, key: &CipherKey) -> Result<()> {
        crypto::decrypt(&mut self.storage, self.length, PAYLOAD_LENGTH_OFFSET, key)
    }

    fn check_sendable(&self) -> Result<()> {
        if self.length < HEADER_SIZE {
            return Err(ProtocolError::CipherFailure(
                constants::ERR_EMPTY_CIPHER_REGION.to_string(),
            ));
        }
        if crypto::padded_len(PAYLOAD_LENGTH_OFFSET, self.length) > self.capacity() {
            return Err(ProtocolError::CipherFailure(
                constants::ERR_PADDING_OVERFLOW.to_string(),
            ));
        }
        Ok(())
    }

    fn seal_region(&mut self, key: &CipherKey) -> Result<()> {
        self.encrypt(key)?;
        self.add_checksum()?;
        self.insert_header()
    }

    /// Finalises an outbound frame under `key`.
    ///
    /// Writes the payload length, encrypts `[6, len())` (padding the length to
    /// whole blocks), stores the checksum of the ciphertext and the frame
    /// length. The buffer is untouched if the region is empty or its padded
    /// size would not fit the capacity.
    pub fn prepare_to_send(&mut self, key: &CipherKey) -> Result<()> {
        self.check_sendable()?;

        let payload_length = self.length - HEADER_SIZE;
        self.insert_payload_length()?;
        self.seal_region(key)?;

        debug!(payload_length, frame_length = self.length, "Frame prepared for send");
        Ok(())
    }

    /// Like [`prepare_to_send`](Self::prepare_to_send) but keeps whatever the
    /// caller stored at offset 6.
    ///
    /// Used for one segment of a message split across several frames, where
    /// the payload length describes the whole message rather than this
    /// segment.
    pub fn prepare_segment_to_send(&mut self, key: &CipherKey) -> Result<()> {
        self.check_sendable()?;
        self.seal_region(key)?;

        debug!(frame_length = self.length, "Segment prepared for send");
        Ok(())
    }

    /// Opens an inbound frame under `key`.
    ///
    /// Decrypts `[6, len())` and leaves the cursor at offset 6, on the payload
    /// length field. When that field fits inside the frame the length is
    /// trimmed to `8 + payload length`, hiding the cipher padding. A larger
    /// value is left alone: it belongs to a message split across segments.
    ///
    /// # Errors
    /// `CipherFailure` when the region is empty or misaligned; the buffer is
    /// untouched.
    pub fn prepare_to_read(&mut self, key: &CipherKey) -> Result<()> {
        if let Err(e) = self.decrypt(key) {
            warn!(length = self.length, error = %e, "Frame decryption rejected");
            return Err(e);
        }

        let payload_length = usize::from(u16::from_le_bytes([
            self.storage[PAYLOAD_LENGTH_OFFSET],
            self.storage[PAYLOAD_LENGTH_OFFSET + 1],
        ]));
        let end = HEADER_SIZE + payload_length;
        if end <= self.length {
            self.length = end;
        } else {
            trace!(
                payload_length,
                frame_length = self.length,
                "Payload length spans past this segment"
            );
        }

        self.cursor = PAYLOAD_LENGTH_OFFSET;
        debug!(payload_length, "Frame opened");
        Ok(())
    }

    /// [`prepare_to_send`](Self::prepare_to_send) with the provider's key.
    pub fn prepare_to_send_with<P>(&mut self, provider: &P) -> Result<()>
    where
        P: KeyProvider + ?Sized,
    {
        self.prepare_to_send(provider.cipher_key()?)
    }

    /// [`prepare_to_read`](Self::prepare_to_read) with the provider's key.
    pub fn prepare_to_read_with<P>(&mut self, provider: &P) -> Result<()>
    where
        P: KeyProvider + ?Sized,
    {
        self.prepare_to_read(provider.cipher_key()?)
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new_writer(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for PacketBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketBuffer")
            .field("capacity", &self.capacity())
            .field("cursor", &self.cursor)
            .field("length", &self.length)
            .finish()
    }
}
