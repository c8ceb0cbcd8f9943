//! Stream framing for the transport layer.
//!
//! `FrameCodec` splits a byte stream into whole frames using the 2-byte
//! length prefix and hands each one out as a read-mode [`PacketBuffer`].
//! It neither verifies checksums nor decrypts; that is the session's job.
//!
//! The default lower bound is the 8-byte header. Streams that only carry
//! encrypted frames should raise it to [`MIN_ENCRYPTED_FRAME_SIZE`] with
//! [`FrameCodec::with_min_frame_size`], so runt frames fail here instead of in
//! `Session::open`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

use crate::config::{
    PacketConfig, DEFAULT_CAPACITY, LENGTH_FIELD_SIZE, MIN_ENCRYPTED_FRAME_SIZE, MIN_FRAME_SIZE,
};
use crate::core::packet::PacketBuffer;
use crate::error::{ProtocolError, Result};
use crate::utils::metrics::global_metrics;

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    min_frame_size: usize,
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_CAPACITY)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            min_frame_size: MIN_FRAME_SIZE,
            max_frame_size,
        }
    }

    /// Raises the smallest accepted frame, e.g. to `MIN_ENCRYPTED_FRAME_SIZE`.
    /// Values below the 8-byte header are clamped up to it.
    pub fn with_min_frame_size(mut self, min_frame_size: usize) -> Self {
        self.min_frame_size = min_frame_size.max(MIN_FRAME_SIZE);
        self
    }

    /// Codec for streams that only carry encrypted frames.
    pub fn encrypted(max_frame_size: usize) -> Self {
        Self::with_max_frame_size(max_frame_size).with_min_frame_size(MIN_ENCRYPTED_FRAME_SIZE)
    }

    pub fn from_config(config: &PacketConfig) -> Self {
        Self::with_max_frame_size(config.max_frame_size)
    }

    pub fn min_frame_size(&self) -> usize {
        self.min_frame_size
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = PacketBuffer;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        let declared = usize::from(u16::from_le_bytes([src[0], src[1]]));
        let total = declared + LENGTH_FIELD_SIZE;

        if total < self.min_frame_size {
            warn!(declared, min = self.min_frame_size, "Frame shorter than the minimum");
            return Err(ProtocolError::InvalidHeader);
        }
        if total > self.max_frame_size {
            warn!(total, max = self.max_frame_size, "Frame exceeds size limit");
            return Err(ProtocolError::OversizedPacket(total));
        }

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = PacketBuffer::new_reader(&src[..total]);
        src.advance(total);
        global_metrics().frame_decoded();
        trace!(total, "Frame split from stream");
        Ok(Some(frame))
    }
}

impl Encoder<PacketBuffer> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: PacketBuffer, dst: &mut BytesMut) -> Result<()> {
        if item.len() > self.max_frame_size {
            return Err(ProtocolError::OversizedPacket(item.len()));
        }
        dst.extend_from_slice(item.as_slice());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn test_waits_for_length_prefix() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x0C][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_waits_for_full_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x0C, 0x00, 1, 2, 3][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&[0u8; 9]);
        let frame = codec.decode(&mut buf).unwrap().expect("complete frame");
        assert_eq!(frame.len(), 14);
        assert_eq!(frame.position(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_splits_back_to_back_frames() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x06, 0x00, 1, 1, 1, 1, 1, 1]);
        buf.extend_from_slice(&[0x07, 0x00, 2, 2, 2, 2, 2, 2, 2]);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.as_slice()[2..], [1; 6]);
        assert_eq!(second.as_slice()[2..], [2; 7]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_rejects_runt_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x03, 0x00, 1, 2, 3][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::InvalidHeader)
        ));
    }

    #[test]
    fn test_encrypted_codec_rejects_headers_without_a_block() {
        let frame = [0x0A, 0x00, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        let mut plain = FrameCodec::new();
        let mut buf = BytesMut::from(&frame[..]);
        assert_eq!(plain.decode(&mut buf).unwrap().unwrap().len(), 12);

        let mut encrypted = FrameCodec::encrypted(DEFAULT_CAPACITY);
        assert_eq!(encrypted.min_frame_size(), MIN_ENCRYPTED_FRAME_SIZE);
        let mut buf = BytesMut::from(&frame[..]);
        assert!(matches!(
            encrypted.decode(&mut buf),
            Err(ProtocolError::InvalidHeader)
        ));

        let mut buf = BytesMut::from(&[0x0C, 0x00][..]);
        buf.extend_from_slice(&[0u8; 12]);
        assert_eq!(encrypted.decode(&mut buf).unwrap().unwrap().len(), 14);
    }

    #[test]
    fn test_min_frame_size_never_below_header() {
        let codec = FrameCodec::new().with_min_frame_size(2);
        assert_eq!(codec.min_frame_size(), MIN_FRAME_SIZE);
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let mut codec = FrameCodec::with_max_frame_size(64);
        let mut buf = BytesMut::from(&[0xFF, 0x00][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ProtocolError::OversizedPacket(257))
        ));
    }

    #[test]
    fn test_encode_writes_logical_bytes() {
        let mut codec = FrameCodec::new();
        let mut packet = PacketBuffer::new_unencrypted_writer(32);
        packet.add_bytes(&[9, 8, 7]).unwrap();

        let mut dst = BytesMut::new();
        codec.encode(packet, &mut dst).unwrap();
        assert_eq!(&dst[..], &[9, 8, 7]);
    }

    #[test]
    fn test_encode_rejects_oversized() {
        let mut codec = FrameCodec::with_max_frame_size(16);
        let mut packet = PacketBuffer::new_writer(64);
        packet.add_padding(20).unwrap();

        let mut dst = BytesMut::new();
        assert!(matches!(
            codec.encode(packet, &mut dst),
            Err(ProtocolError::OversizedPacket(28))
        ));
        assert!(dst.is_empty());
    }
}
