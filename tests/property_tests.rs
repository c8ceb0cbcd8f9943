//! Property-based tests using proptest
//!
//! These tests validate buffer, cipher and checksum invariants across a wide
//! range of randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gamewire::error::ProtocolError;
use gamewire::utils::checksum::{adler32, Adler32};
use gamewire::utils::crypto::{self, CipherKey, BLOCK_SIZE};
use gamewire::PacketBuffer;
use proptest::prelude::*;

fn any_key() -> impl Strategy<Value = CipherKey> {
    any::<[u32; 4]>().prop_map(CipherKey::new)
}

fn latin1_string(max: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 0..max)
        .prop_map(|bytes| bytes.into_iter().map(char::from).collect())
}

#[derive(Debug, Clone)]
enum Field {
    Byte(u8),
    U16(u16),
    U32(u32),
    Bytes(Vec<u8>),
    Text(String),
}

fn any_field() -> impl Strategy<Value = Field> {
    prop_oneof![
        any::<u8>().prop_map(Field::Byte),
        any::<u16>().prop_map(Field::U16),
        any::<u32>().prop_map(Field::U32),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Field::Bytes),
        latin1_string(64).prop_map(Field::Text),
    ]
}

fn write_field(packet: &mut PacketBuffer, field: &Field) {
    match field {
        Field::Byte(v) => packet.add_byte(*v).unwrap(),
        Field::U16(v) => packet.add_u16(*v).unwrap(),
        Field::U32(v) => packet.add_u32(*v).unwrap(),
        Field::Bytes(v) => packet.add_bytes(v).unwrap(),
        Field::Text(v) => packet.add_string(v).unwrap(),
    }
}

fn check_field(packet: &mut PacketBuffer, field: &Field) -> Result<(), TestCaseError> {
    match field {
        Field::Byte(v) => prop_assert_eq!(packet.get_byte().unwrap(), *v),
        Field::U16(v) => prop_assert_eq!(packet.get_u16().unwrap(), *v),
        Field::U32(v) => prop_assert_eq!(packet.get_u32().unwrap(), *v),
        Field::Bytes(v) => prop_assert_eq!(&packet.get_bytes(v.len()).unwrap(), v),
        Field::Text(v) => prop_assert_eq!(&packet.get_string().unwrap(), v),
    }
    Ok(())
}

// Property: every field written is read back in order, in the clear
proptest! {
    #[test]
    fn prop_fields_roundtrip_unencrypted(fields in prop::collection::vec(any_field(), 0..32)) {
        let mut out = PacketBuffer::new_unencrypted_writer(4096);
        for field in &fields {
            write_field(&mut out, field);
        }

        let mut inbound = PacketBuffer::new_reader(out.as_slice());
        for field in &fields {
            check_field(&mut inbound, field)?;
        }
        prop_assert_eq!(inbound.remaining(), 0);
    }
}

// Property: sealing then opening under the same key restores every field
proptest! {
    #[test]
    fn prop_fields_roundtrip_encrypted(
        key in any_key(),
        fields in prop::collection::vec(any_field(), 0..32),
    ) {
        let mut out = PacketBuffer::new_writer(4096);
        for field in &fields {
            write_field(&mut out, field);
        }
        let payload_length = out.len() - 8;
        out.prepare_to_send(&key).unwrap();

        prop_assert_eq!((out.len() - 6) % BLOCK_SIZE, 0);
        prop_assert_eq!(
            usize::from(u16::from_le_bytes([out.as_slice()[0], out.as_slice()[1]])),
            out.len() - 2
        );

        let mut inbound = PacketBuffer::new_reader(out.as_slice());
        prop_assert!(inbound.check_checksum());
        inbound.prepare_to_read(&key).unwrap();
        prop_assert_eq!(usize::from(inbound.get_u16().unwrap()), payload_length);
        for field in &fields {
            check_field(&mut inbound, field)?;
        }
        prop_assert_eq!(inbound.remaining(), 0);
    }
}

// Property: decrypt inverts encrypt on any block-aligned region
proptest! {
    #[test]
    fn prop_cipher_inverts(
        key in any_key(),
        blocks in prop::collection::vec(any::<[u8; 8]>(), 1..64),
    ) {
        let plain: Vec<u8> = blocks.concat();
        let mut buffer = plain.clone();
        let mut length = buffer.len();

        crypto::encrypt(&mut buffer, &mut length, 0, &key).unwrap();
        prop_assert_eq!(length, plain.len());
        crypto::decrypt(&mut buffer, length, 0, &key).unwrap();
        prop_assert_eq!(buffer, plain);
    }
}

// Property: incremental Adler-32 matches the one-shot function for any split
proptest! {
    #[test]
    fn prop_checksum_split_invariant(
        data in prop::collection::vec(any::<u8>(), 0..20_000),
        split in any::<prop::sample::Index>(),
    ) {
        let at = split.index(data.len() + 1);
        let mut hasher = Adler32::new();
        hasher.update(&data[..at]);
        hasher.update(&data[at..]);
        prop_assert_eq!(hasher.finish(), adler32(&data));
    }
}

// Property: reads never go past the logical length and never move the cursor on failure
proptest! {
    #[test]
    fn prop_read_past_length_is_shortage(
        data in prop::collection::vec(any::<u8>(), 0..64),
        extra in 1usize..64,
    ) {
        let mut inbound = PacketBuffer::new_reader(&data);
        let result = inbound.get_bytes(data.len() + extra);
        let is_shortage = matches!(result, Err(ProtocolError::DataShortage { .. }));
        prop_assert!(is_shortage);
        prop_assert_eq!(inbound.position(), 0);
        prop_assert_eq!(inbound.get_bytes(data.len()).unwrap(), data);
    }
}

// Property: writes never pass the capacity and leave the buffer unchanged on failure
proptest! {
    #[test]
    fn prop_write_past_capacity_is_rejected(
        capacity in 8usize..128,
        fill in prop::collection::vec(any::<u8>(), 0..200),
    ) {
        let mut out = PacketBuffer::new_writer(capacity);
        let before = out.clone();
        let result = out.add_bytes(&fill);

        if 8 + fill.len() <= capacity {
            prop_assert!(result.is_ok());
            prop_assert_eq!(out.len(), 8 + fill.len());
        } else {
            let is_capacity = matches!(result, Err(ProtocolError::CapacityExceeded { .. }));
            prop_assert!(is_capacity);
            prop_assert_eq!(out, before);
        }
    }
}

// Property: any single byte flip in the covered region breaks the checksum
proptest! {
    #[test]
    fn prop_byte_flip_detected(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let mut out = PacketBuffer::new_writer(512);
        out.add_bytes(&payload).unwrap();
        out.prepare_to_send(&CipherKey::new([9, 8, 7, 6])).unwrap();

        let mut wire = out.snapshot();
        let at = 6 + position.index(wire.len() - 6);
        wire[at] ^= mask;
        prop_assert!(!PacketBuffer::new_reader(&wire).check_checksum());
    }
}

// Property: arbitrary input never panics the open path
proptest! {
    #[test]
    fn prop_open_arbitrary_bytes(
        key in any_key(),
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let mut inbound = PacketBuffer::new_reader(&data);
        let _ = inbound.check_checksum();
        let aligned = data.len() > 6 && (data.len() - 6) % BLOCK_SIZE == 0;
        let opened = inbound.prepare_to_read(&key).is_ok();
        prop_assert_eq!(opened, aligned);
        if opened {
            prop_assert_eq!(inbound.position(), 6);
            prop_assert!(inbound.len() <= data.len());
            prop_assert!(inbound.len() >= 8);
        }
    }
}

// Property: whatever the sender stores at offset 6 is what the receiver reads first
proptest! {
    #[test]
    fn prop_segment_payload_length_survives(
        key in any_key(),
        payload in prop::collection::vec(any::<u8>(), 0..128),
        declared in any::<u16>(),
    ) {
        let mut out = PacketBuffer::new_writer(256);
        out.add_bytes(&payload).unwrap();
        out.replace_bytes(6, &declared.to_le_bytes());
        out.prepare_segment_to_send(&key).unwrap();

        let mut inbound = PacketBuffer::new_reader(out.as_slice());
        prop_assert!(inbound.check_checksum());
        inbound.prepare_to_read(&key).unwrap();
        prop_assert_eq!(inbound.get_u16().unwrap(), declared);

        let visible = usize::from(declared).min(payload.len());
        prop_assert_eq!(inbound.get_bytes(visible).unwrap(), payload[..visible].to_vec());
    }
}
