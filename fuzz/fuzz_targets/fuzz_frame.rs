#![no_main]

use gamewire::{CipherKey, PacketBuffer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Open arbitrary bytes as an inbound frame - test for panics and out-of-bounds reads
    let key = CipherKey::new([0x0123_4567, 0x89AB_CDEF, 0xFEDC_BA98, 0x7654_3210]);
    let mut packet = PacketBuffer::new_reader(data);
    let _ = packet.check_checksum();
    let _ = packet.verify_checksum();

    if packet.prepare_to_read(&key).is_ok() {
        let _ = packet.get_u16();
        while packet.remaining() > 0 {
            if packet.get_string().is_err() && packet.get_byte().is_err() {
                break;
            }
        }
    }
});
