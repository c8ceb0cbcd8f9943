#![no_main]

use bytes::BytesMut;
use gamewire::FrameCodec;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Split an arbitrary byte stream into frames until the codec stalls or rejects it
    let mut codec = FrameCodec::with_max_frame_size(1024);
    let mut buffer = BytesMut::from(data);
    while let Ok(Some(frame)) = codec.decode(&mut buffer) {
        assert!(frame.len() >= 8);
        assert!(frame.len() <= 1024);
    }
});
