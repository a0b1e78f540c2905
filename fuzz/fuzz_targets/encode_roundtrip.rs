#![no_main]

use bytes::Bytes;
use fountain::{CodecConfig, StreamEncoder, decode_blocks, encode_bytes};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<u8>| {
    // Test with various codec configurations
    let configs = vec![
        // Tiny blocks, narrow window
        CodecConfig::new(1.5, 4, 16).unwrap(),
        // Default config
        CodecConfig::default(),
        // Large blocks, high redundancy
        CodecConfig::new(3.0, 512, 8192).unwrap(),
    ];

    for config in configs {
        let blocks = encode_bytes(config, &data).unwrap();

        // Verify: every block has the fixed wire length
        for block in &blocks {
            assert_eq!(block.len(), config.wire_block_len());
        }

        // Verify: split points do not change the output
        let step = (data.first().copied().unwrap_or(1) as usize).max(1);
        let mut chunked = Vec::new();
        let mut encoder = StreamEncoder::new(config, |b: Bytes| chunked.push(b)).unwrap();
        encoder.set_size(data.len() as i64);
        for piece in data.chunks(step) {
            encoder.encode_block(piece);
        }
        encoder.flush().unwrap();
        drop(encoder);
        assert_eq!(chunked, blocks);

        // Verify: round trip
        let decoded = decode_blocks(config, data.len() as u64, &blocks).unwrap();
        assert_eq!(&decoded[..], &data[..]);
    }
});
