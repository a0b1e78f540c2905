#![no_main]

use bytes::Bytes;
use fountain::{BLOCK_HEADER_LEN, CodecConfig, StreamDecoder, encode_bytes};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<u8>| {
    let config = CodecConfig::new(2.05, 16, 256).unwrap();
    let wire_len = BLOCK_HEADER_LEN + config.block_size();
    let stream = b"fuzzing the peeling decoder with hostile input";
    let genuine = encode_bytes(config, stream).unwrap();

    let mut output = Vec::new();
    let mut decoder =
        StreamDecoder::new(config, stream.len() as u64, |out: Bytes| output.push(out)).unwrap();

    // Arbitrary bytes as blocks, both exact-length and ragged
    for block in data.chunks(wire_len) {
        let _ = decoder.decode_block(block);
    }
    let rejected = decoder.blocks_rejected();

    // Genuine blocks still rebuild the stream afterwards
    for block in &genuine {
        let _ = decoder.decode_block(block);
    }
    assert!(decoder.is_complete());
    assert!(decoder.blocks_rejected() >= rejected);
    drop(decoder);

    // Exactly one emission, and it is correct
    assert_eq!(output.len(), 1);
    assert_eq!(&output[0][..], &stream[..]);
});
