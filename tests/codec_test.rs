// Integration tests for the streaming encoder and decoder
// Tests cover: block counts, size errors, chunked input, round-trips, loss tolerance, corruption, idempotence

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;
use fountain::{
    BLOCK_HEADER_LEN, CodecConfig, CodecError, DecodeStatus, EncodedBlock, StreamDecoder,
    StreamEncoder, decode_blocks, encode_bytes,
};

fn config() -> CodecConfig {
    CodecConfig::new(2.05, 64, 4096).unwrap()
}

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 131 % 256) as u8 ^ (i >> 8) as u8).collect()
}

/// Encodes `data` fed in `piece`-sized writes and returns the emitted blocks.
fn encode_in_pieces(data: &[u8], piece: usize) -> Vec<Bytes> {
    let mut blocks = Vec::new();
    let mut encoder = StreamEncoder::new(config(), |block: Bytes| blocks.push(block)).unwrap();
    encoder.set_size(data.len() as i64);
    for chunk in data.chunks(piece.max(1)) {
        encoder.encode_block(chunk);
    }
    encoder.flush().unwrap();
    drop(encoder);
    blocks
}

/// Shared sink so tests can inspect output while the decoder is alive.
#[derive(Clone, Default)]
struct Collected(Rc<RefCell<Vec<Bytes>>>);

impl Collected {
    fn sink(&self) -> impl FnMut(Bytes) {
        let inner = Rc::clone(&self.0);
        move |data| inner.borrow_mut().push(data)
    }

    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn first(&self) -> Option<Bytes> {
        self.0.borrow().first().cloned()
    }
}

// ============================================================================
// Block Counts
// ============================================================================

#[test]
fn test_zero_bytes_emits_two_or_three_blocks() {
    let mut count = 0;
    let mut encoder = StreamEncoder::new(config(), |_: Bytes| count += 1).unwrap();
    encoder.set_size(0);
    encoder.flush().expect("flush of empty stream should succeed");
    drop(encoder);

    assert!((2..=3).contains(&count), "got {} blocks", count);
}

#[test]
fn test_one_symbol_emits_two_or_three_blocks() {
    let blocks = encode_bytes(config(), &[0xAB; 32]).unwrap();
    assert!((2..=3).contains(&blocks.len()), "got {} blocks", blocks.len());
}

#[test]
fn test_two_symbols_emit_four_or_five_blocks() {
    let blocks = encode_bytes(config(), &[0xCD; 128]).unwrap();
    assert!((4..=5).contains(&blocks.len()), "got {} blocks", blocks.len());
}

#[test]
fn test_block_count_within_floor_and_ceil() {
    for factor in [1.1, 1.5, 2.05, 3.0, 4.75] {
        let config = config().with_storage_factor(factor);
        for len in [0usize, 1, 63, 64, 65, 500, 4096, 10_000] {
            let blocks = encode_bytes(config, &sample(len)).unwrap();
            let sources = len.div_ceil(64).max(1) as f64;
            let exact = sources * factor;
            assert!(
                blocks.len() as f64 >= exact.floor() && blocks.len() as f64 <= exact.ceil(),
                "len {} factor {}: {} blocks outside [{}, {}]",
                len,
                factor,
                blocks.len(),
                exact.floor(),
                exact.ceil()
            );
        }
    }
}

#[test]
fn test_every_block_has_fixed_wire_length() {
    let blocks = encode_bytes(config(), &sample(1000)).unwrap();
    for block in &blocks {
        assert_eq!(block.len(), BLOCK_HEADER_LEN + 64);
        assert_eq!(block.len(), config().wire_block_len());
    }
}

// ============================================================================
// Streaming Input
// ============================================================================

#[test]
fn test_chunked_input_matches_single_call() {
    let data = sample(2048);
    let whole = encode_in_pieces(&data, data.len());

    for piece in [1, 3, 7, 63, 64, 65, 100, 1000] {
        let chunked = encode_in_pieces(&data, piece);
        assert_eq!(chunked.len(), whole.len(), "piece size {}", piece);
        assert_eq!(chunked, whole, "piece size {}", piece);
    }
}

#[test]
fn test_blocks_emitted_before_flush() {
    let mut blocks = 0u64;
    let mut encoder = StreamEncoder::new(config(), |_: Bytes| blocks += 1).unwrap();
    encoder.set_size(64 * 100);
    encoder.encode_block(&sample(64 * 50));

    assert!(
        encoder.blocks_emitted() > 0,
        "full symbols should emit without waiting for flush"
    );
    encoder.encode_block(&sample(64 * 50));
    encoder.flush().unwrap();
    let emitted = encoder.blocks_emitted();
    drop(encoder);
    assert_eq!(blocks, emitted);
}

// ============================================================================
// Size Errors
// ============================================================================

#[test]
fn test_overflow_fails_flush() {
    let mut encoder = StreamEncoder::new(config(), |_: Bytes| {}).unwrap();
    encoder.set_size(10);
    encoder.encode_block(&[0u8; 20]);

    let err = encoder.flush().unwrap_err();
    assert!(matches!(
        err,
        CodecError::Overflow {
            declared: 10,
            received: 20
        }
    ));
    assert!(!encoder.is_finished());
}

#[test]
fn test_negative_size_fails_flush() {
    for fed in [0usize, 1, 64, 1000] {
        let mut encoder = StreamEncoder::new(config(), |_: Bytes| {}).unwrap();
        encoder.set_size(-1);
        encoder.encode_block(&sample(fed));
        assert!(
            matches!(
                encoder.flush(),
                Err(CodecError::InvalidSize { declared: Some(-1) })
            ),
            "fed {} bytes",
            fed
        );
    }
}

#[test]
fn test_underflow_fails_flush() {
    let mut encoder = StreamEncoder::new(config(), |_: Bytes| {}).unwrap();
    encoder.set_size(100);
    encoder.encode_block(&[1u8; 99]);
    assert!(matches!(
        encoder.flush(),
        Err(CodecError::Underflow {
            declared: 100,
            received: 99
        })
    ));
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(CodecConfig::new(1.0, 64, 4096).is_err());
    assert!(CodecConfig::new(f64::NAN, 64, 4096).is_err());
    assert!(CodecConfig::new(2.0, 0, 4096).is_err());
    assert!(CodecConfig::new(2.0, 64, 0).is_err());

    let bad = config().with_storage_factor(0.5);
    assert!(StreamEncoder::new(bad, |_: Bytes| {}).is_err());
    assert!(StreamDecoder::new(bad, 100, |_: Bytes| {}).is_err());
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_roundtrip_various_lengths() {
    for len in [0usize, 1, 32, 63, 64, 65, 127, 128, 129, 1000, 2048, 4097, 20_000] {
        let data = sample(len);
        let blocks = encode_bytes(config(), &data).unwrap();
        let decoded = decode_blocks(config(), len as u64, &blocks).unwrap();
        assert_eq!(decoded, data, "len {}", len);
    }
}

#[test]
fn test_roundtrip_other_configs() {
    let data = sample(5000);
    let configs = [
        CodecConfig::new(1.2, 16, 64).unwrap(),
        CodecConfig::new(3.0, 100, 1000).unwrap(),
        CodecConfig::new(2.05, 1, 8).unwrap(),
        CodecConfig::new(1.5, 4096, 10).unwrap(),
    ];
    for config in configs {
        let blocks = encode_bytes(config, &data).unwrap();
        assert_eq!(decode_blocks(config, 5000, &blocks).unwrap(), data);
    }
}

#[test]
fn test_roundtrip_shuffled_order() {
    let data = sample(3000);
    let mut blocks = encode_bytes(config(), &data).unwrap();

    // Deterministic interleave: odd indices first, then even, each reversed.
    let (odd, even): (Vec<_>, Vec<_>) = blocks
        .drain(..)
        .enumerate()
        .partition(|(i, _)| i % 2 == 1);
    let reordered: Vec<Bytes> = odd
        .into_iter()
        .rev()
        .chain(even.into_iter().rev())
        .map(|(_, b)| b)
        .collect();

    assert_eq!(decode_blocks(config(), 3000, &reordered).unwrap(), data);
}

#[test]
fn test_recovers_from_lost_blocks() {
    let data = sample(4000);
    let blocks = encode_bytes(config(), &data).unwrap();

    for stride in [3usize, 4, 5, 7] {
        let survivors = blocks.iter().enumerate().filter(|(i, _)| i % stride != stride - 1);
        let decoded = decode_blocks(config(), 4000, survivors.map(|(_, b)| b)).unwrap();
        assert_eq!(decoded, data, "stride {}", stride);
    }
}

// ============================================================================
// Loss Tolerance
// ============================================================================

/// Decodes with the blocks for which `lost` is true withheld.
fn decode_without(data: &[u8], blocks: &[Bytes], lost: impl Fn(usize) -> bool) -> Result<Bytes, CodecError> {
    let survivors = blocks.iter().enumerate().filter(|(i, _)| !lost(*i));
    decode_blocks(config(), data.len() as u64, survivors.map(|(_, b)| b))
}

/// Small deterministic generator for loss patterns.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn test_recovers_after_losing_the_tail() {
    let data = sample(2048);
    let blocks = encode_bytes(config(), &data).unwrap();
    assert_eq!(blocks.len(), 65);

    for lost in [1usize, 2, 4, 8, 16] {
        let decoded = decode_without(&data, &blocks, |i| i >= blocks.len() - lost);
        assert_eq!(decoded.unwrap(), data, "last {} blocks lost", lost);
    }
}

#[test]
fn test_recovers_from_every_short_burst() {
    let data = sample(2048);
    let blocks = encode_bytes(config(), &data).unwrap();
    for burst in 1..=8 {
        for start in 0..=blocks.len() - burst {
            let decoded = decode_without(&data, &blocks, |i| (start..start + burst).contains(&i));
            assert_eq!(decoded.unwrap(), data, "burst of {} at {}", burst, start);
        }
    }

    let data = sample(20000);
    let blocks = encode_bytes(config(), &data).unwrap();
    for start in 0..=blocks.len() - 32 {
        let decoded = decode_without(&data, &blocks, |i| (start..start + 32).contains(&i));
        assert_eq!(decoded.unwrap(), data, "burst of 32 at {}", start);
    }
}

#[test]
fn test_random_loss_rarely_stalls() {
    // (stream length, loss percent, tolerated failures out of 200)
    let cases = [(2048, 10, 2), (2048, 20, 15), (12800, 10, 2), (12800, 20, 4)];

    for (len, loss, tolerated) in cases {
        let data = sample(len);
        let blocks = encode_bytes(config(), &data).unwrap();
        let mut rng = Lcg(0x5eed);
        let mut failures = 0;

        for _ in 0..200 {
            let lost: Vec<bool> = (0..blocks.len()).map(|_| rng.next() % 100 < loss).collect();
            match decode_without(&data, &blocks, |i| lost[i]) {
                Ok(decoded) => assert_eq!(decoded, data),
                Err(CodecError::Undecodable { .. }) => failures += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(
            failures <= tolerated,
            "{} bytes at {}% loss: {} of 200 stalled",
            len,
            loss,
            failures
        );
    }
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn test_corrupt_digest_is_rejected() {
    let data = sample(128);
    let blocks = encode_bytes(config(), &data).unwrap();
    let output = Collected::default();
    let mut decoder = StreamDecoder::new(config(), 128, output.sink()).unwrap();

    let mut corrupt = blocks[0].to_vec();
    corrupt[5] ^= 0xFF;
    corrupt[6] ^= 0xFF;

    let err = decoder.decode_block(&corrupt).unwrap_err();
    assert!(matches!(err, CodecError::Integrity { index: 0 }));
    assert!(err.is_block_local());
    assert_eq!(decoder.recovered_count(), 0, "rejected block must not recover anything");
    assert_eq!(decoder.blocks_received(), 0);

    // The remaining blocks still carry enough redundancy.
    for block in &blocks[1..] {
        decoder.decode_block(block).unwrap();
    }
    assert!(decoder.is_complete());
    assert_eq!(output.first().unwrap(), data);
}

#[test]
fn test_corrupt_payload_is_rejected() {
    let data = sample(640);
    let blocks = encode_bytes(config(), &data).unwrap();
    let mut decoder = StreamDecoder::new(config(), 640, |_: Bytes| {}).unwrap();

    for block in &blocks {
        let mut corrupt = block.to_vec();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x80;
        assert!(decoder.decode_block(&corrupt).is_err());
    }
    assert_eq!(decoder.blocks_rejected(), blocks.len() as u64);
    assert_eq!(decoder.recovered_count(), 0);
}

#[test]
fn test_truncated_block_is_malformed() {
    let blocks = encode_bytes(config(), &sample(100)).unwrap();
    let mut decoder = StreamDecoder::new(config(), 100, |_: Bytes| {}).unwrap();

    let err = decoder.decode_block(&blocks[0][..50]).unwrap_err();
    assert!(matches!(
        err,
        CodecError::MalformedBlock {
            actual: 50,
            expected: 100
        }
    ));
}

#[test]
fn test_parse_exposes_header() {
    let blocks = encode_bytes(config(), &sample(300)).unwrap();
    let block = EncodedBlock::parse(&blocks[3], 64).unwrap();
    assert_eq!(block.index(), 3);
    assert_eq!(block.to_bytes(), blocks[3]);
    assert_eq!(&blocks[3][4..36], block.digest().as_bytes());
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_decode_after_completion_is_noop() {
    let data = sample(500);
    let blocks = encode_bytes(config(), &data).unwrap();
    let output = Collected::default();
    let mut decoder = StreamDecoder::new(config(), 500, output.sink()).unwrap();

    for block in &blocks {
        decoder.decode_block(block).unwrap();
    }
    assert_eq!(output.len(), 1, "sink invoked exactly once");
    let received = decoder.blocks_received();

    for block in &blocks {
        assert_eq!(decoder.decode_block(block).unwrap(), DecodeStatus::Complete);
    }
    assert_eq!(decoder.decode_block(b"garbage").unwrap(), DecodeStatus::Complete);

    assert_eq!(output.len(), 1, "sink must not be re-invoked");
    assert_eq!(decoder.blocks_received(), received);
    assert_eq!(output.first().unwrap(), data);
}

#[test]
fn test_flush_twice() {
    let mut count = 0;
    let mut encoder = StreamEncoder::new(config(), |_: Bytes| count += 1).unwrap();
    encoder.set_size(300);
    encoder.encode_block(&sample(300));
    encoder.flush().unwrap();
    encoder.flush().unwrap();
    drop(encoder);

    let expected = encode_bytes(config(), &sample(300)).unwrap().len();
    assert_eq!(count, expected);
}

#[test]
fn test_duplicate_blocks_before_completion() {
    let blocks = encode_bytes(config(), &sample(1000)).unwrap();
    let mut decoder = StreamDecoder::new(config(), 1000, |_: Bytes| {}).unwrap();

    let first = decoder.decode_block(&blocks[0]).unwrap();
    let again = decoder.decode_block(&blocks[0]).unwrap();
    assert_eq!(first, again);
    assert_eq!(decoder.blocks_received(), 1);
}

#[test]
fn test_finish_reports_undecodable() {
    let blocks = encode_bytes(config(), &sample(1000)).unwrap();
    let mut decoder = StreamDecoder::new(config(), 1000, |_: Bytes| {}).unwrap();
    decoder.decode_block(&blocks[0]).unwrap();

    assert!(matches!(
        decoder.finish(),
        Err(CodecError::Undecodable {
            recovered: 1,
            total: 16
        })
    ));
}
