//! Basic synchronous encode/decode with the streaming API.
//!
//! Run with:
//!     RUST_LOG=fountain=debug cargo run --example roundtrip

use bytes::Bytes;
use fountain::{CodecConfig, EncodedBlock, StreamDecoder, StreamEncoder};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Create some sample data
    let data: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let config = CodecConfig::default();

    println!("Encoding {} bytes...\n", data.len());

    let mut blocks = Vec::new();
    let mut encoder = StreamEncoder::new(config, |block: Bytes| blocks.push(block))?;
    encoder.set_size(data.len() as i64);

    // Simulate streaming data in batches
    let batch_size = 8 * 1024; // 8 KB batches
    for batch in data.chunks(batch_size) {
        encoder.encode_block(batch);
    }
    encoder.flush()?;

    let layout = *encoder.layout().ok_or("layout missing after flush")?;
    drop(encoder);

    println!(
        "{} source symbols -> {} blocks of {} bytes on the wire",
        layout.source_count(),
        blocks.len(),
        config.wire_block_len()
    );
    for wire in blocks.iter().take(4) {
        println!("  {}", EncodedBlock::parse(wire, config.block_size())?);
    }

    let mut output = Bytes::new();
    let mut decoder = StreamDecoder::new(config, data.len() as u64, |out: Bytes| output = out)?;
    for wire in &blocks {
        if decoder.decode_block(wire)?.is_complete() {
            break;
        }
    }
    let used = decoder.blocks_received();
    drop(decoder);

    println!("\nDecoded {} bytes from {} blocks", output.len(), used);
    assert_eq!(output, data);
    println!("Round trip OK");

    Ok(())
}
