//! Erasure recovery over a simulated lossy, corrupting channel.
//!
//! Drops a fraction of the blocks, flips bits in a few others, and shuffles
//! the rest before handing them to the decoder.
//!
//! Run with:
//!     cargo run --example lossy_channel -- [loss_percent]

use bytes::Bytes;
use fountain::{CodecConfig, StreamDecoder, encode_reader};
use tracing_subscriber::EnvFilter;

/// Tiny deterministic generator so the demo needs no extra dependencies.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn percent(&mut self) -> u64 {
        self.next() % 100
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let loss: u64 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(20);

    let data: Vec<u8> = (0..100_000u32)
        .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
        .collect();
    let config = CodecConfig::new(2.5, 128, 8192)?;

    let blocks = encode_reader(std::io::Cursor::new(&data), config, data.len() as u64)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = Lcg(0x5eed);
    let mut channel: Vec<Vec<u8>> = Vec::new();
    let mut dropped = 0;
    let mut corrupted = 0;
    for block in &blocks {
        if rng.percent() < loss {
            dropped += 1;
            continue;
        }
        let mut wire = block.to_vec();
        if rng.percent() < 2 {
            let at = (rng.next() as usize) % wire.len();
            wire[at] ^= 0x01;
            corrupted += 1;
        }
        channel.push(wire);
    }
    // Fisher-Yates shuffle for out-of-order delivery
    for i in (1..channel.len()).rev() {
        let j = (rng.next() as usize) % (i + 1);
        channel.swap(i, j);
    }

    println!(
        "Sent {} blocks: {} dropped, {} corrupted, {} delivered out of order",
        blocks.len(),
        dropped,
        corrupted,
        channel.len()
    );

    let mut output = None;
    let mut decoder =
        StreamDecoder::new(config, data.len() as u64, |out: Bytes| output = Some(out))?;
    for wire in &channel {
        match decoder.decode_block(wire) {
            Ok(status) if status.is_complete() => break,
            Ok(_) => {}
            Err(e) if e.is_block_local() => {}
            Err(e) => return Err(e.into()),
        }
    }
    let finished = decoder.finish();
    let (received, rejected) = (decoder.blocks_received(), decoder.blocks_rejected());
    drop(decoder);

    println!("Accepted {} blocks, rejected {}", received, rejected);
    match (finished, output) {
        (Ok(()), Some(out)) => {
            assert_eq!(out, data);
            println!("Recovered all {} bytes", out.len());
        }
        (Err(e), _) => println!("Stream not recovered: {}", e),
        (Ok(()), None) => println!("Decoder finished without output"),
    }

    Ok(())
}
