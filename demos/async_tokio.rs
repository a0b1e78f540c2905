//! Async encoding with tokio, decoding concurrently on another task.
//!
//! Demonstrates `encode_async` over a tokio reader and a decoder fed through
//! a channel, standing in for a network hop.
//!
//! Run with:
//!     cargo run --example async_tokio --features async-io

use bytes::Bytes;
use fountain::{CodecConfig, StreamDecoder, encode_async};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data: Vec<u8> = (0..150_000).map(|i| (i % 256) as u8).collect();
    let len = data.len() as u64;
    let config = CodecConfig::default();

    let (tx, mut rx) = mpsc::channel::<Bytes>(64);

    // Receiver: decode whatever arrives until the stream is complete
    let receiver = tokio::spawn(async move {
        let mut output = None;
        let mut decoder = StreamDecoder::new(config, len, |out: Bytes| output = Some(out))?;
        while let Some(block) = rx.recv().await {
            if decoder.decode_block(&block)?.is_complete() {
                break;
            }
        }
        decoder.finish()?;
        drop(decoder);
        Ok::<_, fountain::CodecError>(output)
    });

    // Sender: stream blocks straight from an async reader, losing every 5th
    let reader = tokio::io::BufReader::new(&data[..]).compat();
    let mut blocks = encode_async(reader, config, len)?;
    let mut sent = 0usize;
    let mut index = 0usize;
    while let Some(block) = blocks.next().await {
        let block = block?;
        index += 1;
        if index % 5 == 0 {
            continue;
        }
        if tx.send(block).await.is_err() {
            // Receiver finished early
            break;
        }
        sent += 1;
    }
    drop(tx);

    let output = receiver.await??.ok_or("decoder produced no output")?;
    println!("Sent {} of {} blocks", sent, index);
    println!("Recovered {} bytes", output.len());
    assert_eq!(output, data);

    Ok(())
}
