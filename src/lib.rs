//! fountain
//!
//! Streaming erasure-correcting block codec for Rust.
//!
//! `fountain` turns a byte stream of known length into fixed-size, redundant,
//! self-verifying blocks, and rebuilds the exact stream from any sufficient
//! subset of them. It is designed as a small, composable primitive for:
//!
//! - lossy or unordered transports (UDP, multicast, radio links)
//! - striping data over unreliable storage
//! - forward error correction in front of a retransmit protocol
//!
//! Each stream is cut into `block_size`-byte source symbols. Every encoded
//! block carries the XOR of a few source symbols chosen by a deterministic
//! sparse graph, a sequence index, and a keyed BLAKE3 digest. Encoder and
//! decoder derive the same graph from the stream length and configuration,
//! so nothing but the blocks travels on the wire.
//!
//! The crate intentionally:
//! - does NOT own a transport
//! - does NOT retransmit or time out
//! - does NOT spawn threads
//! - does NOT perform I/O inside the encoder or decoder
//!
//! It only does one thing: **bytes → blocks → bytes**
//!
//! # Sync
//!
//! ```
//! use fountain::{CodecConfig, CodecError, decode_blocks, encode_bytes};
//!
//! fn main() -> Result<(), CodecError> {
//!     let config = CodecConfig::default();
//!     let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
//!
//!     let blocks = encode_bytes(config, &data)?;
//!
//!     // Lose a third of the blocks on the way.
//!     let survivors = blocks.iter().enumerate().filter(|(i, _)| i % 3 != 1).map(|(_, b)| b);
//!
//!     let decoded = decode_blocks(config, data.len() as u64, survivors)?;
//!     assert_eq!(decoded, data);
//!     Ok(())
//! }
//! ```
//!
//! # Streaming
//!
//! ```
//! use bytes::Bytes;
//! use fountain::{CodecConfig, CodecError, StreamDecoder, StreamEncoder};
//!
//! fn main() -> Result<(), CodecError> {
//!     let config = CodecConfig::default();
//!     let data = vec![42u8; 4000];
//!
//!     let mut blocks = Vec::new();
//!     let mut encoder = StreamEncoder::new(config, |block: Bytes| blocks.push(block))?;
//!     encoder.set_size(data.len() as i64);
//!     for piece in data.chunks(1000) {
//!         encoder.encode_block(piece);
//!     }
//!     encoder.flush()?;
//!     drop(encoder);
//!
//!     let mut output = Vec::new();
//!     let mut decoder = StreamDecoder::new(config, data.len() as u64, |stream: Bytes| {
//!         output.extend_from_slice(&stream)
//!     })?;
//!     for block in &blocks {
//!         decoder.decode_block(block)?;
//!     }
//!     drop(decoder);
//!
//!     assert_eq!(output, data);
//!     Ok(())
//! }
//! ```
//!
//! # Async (feature = "async-io")
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use fountain::{encode_async, CodecConfig};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead + Unpin>(reader: R, len: u64) -> Result<(), fountain::CodecError> {
//!     let mut stream = encode_async(reader, CodecConfig::default(), len)?;
//!
//!     while let Some(block) = stream.next().await {
//!         let block = block?;
//!         println!("block {}", block.len());
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod codec;
mod config;
mod error;
mod graph;
mod segment;

mod buffer; // internal (thread-local reuse)
mod hash; // internal keyed blake3
mod util; // internal xor kernels

#[cfg(feature = "async-io")]
mod async_stream;

//
// Public surface
//

pub use block::{BLOCK_HEADER_LEN, BlockDigest, EncodedBlock};
pub use codec::{
    BlockIter, ByteSink, DecodeStatus, StreamDecoder, StreamEncoder, decode_blocks, encode_bytes,
    encode_reader,
};
pub use config::{CodecConfig, DEFAULT_BLOCK_SIZE, DEFAULT_STORAGE_FACTOR, DEFAULT_WINDOW_SIZE};
pub use error::CodecError;
pub use graph::{MAX_SYMBOL_DEGREE, MIN_SYMBOL_DEGREE, RedundancyGraph, StreamLayout};
pub use segment::Segmenter;

#[cfg(feature = "async-io")]
pub use async_stream::{EncodeStream, encode_async};
