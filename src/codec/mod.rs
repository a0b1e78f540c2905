//! Streaming encoder and peeling decoder.
//!
//! - [`StreamEncoder`] - Push bytes, receive wire blocks through a [`ByteSink`]
//! - [`StreamDecoder`] - Push wire blocks, receive the stream once recovered
//! - [`BlockIter`] - Pull wire blocks from a [`std::io::Read`] source
//! - [`encode_bytes`] / [`decode_blocks`] - One-shot helpers for in-memory data

mod decoder;
mod encoder;
mod iter;
mod sink;

pub use decoder::{DecodeStatus, StreamDecoder};
pub use encoder::StreamEncoder;
pub use iter::{BlockIter, encode_reader};
pub use sink::ByteSink;

pub(crate) use sink::BlockQueue;

use bytes::Bytes;

use crate::config::CodecConfig;
use crate::error::CodecError;

/// Encodes an in-memory buffer and returns every wire block in index order.
///
/// # Example
///
/// ```
/// use fountain::{CodecConfig, encode_bytes};
///
/// let blocks = encode_bytes(CodecConfig::default(), &[0u8; 2048])?;
/// assert_eq!(blocks.len(), 65);
/// # Ok::<(), fountain::CodecError>(())
/// ```
pub fn encode_bytes(config: CodecConfig, data: &[u8]) -> Result<Vec<Bytes>, CodecError> {
    let size = i64::try_from(data.len()).map_err(|_| CodecError::InvalidConfig {
        message: "stream length does not fit in i64",
    })?;

    let mut blocks = Vec::new();
    let mut encoder = StreamEncoder::new(config, |block: Bytes| blocks.push(block))?;
    encoder.set_size(size);
    encoder.encode_block(data);
    encoder.flush()?;
    drop(encoder);

    Ok(blocks)
}

/// Decodes a `stream_len`-byte stream from whatever blocks are available.
///
/// Blocks rejected by per-block checks (corrupt, malformed, foreign, or
/// conflicting) are skipped. Decoding stops at the first block that
/// completes the stream.
///
/// # Errors
///
/// - [`CodecError::Undecodable`] - the blocks do not determine every source
///   symbol
/// - [`CodecError::Conflict`] - an accepted block contradicted the symbols
///   recovered after it
///
/// # Example
///
/// ```
/// use fountain::{CodecConfig, decode_blocks, encode_bytes};
///
/// let config = CodecConfig::default();
/// let blocks = encode_bytes(config, b"hello world")?;
///
/// let data = decode_blocks(config, 11, &blocks)?;
/// assert_eq!(&data[..], b"hello world");
/// # Ok::<(), fountain::CodecError>(())
/// ```
pub fn decode_blocks<I>(config: CodecConfig, stream_len: u64, blocks: I) -> Result<Bytes, CodecError>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut output = None;
    let mut decoder = StreamDecoder::new(config, stream_len, |stream: Bytes| output = Some(stream))?;

    for block in blocks {
        match decoder.decode_block(block.as_ref()) {
            Ok(status) if status.is_complete() => break,
            Ok(_) => {}
            Err(e) if e.is_block_local() => {}
            Err(e) => return Err(e),
        }
    }
    let outcome = decoder.finish();
    let missing = CodecError::Undecodable {
        recovered: decoder.recovered_count(),
        total: decoder.source_count(),
    };
    drop(decoder);

    outcome?;
    output.ok_or(missing)
}
