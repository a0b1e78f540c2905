//! Pull-based encoding from a [`std::io::Read`] source.

use std::io::Read;

use bytes::Bytes;
use tracing::debug;

use super::{BlockQueue, StreamEncoder};
use crate::buffer::Buffer;
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::graph::StreamLayout;

/// Creates an iterator that encodes `stream_len` bytes read from `reader`.
///
/// The reader is pulled lazily, one pooled 64 KiB buffer at a time, and the
/// iterator yields wire blocks as soon as they are computable. End of input
/// finalizes the stream.
///
/// # Errors
///
/// Fails up front if the configuration is invalid or `stream_len` cannot be
/// laid out. Read errors and size mismatches are yielded by the iterator.
///
/// # Example
///
/// ```
/// use fountain::{CodecConfig, encode_reader};
/// use std::io::Cursor;
///
/// let data = vec![0x5Au8; 10_000];
/// let blocks = encode_reader(Cursor::new(&data), CodecConfig::default(), data.len() as u64)?
///     .collect::<Result<Vec<_>, _>>()?;
///
/// assert_eq!(blocks.len(), 321);
/// # Ok::<(), fountain::CodecError>(())
/// ```
pub fn encode_reader<R: Read>(
    reader: R,
    config: CodecConfig,
    stream_len: u64,
) -> Result<BlockIter<R>, CodecError> {
    let size = i64::try_from(stream_len).map_err(|_| CodecError::InvalidConfig {
        message: "stream length does not fit in i64",
    })?;

    let mut encoder = StreamEncoder::new(config, BlockQueue::default())?;
    encoder.set_size(size);
    if encoder.declared_size().is_none() {
        return Err(CodecError::InvalidSize {
            declared: Some(size),
        });
    }

    Ok(BlockIter {
        reader,
        encoder,
        buffer: Buffer::take(),
        error: None,
        finished: false,
    })
}

/// An iterator that yields encoded blocks from a reader.
///
/// Returned by [`encode_reader`]. Yields `Ok(block)` for every wire block in
/// index order. If the reader fails, or supplies more or fewer bytes than
/// declared, a single `Err` is yielded and iteration stops.
pub struct BlockIter<R> {
    reader: R,
    encoder: StreamEncoder<BlockQueue>,
    buffer: Buffer,
    /// Yielded after the blocks already queued.
    error: Option<CodecError>,
    finished: bool,
}

impl<R> BlockIter<R> {
    /// Returns the stream layout.
    pub fn layout(&self) -> Option<&StreamLayout> {
        self.encoder.layout()
    }

    /// Returns the number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.encoder.bytes_received()
    }
}

impl<R: Read> Iterator for BlockIter<R> {
    type Item = Result<Bytes, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(block) = self.encoder.sink_mut().pop() {
                return Some(Ok(block));
            }
            if self.finished {
                return self.error.take().map(Err);
            }

            match self.buffer.read_from(&mut self.reader) {
                Ok(data) if data.is_empty() => {
                    self.finished = true;
                    if let Err(e) = self.encoder.flush() {
                        self.error = Some(e);
                        continue;
                    }
                    debug!(blocks = self.encoder.blocks_emitted(), "reader drained");
                }
                Ok(data) => {
                    self.encoder.encode_block(data);
                    let declared = self.encoder.declared_size().unwrap_or_default();
                    let received = self.encoder.bytes_received();
                    if received > declared {
                        self.finished = true;
                        self.error = Some(CodecError::Overflow { declared, received });
                    }
                }
                Err(e) => {
                    self.finished = true;
                    self.error = Some(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_blocks, encode_bytes};
    use std::io::{self, Cursor};

    fn config() -> CodecConfig {
        CodecConfig::new(2.05, 64, 4096).unwrap()
    }

    /// Reader that hands out at most `step` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
        }
    }

    #[test]
    fn test_matches_encode_bytes() {
        let data: Vec<u8> = (0..5000).map(|i| (i % 199) as u8).collect();
        let reader = Trickle {
            data: &data,
            step: 17,
        };
        let from_reader: Vec<Bytes> = encode_reader(reader, config(), data.len() as u64)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(from_reader, encode_bytes(config(), &data).unwrap());

        let decoded = decode_blocks(config(), data.len() as u64, &from_reader).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_empty_reader() {
        let blocks: Vec<_> = encode_reader(Cursor::new(Vec::new()), config(), 0)
            .unwrap()
            .collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.is_ok()));
    }

    #[test]
    fn test_short_reader_underflows() {
        let mut iter = encode_reader(Cursor::new(vec![1u8; 100]), config(), 200).unwrap();
        let last = iter.by_ref().last().unwrap();
        assert!(matches!(
            last,
            Err(CodecError::Underflow {
                declared: 200,
                received: 100
            })
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_long_reader_overflows() {
        let results: Vec<_> = encode_reader(Cursor::new(vec![1u8; 300]), config(), 200)
            .unwrap()
            .collect();
        assert!(matches!(
            results.last(),
            Some(Err(CodecError::Overflow { declared: 200, .. }))
        ));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let mut iter = encode_reader(Failing, config(), 10).unwrap();
        assert!(matches!(iter.next(), Some(Err(CodecError::Io(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_invalid_length_fails_up_front() {
        let bad = config().with_block_size(1).with_storage_factor(1e12);
        assert!(encode_reader(Cursor::new(Vec::new()), bad, 1 << 20).is_err());
    }
}
