//! Streaming encoder - bytes in, redundant blocks out.
//!
//! - [`StreamEncoder`] - Stateful encoder with `set_size()`/`encode_block()`/`flush()`
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use fountain::{CodecConfig, StreamEncoder};
//!
//! let mut blocks = Vec::new();
//! let mut encoder = StreamEncoder::new(CodecConfig::default(), |block: Bytes| blocks.push(block))?;
//!
//! encoder.set_size(200);
//! encoder.encode_block(&[1u8; 150]);
//! encoder.encode_block(&[2u8; 50]);
//! encoder.flush()?;
//! drop(encoder);
//!
//! // 4 source symbols * 2.05 = 8.2 -> 8 blocks
//! assert_eq!(blocks.len(), 8);
//! # Ok::<(), fountain::CodecError>(())
//! ```

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use super::ByteSink;
use crate::block::EncodedBlock;
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::graph::{RedundancyGraph, StreamLayout};
use crate::hash::{Blake3Hasher, derive_stream_key};
use crate::segment::Segmenter;
use crate::util::xor_into;

/// What `set_size` has told us so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredSize {
    Unset,
    Valid(u64),
    Invalid(i64),
}

/// A repair block still waiting for some of its source symbols.
#[derive(Debug)]
struct OpenRepair {
    payload: BytesMut,
    mixed: usize,
}

/// Per-stream encoding state, built once the stream size is known.
#[derive(Debug)]
struct Session {
    layout: StreamLayout,
    graph: RedundancyGraph,
    hasher: Blake3Hasher,
    /// Repair blocks in progress, in repair order.
    open: VecDeque<OpenRepair>,
    /// Repair number of `open[0]`.
    first_open: usize,
    next_source: usize,
}

impl Session {
    fn new(stream_len: u64, config: &CodecConfig) -> Result<Self, CodecError> {
        let layout = StreamLayout::new(stream_len, config)?;
        let key = derive_stream_key(stream_len, config);
        let graph = RedundancyGraph::for_stream(&layout, &key)?;

        debug!(
            stream_len,
            source_count = layout.source_count(),
            encoded_count = layout.encoded_count(),
            window = layout.window(),
            symbol_degree = graph.symbol_degree(),
            "encoder graph ready"
        );

        Ok(Self {
            layout,
            graph,
            hasher: Blake3Hasher::new_keyed(&key),
            open: VecDeque::new(),
            first_open: 0,
            next_source: 0,
        })
    }

    /// Takes the next source symbol and emits every block it completes:
    /// its systematic copy, then the repair blocks anchored on it.
    fn push_symbol<S: ByteSink>(&mut self, symbol: Bytes, sink: &mut S) -> u64 {
        let source = self.next_source;
        self.next_source += 1;

        let mut copy = BytesMut::zeroed(self.layout.block_size());
        xor_into(&mut copy, &symbol);
        self.emit(self.graph.systematic_index(source), copy, sink);
        let mut emitted = 1;

        for repair in self.graph.repairs_of(source) {
            let open = self.open_repair(repair);
            xor_into(&mut open.payload, &symbol);
            open.mixed += 1;
        }

        let done = if source + 1 == self.layout.source_count() {
            self.graph.repair_count()
        } else {
            self.graph.repairs_before(source + 1)
        };
        while self.first_open < done {
            let mut repair = match self.open.pop_front() {
                Some(open) => open,
                None => OpenRepair::new(self.layout.block_size()),
            };
            if repair.mixed == 0 {
                // Nothing picked it; carry the anchor.
                xor_into(&mut repair.payload, &symbol);
            }
            let index = self.graph.repair_index(self.first_open);
            self.first_open += 1;
            self.emit(index, repair.payload, sink);
            emitted += 1;
        }
        emitted
    }

    fn open_repair(&mut self, repair: usize) -> &mut OpenRepair {
        let offset = repair - self.first_open;
        while self.open.len() <= offset {
            self.open.push_back(OpenRepair::new(self.layout.block_size()));
        }
        &mut self.open[offset]
    }

    fn emit<S: ByteSink>(&mut self, index: usize, payload: BytesMut, sink: &mut S) {
        // Block counts are bounded to u32 by StreamLayout.
        let block = EncodedBlock::seal(index as u32, payload.freeze(), &mut self.hasher);
        trace!(index = block.index(), "emit block");
        sink.emit(block.to_bytes());
    }
}

impl OpenRepair {
    fn new(block_size: usize) -> Self {
        Self {
            payload: BytesMut::zeroed(block_size),
            mixed: 0,
        }
    }
}

/// A streaming encoder that turns a byte stream of declared length into
/// fixed-size encoded blocks.
///
/// Blocks are pushed to the sink as soon as every source symbol they mix has
/// been fed. Only the repair blocks of the current window are held, so
/// memory stays bounded by the configured window regardless of stream length.
///
/// # Streaming API
///
/// - Call `set_size()` with the total stream length
/// - Call `encode_block()` with data in any size (1 byte to megabytes)
/// - Call `flush()` once every byte has been fed
///
/// Size problems are not reported eagerly. A negative or missing size, too
/// many bytes, or too few bytes all surface as an error from `flush()`. A
/// failed `flush()` changes nothing, so an encoder that was flushed too early
/// can be fed the rest of the stream and flushed again.
///
/// # Determinism
///
/// The emitted blocks depend only on the stream bytes and the configuration,
/// never on how the input was split across `encode_block()` calls.
#[derive(Debug)]
pub struct StreamEncoder<S> {
    config: CodecConfig,
    sink: S,
    segmenter: Segmenter,
    size: DeclaredSize,
    session: Option<Session>,
    blocks_emitted: u64,
    finished: bool,
}

impl<S: ByteSink> StreamEncoder<S> {
    /// Creates an encoder that emits wire blocks into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: CodecConfig, sink: S) -> Result<Self, CodecError> {
        config.validate()?;
        Ok(Self {
            config,
            sink,
            segmenter: Segmenter::new(config.block_size()),
            size: DeclaredSize::Unset,
            session: None,
            blocks_emitted: 0,
            finished: false,
        })
    }

    /// Declares the total stream length.
    ///
    /// Never fails immediately: a negative size, a size the graph cannot
    /// address, or a size changed after blocks were emitted is recorded and
    /// reported by [`flush`](Self::flush). Bytes fed before the size was
    /// known are encoded now.
    pub fn set_size(&mut self, size: i64) {
        let current = self.session.as_ref().map(|s| s.layout.stream_len());
        if self.segmenter.symbols_cut() > 0 {
            if size >= 0 && current == Some(size as u64) {
                self.size = DeclaredSize::Valid(size as u64);
            } else {
                warn!(size, "stream size changed after encoding started");
                self.size = DeclaredSize::Invalid(size);
            }
            return;
        }
        if size >= 0 && self.declared_size() == Some(size as u64) {
            return;
        }

        self.session = None;
        if size < 0 {
            self.size = DeclaredSize::Invalid(size);
            return;
        }

        match Session::new(size as u64, &self.config) {
            Ok(session) => {
                self.size = DeclaredSize::Valid(size as u64);
                self.session = Some(session);
                self.drain();
            }
            Err(e) => {
                warn!(size, error = %e, "cannot lay out stream");
                self.size = DeclaredSize::Invalid(size);
            }
        }
    }

    /// Feeds stream bytes. An empty slice is a no-op.
    ///
    /// Every complete source symbol is cut immediately and all blocks that
    /// become computable are emitted before this returns. The final short
    /// symbol is held back until [`flush`](Self::flush).
    pub fn encode_block(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.segmenter.push(data);
        trace!(
            len = data.len(),
            received = self.segmenter.received(),
            "buffered input"
        );
        self.drain();
    }

    fn drain(&mut self) {
        if !matches!(self.size, DeclaredSize::Valid(_)) {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        while let Some(symbol) = self.segmenter.next_full(&session.layout) {
            self.blocks_emitted += session.push_symbol(symbol, &mut self.sink);
        }
    }

    /// Finalizes the stream and emits every remaining block.
    ///
    /// After a successful flush exactly `layout().encoded_count()` blocks
    /// have been emitted over the life of the stream. Flushing again is a
    /// no-op unless more bytes were fed in the meantime.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidSize`] - size unset, negative, or changed mid-stream
    /// - [`CodecError::Overflow`] - more bytes fed than declared
    /// - [`CodecError::Underflow`] - fewer bytes fed than declared
    pub fn flush(&mut self) -> Result<(), CodecError> {
        let declared = match self.size {
            DeclaredSize::Unset => return Err(CodecError::InvalidSize { declared: None }),
            DeclaredSize::Invalid(n) => return Err(CodecError::InvalidSize { declared: Some(n) }),
            DeclaredSize::Valid(n) => n,
        };

        let received = self.segmenter.received();
        if received > declared {
            warn!(declared, received, "flush with overflowing stream");
            return Err(CodecError::Overflow { declared, received });
        }
        if received < declared {
            debug!(declared, received, "flush with incomplete stream");
            return Err(CodecError::Underflow { declared, received });
        }

        let session = self
            .session
            .as_mut()
            .ok_or(CodecError::InvalidSize { declared: None })?;

        while let Some(symbol) = self.segmenter.next_full(&session.layout) {
            self.blocks_emitted += session.push_symbol(symbol, &mut self.sink);
        }
        if let Some(tail) = self.segmenter.finish(&session.layout) {
            self.blocks_emitted += session.push_symbol(tail, &mut self.sink);
        }

        debug_assert_eq!(session.next_source, session.layout.source_count());
        debug_assert_eq!(session.first_open, session.graph.repair_count());
        if !self.finished {
            debug!(
                stream_len = declared,
                blocks = self.blocks_emitted,
                "encoder flushed"
            );
        }
        self.finished = true;
        Ok(())
    }

    /// Resets the encoder for a new stream with the same config and sink.
    pub fn reset(&mut self) {
        self.segmenter.reset();
        self.size = DeclaredSize::Unset;
        self.session = None;
        self.blocks_emitted = 0;
        self.finished = false;
    }

    /// Returns the number of blocks emitted for the current stream.
    pub fn blocks_emitted(&self) -> u64 {
        self.blocks_emitted
    }

    /// Returns the number of bytes fed for the current stream.
    pub fn bytes_received(&self) -> u64 {
        self.segmenter.received()
    }

    /// Returns the declared stream length, if it is valid.
    pub fn declared_size(&self) -> Option<u64> {
        match self.size {
            DeclaredSize::Valid(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the stream layout once a valid size has been declared.
    pub fn layout(&self) -> Option<&StreamLayout> {
        self.session.as_ref().map(|s| &s.layout)
    }

    /// Returns true once `flush()` has succeeded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the configuration used by this encoder.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Returns a reference to the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns a mutable reference to the sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the encoder and returns the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BlockQueue;

    fn encoder() -> StreamEncoder<BlockQueue> {
        StreamEncoder::new(CodecConfig::new(2.05, 64, 4096).unwrap(), BlockQueue::default())
            .unwrap()
    }

    fn drain(encoder: &mut StreamEncoder<BlockQueue>) -> Vec<Bytes> {
        std::iter::from_fn(|| encoder.sink_mut().pop()).collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CodecConfig::default().with_storage_factor(1.0);
        assert!(StreamEncoder::new(config, BlockQueue::default()).is_err());
    }

    #[test]
    fn test_zero_bytes() {
        let mut enc = encoder();
        enc.set_size(0);
        enc.encode_block(&[]);
        assert_eq!(enc.blocks_emitted(), 0);
        enc.flush().unwrap();
        assert_eq!(enc.blocks_emitted(), 2);
    }

    #[test]
    fn test_full_symbols_emit_before_flush() {
        let mut enc = encoder();
        enc.set_size(128);
        enc.encode_block(&[3u8; 128]);
        assert_eq!(enc.blocks_emitted(), 4);
        enc.flush().unwrap();
        assert_eq!(enc.blocks_emitted(), 4);
    }

    #[test]
    fn test_short_tail_waits_for_flush() {
        let mut enc = encoder();
        enc.set_size(32);
        enc.encode_block(&[1u8; 32]);
        assert_eq!(enc.blocks_emitted(), 0);
        enc.flush().unwrap();
        assert_eq!(enc.blocks_emitted(), 2);
    }

    #[test]
    fn test_bytes_before_size_are_kept() {
        let mut enc = encoder();
        enc.encode_block(&[9u8; 128]);
        assert_eq!(enc.blocks_emitted(), 0);
        enc.set_size(128);
        assert_eq!(enc.blocks_emitted(), 4);
        enc.flush().unwrap();
    }

    #[test]
    fn test_unset_size_fails() {
        let mut enc = encoder();
        enc.encode_block(b"data");
        assert!(matches!(
            enc.flush(),
            Err(CodecError::InvalidSize { declared: None })
        ));
    }

    #[test]
    fn test_size_change_after_emission_fails() {
        let mut enc = encoder();
        enc.set_size(128);
        enc.encode_block(&[0u8; 64]);
        enc.set_size(256);
        assert!(matches!(
            enc.flush(),
            Err(CodecError::InvalidSize { declared: Some(256) })
        ));
    }

    #[test]
    fn test_size_change_before_emission_is_allowed() {
        let mut enc = encoder();
        enc.set_size(0);
        enc.set_size(10);
        enc.encode_block(&[1u8; 10]);
        enc.flush().unwrap();
        assert_eq!(enc.layout().unwrap().stream_len(), 10);
    }

    #[test]
    fn test_underflow_then_top_up() {
        let mut enc = encoder();
        enc.set_size(32);
        enc.encode_block(&[5u8; 10]);
        assert!(matches!(
            enc.flush(),
            Err(CodecError::Underflow {
                declared: 32,
                received: 10
            })
        ));
        enc.encode_block(&[5u8; 22]);
        enc.flush().unwrap();
        assert_eq!(enc.blocks_emitted(), 2);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let mut enc = encoder();
        enc.set_size(100);
        enc.encode_block(&[1u8; 100]);
        enc.flush().unwrap();
        let emitted = enc.blocks_emitted();
        enc.flush().unwrap();
        assert_eq!(enc.blocks_emitted(), emitted);
        assert!(enc.is_finished());
    }

    #[test]
    fn test_feeding_after_flush_overflows() {
        let mut enc = encoder();
        enc.set_size(4);
        enc.encode_block(b"abcd");
        enc.flush().unwrap();
        enc.encode_block(b"e");
        assert!(matches!(enc.flush(), Err(CodecError::Overflow { .. })));
    }

    #[test]
    fn test_blocks_are_in_index_order() {
        let mut enc = encoder();
        enc.set_size(1000);
        enc.encode_block(&vec![7u8; 1000]);
        enc.flush().unwrap();

        let blocks = drain(&mut enc);
        assert_eq!(blocks.len() as u64, enc.blocks_emitted());
        for (i, wire) in blocks.iter().enumerate() {
            let block = EncodedBlock::parse(wire, 64).unwrap();
            assert_eq!(block.index() as usize, i);
        }
    }

    #[test]
    fn test_systematic_blocks_carry_source() {
        let data: Vec<u8> = (0..128).map(|i| i as u8).collect();
        let mut enc = encoder();
        enc.set_size(128);
        enc.encode_block(&data);
        enc.flush().unwrap();

        let blocks = drain(&mut enc);
        let first = EncodedBlock::parse(&blocks[0], 64).unwrap();
        assert_eq!(first.payload().as_ref(), &data[..64]);
    }

    #[test]
    fn test_reset() {
        let mut enc = encoder();
        enc.set_size(10);
        enc.encode_block(&[0u8; 20]);
        assert!(enc.flush().is_err());

        enc.reset();
        enc.set_size(10);
        enc.encode_block(&[0u8; 10]);
        enc.flush().unwrap();
        assert_eq!(enc.bytes_received(), 10);
        assert_eq!(enc.declared_size(), Some(10));
    }
}
