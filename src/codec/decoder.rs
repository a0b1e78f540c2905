//! Streaming decoder - received blocks in, reconstructed stream out.
//!
//! The decoder is a peeling decoder. Each accepted block is reduced against
//! the source symbols already known; a block left with exactly one unknown
//! neighbor yields that neighbor, and every recovery is pushed on a work
//! queue that reduces the blocks waiting on it. The queue runs to a fixed
//! point after every accepted block.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use super::ByteSink;
use crate::block::EncodedBlock;
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::graph::{RedundancyGraph, StreamLayout};
use crate::hash::{Blake3Hasher, derive_stream_key};
use crate::util::{is_zero, xor_into};

/// Progress reported for every accepted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// More blocks are needed.
    Incomplete {
        /// Source symbols recovered so far.
        recovered: usize,
        /// Source symbols in the stream.
        total: usize,
    },
    /// The stream has been reconstructed and emitted.
    Complete,
}

impl DecodeStatus {
    /// Returns true if the stream has been reconstructed.
    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeStatus::Complete)
    }
}

/// An accepted block that still mixes two or more unknown source symbols.
#[derive(Debug)]
struct PendingBlock {
    index: u32,
    /// Payload XORed with every neighbor recovered so far.
    residual: BytesMut,
    /// Neighbors not yet subtracted from `residual`.
    unknown: Vec<usize>,
}

/// A streaming decoder for one stream of known length.
///
/// Blocks may arrive in any order, with duplicates, and with losses. Blocks
/// that fail their integrity check or contradict recovered data are rejected
/// with a block-local error and leave the decoder exactly as it was.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use fountain::{CodecConfig, StreamDecoder, encode_bytes};
///
/// let config = CodecConfig::default();
/// let data = vec![7u8; 1000];
/// let blocks = encode_bytes(config, &data)?;
///
/// let mut output = None;
/// let mut decoder = StreamDecoder::new(config, data.len() as u64, |stream: Bytes| output = Some(stream))?;
///
/// // Every other block is lost in transit.
/// for block in blocks.iter().skip(1).step_by(2) {
///     let _ = decoder.decode_block(block);
/// }
/// for block in blocks.iter().step_by(2) {
///     if decoder.decode_block(block)?.is_complete() {
///         break;
///     }
/// }
/// drop(decoder);
///
/// assert_eq!(output.as_deref(), Some(&data[..]));
/// # Ok::<(), fountain::CodecError>(())
/// ```
#[derive(Debug)]
pub struct StreamDecoder<S> {
    config: CodecConfig,
    layout: StreamLayout,
    /// Neighbor list of every block.
    neighbors: Vec<Vec<usize>>,
    hasher: Blake3Hasher,
    sink: S,

    /// Recovered source symbols, padded to the block size.
    recovered: Vec<Option<Bytes>>,
    recovered_count: usize,
    /// Arena of pending blocks; freed slots become `None`.
    pending: Vec<Option<PendingBlock>>,
    /// For each source symbol, the pending slots that mix it.
    waiters: Vec<Vec<usize>>,
    queue: VecDeque<usize>,

    received: Vec<bool>,
    blocks_received: usize,
    blocks_rejected: u64,
    /// Accepted blocks found inconsistent once all their neighbors were known.
    conflicts: Vec<u32>,
    complete: bool,
}

impl<S: ByteSink> StreamDecoder<S> {
    /// Creates a decoder for a `stream_len`-byte stream.
    ///
    /// The configuration must match the encoder's; the redundancy graph and
    /// the integrity key are both derived from it.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] or
    /// [`CodecError::UnreachableSource`] if no valid graph exists.
    pub fn new(config: CodecConfig, stream_len: u64, sink: S) -> Result<Self, CodecError> {
        let layout = StreamLayout::new(stream_len, &config)?;
        let key = derive_stream_key(stream_len, &config);
        let graph = RedundancyGraph::for_stream(&layout, &key)?;

        debug!(
            stream_len,
            source_count = layout.source_count(),
            encoded_count = layout.encoded_count(),
            "decoder ready"
        );

        Ok(Self {
            config,
            neighbors: graph.neighbor_table(),
            hasher: Blake3Hasher::new_keyed(&key),
            sink,
            recovered: vec![None; layout.source_count()],
            recovered_count: 0,
            pending: Vec::new(),
            waiters: vec![Vec::new(); layout.source_count()],
            queue: VecDeque::new(),
            received: vec![false; layout.encoded_count()],
            blocks_received: 0,
            blocks_rejected: 0,
            conflicts: Vec::new(),
            complete: false,
            layout,
        })
    }

    /// Accepts one received block in wire form.
    ///
    /// Once the last source symbol is recovered the stream is emitted to the
    /// sink and every later call returns [`DecodeStatus::Complete`] without
    /// doing anything.
    ///
    /// # Errors
    ///
    /// Block-local errors reject only this block and change no state:
    ///
    /// - [`CodecError::MalformedBlock`] - wrong wire length
    /// - [`CodecError::Integrity`] - digest mismatch
    /// - [`CodecError::BlockOutOfRange`] - index beyond this stream
    /// - [`CodecError::Conflict`] - payload contradicts recovered symbols
    ///
    /// An incomplete stream is not an error here; call
    /// [`finish`](Self::finish) once no more blocks are coming.
    pub fn decode_block(&mut self, data: &[u8]) -> Result<DecodeStatus, CodecError> {
        if self.complete {
            return Ok(DecodeStatus::Complete);
        }

        let block = match self.check(data) {
            Ok(Some(block)) => block,
            Ok(None) => return Ok(self.status()),
            Err(e) => {
                self.blocks_rejected += 1;
                warn!(error = %e, "rejected block");
                return Err(e);
            }
        };

        let index = block.index();
        let (residual, unknown) = self.reduce(&block);

        match unknown.len() {
            0 => {
                if !is_zero(&residual) {
                    self.blocks_rejected += 1;
                    warn!(index, "block conflicts with recovered symbols");
                    return Err(CodecError::Conflict { index });
                }
                trace!(index, "redundant block");
            }
            1 => {
                trace!(index, source = unknown[0], "block resolves a symbol");
                self.recover(unknown[0], residual.freeze());
            }
            _ => {
                trace!(index, unknown = unknown.len(), "block pending");
                let slot = self.pending.len();
                for &source in &unknown {
                    self.waiters[source].push(slot);
                }
                self.pending.push(Some(PendingBlock {
                    index,
                    residual,
                    unknown,
                }));
            }
        }

        self.received[index as usize] = true;
        self.blocks_received += 1;
        self.peel();

        if self.recovered_count == self.layout.source_count() {
            self.emit_stream();
            return Ok(DecodeStatus::Complete);
        }
        Ok(self.status())
    }

    /// Parses and verifies a block. Returns `None` for duplicates.
    fn check(&mut self, data: &[u8]) -> Result<Option<EncodedBlock>, CodecError> {
        let block = EncodedBlock::parse(data, self.layout.block_size())?;
        let index = block.index();

        if !block.verify(&mut self.hasher) {
            return Err(CodecError::Integrity { index });
        }
        if index as usize >= self.layout.encoded_count() {
            return Err(CodecError::BlockOutOfRange {
                index,
                count: self.layout.encoded_count(),
            });
        }
        if self.received[index as usize] {
            trace!(index, "duplicate block");
            return Ok(None);
        }
        Ok(Some(block))
    }

    /// Subtracts every recovered neighbor from the payload.
    fn reduce(&self, block: &EncodedBlock) -> (BytesMut, Vec<usize>) {
        let mut residual = BytesMut::from(block.payload().as_ref());
        let mut unknown = Vec::new();
        for &source in &self.neighbors[block.index() as usize] {
            match &self.recovered[source] {
                Some(symbol) => xor_into(&mut residual, symbol),
                None => unknown.push(source),
            }
        }
        (residual, unknown)
    }

    fn recover(&mut self, source: usize, symbol: Bytes) {
        if self.recovered[source].is_some() {
            return;
        }
        self.recovered[source] = Some(symbol);
        self.recovered_count += 1;
        self.queue.push_back(source);
    }

    /// Propagates recovered symbols until no pending block can be resolved.
    fn peel(&mut self) {
        while let Some(source) = self.queue.pop_front() {
            let Some(symbol) = self.recovered[source].clone() else {
                continue;
            };

            for slot in std::mem::take(&mut self.waiters[source]) {
                let Some(block) = self.pending[slot].as_mut() else {
                    continue;
                };
                xor_into(&mut block.residual, &symbol);
                block.unknown.retain(|&s| s != source);

                match block.unknown.len() {
                    0 => {
                        // Its last unknown was recovered by another block first.
                        if let Some(block) = self.pending[slot].take() {
                            if !is_zero(&block.residual) {
                                warn!(index = block.index, "pending block conflicts after peel");
                                self.conflicts.push(block.index);
                            }
                        }
                    }
                    1 => {
                        let target = block.unknown[0];
                        if self.recovered[target].is_none() {
                            if let Some(block) = self.pending[slot].take() {
                                trace!(index = block.index, source = target, "peeled symbol");
                                self.recover(target, block.residual.freeze());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn emit_stream(&mut self) {
        let mut output = BytesMut::with_capacity(self.layout.stream_len() as usize);
        for (i, symbol) in self.recovered.iter().enumerate() {
            if let Some(symbol) = symbol {
                output.extend_from_slice(&symbol[..self.layout.symbol_len(i)]);
            }
        }
        self.complete = true;
        self.pending.clear();
        self.waiters.iter_mut().for_each(Vec::clear);

        debug!(
            stream_len = output.len(),
            blocks_received = self.blocks_received,
            blocks_rejected = self.blocks_rejected,
            "stream reconstructed"
        );
        self.sink.emit(output.freeze());
    }

    /// Reports whether the stream was reconstructed from consistent blocks.
    ///
    /// Call this when the transport knows no more blocks will arrive.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Undecodable`] - source symbols are missing
    /// - [`CodecError::Conflict`] - an accepted block contradicted symbols
    ///   recovered later, so the emitted stream cannot be trusted
    pub fn finish(&self) -> Result<(), CodecError> {
        if !self.complete {
            return Err(self.undecodable());
        }
        match self.conflicts.first() {
            Some(&index) => Err(CodecError::Conflict { index }),
            None => Ok(()),
        }
    }

    fn undecodable(&self) -> CodecError {
        CodecError::Undecodable {
            recovered: self.recovered_count,
            total: self.layout.source_count(),
        }
    }

    fn status(&self) -> DecodeStatus {
        if self.complete {
            DecodeStatus::Complete
        } else {
            DecodeStatus::Incomplete {
                recovered: self.recovered_count,
                total: self.layout.source_count(),
            }
        }
    }

    /// Returns the number of source symbols recovered so far.
    pub fn recovered_count(&self) -> usize {
        self.recovered_count
    }

    /// Returns the number of source symbols in the stream.
    pub fn source_count(&self) -> usize {
        self.layout.source_count()
    }

    /// Returns the number of distinct blocks accepted.
    pub fn blocks_received(&self) -> usize {
        self.blocks_received
    }

    /// Returns the number of blocks rejected by per-block checks.
    pub fn blocks_rejected(&self) -> u64 {
        self.blocks_rejected
    }

    /// Returns the indices of accepted blocks that later proved inconsistent
    /// with the recovered symbols.
    pub fn conflicts(&self) -> &[u32] {
        &self.conflicts
    }

    /// Returns true once the stream has been emitted.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns the stream layout.
    pub fn layout(&self) -> &StreamLayout {
        &self.layout
    }

    /// Returns the configuration used by this decoder.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Returns a reference to the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the decoder and returns the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
