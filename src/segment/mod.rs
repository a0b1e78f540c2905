//! Source segmentation for streaming input.
//!
//! [`Segmenter`] turns writes of any size (1 byte, 8 KB, 1 MB) into fixed-size
//! source symbols. It owns a growable buffer of pending bytes and a cursor
//! counting how many bytes have already been cut into symbols, so symbol
//! boundaries never depend on how the input was split.
//!
//! # Example
//!
//! ```
//! use fountain::{CodecConfig, Segmenter, StreamLayout};
//!
//! let config = CodecConfig::default().with_block_size(4);
//! let layout = StreamLayout::new(10, &config)?;
//! let mut segmenter = Segmenter::new(4);
//!
//! segmenter.push(b"abcdef");
//! assert_eq!(segmenter.next_full(&layout).as_deref(), Some(&b"abcd"[..]));
//! assert!(segmenter.next_full(&layout).is_none());
//!
//! segmenter.push(b"ghij");
//! assert_eq!(segmenter.next_full(&layout).as_deref(), Some(&b"efgh"[..]));
//!
//! // The short tail is only cut when the stream is finalized.
//! assert!(segmenter.next_full(&layout).is_none());
//! assert_eq!(segmenter.finish(&layout).as_deref(), Some(&b"ij"[..]));
//! # Ok::<(), fountain::CodecError>(())
//! ```

use bytes::{Bytes, BytesMut};

use crate::graph::StreamLayout;

/// Splits a byte stream into fixed-size source symbols.
#[derive(Debug)]
pub struct Segmenter {
    block_size: usize,
    pending: BytesMut,
    cursor: u64,
    received: u64,
    symbols_cut: usize,
}

impl Segmenter {
    /// Creates a segmenter for `block_size`-byte symbols.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            pending: BytesMut::with_capacity(block_size),
            cursor: 0,
            received: 0,
            symbols_cut: 0,
        }
    }

    /// Appends bytes to the pending buffer.
    ///
    /// Bytes past the declared stream length are kept and counted; the
    /// overflow is reported by the encoder at flush time.
    pub fn push(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
        self.received += data.len() as u64;
    }

    /// Cuts the next source symbol if it is full and completely buffered.
    ///
    /// A symbol is full when it lies entirely inside the declared stream,
    /// i.e. it is not the short tail. Returns `None` otherwise.
    pub fn next_full(&mut self, layout: &StreamLayout) -> Option<Bytes> {
        let index = self.symbols_cut;
        if !layout.is_full_symbol(index) || self.pending.len() < self.block_size {
            return None;
        }
        Some(self.cut(self.block_size))
    }

    /// Cuts the final short (possibly empty) symbol.
    ///
    /// Only valid once every declared byte has been pushed. Returns `None`
    /// when every symbol has already been cut.
    pub fn finish(&mut self, layout: &StreamLayout) -> Option<Bytes> {
        let index = self.symbols_cut;
        if index >= layout.source_count() {
            return None;
        }
        let len = layout.symbol_len(index).min(self.pending.len());
        Some(self.cut(len))
    }

    fn cut(&mut self, len: usize) -> Bytes {
        let symbol = self.pending.split_to(len).freeze();
        self.cursor += len as u64;
        self.symbols_cut += 1;
        symbol
    }

    /// Returns the total number of bytes pushed.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Returns the number of bytes already cut into symbols.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Returns the number of symbols cut so far.
    pub fn symbols_cut(&self) -> usize {
        self.symbols_cut
    }

    /// Returns the number of bytes waiting to be cut.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Clears all state for a new stream.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.cursor = 0;
        self.received = 0;
        self.symbols_cut = 0;
    }
}
