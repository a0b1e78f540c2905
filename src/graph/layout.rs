//! Symbol and block counts derived from a stream length.

use crate::config::CodecConfig;
use crate::error::CodecError;

/// Shape of one stream: how many source symbols, encoded blocks, and how wide
/// the neighbor window is.
///
/// - `source_count = max(1, ceil(len / block_size))`. An empty stream still
///   owns one all-zero symbol so that it produces blocks a receiver can see.
/// - `encoded_count = max(floor(source_count * storage_factor), source_count + 1)`,
///   which always lies within `[floor, ceil]` of the exact product.
/// - `window = clamp(window_size / block_size, 1, source_count)` symbols.
///
/// # Example
///
/// ```
/// use fountain::{CodecConfig, StreamLayout};
///
/// let config = CodecConfig::new(2.05, 64, 4096)?;
///
/// let layout = StreamLayout::new(128, &config)?;
/// assert_eq!(layout.source_count(), 2);
/// assert_eq!(layout.encoded_count(), 4);
///
/// let empty = StreamLayout::new(0, &config)?;
/// assert_eq!(empty.source_count(), 1);
/// assert_eq!(empty.encoded_count(), 2);
/// # Ok::<(), fountain::CodecError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLayout {
    stream_len: u64,
    block_size: usize,
    source_count: usize,
    encoded_count: usize,
    window: usize,
}

impl StreamLayout {
    /// Computes the layout of a `stream_len`-byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if the configuration is invalid
    /// or the stream needs more blocks than a 32-bit index can address.
    pub fn new(stream_len: u64, config: &CodecConfig) -> Result<Self, CodecError> {
        config.validate()?;

        let block_size = config.block_size();
        let source_count = usize::try_from(stream_len.div_ceil(block_size as u64).max(1))
            .map_err(|_| CodecError::InvalidConfig {
                message: "stream has too many source symbols for this platform",
            })?;

        let encoded_count = encoded_count(source_count, config.storage_factor())?;
        if encoded_count as u64 > u64::from(u32::MAX) + 1 {
            return Err(CodecError::InvalidConfig {
                message: "stream needs more blocks than a 32-bit index can address",
            });
        }

        let window = (config.window_size() / block_size).clamp(1, source_count);

        Ok(Self {
            stream_len,
            block_size,
            source_count,
            encoded_count,
            window,
        })
    }

    /// Returns the stream length in bytes.
    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    /// Returns the source symbol size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of source symbols.
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    /// Returns the number of encoded blocks.
    pub fn encoded_count(&self) -> usize {
        self.encoded_count
    }

    /// Returns the neighbor window in symbols.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns true if source symbol `index` lies entirely inside the stream.
    pub fn is_full_symbol(&self, index: usize) -> bool {
        (index as u64 + 1) * self.block_size as u64 <= self.stream_len
    }

    /// Returns the true (unpadded) length of source symbol `index`.
    pub fn symbol_len(&self, index: usize) -> usize {
        let start = index as u64 * self.block_size as u64;
        self.stream_len
            .saturating_sub(start)
            .min(self.block_size as u64) as usize
    }
}

fn encoded_count(source_count: usize, storage_factor: f64) -> Result<usize, CodecError> {
    let scaled = source_count as f64 * storage_factor;
    if scaled >= usize::MAX as f64 {
        return Err(CodecError::InvalidConfig {
            message: "storage_factor overflows the block count",
        });
    }
    // Decimal factors land a hair off the product they denote (60 * 2.05
    // gives 122.99999999999999); snap those to the integer before flooring.
    let nearest = scaled.round();
    let count = if (scaled - nearest).abs() <= scaled * 1e-9 {
        nearest
    } else {
        scaled.floor()
    };
    Ok((count as usize).max(source_count + 1))
}
