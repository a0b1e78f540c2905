//! Configuration for encoding and decoding.
//!
//! [`CodecConfig`] carries the stream parameters both ends must agree on out
//! of band: the storage factor, the block size, and the window size. Together
//! with the stream length they fully determine the redundancy graph, so a
//! decoder configured differently from its encoder rejects every block.
//!
//! # Example
//!
//! ```
//! use fountain::CodecConfig;
//!
//! // Explicit parameters
//! let config = CodecConfig::new(2.05, 64, 4096)?;
//!
//! // Builder pattern
//! let config = CodecConfig::default()
//!     .with_storage_factor(1.5)
//!     .with_block_size(1024);
//! config.validate()?;
//!
//! # Ok::<(), fountain::CodecError>(())
//! ```

use crate::error::CodecError;

/// Default ratio of encoded blocks to source symbols.
pub const DEFAULT_STORAGE_FACTOR: f64 = 2.05;

/// Default source symbol size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Default neighbor window in bytes (64 symbols of the default size).
pub const DEFAULT_WINDOW_SIZE: usize = 4096;

/// Configuration shared by [`StreamEncoder`](crate::StreamEncoder) and
/// [`StreamDecoder`](crate::StreamDecoder).
///
/// - `storage_factor` - Encoded blocks per source symbol, must be > 1.0
/// - `block_size` - Source symbol and block payload size in bytes
/// - `window_size` - Span, in bytes, of source data an encoded block may mix
///
/// The window bounds how much source data the encoder retains, which keeps
/// memory flat for arbitrarily long streams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecConfig {
    storage_factor: f64,
    block_size: usize,
    window_size: usize,
}

impl CodecConfig {
    /// Creates a new validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidConfig`] if:
    /// - `storage_factor` is not finite or not greater than 1.0
    /// - `block_size` is zero or does not fit in a `u32`
    /// - `window_size` is zero
    ///
    /// # Example
    ///
    /// ```
    /// use fountain::CodecConfig;
    ///
    /// let config = CodecConfig::new(2.0, 256, 16 * 1024)?;
    /// assert_eq!(config.block_size(), 256);
    /// assert!(CodecConfig::new(1.0, 256, 1024).is_err());
    /// # Ok::<(), fountain::CodecError>(())
    /// ```
    pub fn new(
        storage_factor: f64,
        block_size: usize,
        window_size: usize,
    ) -> Result<Self, CodecError> {
        if !storage_factor.is_finite() || storage_factor <= 1.0 {
            return Err(CodecError::InvalidConfig {
                message: "storage_factor must be a finite value greater than 1.0",
            });
        }

        if block_size == 0 {
            return Err(CodecError::InvalidConfig {
                message: "block_size must be non-zero",
            });
        }

        if u32::try_from(block_size).is_err() {
            return Err(CodecError::InvalidConfig {
                message: "block_size must fit in 32 bits",
            });
        }

        if window_size == 0 {
            return Err(CodecError::InvalidConfig {
                message: "window_size must be non-zero",
            });
        }

        Ok(Self {
            storage_factor,
            block_size,
            window_size,
        })
    }

    /// Sets the storage factor.
    ///
    /// Note: This does not validate the configuration. Use [`CodecConfig::validate`]
    /// to check if the configuration is valid.
    pub fn with_storage_factor(mut self, factor: f64) -> Self {
        self.storage_factor = factor;
        self
    }

    /// Sets the block size.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the window size.
    ///
    /// Note: This does not validate the configuration.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Returns the storage factor.
    pub fn storage_factor(&self) -> f64 {
        self.storage_factor
    }

    /// Returns the block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the window size in bytes.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Returns the wire length of one encoded block (header plus payload).
    pub fn wire_block_len(&self) -> usize {
        crate::block::BLOCK_HEADER_LEN + self.block_size
    }

    /// Validates the current configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use fountain::CodecConfig;
    ///
    /// let config = CodecConfig::default().with_block_size(0);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), CodecError> {
        Self::new(self.storage_factor, self.block_size, self.window_size).map(|_| ())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            storage_factor: DEFAULT_STORAGE_FACTOR,
            block_size: DEFAULT_BLOCK_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}
