//! Error types for fountain.

use std::fmt;

/// Errors that can occur while encoding or decoding a stream.
///
/// Per-block rejections ([`Integrity`](CodecError::Integrity),
/// [`MalformedBlock`](CodecError::MalformedBlock),
/// [`BlockOutOfRange`](CodecError::BlockOutOfRange) and
/// [`Conflict`](CodecError::Conflict)) leave the decoder untouched and the
/// session usable. See [`CodecError::is_block_local`].
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred while reading input data.
    Io(std::io::Error),

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The redundancy graph leaves a source symbol without any encoded
    /// symbol covering it.
    UnreachableSource {
        /// Index of the uncovered source symbol.
        index: usize,
    },

    /// The declared stream size is unset, negative, or was changed after
    /// encoding started.
    InvalidSize {
        /// The offending declared size, if one was given.
        declared: Option<i64>,
    },

    /// More bytes were fed than the declared stream size.
    Overflow {
        /// Declared stream size.
        declared: u64,
        /// Bytes actually fed.
        received: u64,
    },

    /// Fewer bytes were fed than the declared stream size.
    Underflow {
        /// Declared stream size.
        declared: u64,
        /// Bytes actually fed.
        received: u64,
    },

    /// A received block failed its integrity check.
    Integrity {
        /// Sequence index read from the (untrusted) header.
        index: u32,
    },

    /// A received block does not have the fixed wire length.
    MalformedBlock {
        /// The actual length.
        actual: usize,
        /// The expected length.
        expected: usize,
    },

    /// A received block names an index outside this stream's graph.
    BlockOutOfRange {
        /// The index carried by the block.
        index: u32,
        /// Number of encoded blocks in the stream.
        count: usize,
    },

    /// A block disagrees with source symbols that are already recovered.
    Conflict {
        /// Index of the offending encoded block.
        index: u32,
    },

    /// Every available block was ingested and the peel stalled.
    Undecodable {
        /// Source symbols recovered so far.
        recovered: usize,
        /// Source symbols in the stream.
        total: usize,
    },
}

impl CodecError {
    /// Returns true if the error only concerns a single received block.
    ///
    /// Such errors are absorbed by the decoder: the block is discarded and
    /// decoding continues with the next one.
    pub fn is_block_local(&self) -> bool {
        matches!(
            self,
            CodecError::Integrity { .. }
                | CodecError::MalformedBlock { .. }
                | CodecError::BlockOutOfRange { .. }
                | CodecError::Conflict { .. }
        )
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "io error: {}", e),
            CodecError::InvalidConfig { message } => {
                write!(f, "invalid config: {}", message)
            }
            CodecError::UnreachableSource { index } => {
                write!(f, "source symbol {} is not covered by any block", index)
            }
            CodecError::InvalidSize { declared: Some(n) } => {
                write!(f, "invalid stream size: {}", n)
            }
            CodecError::InvalidSize { declared: None } => {
                write!(f, "stream size was never declared")
            }
            CodecError::Overflow { declared, received } => {
                write!(
                    f,
                    "stream overflow: {} bytes fed, {} declared",
                    received, declared
                )
            }
            CodecError::Underflow { declared, received } => {
                write!(
                    f,
                    "stream underflow: {} bytes fed, {} declared",
                    received, declared
                )
            }
            CodecError::Integrity { index } => {
                write!(f, "integrity check failed for block {}", index)
            }
            CodecError::MalformedBlock { actual, expected } => {
                write!(f, "malformed block: {} bytes (expected {})", actual, expected)
            }
            CodecError::BlockOutOfRange { index, count } => {
                write!(f, "block index {} out of range ({} blocks)", index, count)
            }
            CodecError::Conflict { index } => {
                write!(f, "block {} conflicts with recovered data", index)
            }
            CodecError::Undecodable { recovered, total } => {
                write!(
                    f,
                    "stream undecodable: {} of {} source symbols recovered",
                    recovered, total
                )
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e)
    }
}
