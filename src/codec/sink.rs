//! Output capability injected into encoders and decoders.

use std::collections::VecDeque;

use bytes::Bytes;

/// Receives the bytes a codec produces.
///
/// The encoder calls [`emit`](ByteSink::emit) once per wire block; the decoder
/// calls it exactly once with the reconstructed stream. Any `FnMut(Bytes)`
/// is a sink, so a closure pushing into a `Vec`, sending on a channel, or
/// writing to a socket all work.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use fountain::{CodecConfig, StreamEncoder};
///
/// let (tx, rx) = std::sync::mpsc::channel();
/// let mut encoder = StreamEncoder::new(CodecConfig::default(), move |block: Bytes| {
///     let _ = tx.send(block);
/// })?;
///
/// encoder.set_size(3);
/// encoder.encode_block(b"abc");
/// encoder.flush()?;
/// drop(encoder);
///
/// assert_eq!(rx.iter().count(), 2);
/// # Ok::<(), fountain::CodecError>(())
/// ```
pub trait ByteSink {
    /// Accepts one unit of output.
    fn emit(&mut self, data: Bytes);
}

impl<F: FnMut(Bytes)> ByteSink for F {
    fn emit(&mut self, data: Bytes) {
        self(data)
    }
}

/// FIFO sink used by the pull-based adapters.
#[derive(Debug, Default)]
pub(crate) struct BlockQueue {
    blocks: VecDeque<Bytes>,
}

impl BlockQueue {
    pub(crate) fn pop(&mut self) -> Option<Bytes> {
        self.blocks.pop_front()
    }
}

impl ByteSink for BlockQueue {
    fn emit(&mut self, data: Bytes) {
        self.blocks.push_back(data);
    }
}
