//! Async stream adapter for encoding.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use futures_io::AsyncRead;
use pin_project_lite::pin_project;
use tracing::debug;

use crate::buffer::Buffer;
use crate::codec::{BlockQueue, StreamEncoder};
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::graph::StreamLayout;

pin_project! {
    /// A stream that yields encoded wire blocks from an async reader.
    ///
    /// This uses `futures_io::AsyncRead` which is runtime-agnostic.
    /// Works with tokio, async-std, smol, or any futures-compatible runtime.
    ///
    /// Created by [`encode_async`]. Blocks come out in index order; a read
    /// error or a size mismatch is yielded once, after the blocks already
    /// computed, and ends the stream.
    pub struct EncodeStream<R> {
        #[pin]
        reader: R,
        encoder: StreamEncoder<BlockQueue>,
        buffer: Buffer,
        error: Option<CodecError>,
        finished: bool,
    }
}

impl<R> EncodeStream<R> {
    /// Returns the stream layout.
    pub fn layout(&self) -> Option<&StreamLayout> {
        self.encoder.layout()
    }

    /// Returns the number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.encoder.bytes_received()
    }
}

impl<R: AsyncRead> Stream for EncodeStream<R> {
    type Item = Result<Bytes, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(block) = this.encoder.sink_mut().pop() {
                return Poll::Ready(Some(Ok(block)));
            }
            if *this.finished {
                return Poll::Ready(this.error.take().map(Err));
            }

            let n = match this.reader.as_mut().poll_read(cx, this.buffer.as_mut_slice()) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Poll::Ready(Err(e)) => {
                    *this.finished = true;
                    *this.error = Some(CodecError::Io(e));
                    continue;
                }
                Poll::Ready(Ok(n)) => n,
            };

            if n == 0 {
                *this.finished = true;
                match this.encoder.flush() {
                    Ok(()) => debug!(blocks = this.encoder.blocks_emitted(), "reader drained"),
                    Err(e) => *this.error = Some(e),
                }
                continue;
            }

            this.encoder.encode_block(this.buffer.filled(n));
            let declared = this.encoder.declared_size().unwrap_or_default();
            let received = this.encoder.bytes_received();
            if received > declared {
                *this.finished = true;
                *this.error = Some(CodecError::Overflow { declared, received });
            }
        }
    }
}

/// Creates a stream of wire blocks from an async reader.
///
/// Uses `futures_io::AsyncRead` for runtime-agnostic async I/O.
/// This works with any async runtime (tokio, async-std, smol, etc.).
///
/// # Runtime Compatibility
///
/// For tokio users, you can use `tokio_util::compat` to convert
/// `tokio::io::AsyncRead` to `futures_io::AsyncRead`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
/// use fountain::{encode_async, CodecConfig};
///
/// let file = tokio::fs::File::open("file").await?;
/// let len = file.metadata().await?.len();
/// let stream = encode_async(file.compat(), CodecConfig::default(), len)?;
/// ```
///
/// # Example
///
/// ```ignore
/// use fountain::{encode_async, CodecConfig};
/// use futures_util::StreamExt;
/// use futures_io::AsyncRead;
///
/// async fn demo<R: AsyncRead + Unpin>(reader: R, len: u64) -> Result<(), fountain::CodecError> {
///     let mut stream = encode_async(reader, CodecConfig::default(), len)?;
///
///     while let Some(block) = stream.next().await {
///         let block = block?;
///         println!("block {} bytes", block.len());
///     }
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// Fails up front if the configuration is invalid or `stream_len` cannot be
/// laid out.
pub fn encode_async<R: AsyncRead>(
    reader: R,
    config: CodecConfig,
    stream_len: u64,
) -> Result<EncodeStream<R>, CodecError> {
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

    Ok(EncodeStream {
        reader,
        encoder,
        buffer: Buffer::take(),
        error: None,
        finished: false,
    })
}
