//! Thread-local pool of read buffers.

use std::cell::RefCell;
use std::io::{self, Read};

/// Size of one read from the underlying source.
pub const READ_BUFFER_SIZE: usize = 64 * 1024; // 64 KiB

/// Maximum number of buffers to keep per thread.
pub const MAX_POOL_SIZE: usize = 4;

/// A reusable, fixed-size read buffer.
///
/// Taken from the thread-local pool on creation and handed back on drop, so
/// repeatedly encoding small streams does not allocate a fresh 64 KiB buffer
/// each time.
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    /// Takes a buffer from the thread-local pool or creates a new one.
    pub fn take() -> Self {
        let mut data = THREAD_BUFFER_POOL
            .with(|pool| pool.borrow_mut().pop())
            .unwrap_or_default();
        data.resize(READ_BUFFER_SIZE, 0);
        Self { data }
    }

    /// Returns the whole buffer for a reader to fill.
    #[cfg_attr(not(feature = "async-io"), allow(dead_code))]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the first `len` bytes, as filled by the last read.
    #[cfg_attr(not(feature = "async-io"), allow(dead_code))]
    pub(crate) fn filled(&self, len: usize) -> &[u8] {
        &self.data[..len]
    }

    /// Reads once from `reader`, retrying on interruption.
    ///
    /// Returns the bytes read; an empty slice means end of stream.
    pub(crate) fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<&[u8]> {
        loop {
            match reader.read(&mut self.data) {
                Ok(n) => return Ok(&self.data[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        // Return the buffer to the pool if it's not too large
        if self.data.capacity() <= READ_BUFFER_SIZE * 2 {
            THREAD_BUFFER_POOL.with(|pool| {
                let mut pool = pool.borrow_mut();
                if pool.len() < MAX_POOL_SIZE {
                    pool.push(std::mem::take(&mut self.data));
                }
            });
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::take()
    }
}

// Thread-local buffer pool
thread_local! {
    static THREAD_BUFFER_POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_buffer_take() {
        let buf = Buffer::take();
        assert_eq!(buf.data.len(), READ_BUFFER_SIZE);
    }

    #[test]
    fn test_read_from() {
        let mut buf = Buffer::take();
        let mut reader = Cursor::new(b"hello world".to_vec());
        assert_eq!(buf.read_from(&mut reader).unwrap(), b"hello world");
        assert!(buf.read_from(&mut reader).unwrap().is_empty());
    }

    #[test]
    fn test_buffer_reuse() {
        {
            let mut buf = Buffer::take();
            buf.as_mut_slice()[0] = 0xAB;
        }

        // The same allocation comes back at full size
        let buf2 = Buffer::take();
        assert_eq!(buf2.filled(1).len(), 1);
        assert!(buf2.data.capacity() >= READ_BUFFER_SIZE);
    }
}
