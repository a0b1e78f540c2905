//! BLAKE3-based block digest implementation.

use crate::block::BlockDigest;
use crate::config::CodecConfig;

/// Context string for stream key derivation. Changing it invalidates every
/// previously encoded block.
const STREAM_KEY_CONTEXT: &str = "fountain 1 stream key";

/// Derives the stream key from the stream length and configuration.
///
/// The key material is `len || block_size || storage_factor bits || window_size`,
/// each as a little-endian `u64`.
pub(crate) fn derive_stream_key(stream_len: u64, config: &CodecConfig) -> [u8; 32] {
    let mut material = [0u8; 32];
    material[0..8].copy_from_slice(&stream_len.to_le_bytes());
    material[8..16].copy_from_slice(&(config.block_size() as u64).to_le_bytes());
    material[16..24].copy_from_slice(&config.storage_factor().to_bits().to_le_bytes());
    material[24..32].copy_from_slice(&(config.window_size() as u64).to_le_bytes());
    blake3::derive_key(STREAM_KEY_CONTEXT, &material)
}

/// A keyed hasher that computes block digests.
#[derive(Debug, Clone)]
pub(crate) struct Blake3Hasher {
    state: blake3::Hasher,
}

impl Blake3Hasher {
    /// Creates a new hasher keyed with a stream key.
    pub(crate) fn new_keyed(key: &[u8; 32]) -> Self {
        Self {
            state: blake3::Hasher::new_keyed(key),
        }
    }

    /// Updates the hasher with more data.
    pub(crate) fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finalizes and returns the digest.
    pub(crate) fn finalize(&self) -> BlockDigest {
        BlockDigest::new(self.state.finalize().into())
    }

    /// Resets the hasher to its keyed initial state.
    pub(crate) fn reset(&mut self) {
        self.state.reset();
    }

    /// Digests one block: the big-endian index followed by the payload.
    pub(crate) fn digest_block(&mut self, index: u32, payload: &[u8]) -> BlockDigest {
        self.reset();
        self.update(&index.to_be_bytes());
        self.update(payload);
        let digest = self.finalize();
        self.reset();
        digest
    }
}
