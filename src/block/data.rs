//! The EncodedBlock type - one fixed-size unit on the wire.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use super::BlockDigest;
use crate::error::CodecError;
use crate::hash::Blake3Hasher;

/// Length of the block header: 4-byte index plus 32-byte digest.
pub const BLOCK_HEADER_LEN: usize = 4 + BlockDigest::SIZE;

/// An encoded block with its header.
///
/// Wire layout, `BLOCK_HEADER_LEN + block_size` bytes in total:
///
/// ```text
/// +----------------+-------------------------+---------------------+
/// | index (u32 BE) | digest (32 bytes)       | payload (block_size)|
/// +----------------+-------------------------+---------------------+
/// ```
///
/// The digest is a BLAKE3 hash keyed with the stream key over the index
/// bytes and the payload. Nothing else about the stream travels with a
/// block; the redundancy graph is recomputed by the receiver.
///
/// # Example
///
/// ```
/// use fountain::{CodecConfig, EncodedBlock, encode_bytes};
///
/// let config = CodecConfig::default();
/// let blocks = encode_bytes(config, &b"hello world"[..])?;
///
/// let first = EncodedBlock::parse(&blocks[0], config.block_size())?;
/// assert_eq!(first.index(), 0);
/// assert_eq!(first.payload().len(), config.block_size());
/// # Ok::<(), fountain::CodecError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    index: u32,
    digest: BlockDigest,
    payload: Bytes,
}

impl EncodedBlock {
    /// Creates a block, computing its digest with the stream hasher.
    pub(crate) fn seal(index: u32, payload: Bytes, hasher: &mut Blake3Hasher) -> Self {
        let digest = hasher.digest_block(index, &payload);
        Self {
            index,
            digest,
            payload,
        }
    }

    /// Parses a block from its wire form without verifying the digest.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedBlock`] if `data` is not exactly
    /// `BLOCK_HEADER_LEN + block_size` bytes.
    pub fn parse(data: &[u8], block_size: usize) -> Result<Self, CodecError> {
        let expected = BLOCK_HEADER_LEN + block_size;
        if data.len() != expected {
            return Err(CodecError::MalformedBlock {
                actual: data.len(),
                expected,
            });
        }

        let mut buf = data;
        let index = buf.get_u32();
        let mut digest = [0u8; BlockDigest::SIZE];
        buf.copy_to_slice(&mut digest);

        Ok(Self {
            index,
            digest: BlockDigest::new(digest),
            payload: Bytes::copy_from_slice(buf),
        })
    }

    /// Checks the digest against the payload with the stream hasher.
    pub(crate) fn verify(&self, hasher: &mut Blake3Hasher) -> bool {
        hasher
            .digest_block(self.index, &self.payload)
            .matches(&self.digest)
    }

    /// Serializes the block to its wire form.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        buf.put_u32(self.index);
        buf.put_slice(self.digest.as_bytes());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Returns the sequence index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the integrity digest.
    pub fn digest(&self) -> BlockDigest {
        self.digest
    }

    /// Returns the XOR payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Returns the length of the wire form.
    pub fn wire_len(&self) -> usize {
        BLOCK_HEADER_LEN + self.payload.len()
    }

    /// Consumes the block and returns the payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl fmt::Display for EncodedBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block(#{}, {} bytes, digest={})",
            self.index,
            self.payload.len(),
            &self.digest.to_hex()[..16]
        )
    }
}
