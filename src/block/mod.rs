//! Encoded block types.
//!
//! - [`EncodedBlock`] - Sequence index, integrity digest, XOR payload
//! - [`BlockDigest`] - 32-byte keyed BLAKE3 digest

mod data;
mod digest;

pub use data::{BLOCK_HEADER_LEN, EncodedBlock};
pub use digest::BlockDigest;
