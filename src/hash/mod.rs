//! Keyed BLAKE3 hashing for block integrity.
//!
//! Every stream derives a 32-byte key from its parameters. The key seeds the
//! redundancy graph and keys the per-block digest, so a block is only valid
//! for the exact stream it was produced for.
//!
//! - [`Blake3Hasher`] - Incremental keyed digest of one block
//! - [`derive_stream_key`] - Key derivation from stream parameters

mod blake3;

pub(crate) use self::blake3::{Blake3Hasher, derive_stream_key};
