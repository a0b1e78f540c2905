//! Async streaming support for encoding.
//!
//! This module provides asynchronous encoding using the `futures-io::AsyncRead`
//! trait, making it runtime-agnostic and compatible with tokio, async-std,
//! smol, and other async runtimes.
//!
//! - [`encode_async`] - Creates an async stream of wire blocks from an async reader
//!
//! This module requires the `async-io` feature to be enabled.

mod stream;

pub use stream::{EncodeStream, encode_async};
