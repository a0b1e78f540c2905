//! Redundancy graph generation.
//!
//! This module holds the core of the code: which source symbols each encoded
//! block mixes together. The graph is never transmitted; encoder and decoder
//! rebuild it independently from the stream length and configuration.
//!
//! - [`StreamLayout`] - Symbol and block counts for one stream
//! - [`RedundancyGraph`] - Deterministic neighbor sets per encoded block

mod generator;
mod layout;
mod rng;

pub use generator::{MAX_SYMBOL_DEGREE, MIN_SYMBOL_DEGREE, RedundancyGraph};
pub use layout::StreamLayout;
