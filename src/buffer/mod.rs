//! Internal buffer management for reader-driven encoding.
//!
//! This module provides a thread-local buffer pool to minimize allocations
//! when pulling input from readers. It is an implementation detail and not
//! part of the public API.

mod pool;

pub(crate) use pool::Buffer;
