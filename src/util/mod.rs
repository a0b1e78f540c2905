//! Internal utility functions and helpers.
//!
//! This module contains the XOR kernels shared by the encoder and decoder.
//! It is an implementation detail and not part of the public API.

/// XORs `src` into `dst` byte by byte.
///
/// `src` may be shorter than `dst`; the missing tail is treated as zeros,
/// which is how a short final source symbol is padded.
pub(crate) fn xor_into(dst: &mut [u8], src: &[u8]) {
    debug_assert!(src.len() <= dst.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// Returns true if every byte is zero.
pub(crate) fn is_zero(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_into_is_involution() {
        let original = [1u8, 2, 3, 4];
        let mut buf = original;
        xor_into(&mut buf, &[0xFF, 0x0F, 0xF0, 0x00]);
        assert_ne!(buf, original);
        xor_into(&mut buf, &[0xFF, 0x0F, 0xF0, 0x00]);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_xor_into_short_source() {
        let mut buf = [0xAAu8; 4];
        xor_into(&mut buf, &[0xAA, 0xAA]);
        assert_eq!(buf, [0, 0, 0xAA, 0xAA]);
    }

    #[test]
    fn test_is_zero() {
        assert!(is_zero(&[]));
        assert!(is_zero(&[0, 0, 0]));
        assert!(!is_zero(&[0, 1, 0]));
    }
}
