//! Seedable pseudo-random generator for graph construction.
//!
//! xoshiro256** seeded through splitmix64. Not cryptographic; the only
//! requirement is that every platform produces the same sequence.

/// Per-symbol multiplier applied to the stream seed (2^64 / golden ratio).
const SYMBOL_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone)]
pub(crate) struct Xoshiro256 {
    state: [u64; 4],
}

impl Xoshiro256 {
    pub(crate) fn from_seed(seed: u64) -> Self {
        let mut state = [0u64; 4];
        let mut z = seed;
        for slot in &mut state {
            z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            *slot = z ^ (z >> 31);
        }
        Self { state }
    }

    /// Independent generator for source symbol `index` of a stream.
    pub(crate) fn for_symbol(stream_seed: u64, index: u64) -> Self {
        Self::from_seed(stream_seed ^ index.wrapping_mul(SYMBOL_STRIDE))
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);
        result
    }

    /// Uniform value in `[0, bound)`. `bound` must be non-zero.
    pub(crate) fn below(&mut self, bound: usize) -> usize {
        // Multiply-shift; bias is negligible for the small bounds used here.
        ((self.next_u64() as u128 * bound as u128) >> 64) as usize
    }
}
