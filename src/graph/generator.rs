//! Deterministic sparse XOR graph.
//!
//! # Construction
//!
//! A stream of `K` source symbols is carried by `M` blocks: one systematic
//! block per symbol, which is a plain copy of it, and `R = M - K` repair
//! blocks, which XOR several symbols together.
//!
//! Repair block `r` is placed at slot `floor(r * V / R)` on a line of
//! `V = K + w - 1` slots, `w` being the window in symbols. Source symbol `i`
//! feeds `c` of the repair blocks whose slot lies in `[i, i + w - 1]` (all of
//! them if there are fewer), drawn without replacement from the symbol's own
//! generator. The `w - 1` slots past the last symbol give the end of the
//! stream as many repair blocks as the middle.
//!
//! The symbol degree `c` is `ceil(6 * R / K)` clamped to
//! [`MIN_SYMBOL_DEGREE`]`..=`[`MAX_SYMBOL_DEGREE`], so repair blocks average
//! about six neighbors whatever the storage factor.
//!
//! # Ordering
//!
//! A block's *anchor* is the highest source symbol it may mix: the symbol
//! itself for a systematic block, `min(slot, K - 1)` for a repair block.
//! Blocks are numbered by anchor, systematic block first, so the encoder can
//! emit them in index order while only the repair blocks of the current
//! window are in progress.
//!
//! A repair block that no symbol picked carries a copy of its anchor.
//!
//! # Determinism
//!
//! Each source symbol draws from its own xoshiro256** generator seeded with
//! `stream_seed ^ i * 0x9e3779b97f4a7c15`. Either side can compute any part
//! of the graph, in any order, with no shared state.

use tracing::debug;

use super::StreamLayout;
use super::rng::Xoshiro256;
use crate::error::CodecError;

/// Lower bound on the number of repair blocks each source symbol feeds.
pub const MIN_SYMBOL_DEGREE: usize = 4;

/// Upper bound on the number of repair blocks each source symbol feeds.
pub const MAX_SYMBOL_DEGREE: usize = 32;

/// Average repair block degree the symbol degree is chosen for.
const REPAIR_DEGREE: usize = 6;

/// The bipartite graph between source symbols and encoded blocks.
///
/// # Example
///
/// ```
/// use fountain::RedundancyGraph;
///
/// let graph = RedundancyGraph::generate(8, 17, 4, 0xfeed)?;
///
/// for j in 0..graph.encoded_count() {
///     let neighbors = graph.neighbors(j);
///     assert!(!neighbors.is_empty());
///     assert!(*neighbors.last().unwrap() <= graph.anchor(j));
/// }
/// # Ok::<(), fountain::CodecError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundancyGraph {
    source_count: usize,
    encoded_count: usize,
    window: usize,
    seed: u64,
    repair_count: usize,
    slots: usize,
    symbol_degree: usize,
}

impl RedundancyGraph {
    /// Generates a graph from explicit parameters.
    ///
    /// # Errors
    ///
    /// - [`CodecError::InvalidConfig`] if `source_count` or `window` is zero,
    ///   or there is no room for a repair block
    /// - [`CodecError::UnreachableSource`] if there are fewer blocks than
    ///   source symbols, leaving some symbol in no block at all
    pub fn generate(
        source_count: usize,
        encoded_count: usize,
        window: usize,
        seed: u64,
    ) -> Result<Self, CodecError> {
        if source_count == 0 {
            return Err(CodecError::InvalidConfig {
                message: "graph needs at least one source symbol",
            });
        }
        if window == 0 {
            return Err(CodecError::InvalidConfig {
                message: "graph window must be non-zero",
            });
        }
        if encoded_count < source_count {
            return Err(CodecError::UnreachableSource {
                index: encoded_count,
            });
        }
        if encoded_count == source_count {
            return Err(CodecError::InvalidConfig {
                message: "graph needs at least one repair block",
            });
        }

        let window = window.min(source_count);
        let repair_count = encoded_count - source_count;
        let symbol_degree = REPAIR_DEGREE
            .saturating_mul(repair_count)
            .div_ceil(source_count)
            .clamp(MIN_SYMBOL_DEGREE, MAX_SYMBOL_DEGREE);

        Ok(Self {
            source_count,
            encoded_count,
            window,
            seed,
            repair_count,
            slots: source_count + window - 1,
            symbol_degree,
        })
    }

    /// Generates the graph for a stream, seeded from its stream key.
    pub(crate) fn for_stream(layout: &StreamLayout, key: &[u8; 32]) -> Result<Self, CodecError> {
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&key[..8]);
        let graph = Self::generate(
            layout.source_count(),
            layout.encoded_count(),
            layout.window(),
            u64::from_le_bytes(seed),
        )?;

        debug!(
            source_count = graph.source_count,
            repair_count = graph.repair_count,
            window = graph.window,
            symbol_degree = graph.symbol_degree,
            "graph built"
        );
        Ok(graph)
    }

    /// Returns the number of source symbols.
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    /// Returns the number of encoded blocks.
    pub fn encoded_count(&self) -> usize {
        self.encoded_count
    }

    /// Returns the number of repair (non-systematic) blocks.
    pub fn repair_count(&self) -> usize {
        self.repair_count
    }

    /// Returns the neighbor window in symbols.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns how many repair blocks a source symbol feeds when its window
    /// offers enough of them.
    pub fn symbol_degree(&self) -> usize {
        self.symbol_degree
    }

    fn slot(&self, repair: usize) -> usize {
        (repair as u128 * self.slots as u128 / self.repair_count as u128) as usize
    }

    /// Number of repair blocks placed before `slot`.
    pub(crate) fn repairs_before(&self, slot: usize) -> usize {
        let n = (slot as u128 * self.repair_count as u128).div_ceil(self.slots as u128);
        n.min(self.repair_count as u128) as usize
    }

    fn repair_anchor(&self, repair: usize) -> usize {
        self.slot(repair).min(self.source_count - 1)
    }

    /// Returns the block index of the systematic copy of `source`.
    pub fn systematic_index(&self, source: usize) -> usize {
        source + self.repairs_before(source)
    }

    /// Returns the block index of repair block `repair`.
    pub(crate) fn repair_index(&self, repair: usize) -> usize {
        self.repair_anchor(repair) + 1 + repair
    }

    /// Returns the highest source index block `index` depends on.
    pub fn anchor(&self, index: usize) -> usize {
        let (mut low, mut high) = (0, self.source_count - 1);
        while low < high {
            let mid = low + (high - low).div_ceil(2);
            if self.systematic_index(mid) <= index {
                low = mid;
            } else {
                high = mid - 1;
            }
        }
        low
    }

    /// Returns true if block `index` is a plain copy of its anchor.
    pub fn is_systematic(&self, index: usize) -> bool {
        self.systematic_index(self.anchor(index)) == index
    }

    /// Returns the repair blocks `source` feeds, as ascending repair numbers.
    pub(crate) fn repairs_of(&self, source: usize) -> Vec<usize> {
        let first = self.repairs_before(source);
        let count = self.repairs_before(source + self.window) - first;
        let degree = self.symbol_degree.min(count);
        let mut rng = Xoshiro256::for_symbol(self.seed, source as u64);

        // Floyd's sampling of `degree` distinct offsets from `0..count`.
        let mut picks = Vec::with_capacity(degree);
        for top in count - degree..count {
            let pick = rng.below(top + 1);
            if picks.contains(&pick) {
                picks.push(top);
            } else {
                picks.push(pick);
            }
        }
        picks.sort_unstable();
        picks.into_iter().map(|pick| first + pick).collect()
    }

    /// Returns the source indices XORed into block `index`, ascending.
    ///
    /// The result is never empty and never goes past the anchor.
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        let anchor = self.anchor(index);
        if self.systematic_index(anchor) == index {
            return vec![anchor];
        }

        let repair = index - anchor - 1;
        let slot = self.slot(repair);
        let low = (slot + 1).saturating_sub(self.window);
        let neighbors: Vec<usize> = (low..=anchor)
            .filter(|&source| self.repairs_of(source).contains(&repair))
            .collect();
        if neighbors.is_empty() {
            vec![anchor]
        } else {
            neighbors
        }
    }

    /// Returns the neighbor list of every block, indexed by block.
    ///
    /// Equivalent to calling [`neighbors`](Self::neighbors) for each block,
    /// but walks every source symbol once.
    pub(crate) fn neighbor_table(&self) -> Vec<Vec<usize>> {
        let mut table = vec![Vec::new(); self.encoded_count];
        for source in 0..self.source_count {
            table[self.systematic_index(source)].push(source);
            for repair in self.repairs_of(source) {
                table[self.repair_index(repair)].push(source);
            }
        }
        for repair in 0..self.repair_count {
            let index = self.repair_index(repair);
            if table[index].is_empty() {
                table[index].push(self.repair_anchor(repair));
            }
        }
        table
    }
}
