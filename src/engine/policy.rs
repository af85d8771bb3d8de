//! Tie-break policies for the grant and accept phases.
//!
//! Every phase of an iterative matcher reduces to the same question: given a
//! set of candidate ports, which one wins? The answer depends on the
//! algorithm family:
//!
//! | Policy | Family | Rule |
//! |--------|--------|------|
//! | [`TieBreak::RoundRobin`] | SLIP | first candidate at or after the port's pointer, circularly |
//! | [`TieBreak::Random`] | PIM | uniform draw from the instance PRNG |
//! | [`TieBreak::Weighted`] | iLQF / iOCF | highest weight, lowest index on ties |

use rand::Rng;

use crate::types::Bitmap;

/// How a port chooses among competing candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TieBreak {
    /// Rotating priority pointer (SLIP).
    RoundRobin,
    /// Uniform random choice (PIM).
    Random,
    /// Largest request weight wins.
    Weighted,
}

impl TieBreak {
    /// True if this policy keeps rotating pointers.
    #[inline]
    pub fn uses_pointers(self) -> bool {
        matches!(self, TieBreak::RoundRobin)
    }

    /// Pick one candidate in `0..len`.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Ports competing this phase
    /// * `len` - Number of ports on the candidate side
    /// * `pointer` - Rotating pointer of the choosing port (RoundRobin only)
    /// * `weight` - Request weight of each candidate (Weighted only)
    /// * `rng` - Instance PRNG (Random only)
    ///
    /// # Returns
    ///
    /// The winning candidate, or `None` if there are no candidates.
    pub fn pick<R, W>(
        self,
        candidates: &Bitmap,
        len: usize,
        pointer: usize,
        weight: W,
        rng: &mut R,
    ) -> Option<usize>
    where
        R: Rng + ?Sized,
        W: Fn(usize) -> u64,
    {
        match self {
            TieBreak::RoundRobin => candidates.next_set_circular(pointer, len),
            TieBreak::Random => {
                let count = candidates.iter_ones().take_while(|&c| c < len).count();
                if count == 0 {
                    return None;
                }
                let k = rng.gen_range(0..count);
                candidates.iter_ones().nth(k)
            }
            TieBreak::Weighted => {
                let mut best: Option<(usize, u64)> = None;
                for c in candidates.iter_ones().take_while(|&c| c < len) {
                    let w = weight(c);
                    // strict comparison keeps the lowest index on ties
                    if best.map_or(true, |(_, bw)| w > bw) {
                        best = Some((c, w));
                    }
                }
                best.map(|(c, _)| c)
            }
        }
    }
}
