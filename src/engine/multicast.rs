//! Multicast iterative matching with fan-out splitting.
//!
//! A multicast input holds one head-of-line cell addressed to a set of
//! outputs (its fan-out, the nonzero entries of its request row). The
//! crossbar can copy that cell to any number of outputs in the same slot, so
//! an input that wins does not leave the slot: only the outputs it has been
//! connected to are removed from its residual fan-out, and it keeps
//! requesting the rest. Whatever is left at the end of the slot is the
//! residue.
//!
//! ## Residue Policies
//!
//! The two policies differ in both phases, not just in a tie-break:
//!
//! | Policy | Grant | Accept |
//! |--------|-------|--------|
//! | [`ResiduePolicy::Concentrate`] | smallest residual fan-out first | every grant |
//! | [`ResiduePolicy::Distribute`] | inputs not yet served this slot first | one grant per iteration |
//!
//! Concentrating completes cells and leaves the residue on the few inputs
//! already partially served. Distributing hands declined outputs to idle
//! inputs in the next iteration, spreading partial service (and residue)
//! across as many inputs as possible.
//!
//! Remaining ties go to the rotating pointers, which follow the same
//! first-iteration-only update rule as unicast SLIP. Grant decisions within
//! an iteration all see the state at the start of that iteration.

use tracing::{debug, trace};

use crate::engine::config::MatcherConfig;
use crate::engine::matcher::RingPointers;
use crate::types::{Bitmap, Matching, RequestMatrix, SwitchSpec};

/// How contention among multicast inputs is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResiduePolicy {
    /// Complete small fan-outs, leave residue on few inputs.
    Concentrate,
    /// Serve as many distinct inputs as possible.
    Distribute,
}

impl ResiduePolicy {
    fn grant(
        self,
        candidates: &Bitmap,
        len: usize,
        pointer: usize,
        residue: &[Bitmap],
        served: &Bitmap,
    ) -> Option<usize> {
        let preferred = match self {
            ResiduePolicy::Concentrate => {
                let smallest = candidates.iter_ones().map(|i| residue[i].pop_count()).min()?;
                Bitmap::from_indices(
                    candidates
                        .iter_ones()
                        .filter(|&i| residue[i].pop_count() == smallest),
                )
            }
            ResiduePolicy::Distribute => {
                let idle = candidates.and_not(served);
                if idle.any_bit_set() {
                    idle
                } else {
                    *candidates
                }
            }
        };
        preferred.next_set_circular(pointer, len)
    }

    fn accept(self, grants: &Bitmap, len: usize, pointer: usize) -> Bitmap {
        match self {
            ResiduePolicy::Concentrate => *grants,
            ResiduePolicy::Distribute => Bitmap::from_indices(grants.next_set_circular(pointer, len)),
        }
    }
}

/// Per-switch state of a multicast matcher instance.
#[derive(Debug, Clone)]
pub struct MulticastMatcher {
    spec: SwitchSpec,
    policy: ResiduePolicy,
    iterations: usize,
    rings: Vec<RingPointers>,
}

impl MulticastMatcher {
    /// Create a matcher with all pointers at 0.
    pub fn new(spec: SwitchSpec, policy: ResiduePolicy, config: MatcherConfig) -> Self {
        Self {
            spec,
            policy,
            iterations: config.iterations.max(1),
            rings: (0..config.priorities.max(1)).map(|_| RingPointers::new(spec)).collect(),
        }
    }

    /// Residue policy of this instance.
    #[inline]
    pub fn policy(&self) -> ResiduePolicy {
        self.policy
    }

    /// Number of priority rings this instance keeps pointers for.
    #[inline]
    pub fn levels(&self) -> usize {
        self.rings.len()
    }

    /// Pointers of a priority ring.
    pub fn pointers(&self, priority: usize) -> Option<&RingPointers> {
        self.rings.get(priority)
    }

    /// Compute the multicast matching for one priority ring of one slot.
    ///
    /// Inputs and outputs matched by higher rings (`claimed`) are excluded;
    /// an input carries one cell per slot, so a claimed input cannot send a
    /// lower-priority copy.
    ///
    /// # Panics
    ///
    /// Panics if `requests` does not have this switch's shape, or if
    /// `priority` is not below [`MulticastMatcher::levels`].
    pub fn run(&mut self, requests: &RequestMatrix, priority: usize, claimed: &Matching) -> Matching {
        assert_eq!(requests.spec(), self.spec, "request matrix shape differs from switch");
        assert!(
            priority < self.rings.len(),
            "priority ring {priority} outside the {} configured",
            self.rings.len()
        );
        let SwitchSpec { inputs, outputs } = self.spec;

        let policy = self.policy;
        let pointers = &mut self.rings[priority];

        let mut matching = Matching::new(self.spec);
        let claimed_in = claimed.matched_inputs();
        let mut free_out = Bitmap::full(outputs).and_not(&claimed.matched_outputs());
        let mut residue: Vec<Bitmap> = (0..inputs)
            .map(|i| {
                if claimed_in.test_bit(i) {
                    Bitmap::new()
                } else {
                    requests.row_bitmap(i)
                }
            })
            .collect();
        let mut served = Bitmap::new();
        let mut requesters = vec![Bitmap::new(); outputs];
        let mut grants = vec![Bitmap::new(); inputs];

        for iteration in 0..self.iterations {
            // Request
            requesters.iter_mut().for_each(Bitmap::reset);
            for (i, want) in residue.iter().enumerate() {
                for o in want.and(&free_out).iter_ones() {
                    requesters[o].set_bit(i);
                }
            }

            // Grant
            grants.iter_mut().for_each(Bitmap::reset);
            for o in free_out.iter_ones() {
                if let Some(i) = policy.grant(&requesters[o], inputs, pointers.grant[o], &residue, &served) {
                    grants[i].set_bit(o);
                }
            }

            // Accept
            let mut connected = 0;
            for i in 0..inputs {
                let accepted = policy.accept(&grants[i], outputs, pointers.accept[i]);
                let Some(first) = accepted.next_set_circular(pointers.accept[i], outputs) else {
                    continue;
                };
                for o in accepted.iter_ones() {
                    matching.connect_multicast(i, o);
                    residue[i].clear_bit(o);
                    free_out.clear_bit(o);
                    connected += 1;
                    if iteration == 0 {
                        pointers.grant[o] = (i + 1) % inputs;
                    }
                }
                if iteration == 0 {
                    pointers.accept[i] = (first + 1) % outputs;
                }
                served.set_bit(i);
            }

            trace!(priority, iteration, connected, "multicast iteration complete");
            if connected == 0 {
                break;
            }
        }

        let residue_cells = residue.iter().filter(|r| r.any_bit_set()).count();
        debug!(
            ?policy,
            priority,
            copies = matching.len(),
            residue_cells,
            "multicast ring matched"
        );
        matching
    }
}
