//! Iterative request/grant/accept matching (SLIP, PIM, iLQF family).
//!
//! ## Phases
//!
//! Each iteration of a slot runs three phases over the ports still unmatched:
//!
//! 1. **Request**: every free input requests every free output it holds a
//!    nonzero-weight request for.
//! 2. **Grant**: every free output picks one requesting input.
//! 3. **Accept**: every free input picks one granting output; the pair is
//!    connected and both ports leave the slot.
//!
//! Iteration stops when an iteration connects nothing or the configured cap
//! is reached.
//!
//! ## Pointer Rule
//!
//! Under [`TieBreak::RoundRobin`] each output keeps a grant pointer and each
//! input an accept pointer, per priority ring. When an accept happens in the
//! *first* iteration of a ring, the output's pointer moves to one past the
//! input and the input's pointer to one past the output. Matches made in
//! later iterations never move pointers. This is what desynchronizes the
//! outputs under load and bounds how long a persistently requesting input
//! can wait.
//!
//! ## Example
//!
//! ```
//! use crossbar_match::engine::{IterativeMatcher, MatcherConfig, TieBreak};
//! use crossbar_match::types::{Matching, RequestMatrix};
//!
//! let requests = RequestMatrix::from_rows(&[
//!     vec![1, 0],
//!     vec![1, 0],
//! ]).unwrap();
//! let spec = requests.spec();
//!
//! let mut slip = IterativeMatcher::new(spec, TieBreak::RoundRobin, MatcherConfig::defaults(spec));
//! let m = slip.run(&requests, 0, &Matching::new(spec));
//! assert_eq!(m.input_of(0), Some(0));
//!
//! // Output 0's pointer moved past input 0, so input 1 wins next slot.
//! let m = slip.run(&requests, 0, &Matching::new(spec));
//! assert_eq!(m.input_of(0), Some(1));
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::engine::config::MatcherConfig;
use crate::engine::policy::TieBreak;
use crate::types::{Bitmap, Matching, RequestMatrix, SwitchSpec};

/// Rotating pointers of one priority ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingPointers {
    /// Per output: input to start the grant scan at.
    pub grant: Vec<usize>,
    /// Per input: output to start the accept scan at.
    pub accept: Vec<usize>,
}

impl RingPointers {
    pub(crate) fn new(spec: SwitchSpec) -> Self {
        Self {
            grant: vec![0; spec.outputs],
            accept: vec![0; spec.inputs],
        }
    }
}

/// Per-switch state of an iterative matcher instance.
#[derive(Debug, Clone)]
pub struct IterativeMatcher {
    spec: SwitchSpec,
    policy: TieBreak,
    iterations: usize,
    rings: Vec<RingPointers>,
    rng: ChaCha8Rng,
}

impl IterativeMatcher {
    /// Create a matcher with all pointers at 0 and the PRNG seeded from
    /// `config.seed`.
    pub fn new(spec: SwitchSpec, policy: TieBreak, config: MatcherConfig) -> Self {
        Self {
            spec,
            policy,
            iterations: config.iterations.max(1),
            rings: (0..config.priorities.max(1)).map(|_| RingPointers::new(spec)).collect(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    /// Tie-break policy of this instance.
    #[inline]
    pub fn policy(&self) -> TieBreak {
        self.policy
    }

    /// Iteration cap per ring.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Number of priority rings this instance keeps pointers for.
    #[inline]
    pub fn levels(&self) -> usize {
        self.rings.len()
    }

    /// Pointers of a priority ring, `None` outside the configured rings.
    pub fn pointers(&self, priority: usize) -> Option<&RingPointers> {
        self.rings.get(priority)
    }

    /// Compute the matching for one priority ring of one slot.
    ///
    /// # Arguments
    ///
    /// * `requests` - Weights for this ring (0 = no request)
    /// * `priority` - Ring index, 0 is highest
    /// * `claimed` - Pairs already matched by higher rings this slot; their
    ///   ports are excluded
    ///
    /// # Returns
    ///
    /// The pairs matched in this ring only.
    ///
    /// # Panics
    ///
    /// Panics if `requests` does not have this switch's shape, or if
    /// `priority` is not below [`IterativeMatcher::levels`].
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
        let rng = &mut self.rng;

        let mut matching = Matching::new(self.spec);
        let mut free_in = Bitmap::full(inputs).and_not(&claimed.matched_inputs());
        let mut free_out = Bitmap::full(outputs).and_not(&claimed.matched_outputs());
        let wanted: Vec<Bitmap> = (0..inputs).map(|i| requests.row_bitmap(i)).collect();

        let mut requesters = vec![Bitmap::new(); outputs];
        let mut grants = vec![Bitmap::new(); inputs];
        let mut used = 0;

        for iteration in 0..self.iterations {
            // Request
            requesters.iter_mut().for_each(Bitmap::reset);
            for i in free_in.iter_ones() {
                for o in wanted[i].and(&free_out).iter_ones() {
                    requesters[o].set_bit(i);
                }
            }

            // Grant
            grants.iter_mut().for_each(Bitmap::reset);
            for o in free_out.iter_ones() {
                let pick = policy.pick(
                    &requesters[o],
                    inputs,
                    pointers.grant[o],
                    |i| requests.get(i, o),
                    &mut *rng,
                );
                if let Some(i) = pick {
                    grants[i].set_bit(o);
                }
            }

            // Accept
            let mut connected = 0;
            let candidates: Vec<usize> = free_in.iter_ones().collect();
            for i in candidates {
                let pick = policy.pick(
                    &grants[i],
                    outputs,
                    pointers.accept[i],
                    |o| requests.get(i, o),
                    &mut *rng,
                );
                let Some(o) = pick else { continue };

                matching.connect(i, o);
                free_in.clear_bit(i);
                free_out.clear_bit(o);
                connected += 1;

                if iteration == 0 && policy.uses_pointers() {
                    pointers.grant[o] = (i + 1) % inputs;
                    pointers.accept[i] = (o + 1) % outputs;
                }
            }

            used = iteration + 1;
            trace!(priority, iteration, connected, "iteration complete");
            if connected == 0 {
                break;
            }
        }

        debug!(
            ?policy,
            priority,
            iterations = used,
            matched = matching.len(),
            "ring matched"
        );
        matching
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(n: usize) -> SwitchSpec {
        SwitchSpec::square(n).unwrap()
    }

    fn slip(n: usize, iterations: usize) -> IterativeMatcher {
        let mut cfg = MatcherConfig::defaults(spec(n));
        cfg.iterations = iterations;
        cfg.priorities = 2;
        IterativeMatcher::new(spec(n), TieBreak::RoundRobin, cfg)
    }

    fn empty(n: usize) -> Matching {
        Matching::new(spec(n))
    }

    #[test]
    fn test_no_requests_no_matches() {
        let mut m = slip(4, 4);
        let out = m.run(&RequestMatrix::new(spec(4)), 0, &empty(4));
        assert!(out.is_empty());
        assert_eq!(m.pointers(0).unwrap().grant, vec![0; 4]);
    }

    #[test]
    fn test_first_iteration_pointer_update_only() {
        // All inputs want every output; with pointers at 0 every output grants
        // input 0 in iteration 1, the rest is filled in by later iterations.
        let requests = RequestMatrix::from_rows(&vec![vec![1; 3]; 3]).unwrap();
        let mut m = slip(3, 3);
        let out = m.run(&requests, 0, &empty(3));

        assert_eq!(out.len(), 3);
        assert_eq!(out.output_of(0), Some(0));
        let p = m.pointers(0).unwrap();
        // only the first-iteration pair (0, 0) moved pointers
        assert_eq!(p.grant, vec![1, 0, 0]);
        assert_eq!(p.accept, vec![1, 0, 0]);
    }

    #[test]
    fn test_single_iteration_leaves_unmatched() {
        let requests = RequestMatrix::from_rows(&vec![vec![1; 3]; 3]).unwrap();
        let mut m = slip(3, 1);
        let out = m.run(&requests, 0, &empty(3));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_pointer_wraps() {
        let requests = RequestMatrix::from_rows(&[vec![0, 0], vec![1, 0]]).unwrap();
        let mut m = slip(2, 1);
        m.run(&requests, 0, &empty(2));
        let p = m.pointers(0).unwrap();
        assert_eq!(p.grant[0], 0); // one past input 1 wraps to 0
        assert_eq!(p.accept[1], 1);
    }

    #[test]
    fn test_claimed_ports_excluded() {
        let requests = RequestMatrix::from_rows(&vec![vec![1; 2]; 2]).unwrap();
        let mut claimed = empty(2);
        claimed.connect(0, 0);

        let mut m = slip(2, 2);
        let out = m.run(&requests, 1, &claimed);
        assert_eq!(out.pairs().collect::<Vec<_>>(), vec![(1, 1)]);
        // ring 1 pointers wrap back to 0 after (1, 1); ring 0 untouched
        assert_eq!(m.pointers(0).unwrap().grant, vec![0, 0]);
        assert_eq!(m.pointers(1).unwrap().grant, vec![0, 0]);
        assert_eq!(m.pointers(1).unwrap().accept, vec![0, 0]);
    }

    #[test]
    fn test_rings_fixed_at_configured_count() {
        let m = slip(4, 1);
        assert_eq!(m.levels(), 2);
        assert!(m.pointers(1).is_some());
        assert!(m.pointers(2).is_none());
    }

    #[test]
    #[should_panic(expected = "outside the 2 configured")]
    fn test_unconfigured_ring_panics() {
        let mut m = slip(4, 1);
        m.run(&RequestMatrix::new(spec(4)), 2_000_000, &empty(4));
    }

    #[test]
    fn test_weighted_prefers_heavy_requests() {
        let requests = RequestMatrix::from_rows(&[
            vec![2, 0],
            vec![9, 1],
        ])
        .unwrap();
        let s = spec(2);
        let mut m = IterativeMatcher::new(s, TieBreak::Weighted, MatcherConfig::defaults(s));
        let out = m.run(&requests, 0, &empty(2));
        // output 0 grants the weight-9 request; input 0 is left with nothing
        assert_eq!(out.input_of(0), Some(1));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_random_respects_requests() {
        let requests = RequestMatrix::from_rows(&[
            vec![1, 0, 1],
            vec![0, 1, 0],
            vec![1, 1, 0],
        ])
        .unwrap();
        let s = spec(3);
        let mut m = IterativeMatcher::new(s, TieBreak::Random, MatcherConfig::defaults(s));
        for _ in 0..50 {
            let out = m.run(&requests, 0, &empty(3));
            assert!(out.respects(&requests));
            assert!(out.is_unicast());
        }
    }

    #[test]
    #[should_panic(expected = "shape differs")]
    fn test_shape_mismatch_panics() {
        let mut m = slip(4, 1);
        m.run(&RequestMatrix::new(spec(3)), 0, &empty(4));
    }
}
