//! Maximum-weight matching over a request matrix via the assignment solver.

use tracing::{debug, warn};

use crate::assignment::solver::{AssignmentSolver, CostMatrix};
use crate::types::{Bitmap, Matching, RequestMatrix, SwitchSpec};

/// Weights above this are clamped so that costs and potentials stay well
/// inside `i64` for any switch size.
pub const MAX_WEIGHT: u64 = 1 << 40;

/// Exact matching that maximizes the total request weight of one ring.
///
/// The request matrix is padded to `n x n` with `n = max(inputs, outputs)`,
/// ports claimed by higher rings get benefit 0, and the assignment is solved
/// on `cost = max_benefit - benefit`. Pairs whose benefit was 0 are dropped,
/// so padding, claimed ports and absent requests never appear in the result.
#[derive(Debug, Clone)]
pub struct MaxWeightMatcher {
    spec: SwitchSpec,
    unit_weights: bool,
    levels: usize,
    solver: AssignmentSolver,
    /// Row-major `n * n` benefits, reused across slots
    benefits: Vec<u64>,
}

impl MaxWeightMatcher {
    /// Matcher maximizing total weight.
    pub fn new(spec: SwitchSpec) -> Self {
        Self {
            spec,
            unit_weights: false,
            levels: 1,
            solver: AssignmentSolver::with_capacity(spec.max_ports()),
            benefits: Vec::new(),
        }
    }

    /// Matcher maximizing the number of pairs: every nonzero request counts
    /// as weight 1.
    pub fn maximum_size(spec: SwitchSpec) -> Self {
        Self { unit_weights: true, ..Self::new(spec) }
    }

    /// Serve `levels` priority rings instead of one.
    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels.max(1);
        self
    }

    /// Number of priority rings this instance serves. The solver keeps no
    /// per-ring state; the count only bounds the rings a switch may run.
    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Compute the matching for one priority ring of one slot.
    ///
    /// # Panics
    ///
    /// Panics if `requests` does not have this switch's shape.
    pub fn run(&mut self, requests: &RequestMatrix, priority: usize, claimed: &Matching) -> Matching {
        assert_eq!(requests.spec(), self.spec, "request matrix shape differs from switch");
        let SwitchSpec { inputs, outputs } = self.spec;
        let n = self.spec.max_ports();

        let free_in = Bitmap::full(inputs).and_not(&claimed.matched_inputs());
        let free_out = Bitmap::full(outputs).and_not(&claimed.matched_outputs());

        self.benefits.clear();
        self.benefits.resize(n * n, 0);
        let mut clamped = 0usize;
        for i in free_in.iter_ones() {
            for o in free_out.iter_ones() {
                let w = match requests.get(i, o) {
                    0 => 0,
                    _ if self.unit_weights => 1,
                    w if w > MAX_WEIGHT => {
                        clamped += 1;
                        MAX_WEIGHT
                    }
                    w => w,
                };
                self.benefits[i * n + o] = w;
            }
        }
        if clamped > 0 {
            warn!(priority, clamped, max = MAX_WEIGHT, "request weights clamped");
        }

        let mut matching = Matching::new(self.spec);
        if self.benefits.iter().all(|&b| b == 0) {
            debug!(priority, matched = 0, "ring has no requests");
            return matching;
        }

        let cost = CostMatrix::from_benefits(n, &self.benefits);
        let result = self.solver.solve(&cost);
        for (i, o) in result.pairs() {
            if self.benefits[i * n + o] != 0 {
                matching.connect(i, o);
            }
        }

        debug!(
            priority,
            matched = matching.len(),
            weight = matching.total_weight(requests),
            "ring matched"
        );
        matching
    }
}
