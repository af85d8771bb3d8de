//! Primal-dual Hungarian solver for the square min-cost assignment problem.

use crate::types::AssignmentError;

/// Validated square matrix of non-negative costs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    n: usize,
    /// Row-major, `n * n` entries
    costs: Vec<i64>,
}

impl CostMatrix {
    /// Build from rows, rejecting empty, ragged/non-square and negative input.
    pub fn from_rows(rows: &[Vec<i64>]) -> Result<Self, AssignmentError> {
        let n = rows.len();
        if n == 0 {
            return Err(AssignmentError::Empty);
        }
        let mut costs = Vec::with_capacity(n * n);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(AssignmentError::NotSquare { rows: n, row, cols: values.len() });
            }
            if let Some(col) = values.iter().position(|&c| c < 0) {
                return Err(AssignmentError::NegativeCost { row, col, value: values[col] });
            }
            costs.extend_from_slice(values);
        }
        Ok(Self { n, costs })
    }

    /// Turn an `n * n` row-major benefit matrix into costs
    /// `max_benefit - benefit`, so minimizing cost maximizes benefit.
    ///
    /// # Panics
    ///
    /// Panics if `benefits` is empty or does not hold `n * n` entries, or if
    /// a benefit does not fit in an `i64`.
    pub fn from_benefits(n: usize, benefits: &[u64]) -> Self {
        assert!(n > 0 && benefits.len() == n * n, "benefit matrix is not {n}x{n}");
        let max = benefits.iter().copied().max().unwrap_or(0);
        assert!(max <= i64::MAX as u64, "benefit {max} does not fit a cost");
        let costs = benefits.iter().map(|&b| (max - b) as i64).collect();
        Self { n, costs }
    }

    /// Matrix dimension.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Cost of assigning `row` to `col`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.costs[row * self.n + col]
    }
}

/// Optimal assignment with its dual certificate.
///
/// For every `(i, j)`: `row_dual[i] + col_dual[j] <= cost(i, j)`, with
/// equality when `assignment[i] == j`. Summing the duals gives `cost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Column assigned to each row.
    pub assignment: Vec<usize>,
    /// Row potentials.
    pub row_dual: Vec<i64>,
    /// Column potentials.
    pub col_dual: Vec<i64>,
    /// Total cost of the assignment.
    pub cost: i64,
}

impl Assignment {
    /// `(row, col)` pairs in row order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.assignment.iter().copied().enumerate()
    }
}

/// Hungarian algorithm with reusable scratch.
///
/// The potentials, the column-to-row map and the augmenting-path buffers are
/// owned by the instance and grow to the largest `n` solved, so repeated
/// per-slot solves on one switch do not allocate. Runs in `O(n^3)` time.
///
/// # Example
///
/// ```
/// use crossbar_match::assignment::{AssignmentSolver, CostMatrix};
///
/// let cost = CostMatrix::from_rows(&[
///     vec![4, 1, 3],
///     vec![2, 0, 5],
///     vec![3, 2, 2],
/// ]).unwrap();
///
/// let mut solver = AssignmentSolver::new();
/// let result = solver.solve(&cost);
/// assert_eq!(result.assignment, vec![1, 0, 2]);
/// assert_eq!(result.cost, 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssignmentSolver {
    /// Row potentials, 1-indexed
    u: Vec<i64>,
    /// Column potentials, 1-indexed; `v[0]` ends as minus the total cost
    v: Vec<i64>,
    /// Row matched to each column, 1-indexed, 0 = free
    p: Vec<usize>,
    /// Previous column on the alternating path
    way: Vec<usize>,
    /// Smallest reduced cost seen per column in the current phase
    minv: Vec<i64>,
    /// Columns in the current alternating tree
    used: Vec<bool>,
}

impl AssignmentSolver {
    /// Create a solver with no scratch allocated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a solver with scratch for matrices up to `n x n`.
    pub fn with_capacity(n: usize) -> Self {
        let mut solver = Self::new();
        solver.reserve(n);
        solver
    }

    /// Largest `n` the scratch currently covers.
    pub fn capacity(&self) -> usize {
        self.p.len().saturating_sub(1)
    }

    fn reserve(&mut self, n: usize) {
        if self.p.len() < n + 1 {
            self.u.resize(n + 1, 0);
            self.v.resize(n + 1, 0);
            self.p.resize(n + 1, 0);
            self.way.resize(n + 1, 0);
            self.minv.resize(n + 1, 0);
            self.used.resize(n + 1, false);
        }
    }

    /// Validate `rows` and solve.
    pub fn solve_rows(&mut self, rows: &[Vec<i64>]) -> Result<Assignment, AssignmentError> {
        let cost = CostMatrix::from_rows(rows)?;
        Ok(self.solve(&cost))
    }

    /// Compute a minimum-cost perfect assignment of `cost`.
    pub fn solve(&mut self, cost: &CostMatrix) -> Assignment {
        let n = cost.n();
        self.reserve(n);
        self.u[..=n].fill(0);
        self.v[..=n].fill(0);
        self.p[..=n].fill(0);
        self.way[..=n].fill(0);

        for row in 1..=n {
            self.p[0] = row;
            let mut j0 = 0;
            self.minv[..=n].fill(i64::MAX);
            self.used[..=n].fill(false);

            // grow the alternating tree until it reaches a free column
            loop {
                self.used[j0] = true;
                let i0 = self.p[j0];
                let mut delta = i64::MAX;
                let mut j1 = 0;
                for j in 1..=n {
                    if self.used[j] {
                        continue;
                    }
                    let reduced = cost.get(i0 - 1, j - 1) - self.u[i0] - self.v[j];
                    if reduced < self.minv[j] {
                        self.minv[j] = reduced;
                        self.way[j] = j0;
                    }
                    if self.minv[j] < delta {
                        delta = self.minv[j];
                        j1 = j;
                    }
                }
                for j in 0..=n {
                    if self.used[j] {
                        self.u[self.p[j]] += delta;
                        self.v[j] -= delta;
                    } else {
                        self.minv[j] -= delta;
                    }
                }
                j0 = j1;
                if self.p[j0] == 0 {
                    break;
                }
            }

            // flip the path back to the root
            loop {
                let j1 = self.way[j0];
                self.p[j0] = self.p[j1];
                j0 = j1;
                if j0 == 0 {
                    break;
                }
            }
        }

        let mut assignment = vec![0; n];
        for j in 1..=n {
            assignment[self.p[j] - 1] = j - 1;
        }
        Assignment {
            assignment,
            row_dual: self.u[1..=n].to_vec(),
            col_dual: self.v[1..=n].to_vec(),
            cost: -self.v[0],
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
