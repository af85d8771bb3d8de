//! Per-slot request weights and switch shape.
//!
//! A [`RequestMatrix`] maps every `(input, output)` pair to a `u64` weight.
//! The meaning of the weight depends on the algorithm (presence, VOQ
//! occupancy, head-of-line waiting time), but zero always means "no pending
//! request": no algorithm may ever match a zero-weight pair.
//!
//! ## Priority Rings
//!
//! [`SlotRequests`] bundles one matrix per priority ring for a single slot.
//! Ring 0 is the highest priority and is matched first.

use crate::types::bitmap::{Bitmap, CAPACITY};
use crate::types::error::ConfigError;

/// Port counts of a crossbar switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwitchSpec {
    /// Number of input ports.
    pub inputs: usize,
    /// Number of output ports.
    pub outputs: usize,
}

impl SwitchSpec {
    /// Create a switch shape, rejecting zero or over-capacity port counts.
    ///
    /// # Example
    ///
    /// ```
    /// use crossbar_match::types::SwitchSpec;
    ///
    /// assert!(SwitchSpec::new(16, 16).is_ok());
    /// assert!(SwitchSpec::new(0, 4).is_err());
    /// ```
    pub fn new(inputs: usize, outputs: usize) -> Result<Self, ConfigError> {
        if inputs == 0 || outputs == 0 || inputs > CAPACITY || outputs > CAPACITY {
            return Err(ConfigError::InvalidShape { inputs, outputs, capacity: CAPACITY });
        }
        Ok(Self { inputs, outputs })
    }

    /// Square switch with `ports` inputs and outputs.
    pub fn square(ports: usize) -> Result<Self, ConfigError> {
        Self::new(ports, ports)
    }

    /// The larger of the two port counts.
    #[inline]
    pub fn max_ports(&self) -> usize {
        self.inputs.max(self.outputs)
    }
}

/// Request weights for one priority ring of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMatrix {
    inputs: usize,
    outputs: usize,
    /// Row-major, `inputs * outputs` entries
    weights: Vec<u64>,
}

impl RequestMatrix {
    /// Create an all-zero (no requests) matrix.
    pub fn new(spec: SwitchSpec) -> Self {
        Self {
            inputs: spec.inputs,
            outputs: spec.outputs,
            weights: vec![0; spec.inputs * spec.outputs],
        }
    }

    /// Build a matrix from rows of weights.
    ///
    /// All rows must have the same width and the shape must fit a switch.
    ///
    /// # Example
    ///
    /// ```
    /// use crossbar_match::types::RequestMatrix;
    ///
    /// let m = RequestMatrix::from_rows(&[vec![1, 0], vec![0, 3]]).unwrap();
    /// assert_eq!(m.get(1, 1), 3);
    /// assert!(!m.has_request(0, 1));
    /// ```
    pub fn from_rows(rows: &[Vec<u64>]) -> Result<Self, ConfigError> {
        let inputs = rows.len();
        let outputs = rows.first().map_or(0, Vec::len);
        let spec = SwitchSpec::new(inputs, outputs)?;
        if let Some(bad) = rows.iter().find(|r| r.len() != outputs) {
            return Err(ConfigError::DimensionMismatch {
                rows: inputs,
                cols: bad.len(),
                inputs,
                outputs,
            });
        }
        let mut m = Self::new(spec);
        for (i, row) in rows.iter().enumerate() {
            m.weights[i * outputs..(i + 1) * outputs].copy_from_slice(row);
        }
        Ok(m)
    }

    /// Number of inputs (rows).
    #[inline]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Number of outputs (columns).
    #[inline]
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Shape of the switch this matrix describes.
    #[inline]
    pub fn spec(&self) -> SwitchSpec {
        SwitchSpec { inputs: self.inputs, outputs: self.outputs }
    }

    /// Weight of the request from `input` to `output`.
    #[inline]
    pub fn get(&self, input: usize, output: usize) -> u64 {
        assert!(input < self.inputs && output < self.outputs, "request ({input}, {output}) out of range");
        self.weights[input * self.outputs + output]
    }

    /// Set the weight of the request from `input` to `output`.
    #[inline]
    pub fn set(&mut self, input: usize, output: usize, weight: u64) {
        assert!(input < self.inputs && output < self.outputs, "request ({input}, {output}) out of range");
        self.weights[input * self.outputs + output] = weight;
    }

    /// True if `input` holds a nonzero request for `output`.
    #[inline]
    pub fn has_request(&self, input: usize, output: usize) -> bool {
        self.get(input, output) != 0
    }

    /// Weights of one input's row.
    pub fn row(&self, input: usize) -> &[u64] {
        &self.weights[input * self.outputs..(input + 1) * self.outputs]
    }

    /// Outputs `input` holds a nonzero request for.
    pub fn row_bitmap(&self, input: usize) -> Bitmap {
        Bitmap::from_indices(
            self.row(input)
                .iter()
                .enumerate()
                .filter(|&(_, w)| *w != 0)
                .map(|(o, _)| o),
        )
    }

    /// Inputs holding a nonzero request for `output`.
    pub fn column_bitmap(&self, output: usize) -> Bitmap {
        Bitmap::from_indices((0..self.inputs).filter(|&i| self.has_request(i, output)))
    }

    /// Number of nonzero entries.
    pub fn request_count(&self) -> usize {
        self.weights.iter().filter(|&&w| w != 0).count()
    }

    /// True if there is no request at all.
    pub fn is_empty(&self) -> bool {
        self.weights.iter().all(|&w| w == 0)
    }

    /// Largest weight in the matrix.
    pub fn max_weight(&self) -> u64 {
        self.weights.iter().copied().max().unwrap_or(0)
    }

    /// Clear every request.
    pub fn clear(&mut self) {
        self.weights.iter_mut().for_each(|w| *w = 0);
    }

    /// Check that this matrix has the shape of `spec`.
    pub fn check_shape(&self, spec: SwitchSpec) -> Result<(), ConfigError> {
        if self.inputs != spec.inputs || self.outputs != spec.outputs {
            return Err(ConfigError::DimensionMismatch {
                rows: self.inputs,
                cols: self.outputs,
                inputs: spec.inputs,
                outputs: spec.outputs,
            });
        }
        Ok(())
    }
}

/// All priority rings of one slot, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequests {
    rings: Vec<RequestMatrix>,
}

impl SlotRequests {
    /// Create `levels` empty rings for `spec`.
    pub fn new(spec: SwitchSpec, levels: usize) -> Self {
        Self { rings: (0..levels).map(|_| RequestMatrix::new(spec)).collect() }
    }

    /// Single-ring slot.
    pub fn single(requests: RequestMatrix) -> Self {
        Self { rings: vec![requests] }
    }

    /// Number of priority rings.
    #[inline]
    pub fn levels(&self) -> usize {
        self.rings.len()
    }

    /// Requests of one ring (0 is highest).
    pub fn ring(&self, priority: usize) -> &RequestMatrix {
        &self.rings[priority]
    }

    /// Mutable requests of one ring.
    pub fn ring_mut(&mut self, priority: usize) -> &mut RequestMatrix {
        &mut self.rings[priority]
    }

    /// Rings from highest to lowest priority.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RequestMatrix)> {
        self.rings.iter().enumerate()
    }
}
