//! Conflict-free input/output assignment for one slot.
//!
//! ## Representation
//!
//! A [`Matching`] keeps both directions so either side can be queried in O(1):
//!
//! - `fanout[input]`: outputs connected to the input (one bit for unicast)
//! - `owner[output]`: the input driving the output, if any
//!
//! Every output has at most one owner. Unicast connections also give every
//! input at most one output; multicast connections may give an input many.
//! Breaking either rule is a scheduler defect and panics at the point of
//! connection rather than producing a corrupt matching.

use std::fmt;

use crate::types::bitmap::Bitmap;
use crate::types::record::MatchRecord;
use crate::types::request::{RequestMatrix, SwitchSpec};

/// Input/output assignment for one slot (or one priority ring of a slot).
#[derive(Clone, PartialEq, Eq)]
pub struct Matching {
    fanout: Vec<Bitmap>,
    owner: Vec<Option<usize>>,
}

impl Matching {
    /// Create an empty matching for a switch of the given shape.
    pub fn new(spec: SwitchSpec) -> Self {
        Self {
            fanout: vec![Bitmap::new(); spec.inputs],
            owner: vec![None; spec.outputs],
        }
    }

    /// Number of inputs.
    #[inline]
    pub fn inputs(&self) -> usize {
        self.fanout.len()
    }

    /// Number of outputs.
    #[inline]
    pub fn outputs(&self) -> usize {
        self.owner.len()
    }

    /// Connect `input` to `output` as a unicast pair.
    ///
    /// # Panics
    ///
    /// Panics if either port is already matched: an output granted twice or
    /// an input accepted twice is a scheduler defect.
    pub fn connect(&mut self, input: usize, output: usize) {
        assert!(
            !self.fanout[input].any_bit_set(),
            "input {input} accepted twice (already holds {})",
            self.fanout[input]
        );
        self.connect_multicast(input, output);
    }

    /// Add `output` to the fan-out of `input`.
    ///
    /// # Panics
    ///
    /// Panics if `output` already has an owner.
    pub fn connect_multicast(&mut self, input: usize, output: usize) {
        if let Some(prev) = self.owner[output] {
            panic!("output {output} granted twice (to {prev} and {input})");
        }
        self.owner[output] = Some(input);
        self.fanout[input].set_bit(output);
    }

    /// Unicast output of `input`: the lowest output it is connected to.
    pub fn output_of(&self, input: usize) -> Option<usize> {
        self.fanout[input].iter_ones().next()
    }

    /// All outputs connected to `input`.
    #[inline]
    pub fn outputs_of(&self, input: usize) -> &Bitmap {
        &self.fanout[input]
    }

    /// The input driving `output`.
    #[inline]
    pub fn input_of(&self, output: usize) -> Option<usize> {
        self.owner[output]
    }

    /// True if `input` drives at least one output.
    #[inline]
    pub fn is_input_matched(&self, input: usize) -> bool {
        self.fanout[input].any_bit_set()
    }

    /// True if `output` has an owner.
    #[inline]
    pub fn is_output_matched(&self, output: usize) -> bool {
        self.owner[output].is_some()
    }

    /// Inputs that drive at least one output.
    pub fn matched_inputs(&self) -> Bitmap {
        Bitmap::from_indices((0..self.inputs()).filter(|&i| self.is_input_matched(i)))
    }

    /// Outputs that have an owner.
    pub fn matched_outputs(&self) -> Bitmap {
        Bitmap::from_indices((0..self.outputs()).filter(|&o| self.is_output_matched(o)))
    }

    /// Number of connected `(input, output)` pairs.
    pub fn len(&self) -> usize {
        self.owner.iter().filter(|o| o.is_some()).count()
    }

    /// True if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.owner.iter().all(Option::is_none)
    }

    /// Connected pairs in ascending `(input, output)` order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.fanout
            .iter()
            .enumerate()
            .flat_map(|(i, outs)| outs.iter_ones().map(move |o| (i, o)))
    }

    /// True if no input drives more than one output.
    pub fn is_unicast(&self) -> bool {
        self.fanout.iter().all(|f| f.pop_count() <= 1)
    }

    /// True if every connected pair has a nonzero request in `requests`.
    pub fn respects(&self, requests: &RequestMatrix) -> bool {
        self.pairs().all(|(i, o)| requests.has_request(i, o))
    }

    /// Sum of request weights over connected pairs, saturating at `u64::MAX`.
    pub fn total_weight(&self, requests: &RequestMatrix) -> u64 {
        self.pairs()
            .map(|(i, o)| requests.get(i, o))
            .fold(0, u64::saturating_add)
    }

    /// Fold the pairs of `other` (a lower priority ring) into `self`.
    ///
    /// # Panics
    ///
    /// Panics if `other` reuses a port already matched here, which would mean
    /// a lower ring preempted a higher one.
    pub fn merge(&mut self, other: &Matching) {
        let unicast = other.is_unicast();
        for (i, o) in other.pairs() {
            if unicast {
                assert!(!self.is_input_matched(i), "input {i} matched in two priority rings");
            }
            self.connect_multicast(i, o);
        }
    }

    /// Trace records for every pair, tagged with slot and ring.
    pub fn records(&self, slot: u64, priority: usize) -> Vec<MatchRecord> {
        self.pairs()
            .map(|(i, o)| MatchRecord::new(slot, priority as u64, i as u64, o as u64))
            .collect()
    }
}

impl fmt::Debug for Matching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.pairs()).finish()
    }
}

impl fmt::Display for Matching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, outs) in self.fanout.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match outs.pop_count() {
                0 => write!(f, "{i}:-")?,
                1 => write!(f, "{i}:{}", self.output_of(i).unwrap_or_default())?,
                _ => write!(f, "{i}:{outs}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(n: usize) -> SwitchSpec {
        SwitchSpec::square(n).unwrap()
    }

    #[test]
    fn test_connect_unicast() {
        let mut m = Matching::new(spec(4));
        assert!(m.is_empty());

        m.connect(0, 2);
        m.connect(3, 1);

        assert_eq!(m.output_of(0), Some(2));
        assert_eq!(m.input_of(1), Some(3));
        assert_eq!(m.output_of(1), None);
        assert_eq!(m.len(), 2);
        assert!(m.is_unicast());
        assert_eq!(m.pairs().collect::<Vec<_>>(), vec![(0, 2), (3, 1)]);
        assert_eq!(m.matched_inputs(), Bitmap::from_indices([0, 3]));
        assert_eq!(m.matched_outputs(), Bitmap::from_indices([1, 2]));
    }

    #[test]
    #[should_panic(expected = "granted twice")]
    fn test_output_granted_twice_panics() {
        let mut m = Matching::new(spec(4));
        m.connect(0, 1);
        m.connect(2, 1);
    }

    #[test]
    #[should_panic(expected = "accepted twice")]
    fn test_input_accepted_twice_panics() {
        let mut m = Matching::new(spec(4));
        m.connect(0, 1);
        m.connect(0, 2);
    }

    #[test]
    fn test_multicast_fanout() {
        let mut m = Matching::new(spec(4));
        m.connect_multicast(1, 0);
        m.connect_multicast(1, 3);
        assert!(!m.is_unicast());
        assert_eq!(m.outputs_of(1), &Bitmap::from_indices([0, 3]));
        assert_eq!(m.len(), 2);
        assert_eq!(m.to_string(), "0:- 1:{0,3} 2:- 3:-");
    }

    #[test]
    fn test_respects_and_weight() {
        let requests = RequestMatrix::from_rows(&[vec![0, 4], vec![9, 0]]).unwrap();
        let mut m = Matching::new(spec(2));
        m.connect(0, 1);
        m.connect(1, 0);
        assert!(m.respects(&requests));
        assert_eq!(m.total_weight(&requests), 13);

        let mut bad = Matching::new(spec(2));
        bad.connect(0, 0);
        assert!(!bad.respects(&requests));
    }

    #[test]
    fn test_merge_rings() {
        let mut high = Matching::new(spec(4));
        high.connect(0, 0);
        let mut low = Matching::new(spec(4));
        low.connect(1, 2);
        high.merge(&low);
        assert_eq!(high.len(), 2);
        assert_eq!(high.input_of(2), Some(1));
    }

    #[test]
    fn test_records() {
        let mut m = Matching::new(spec(3));
        m.connect(2, 0);
        let recs = m.records(7, 1);
        assert_eq!(recs, vec![MatchRecord::new(7, 1, 2, 0)]);
    }
}
