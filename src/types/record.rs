//! Match trace records and the running trace digest.
//!
//! ## SSZ Serialization
//!
//! [`MatchRecord`] derives `SimpleSerialize` so each matched pair has one
//! canonical byte encoding (four little-endian `u64`s, 32 bytes).
//!
//! ## Trace Digest
//!
//! [`MatchLog`] folds the encoded records into a SHA-256 digest in the order
//! they are recorded. Two runs with the same seed and the same requests must
//! produce the same digest; this is how reproducibility of randomized
//! algorithms is checked without storing whole traces.
//!
//! ## Example
//!
//! ```
//! use crossbar_match::types::{MatchLog, MatchRecord};
//!
//! let mut a = MatchLog::new();
//! let mut b = MatchLog::new();
//! a.record(&MatchRecord::new(1, 0, 2, 3)).unwrap();
//! b.record(&MatchRecord::new(1, 0, 2, 3)).unwrap();
//! assert_eq!(a.root(), b.root());
//! ```

use sha2::{Digest, Sha256};
use ssz_rs::prelude::*;

use crate::types::error::TraceError;
use crate::types::matching::Matching;

/// One matched `(input, output)` pair in a given slot and priority ring.
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct MatchRecord {
    /// Slot number
    pub slot: u64,

    /// Priority ring (0 is highest)
    pub priority: u64,

    /// Input port
    pub input: u64,

    /// Output port
    pub output: u64,
}

impl MatchRecord {
    /// Create a record.
    pub fn new(slot: u64, priority: u64, input: u64, output: u64) -> Self {
        Self { slot, priority, input, output }
    }
}

/// Running SHA-256 digest over encoded match records.
#[derive(Clone, Default)]
pub struct MatchLog {
    hasher: Sha256,
    records: u64,
}

impl MatchLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record.
    pub fn record(&mut self, record: &MatchRecord) -> Result<(), TraceError> {
        let bytes = ssz_rs::serialize(record).map_err(|e| TraceError::Encode(format!("{e:?}")))?;
        self.hasher.update(&bytes);
        self.records += 1;
        Ok(())
    }

    /// Append every pair of `matching`, returning how many were recorded.
    pub fn record_matching(
        &mut self,
        slot: u64,
        priority: usize,
        matching: &Matching,
    ) -> Result<usize, TraceError> {
        let records = matching.records(slot, priority);
        for r in &records {
            self.record(r)?;
        }
        Ok(records.len())
    }

    /// Number of records folded in so far.
    #[inline]
    pub fn len(&self) -> u64 {
        self.records
    }

    /// True if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Digest of everything recorded so far.
    pub fn root(&self) -> [u8; 32] {
        let mut root = [0u8; 32];
        root.copy_from_slice(&self.hasher.clone().finalize());
        root
    }

    /// Digest as a hex string.
    pub fn root_hex(&self) -> String {
        hex::encode(self.root())
    }
}
