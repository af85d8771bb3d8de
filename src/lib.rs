//! # Crossbar Match
//!
//! Per-slot matching engine for input-queued crossbar switches.
//!
//! ## Architecture
//!
//! The engine consists of:
//! - **Types**: Bitmap, request matrices, Matching, trace records
//! - **Engine**: Iterative request/grant/accept matchers (SLIP, PIM, iLQF,
//!   multicast fan-out splitting)
//! - **Assignment**: Exact Hungarian solver and the weighted matchers built
//!   on it (LQF, OCF, MWM)
//! - **Registry**: Name-keyed algorithm table and slab-backed switch storage
//!
//! ## Design Principles
//!
//! 1. **Determinism**: All randomness comes from per-instance seeded PRNGs
//! 2. **Isolation**: Every switch owns its pointers, PRNG and solver scratch;
//!    the only statics are the popcount table and the algorithm table, both
//!    immutable once built
//! 3. **Strict Priority**: Rings run highest first; a lower ring never takes
//!    a port a higher ring matched
//! 4. **Synchronous Execution**: One call schedules one ring of one slot
//!
//! ## Example
//!
//! ```
//! use crossbar_match::registry::Fabric;
//! use crossbar_match::types::{RequestMatrix, SlotRequests, SwitchSpec};
//!
//! let mut fabric = Fabric::new();
//! let sw = fabric.attach(SwitchSpec::square(4).unwrap(), "islip", &[]).unwrap();
//!
//! let requests = RequestMatrix::from_rows(&[
//!     vec![1, 0, 0, 0],
//!     vec![1, 0, 0, 0],
//!     vec![0, 1, 0, 0],
//!     vec![0, 1, 0, 0],
//! ]).unwrap();
//! let slot = SlotRequests::single(requests);
//!
//! let first = fabric.schedule(sw, &slot).unwrap();
//! assert_eq!(first.input_of(0), Some(0));
//! assert_eq!(first.input_of(1), Some(2));
//!
//! let second = fabric.schedule(sw, &slot).unwrap();
//! assert_eq!(second.input_of(0), Some(1));
//! assert_eq!(second.input_of(1), Some(3));
//! ```

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Bitmap, RequestMatrix, Matching, MatchRecord
pub mod types;

/// Iterative matchers: SLIP, PIM, iLQF/iOCF, multicast
pub mod engine;

/// Exact assignment: Hungarian solver, maximum weight matching
pub mod assignment;

/// Algorithm registry and switch storage
pub mod registry;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use assignment::{AssignmentSolver, MaxWeightMatcher};
pub use engine::{IterativeMatcher, MulticastMatcher};
pub use registry::{resolve, Fabric, Scheduler, SwitchRef};
pub use types::{Bitmap, Matching, RequestMatrix, SlotRequests, SwitchSpec};
