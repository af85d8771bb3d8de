//! Iterative matching engine.
//!
//! ## Design Principles
//!
//! The engine is designed for:
//!
//! 1. **Determinism**: Same requests, seed and pointer state always produce
//!    the same matching
//! 2. **Per-Instance State**: Pointers, PRNG and scratch belong to one
//!    switch; nothing is shared between switches
//! 3. **Synchronous Execution**: One call computes one ring of one slot
//!
//! ## Algorithms
//!
//! - [`IterativeMatcher`]: unicast request/grant/accept, parameterized by a
//!   [`TieBreak`] (SLIP, PIM, iLQF/iOCF)
//! - [`MulticastMatcher`]: fan-out splitting with a [`ResiduePolicy`]
//!
//! Exact weighted matching lives in [`crate::assignment`].

pub mod config;
pub mod matcher;
pub mod multicast;
pub mod policy;

pub use config::MatcherConfig;
pub use matcher::{IterativeMatcher, RingPointers};
pub use multicast::{MulticastMatcher, ResiduePolicy};
pub use policy::TieBreak;
