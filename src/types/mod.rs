//! Core data types for the crossbar matching engine.
//!
//! ## Types
//!
//! - [`Bitmap`]: fixed-capacity bit vector, one bit per port
//! - [`SwitchSpec`]: input/output port counts
//! - [`RequestMatrix`]: per-slot request weights (0 = no request)
//! - [`SlotRequests`]: one request matrix per priority ring
//! - [`Matching`]: conflict-free assignment produced by a scheduler
//! - [`MatchRecord`] / [`MatchLog`]: SSZ trace records and their digest
//!
//! Port indices are `usize` everywhere and never exceed [`CAPACITY`].

pub mod bitmap;
pub mod error;
mod matching;
mod record;
mod request;

pub use bitmap::{Bitmap, CAPACITY};
pub use error::{AssignmentError, CodecError, ConfigError, TraceError};
pub use matching::Matching;
pub use record::{MatchLog, MatchRecord};
pub use request::{RequestMatrix, SlotRequests, SwitchSpec};
