//! Algorithm registry and per-switch lifecycle.
//!
//! ## Lifecycle
//!
//! 1. **Resolve**: [`resolve`] looks a name up in the immutable algorithm
//!    table
//! 2. **INIT**: the descriptor's handler validates the argument vector and
//!    builds a [`Scheduler`] owning all per-switch state
//! 3. **RUN**: once per priority ring per slot, highest ring first. The
//!    caller passes the slot number; a new number starts a new slot
//! 4. **Detach**: dropping the [`Switch`] destroys its state
//!
//! An unknown name is a [`ConfigError`](crate::types::ConfigError).
//! Falling back to `null` is left to the caller.

mod algorithms;
mod fabric;

pub use algorithms::{algorithms, resolve, AlgorithmDescriptor, InitFn, NullScheduler, Scheduler, WeightKind};
pub use fabric::{Fabric, Switch, SwitchRef};
