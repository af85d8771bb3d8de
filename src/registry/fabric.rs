//! Switch table: slab-backed storage of configured switches.
//!
//! ## Memory Model
//!
//! - `Slab::with_capacity(n)` pre-allocates n switch slots
//! - Keys are reused after [`Fabric::detach`]
//! - O(1) attach, detach and lookup
//!
//! ## Example
//!
//! ```
//! use crossbar_match::registry::Fabric;
//! use crossbar_match::types::{RequestMatrix, SlotRequests, SwitchSpec};
//!
//! let spec = SwitchSpec::square(2).unwrap();
//! let mut fabric = Fabric::with_capacity(4);
//! let sw = fabric.attach(spec, "islip", &["iterations=1"]).unwrap();
//!
//! let requests = RequestMatrix::from_rows(&[vec![1, 1], vec![1, 0]]).unwrap();
//! let m = fabric.schedule(sw, &SlotRequests::single(requests)).unwrap();
//! assert_eq!(m.output_of(0), Some(0));
//! ```

use slab::Slab;
use tracing::info;

use crate::registry::algorithms::{resolve, AlgorithmDescriptor, Scheduler};
use crate::types::{ConfigError, Matching, RequestMatrix, SlotRequests, SwitchSpec};

/// One configured switch: its shape, its algorithm instance and the state
/// of the slot being scheduled.
#[derive(Debug)]
pub struct Switch {
    spec: SwitchSpec,
    algorithm: &'static AlgorithmDescriptor,
    scheduler: Box<dyn Scheduler>,
    /// Pairs matched by the rings already run this slot
    claimed: Matching,
    /// Slot in progress
    slot: Option<u64>,
    /// Ring run last in the current slot
    last_priority: Option<usize>,
    /// Slots started so far
    slots: u64,
}

impl Switch {
    /// Resolve `name` and run its INIT handler with `args`.
    pub fn new(spec: SwitchSpec, name: &str, args: &[&str]) -> Result<Self, ConfigError> {
        let algorithm = resolve(name)?;
        let scheduler = algorithm.instantiate(spec, args)?;
        Ok(Self {
            spec,
            algorithm,
            scheduler,
            claimed: Matching::new(spec),
            slot: None,
            last_priority: None,
            slots: 0,
        })
    }

    /// Port counts.
    #[inline]
    pub fn spec(&self) -> SwitchSpec {
        self.spec
    }

    /// Registry entry this switch was configured with.
    #[inline]
    pub fn algorithm(&self) -> &'static AlgorithmDescriptor {
        self.algorithm
    }

    /// Priority rings configured at INIT.
    #[inline]
    pub fn levels(&self) -> usize {
        self.scheduler.levels()
    }

    /// Slot in progress, `None` before the first slot.
    #[inline]
    pub fn slot(&self) -> Option<u64> {
        self.slot
    }

    /// Number of slots started, counting the current one.
    #[inline]
    pub fn slots(&self) -> u64 {
        self.slots
    }

    /// Pairs matched so far in the current slot, over all rings.
    pub fn slot_matching(&self) -> &Matching {
        &self.claimed
    }

    fn begin_slot(&mut self, slot: u64) {
        self.claimed = Matching::new(self.spec);
        self.slot = Some(slot);
        self.last_priority = None;
        self.slots += 1;
    }

    /// RUN one priority ring of slot `slot`.
    ///
    /// The first call with a new slot number starts that slot and releases
    /// every port claimed in the previous one. Within a slot, rings run from
    /// highest (0) to lowest and may be skipped; ports matched by earlier
    /// rings of the slot are excluded.
    ///
    /// # Returns
    ///
    /// The pairs matched in this ring only.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DimensionMismatch`] if `requests` has the wrong shape
    /// - [`ConfigError::PriorityOutOfRange`] if `priority` is not configured
    /// - [`ConfigError::StaleSlot`] if `slot` precedes the current slot
    /// - [`ConfigError::RingOutOfOrder`] if `priority` does not follow the
    ///   ring run last in this slot
    ///
    /// # Panics
    ///
    /// Panics if the algorithm returns a pair without a request, which is a
    /// defect in the algorithm.
    pub fn run(&mut self, slot: u64, requests: &RequestMatrix, priority: usize) -> Result<Matching, ConfigError> {
        requests.check_shape(self.spec)?;
        self.check_priority(priority)?;
        match self.slot {
            Some(current) if slot < current => return Err(ConfigError::StaleSlot { slot, current }),
            Some(current) if slot == current => {
                if let Some(last) = self.last_priority.filter(|&last| priority <= last) {
                    return Err(ConfigError::RingOutOfOrder { slot, priority, last });
                }
            }
            _ => self.begin_slot(slot),
        }
        Ok(self.run_ring(requests, priority))
    }

    /// Schedule the next slot in full: every ring, highest priority first.
    ///
    /// # Returns
    ///
    /// The union of all rings' pairs.
    pub fn schedule(&mut self, requests: &SlotRequests) -> Result<Matching, ConfigError> {
        for (_, ring) in requests.iter() {
            ring.check_shape(self.spec)?;
        }
        self.check_priority(requests.levels().saturating_sub(1))?;
        self.begin_slot(self.slot.map_or(0, |s| s.saturating_add(1)));
        for (priority, ring) in requests.iter() {
            self.run_ring(ring, priority);
        }
        Ok(self.claimed.clone())
    }

    fn check_priority(&self, priority: usize) -> Result<(), ConfigError> {
        let levels = self.scheduler.levels();
        if priority >= levels {
            return Err(ConfigError::PriorityOutOfRange { priority, levels });
        }
        Ok(())
    }

    fn run_ring(&mut self, requests: &RequestMatrix, priority: usize) -> Matching {
        let ring = self.scheduler.run(requests, priority, &self.claimed);
        assert!(
            ring.respects(requests),
            "{} matched a pair without a request",
            self.algorithm.name
        );
        self.claimed.merge(&ring);
        self.last_priority = Some(priority);
        ring
    }
}

/// Handle to a switch stored in a [`Fabric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwitchRef(usize);

impl SwitchRef {
    /// Slab key.
    #[inline]
    pub fn key(self) -> usize {
        self.0
    }
}

/// All switches of a simulation.
#[derive(Debug, Default)]
pub struct Fabric {
    switches: Slab<Switch>,
}

impl Fabric {
    /// Create an empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty fabric with room for `capacity` switches.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { switches: Slab::with_capacity(capacity) }
    }

    /// INIT a switch running algorithm `name` and store it.
    pub fn attach(&mut self, spec: SwitchSpec, name: &str, args: &[&str]) -> Result<SwitchRef, ConfigError> {
        let switch = Switch::new(spec, name, args)?;
        let key = self.switches.insert(switch);
        info!(
            switch = key,
            algorithm = name,
            inputs = spec.inputs,
            outputs = spec.outputs,
            "switch attached"
        );
        Ok(SwitchRef(key))
    }

    /// Destroy a switch's algorithm state and free its slot.
    pub fn detach(&mut self, switch: SwitchRef) -> Result<Switch, ConfigError> {
        let removed = self
            .switches
            .try_remove(switch.0)
            .ok_or(ConfigError::UnknownSwitch(switch.0))?;
        info!(switch = switch.0, slots = removed.slots(), "switch detached");
        Ok(removed)
    }

    /// Look up a switch.
    pub fn get(&self, switch: SwitchRef) -> Option<&Switch> {
        self.switches.get(switch.0)
    }

    /// Look up a switch mutably.
    pub fn get_mut(&mut self, switch: SwitchRef) -> Option<&mut Switch> {
        self.switches.get_mut(switch.0)
    }

    /// RUN one ring of slot `slot` on a switch. See [`Switch::run`].
    pub fn run(
        &mut self,
        switch: SwitchRef,
        slot: u64,
        requests: &RequestMatrix,
        priority: usize,
    ) -> Result<Matching, ConfigError> {
        self.get_mut(switch)
            .ok_or(ConfigError::UnknownSwitch(switch.0))?
            .run(slot, requests, priority)
    }

    /// Schedule a whole slot on a switch. See [`Switch::schedule`].
    pub fn schedule(&mut self, switch: SwitchRef, requests: &SlotRequests) -> Result<Matching, ConfigError> {
        self.get_mut(switch)
            .ok_or(ConfigError::UnknownSwitch(switch.0))?
            .schedule(requests)
    }

    /// All switches, mutably. Distinct switches may be driven from
    /// different threads.
    pub fn switches_mut(&mut self) -> impl Iterator<Item = (SwitchRef, &mut Switch)> + '_ {
        self.switches.iter_mut().map(|(key, sw)| (SwitchRef(key), sw))
    }

    /// Number of attached switches.
    #[inline]
    pub fn len(&self) -> usize {
        self.switches.len()
    }

    /// True if no switch is attached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}
