//! The algorithm table: names, descriptions and INIT handlers.

use std::fmt;

use crate::assignment::MaxWeightMatcher;
use crate::engine::config::{ITERATIONS, PRIORITIES, SEED};
use crate::engine::{IterativeMatcher, MatcherConfig, MulticastMatcher, ResiduePolicy, TieBreak};
use crate::types::{ConfigError, Matching, RequestMatrix, SwitchSpec};

/// A per-switch algorithm instance created by INIT and driven by RUN.
///
/// An instance is only ever used by one thread at a time, but different
/// switches may live on different threads, hence `Send`.
pub trait Scheduler: Send + fmt::Debug {
    /// Match one priority ring of one slot.
    ///
    /// `claimed` holds the pairs matched by higher rings earlier in the same
    /// slot; the returned matching holds this ring's pairs only.
    fn run(&mut self, requests: &RequestMatrix, priority: usize, claimed: &Matching) -> Matching;

    /// Number of priority rings configured at INIT. `run` is only called
    /// with `priority < levels()`.
    fn levels(&self) -> usize;
}

/// What the driver must put in the request matrix for an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightKind {
    /// 1 for a nonempty VOQ, 0 otherwise; magnitudes are ignored.
    Presence,
    /// VOQ occupancy in cells.
    Occupancy,
    /// Waiting time of the head-of-line cell, in slots.
    WaitingTime,
    /// Any non-negative weight the driver chooses.
    Supplied,
}

/// INIT handler: validate the argument vector and build an instance.
pub type InitFn = fn(SwitchSpec, &[&str]) -> Result<Box<dyn Scheduler>, ConfigError>;

/// Immutable registry entry.
#[derive(Clone, Copy)]
pub struct AlgorithmDescriptor {
    /// Name used on configuration lines.
    pub name: &'static str,
    /// One-line human description.
    pub description: &'static str,
    /// Weight the request matrix is expected to carry.
    pub weights: WeightKind,
    /// INIT handler.
    pub init: InitFn,
}

impl AlgorithmDescriptor {
    /// Run INIT for a switch of shape `spec`.
    pub fn instantiate(&self, spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
        (self.init)(spec, args)
    }
}

impl fmt::Debug for AlgorithmDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmDescriptor")
            .field("name", &self.name)
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}

/// Every registered algorithm.
static ALGORITHMS: [AlgorithmDescriptor; 11] = [
    AlgorithmDescriptor {
        name: "null",
        description: "never matches anything",
        weights: WeightKind::Presence,
        init: init_null,
    },
    AlgorithmDescriptor {
        name: "pim",
        description: "parallel iterative matching, random grant and accept",
        weights: WeightKind::Presence,
        init: init_pim,
    },
    AlgorithmDescriptor {
        name: "islip",
        description: "iterative round-robin matching with slip pointers",
        weights: WeightKind::Presence,
        init: init_islip,
    },
    AlgorithmDescriptor {
        name: "ilqf",
        description: "iterative longest queue first",
        weights: WeightKind::Occupancy,
        init: init_ilqf,
    },
    AlgorithmDescriptor {
        name: "iocf",
        description: "iterative oldest cell first",
        weights: WeightKind::WaitingTime,
        init: init_iocf,
    },
    AlgorithmDescriptor {
        name: "mwm",
        description: "maximum weight matching on supplied weights",
        weights: WeightKind::Supplied,
        init: init_mwm,
    },
    AlgorithmDescriptor {
        name: "lqf",
        description: "longest queue first, exact maximum weight",
        weights: WeightKind::Occupancy,
        init: init_lqf,
    },
    AlgorithmDescriptor {
        name: "ocf",
        description: "oldest cell first, exact maximum weight",
        weights: WeightKind::WaitingTime,
        init: init_ocf,
    },
    AlgorithmDescriptor {
        name: "mm",
        description: "maximum size matching",
        weights: WeightKind::Presence,
        init: init_mm,
    },
    AlgorithmDescriptor {
        name: "mcast-concentrate",
        description: "multicast fan-out splitting, residue concentrated",
        weights: WeightKind::Presence,
        init: init_concentrate,
    },
    AlgorithmDescriptor {
        name: "mcast-distribute",
        description: "multicast fan-out splitting, residue distributed",
        weights: WeightKind::Presence,
        init: init_distribute,
    },
];

/// All registered algorithms, in registration order.
pub fn algorithms() -> &'static [AlgorithmDescriptor] {
    &ALGORITHMS
}

/// Look up an algorithm by name.
///
/// # Example
///
/// ```
/// use crossbar_match::registry::resolve;
/// use crossbar_match::types::ConfigError;
///
/// assert_eq!(resolve("islip").unwrap().name, "islip");
/// assert_eq!(resolve("wfa").unwrap_err(), ConfigError::UnknownAlgorithm("wfa".into()));
/// ```
pub fn resolve(name: &str) -> Result<&'static AlgorithmDescriptor, ConfigError> {
    ALGORITHMS
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| ConfigError::UnknownAlgorithm(name.to_string()))
}

// ============================================================================
// Schedulers
// ============================================================================

/// Scheduler that leaves every port unmatched.
#[derive(Debug, Clone, Copy)]
pub struct NullScheduler {
    levels: usize,
}

impl NullScheduler {
    /// A null scheduler accepting `levels` priority rings.
    pub fn new(levels: usize) -> Self {
        Self { levels: levels.max(1) }
    }
}

impl Default for NullScheduler {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Scheduler for NullScheduler {
    fn run(&mut self, requests: &RequestMatrix, _priority: usize, _claimed: &Matching) -> Matching {
        Matching::new(requests.spec())
    }

    fn levels(&self) -> usize {
        self.levels
    }
}

impl Scheduler for IterativeMatcher {
    fn run(&mut self, requests: &RequestMatrix, priority: usize, claimed: &Matching) -> Matching {
        IterativeMatcher::run(self, requests, priority, claimed)
    }

    fn levels(&self) -> usize {
        IterativeMatcher::levels(self)
    }
}

impl Scheduler for MulticastMatcher {
    fn run(&mut self, requests: &RequestMatrix, priority: usize, claimed: &Matching) -> Matching {
        MulticastMatcher::run(self, requests, priority, claimed)
    }

    fn levels(&self) -> usize {
        MulticastMatcher::levels(self)
    }
}

impl Scheduler for MaxWeightMatcher {
    fn run(&mut self, requests: &RequestMatrix, priority: usize, claimed: &Matching) -> Matching {
        MaxWeightMatcher::run(self, requests, priority, claimed)
    }

    fn levels(&self) -> usize {
        MaxWeightMatcher::levels(self)
    }
}

// ============================================================================
// INIT handlers
// ============================================================================

fn iterative(
    name: &'static str,
    policy: TieBreak,
    keys: &[&str],
    spec: SwitchSpec,
    args: &[&str],
) -> Result<Box<dyn Scheduler>, ConfigError> {
    let cfg = MatcherConfig::parse(name, spec, args, keys)?;
    Ok(Box::new(IterativeMatcher::new(spec, policy, cfg)))
}

fn multicast(
    name: &'static str,
    policy: ResiduePolicy,
    spec: SwitchSpec,
    args: &[&str],
) -> Result<Box<dyn Scheduler>, ConfigError> {
    let cfg = MatcherConfig::parse(name, spec, args, &[ITERATIONS, PRIORITIES])?;
    Ok(Box::new(MulticastMatcher::new(spec, policy, cfg)))
}

fn exact(name: &'static str, unit: bool, spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    let cfg = MatcherConfig::parse(name, spec, args, &[PRIORITIES])?;
    let matcher = if unit {
        MaxWeightMatcher::maximum_size(spec)
    } else {
        MaxWeightMatcher::new(spec)
    };
    Ok(Box::new(matcher.with_levels(cfg.priorities)))
}

fn init_null(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    let cfg = MatcherConfig::parse("null", spec, args, &[PRIORITIES])?;
    Ok(Box::new(NullScheduler::new(cfg.priorities)))
}

fn init_pim(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    iterative("pim", TieBreak::Random, &[ITERATIONS, SEED, PRIORITIES], spec, args)
}

fn init_islip(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    iterative("islip", TieBreak::RoundRobin, &[ITERATIONS, PRIORITIES], spec, args)
}

fn init_ilqf(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    iterative("ilqf", TieBreak::Weighted, &[ITERATIONS, PRIORITIES], spec, args)
}

fn init_iocf(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    iterative("iocf", TieBreak::Weighted, &[ITERATIONS, PRIORITIES], spec, args)
}

fn init_mwm(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    exact("mwm", false, spec, args)
}

fn init_lqf(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    exact("lqf", false, spec, args)
}

fn init_ocf(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    exact("ocf", false, spec, args)
}

fn init_mm(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    exact("mm", true, spec, args)
}

fn init_concentrate(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    multicast("mcast-concentrate", ResiduePolicy::Concentrate, spec, args)
}

fn init_distribute(spec: SwitchSpec, args: &[&str]) -> Result<Box<dyn Scheduler>, ConfigError> {
    multicast("mcast-distribute", ResiduePolicy::Distribute, spec, args)
}
