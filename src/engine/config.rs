//! Algorithm arguments parsed from an INIT argument vector.
//!
//! A configuration line names an algorithm followed by `key=value` tokens:
//!
//! ```text
//! islip iterations=4 priorities=2
//! pim seed=17
//! ```
//!
//! The loader strips the algorithm name and hands the remaining tokens to
//! [`MatcherConfig::parse`]. Each algorithm declares which keys it accepts;
//! anything else is a [`ConfigError`].

use crate::types::{ConfigError, SwitchSpec};

/// Iteration cap key.
pub const ITERATIONS: &str = "iterations";
/// PRNG seed key.
pub const SEED: &str = "seed";
/// Priority ring count key.
pub const PRIORITIES: &str = "priorities";

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 1;

/// Most priority rings an instance may be configured with.
pub const MAX_PRIORITIES: usize = 64;

/// Per-instance matcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherConfig {
    /// Maximum request/grant/accept iterations per priority ring.
    pub iterations: usize,

    /// Seed for the instance's private PRNG.
    pub seed: u64,

    /// Priority rings the instance serves; ring indices run `0..priorities`.
    pub priorities: usize,
}

impl MatcherConfig {
    /// Defaults for a switch: iterate up to the port count, which is enough
    /// for any iterative matcher to converge to a maximal matching.
    pub fn defaults(spec: SwitchSpec) -> Self {
        Self {
            iterations: spec.max_ports(),
            seed: DEFAULT_SEED,
            priorities: 1,
        }
    }

    /// Parse `key=value` tokens on top of [`MatcherConfig::defaults`].
    ///
    /// # Arguments
    ///
    /// * `algorithm` - Name used in error messages
    /// * `spec` - Switch shape (supplies defaults)
    /// * `args` - Tokens following the algorithm name
    /// * `accepted` - Keys this algorithm understands
    ///
    /// # Example
    ///
    /// ```
    /// use crossbar_match::engine::config::{MatcherConfig, ITERATIONS, SEED};
    /// use crossbar_match::types::SwitchSpec;
    ///
    /// let spec = SwitchSpec::square(8).unwrap();
    /// let cfg = MatcherConfig::parse("pim", spec, &["iterations=2", "seed=9"], &[ITERATIONS, SEED]).unwrap();
    /// assert_eq!(cfg.iterations, 2);
    /// assert_eq!(cfg.seed, 9);
    /// ```
    pub fn parse(
        algorithm: &'static str,
        spec: SwitchSpec,
        args: &[&str],
        accepted: &[&str],
    ) -> Result<Self, ConfigError> {
        let mut cfg = Self::defaults(spec);
        for arg in args {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedArgument((*arg).to_string()))?;
            if !accepted.contains(&key) {
                return Err(ConfigError::UnknownOption { algorithm, key: key.to_string() });
            }
            match key {
                ITERATIONS => cfg.iterations = parse_positive(key, value)?,
                PRIORITIES => {
                    cfg.priorities = parse_positive(key, value)?;
                    if cfg.priorities > MAX_PRIORITIES {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                            reason: "exceeds the priority ring limit",
                        });
                    }
                }
                SEED => {
                    cfg.seed = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "expected an unsigned integer",
                    })?;
                }
                _ => return Err(ConfigError::UnknownOption { algorithm, key: key.to_string() }),
            }
        }
        Ok(cfg)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be at least 1",
        }),
        Err(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected an unsigned integer",
        }),
    }
}
