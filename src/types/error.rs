//! Error types for the crossbar matching engine.
//!
//! Errors are split by concern so each layer surfaces only what its caller
//! can act on:
//!
//! - [`CodecError`]: malformed bitmap text
//! - [`AssignmentError`]: invalid input to the assignment solver
//! - [`ConfigError`]: algorithm lookup and INIT argument problems
//! - [`TraceError`]: failure to encode a match trace record
//!
//! Internal invariant violations inside the matching loop are not errors;
//! they are assertions (see `engine::matcher`).

/// Errors produced while decoding the bitmap text format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A character other than `'0'`/`'1'` appeared before the terminator.
    #[error("invalid bitmap character {found:?} at position {position}")]
    InvalidChar {
        /// The offending character.
        found: char,
        /// Zero-based position in the input.
        position: usize,
    },

    /// The text holds more bits than a bitmap can address.
    #[error("bitmap text has {len} bits, capacity is {capacity}")]
    TooLong {
        /// Number of bit characters seen so far.
        len: usize,
        /// Bitmap capacity.
        capacity: usize,
    },
}

/// Errors reported by the assignment solver on invalid input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    /// The cost matrix has no rows.
    #[error("cost matrix is empty")]
    Empty,

    /// The cost matrix is not square.
    #[error("cost matrix is not square: {rows} rows, row {row} has {cols} columns")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// First row with a mismatched width.
        row: usize,
        /// Width of that row.
        cols: usize,
    },

    /// A cost entry is negative.
    #[error("negative cost {value} at ({row}, {col})")]
    NegativeCost {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// The negative value.
        value: i64,
    },
}

/// Configuration-time errors: algorithm lookup, INIT arguments, and
/// dimension checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No algorithm is registered under this name.
    #[error("unknown algorithm {0:?}")]
    UnknownAlgorithm(String),

    /// An INIT argument is not of the form `key=value`.
    #[error("malformed argument {0:?}, expected key=value")]
    MalformedArgument(String),

    /// An INIT argument names an option the algorithm does not take.
    #[error("algorithm {algorithm} does not accept option {key:?}")]
    UnknownOption {
        /// Algorithm name.
        algorithm: &'static str,
        /// Offending key.
        key: String,
    },

    /// An option value failed to parse or is out of range.
    #[error("invalid value {value:?} for option {key}: {reason}")]
    InvalidValue {
        /// Option key.
        key: String,
        /// Raw value text.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Port counts are zero or exceed the bitmap capacity.
    #[error("switch shape {inputs}x{outputs} is outside 1..={capacity}")]
    InvalidShape {
        /// Number of inputs.
        inputs: usize,
        /// Number of outputs.
        outputs: usize,
        /// Largest supported port count.
        capacity: usize,
    },

    /// A request matrix does not match the switch it was handed to.
    #[error("request matrix is {rows}x{cols}, switch is {inputs}x{outputs}")]
    DimensionMismatch {
        /// Matrix rows.
        rows: usize,
        /// Matrix columns.
        cols: usize,
        /// Switch inputs.
        inputs: usize,
        /// Switch outputs.
        outputs: usize,
    },

    /// The switch handle does not refer to an attached switch.
    #[error("no switch attached under handle {0}")]
    UnknownSwitch(usize),

    /// A ring index at or above the configured `priorities`.
    #[error("priority ring {priority} is not configured, switch has {levels}")]
    PriorityOutOfRange {
        /// Requested ring.
        priority: usize,
        /// Configured ring count.
        levels: usize,
    },

    /// A ring was run after a ring of equal or lower priority in the same slot.
    #[error("slot {slot}: ring {priority} run after ring {last}")]
    RingOutOfOrder {
        /// Current slot.
        slot: u64,
        /// Requested ring.
        priority: usize,
        /// Ring run last in this slot.
        last: usize,
    },

    /// A slot number older than the slot in progress.
    #[error("slot {slot} is before current slot {current}")]
    StaleSlot {
        /// Requested slot.
        slot: u64,
        /// Slot in progress.
        current: u64,
    },
}

/// Errors raised while recording match traces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// SSZ encoding of a record failed.
    #[error("failed to encode match record: {0}")]
    Encode(String),
}
