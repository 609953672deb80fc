//! Error types for rule, tick range and grid parsing.
//!
//! All of these surface while a simulation is being configured; once
//! ticks start running nothing in the engine can fail.

use thiserror::Error;

/// A rule string that does not follow the rule grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RuleError {
    #[error("empty rule segment in '{0}'")]
    EmptySegment(String),

    /// Segments need exactly one `/` between alive and dead digits.
    #[error("rule segment '{0}' must contain exactly one '/'")]
    MissingSlash(String),

    #[error("'{ch}' in rule segment '{segment}' is not a neighbour count (0-8)")]
    BadDigit { segment: String, ch: char },

    #[error("bad multiplier '{0}', expected a positive integer")]
    BadMultiplier(String),

    /// Random directives look like `AB+CD` with single digit bounds.
    #[error("random rule directive '{0}' must look like 'AB+CD'")]
    BadRandomDirective(String),

    #[error("random rule directive '{directive}' has empty range {low}..{high}")]
    EmptyRandomRange {
        directive: String,
        low: u32,
        high: u32,
    },
}

/// A render selection expression that cannot be turned into ticks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum TickRangeError {
    #[error("negative tick {0} needs a known maximum tick")]
    UnboundedNegative(i64),

    #[error("'{0}' is not a tick, range or stepped range")]
    Malformed(String),

    #[error("step in '{0}' must be positive")]
    BadStep(String),

    #[error("maximum tick {0} is too large to count back from")]
    MaxTooLarge(u64),
}

/// Grid text that cannot be turned into a board, or a board that does
/// not fit the requested dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum GridError {
    #[error("grid state is empty")]
    Empty,

    #[error("'{ch}' at row {row} is not a cell (expected 0 or 1)")]
    BadCell { row: usize, ch: char },

    #[error("row {row} has {got} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },

    #[error("a {state_w}x{state_h} state does not fit inside {width}x{height}")]
    DimensionMismatch {
        state_w: usize,
        state_h: usize,
        width: usize,
        height: usize,
    },
}

/// Reasons a simulation cannot be built from its configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum ConfigError {
    #[error("rule: {0}")]
    Rule(#[from] RuleError),

    #[error("post-process rule: {0}")]
    PostRule(RuleError),

    #[error("render ticks: {0}")]
    Ticks(#[from] TickRangeError),

    #[error("initial state: {0}")]
    State(#[from] GridError),

    #[error("fill percentage {0} is outside 0..=1")]
    FillPercentage(f64),

    #[error("render interval must be at least 1")]
    RenderEvery,

    #[error("{0} is out of range for a tick")]
    TickOutOfRange(u64),
}
