//! Error types for adaptive code refinement.
//!
//! This module defines all error types used throughout the crate,
//! organized by the phase that produces them. Internal polyhedral-library
//! invariant violations are not represented here: those indicate a
//! modeling bug and abort via assertion instead of propagating a sentinel.

use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Error, Debug)]
pub enum AcrError {
    /// Error parsing the embedded polyhedral representation
    #[error("Polyhedral parse error: {0}")]
    Parse(#[from] PolyParseError),

    /// Semantic pragma/configuration violation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error classifying monitored data
    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// External toolchain failure
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Error during code generation
    #[error("Code generation error: {0}")]
    Codegen(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while parsing a textual set, map, or scop representation.
#[derive(Error, Debug, Clone)]
#[error("{message} at offset {offset}")]
pub struct PolyParseError {
    /// The error message
    pub message: String,
    /// Byte offset into the input text
    pub offset: usize,
}

impl PolyParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self { message: message.into(), offset }
    }
}

/// Semantic violation in the pragma option tree or its use against a scop.
///
/// These are detected at instrumentation/init time. The offending construct
/// is rendered into the message so the user sees what to fix.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// A monitor identifier does not name any statement iterator
    #[error("monitor identifier `{identifier}` not found among any statement's iterators")]
    MonitorIdentifierNotFound {
        /// The missing identifier
        identifier: String,
    },

    /// Monitor dimensions are not a contiguous, order-preserving run
    #[error("monitor dimensions are non-contiguous in statement `{statement}` (found at {positions:?})")]
    NonContiguousMonitorDims {
        /// The offending statement
        statement: String,
        /// Dimension indices the monitor identifiers were found at
        positions: Vec<usize>,
    },

    /// A strategy names an alternative that was never declared
    #[error("strategy `{strategy}` references unknown alternative `{alternative}`")]
    UnknownAlternative {
        /// Rendering of the strategy construct
        strategy: String,
        /// The missing alternative name
        alternative: String,
    },

    /// An alternative is never selected by any strategy
    #[error("alternative `{alternative}` has no matching strategy")]
    UnusedAlternative {
        /// The orphaned alternative name
        alternative: String,
    },

    /// Two strategies claim the same monitor value
    #[error("strategies `{first}` and `{second}` overlap at value {value}")]
    OverlappingStrategies {
        /// Rendering of the first strategy
        first: String,
        /// Rendering of the second strategy
        second: String,
        /// A value claimed by both
        value: u8,
    },

    /// A range strategy with an inverted range
    #[error("strategy `{strategy}` has an empty range")]
    EmptyRange {
        /// Rendering of the strategy construct
        strategy: String,
    },

    /// Grid size must be at least one cell
    #[error("grid size must be positive, got {0}")]
    InvalidGridSize(i64),

    /// The monitor construct declared no index identifiers
    #[error("monitor construct for array `{array}` declares no index identifiers")]
    EmptyMonitorDims {
        /// The monitored array name
        array: String,
    },

    /// Monitor extent count differs from the identifier count
    #[error("monitor construct for array `{array}` declares {dims} identifiers but {extents} extents")]
    ExtentArityMismatch {
        /// The monitored array name
        array: String,
        /// Number of index identifiers
        dims: usize,
        /// Number of extent expressions
        extents: usize,
    },

    /// A parameter-substitution alternative names an unknown parameter
    #[error("alternative `{alternative}` substitutes unknown parameter `{parameter}`")]
    UnknownParameter {
        /// The alternative name
        alternative: String,
        /// The parameter it names
        parameter: String,
    },
}

/// A monitored byte with no owning alternative.
///
/// Every declared strategy set is expected to partition the byte range; an
/// uncovered byte is a configuration defect, so classification fails for
/// the cycle rather than silently defaulting.
#[derive(Error, Debug, Clone)]
pub enum ClassificationError {
    /// No strategy owns this byte value
    #[error("monitor value {byte} (tile {tile}) matches no strategy")]
    Unmatched {
        /// The unowned byte value
        byte: u8,
        /// The tile whose reduction produced it
        tile: usize,
    },
}

/// External compiler / dynamic-loader failure.
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// The external compiler exited non-zero
    #[error("compiler `{compiler}` failed: {stderr}")]
    CompilerFailed {
        /// The compiler binary that was invoked
        compiler: String,
        /// Captured standard error output
        stderr: String,
    },

    /// The produced shared object could not be opened
    #[error("failed to load shared object {path}: {reason}")]
    LoadFailed {
        /// Path to the shared object
        path: String,
        /// Loader error text
        reason: String,
    },

    /// A symbol expected by naming convention is absent
    #[error("symbol `{symbol}` missing from compiled object")]
    SymbolMissing {
        /// The expected symbol name
        symbol: String,
    },

    /// Temp-file or pipe plumbing failure
    #[error("toolchain I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type using AcrError.
pub type AcrResult<T> = Result<T, AcrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::OverlappingStrategies {
            first: "strategy(direct, 3, low)".to_string(),
            second: "strategy(range, 0, 10, high)".to_string(),
            value: 3,
        };
        let s = format!("{}", err);
        assert!(s.contains("overlap"));
        assert!(s.contains("3"));
    }

    #[test]
    fn test_error_conversion() {
        let err: AcrError = ClassificationError::Unmatched { byte: 200, tile: 4 }.into();
        assert!(format!("{}", err).contains("200"));
    }
}
