//! Allocation error types.

use thiserror::Error;

/// Errors raised by the allocation engine.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The calculator has no way to evaluate a basis.
    #[error("Unsupported allocation basis: {basis}")]
    UnsupportedBasis {
        /// Basis code.
        basis: String,
    },

    /// A source pattern could not be compiled.
    #[error("Invalid source pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern as given.
        pattern: String,
        /// Regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A pattern selector names neither a cost-center nor an account pattern.
    #[error("Pattern selector names no pattern")]
    EmptySelector,

    /// The run was cancelled between passes.
    #[error("Allocation cancelled after {iteration} passes")]
    Cancelled {
        /// Passes completed before cancellation.
        iteration: u32,
    },
}
