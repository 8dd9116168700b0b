//! Consolidation error types.

use stratum_shared::types::CostCenterId;
use thiserror::Error;

/// Errors raised while consolidating a hierarchy.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// A cost center appears more than once in the hierarchy.
    #[error("Cost center {0} appears more than once in the hierarchy")]
    DuplicateNode(CostCenterId),

    /// A child was reached before its subtotal was finalized.
    #[error("Child {child} of {parent} is not deeper than its parent")]
    ChildOutOfOrder {
        /// Parent being rolled up.
        parent: CostCenterId,
        /// Child whose subtotal was missing.
        child: CostCenterId,
    },
}
