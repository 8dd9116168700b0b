//! Hierarchy error types.

use stratum_shared::types::CostCenterId;
use thiserror::Error;

/// Errors raised while resolving a cost-center hierarchy.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// The requested root does not exist.
    #[error("Root cost center not found: {0}")]
    RootNotFound(CostCenterId),
}
