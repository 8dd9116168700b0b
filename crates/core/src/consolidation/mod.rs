//! Bottom-up rollup of budget line items through a resolved hierarchy.
//!
//! Nodes are folded deepest level first so that every parent sums the
//! already-finalized subtotals of its children. Intercompany eliminations are
//! applied afterwards by explicit key lookup and carried up to ancestors.

pub mod aggregator;
pub mod elimination;
pub mod error;
pub mod types;


pub use aggregator::ConsolidationAggregator;
pub use elimination::EliminationMatcher;
pub use error::ConsolidationError;
pub use types::{
    ConsolidatedAmount, ConsolidatedKey, ConsolidationOutcome, IntercompanyPartner,
    UnreconciledIntercompany, UnreconciledReason,
};
