//! Cost-center tree expansion.
//!
//! The resolver turns raw cost-center rows into leveled, weighted
//! [`HierarchyNode`]s. Parent pointers are never trusted to be acyclic:
//! expansion is breadth-first, bounded by a maximum depth, and never inserts
//! a cost center twice.

pub mod error;
pub mod resolver;
pub mod types;


pub use error::HierarchyError;
pub use resolver::HierarchyResolver;
pub use types::{CostCenter, CostCenterDirectory, HierarchyNode, ResolveOptions};
