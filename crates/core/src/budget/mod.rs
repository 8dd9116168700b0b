//! Budget header and line items.

pub mod error;
pub mod service;
pub mod types;


pub use error::BudgetError;
pub use service::BudgetService;
pub use types::{Budget, BudgetLineItem, BudgetStatus};
