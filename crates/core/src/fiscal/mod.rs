//! Fiscal period state consumed by the engine.

pub mod period;

pub use period::{FiscalPeriod, FiscalPeriodStatus};
