//! Core business logic for Stratum.
//!
//! This crate contains the consolidation and allocation engine with ZERO web or
//! database dependencies. Callers hand in typed, in-memory collections and get
//! typed results back; persistence is their concern.
//!
//! # Modules
//!
//! - `account` - GL account attributes consumed by the engine
//! - `budget` - Budget header and line items
//! - `fiscal` - Fiscal period state
//! - `hierarchy` - Cost-center tree expansion
//! - `consolidation` - Bottom-up rollup and intercompany elimination
//! - `allocation` - Allocation rules, factors, and the wavefront scheduler
//! - `lock` - Named run locks
//! - `run` - End-to-end run orchestration and summaries

pub mod account;
pub mod allocation;
pub mod budget;
pub mod consolidation;
pub mod fiscal;
pub mod hierarchy;
pub mod lock;
pub mod run;
