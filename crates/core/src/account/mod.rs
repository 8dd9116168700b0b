//! General-ledger account attributes consumed by the engine.

pub mod types;

pub use types::{AccountChart, AccountType, GlAccount};
