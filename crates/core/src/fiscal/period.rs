//! Fiscal period types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stratum_shared::types::FiscalPeriodId;

/// Status of a fiscal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalPeriodStatus {
    /// Period is not yet open.
    Future,
    /// Period is open for budgeting and allocation.
    Open,
    /// Period is closed, no new allocations allowed.
    Closed,
    /// Period is locked, no changes allowed.
    Locked,
}

/// A dated accounting interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Unique identifier.
    pub id: FiscalPeriodId,
    /// Period name (e.g., "2026-01").
    pub name: String,
    /// Start date of the period.
    pub start_date: NaiveDate,
    /// End date of the period (inclusive).
    pub end_date: NaiveDate,
    /// Current status.
    pub status: FiscalPeriodStatus,
}

impl FiscalPeriod {
    /// Returns true if new allocations may be written into this period.
    #[must_use]
    pub fn accepts_allocations(&self) -> bool {
        !matches!(
            self.status,
            FiscalPeriodStatus::Closed | FiscalPeriodStatus::Locked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn period(status: FiscalPeriodStatus) -> FiscalPeriod {
        FiscalPeriod {
            id: FiscalPeriodId::new(),
            name: "2026-01".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            status,
        }
    }

    #[rstest]
    #[case(FiscalPeriodStatus::Future, true)]
    #[case(FiscalPeriodStatus::Open, true)]
    #[case(FiscalPeriodStatus::Closed, false)]
    #[case(FiscalPeriodStatus::Locked, false)]
    fn test_accepts_allocations(#[case] status: FiscalPeriodStatus, #[case] expected: bool) {
        assert_eq!(period(status).accepts_allocations(), expected);
    }
}
