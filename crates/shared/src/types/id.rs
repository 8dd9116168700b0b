//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `CostCenterId` where a `GlAccountId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(CostCenterId, "Unique identifier for a cost center.");
typed_id!(GlAccountId, "Unique identifier for a general-ledger account.");
typed_id!(BudgetId, "Unique identifier for a budget.");
typed_id!(FiscalPeriodId, "Unique identifier for a fiscal period.");
typed_id!(LineItemId, "Unique identifier for a budget line item.");
typed_id!(AllocationRuleId, "Unique identifier for an allocation rule.");
typed_id!(RunId, "Unique identifier for a consolidation and allocation run.");
