//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `PeriodId` where a `FiscalYearId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

typed_id!(CompanyId, "Unique identifier for a company (tenant).");
typed_id!(ActorId, "Unique identifier for the user or process performing an action.");
typed_id!(AccountId, "Unique identifier for a chart of accounts entry.");
typed_id!(LedgerEntryId, "Unique identifier for a ledger (journal) entry.");
typed_id!(PostingId, "Unique identifier for a posting line.");
typed_id!(FiscalYearId, "Unique identifier for a fiscal year.");
typed_id!(PeriodId, "Unique identifier for an accounting period.");
typed_id!(DocumentId, "Unique identifier for a source document.");
typed_id!(CommissionId, "Unique identifier for a partner commission record.");
typed_id!(BankAccountId, "Unique identifier for a bank or cash account.");
typed_id!(MovementId, "Unique identifier for a treasury movement.");
typed_id!(SnapshotId, "Unique identifier for a balance snapshot.");
typed_id!(ClosureRecordId, "Unique identifier for a closure audit record.");
