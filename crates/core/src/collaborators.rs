//! Interfaces to the subsystems that own documents, commissions and treasury.
//!
//! The closing engine only reads through these traits; each returns
//! structured data instead of flags.

use async_trait::async_trait;
use closebook_shared::DateRange;
use closebook_shared::types::{BankAccountId, CompanyId};
use thiserror::Error;

use crate::documents::{CommissionSettlement, DocumentPostingStatus};
use crate::store::StoreError;
use crate::treasury::{BankAccount, TreasuryMovement};

/// Failure reported by a collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator could not answer.
    #[error("{collaborator} unavailable: {message}")]
    Unavailable {
        /// Which collaborator failed.
        collaborator: &'static str,
        /// Failure detail.
        message: String,
    },

    /// Reading shared storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invoicing: posting status of source documents.
#[async_trait]
pub trait SourceDocumentProvider: Send + Sync {
    /// Posting status of every document issued in `range`.
    async fn posting_status(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<DocumentPostingStatus>, CollaboratorError>;
}

/// Partner commissions.
#[async_trait]
pub trait CommissionProvider: Send + Sync {
    /// Settlement counts for commissions dated in `range`.
    async fn settlement_status(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<CommissionSettlement, CollaboratorError>;
}

/// Treasury: bank and cash accounts.
#[async_trait]
pub trait BankAccountProvider: Send + Sync {
    /// Active bank/cash accounts of the company.
    async fn active_accounts(
        &self,
        company: CompanyId,
    ) -> Result<Vec<BankAccount>, CollaboratorError>;
}

/// Treasury: movements on a bank or cash account.
#[async_trait]
pub trait TreasuryMovementProvider: Send + Sync {
    /// Movements on `account` dated in `range`.
    async fn movements(
        &self,
        account: BankAccountId,
        range: DateRange,
    ) -> Result<Vec<TreasuryMovement>, CollaboratorError>;
}
