//! Source documents (invoices) and partner commissions, as far as period
//! closing needs to see them.

pub mod registry;
pub mod types;

pub use registry::{DocumentPostingRegistry, UnpostedDocuments};
pub use types::{
    BillingState, CommissionRecord, CommissionSettlement, DocumentKind, DocumentPostingStatus,
    PostingStatus, SourceDocument,
};
