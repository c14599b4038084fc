//! Read-only aggregation of document posting status.

use std::collections::BTreeMap;
use std::sync::Arc;

use closebook_shared::DateRange;
use closebook_shared::types::CompanyId;

use super::types::{DocumentKind, DocumentPostingStatus};
use crate::collaborators::{CollaboratorError, SourceDocumentProvider};

/// Documents blocking a close, grouped by kind.
pub type UnpostedDocuments = BTreeMap<DocumentKind, Vec<DocumentPostingStatus>>;

/// Collects documents that have not produced a ledger entry.
#[derive(Clone)]
pub struct DocumentPostingRegistry {
    provider: Arc<dyn SourceDocumentProvider>,
}

impl DocumentPostingRegistry {
    /// Creates a registry over the invoicing collaborator.
    #[must_use]
    pub fn new(provider: Arc<dyn SourceDocumentProvider>) -> Self {
        Self { provider }
    }

    /// Documents issued in `range` whose status is `Unposted` or
    /// `PostingFailed`, grouped by kind.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure.
    pub async fn unposted_or_failed(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<UnpostedDocuments, CollaboratorError> {
        let statuses = self.provider.posting_status(company, range).await?;

        let mut grouped = UnpostedDocuments::new();
        for status in statuses.into_iter().filter(|s| s.status.blocks_close()) {
            grouped.entry(status.kind).or_default().push(status);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::PostingStatus;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use closebook_shared::types::DocumentId;

    struct FixedProvider(Vec<DocumentPostingStatus>);

    #[async_trait]
    impl SourceDocumentProvider for FixedProvider {
        async fn posting_status(
            &self,
            _company: CompanyId,
            _range: DateRange,
        ) -> Result<Vec<DocumentPostingStatus>, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    fn status(kind: DocumentKind, number: &str, status: PostingStatus) -> DocumentPostingStatus {
        DocumentPostingStatus {
            kind,
            id: DocumentId::new(),
            number: number.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn test_groups_blocking_documents_by_kind() {
        let provider = FixedProvider(vec![
            status(DocumentKind::SalesInvoice, "F-001", PostingStatus::Posted),
            status(DocumentKind::SalesInvoice, "F-002", PostingStatus::Unposted),
            status(
                DocumentKind::PurchaseInvoice,
                "P-100",
                PostingStatus::PostingFailed {
                    error: "missing tax account".to_string(),
                },
            ),
        ]);
        let registry = DocumentPostingRegistry::new(Arc::new(provider));
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap();

        let grouped = registry
            .unposted_or_failed(CompanyId::new(), range)
            .await
            .unwrap();

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&DocumentKind::SalesInvoice][0].number, "F-002");
        assert_eq!(
            grouped[&DocumentKind::PurchaseInvoice][0].status.error(),
            Some("missing tax account")
        );
        assert!(!grouped.contains_key(&DocumentKind::CommissionInvoice));
    }
}
