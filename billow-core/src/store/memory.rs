//! In-memory invoice store for tests and database-less development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{InvoiceStore, StoreError};
use crate::models::{Invoice, InvoiceId, InvoiceStatus, PaymentTerm};

/// In-memory store backed by a `RwLock<HashMap>`.
///
/// Holds the same seeded payment terms the Postgres migration inserts, so
/// either backend serves an identical `/api/payment-terms` response.
#[derive(Clone)]
pub struct MemoryStore {
    invoices: Arc<RwLock<HashMap<InvoiceId, Invoice>>>,
    payment_terms: Vec<PaymentTerm>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            invoices: Arc::new(RwLock::new(HashMap::new())),
            payment_terms: PaymentTerm::defaults(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_err<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Unavailable(format!("failed to acquire lock: {err}"))
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.invoices.read().map_err(lock_err)?;
        Ok(())
    }

    async fn list_invoices(&self, statuses: &[InvoiceStatus]) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(lock_err)?;

        let mut matched: Vec<Invoice> = invoices
            .values()
            .filter(|invoice| statuses.is_empty() || statuses.contains(&invoice.status))
            .cloned()
            .collect();

        // Same order the Postgres backend produces.
        matched.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then_with(|| a.id.cmp(&b.id)));

        Ok(matched)
    }

    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(lock_err)?;
        Ok(invoices.get(id).cloned())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().map_err(lock_err)?;

        if invoices.contains_key(&invoice.id) {
            return Err(StoreError::Duplicate(invoice.id.clone()));
        }
        invoices.insert(invoice.id.clone(), invoice.clone());

        Ok(())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<bool, StoreError> {
        let mut invoices = self.invoices.write().map_err(lock_err)?;

        if !invoices.contains_key(&invoice.id) {
            return Ok(false);
        }
        invoices.insert(invoice.id.clone(), invoice.clone());

        Ok(true)
    }

    async fn delete_invoice(&self, id: &InvoiceId) -> Result<bool, StoreError> {
        let mut invoices = self.invoices.write().map_err(lock_err)?;
        Ok(invoices.remove(id).is_some())
    }

    async fn list_payment_terms(&self) -> Result<Vec<PaymentTerm>, StoreError> {
        Ok(self.payment_terms.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Address;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn sample_invoice(id: &str, status: InvoiceStatus, issued: (i32, u32, u32)) -> Invoice {
        Invoice {
            id: InvoiceId::parse(id).unwrap(),
            status,
            sender_address: Address::default(),
            client_name: "Jensen Huang".to_string(),
            client_email: "jensenh@mail.com".to_string(),
            client_address: Address::default(),
            issued_at: NaiveDate::from_ymd_opt(issued.0, issued.1, issued.2).unwrap(),
            payment_terms: 1,
            description: String::new(),
            items: Vec::new(),
            payment_due: NaiveDate::from_ymd_opt(issued.0, issued.1, issued.2).unwrap(),
            amount_due: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let invoice = sample_invoice("RT3080", InvoiceStatus::Pending, (2021, 8, 27));

        store.insert_invoice(&invoice).await.unwrap();
        let found = store.get_invoice(&invoice.id).await.unwrap().unwrap();
        assert_eq!(found, invoice);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let invoice = sample_invoice("RT3080", InvoiceStatus::Draft, (2021, 8, 27));

        store.insert_invoice(&invoice).await.unwrap();
        let err = store.insert_invoice(&invoice).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_missing_returns_false() {
        let store = MemoryStore::new();
        let invoice = sample_invoice("ZZ0001", InvoiceStatus::Draft, (2021, 8, 27));
        assert!(!store.update_invoice(&invoice).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_from_lists() {
        let store = MemoryStore::new();
        let invoice = sample_invoice("RT3080", InvoiceStatus::Pending, (2021, 8, 27));
        store.insert_invoice(&invoice).await.unwrap();

        assert!(store.delete_invoice(&invoice.id).await.unwrap());
        assert!(!store.delete_invoice(&invoice.id).await.unwrap());
        assert!(store.list_invoices(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_then_id() {
        let store = MemoryStore::new();
        store
            .insert_invoice(&sample_invoice("AA0001", InvoiceStatus::Draft, (2021, 8, 20)))
            .await
            .unwrap();
        store
            .insert_invoice(&sample_invoice("BB0002", InvoiceStatus::Pending, (2021, 8, 27)))
            .await
            .unwrap();
        store
            .insert_invoice(&sample_invoice("AA0002", InvoiceStatus::Paid, (2021, 8, 27)))
            .await
            .unwrap();

        let all = store.list_invoices(&[]).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["AA0002", "BB0002", "AA0001"]);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_set() {
        let store = MemoryStore::new();
        store
            .insert_invoice(&sample_invoice("AA0001", InvoiceStatus::Draft, (2021, 8, 20)))
            .await
            .unwrap();
        store
            .insert_invoice(&sample_invoice("BB0002", InvoiceStatus::Pending, (2021, 8, 27)))
            .await
            .unwrap();
        store
            .insert_invoice(&sample_invoice("CC0003", InvoiceStatus::Paid, (2021, 8, 25)))
            .await
            .unwrap();

        let drafts = store
            .list_invoices(&[InvoiceStatus::Draft])
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id.as_str(), "AA0001");

        let open = store
            .list_invoices(&[InvoiceStatus::Draft, InvoiceStatus::Pending])
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
    }

    #[tokio::test]
    async fn test_payment_terms_are_seeded() {
        let store = MemoryStore::new();
        let terms = store.list_payment_terms().await.unwrap();
        let days: Vec<i64> = terms.iter().map(|t| t.days).collect();
        assert_eq!(days, vec![1, 7, 14, 30]);
    }
}
