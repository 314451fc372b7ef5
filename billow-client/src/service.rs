//! High-level invoice operations: cached reads and optimistic writes.

use tracing::{debug, warn};

use crate::api::{ApiClient, ClientError};
use crate::cache::{ListKey, QueryCache, Snapshot};
use crate::types::{placeholder_id, Invoice, InvoicePayload, InvoiceStatus, PaymentTerm};

/// Drives the mutation flow a UI needs: stage the optimistic change,
/// issue the request, roll the cache back on failure, and mark the
/// cache stale on settlement so the next read reconciles against the
/// server.
pub struct InvoiceService {
    api: ApiClient,
    cache: QueryCache,
}

impl InvoiceService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: QueryCache::new(),
        }
    }

    /// Read access to the underlying cache.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Lists invoices, serving a fresh cache entry when one exists.
    pub async fn invoices(
        &mut self,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, ClientError> {
        let key = ListKey::new(statuses);
        if let Some(cached) = self.cache.fresh_list(&key) {
            debug!("Serving invoice list from cache");
            return Ok(cached.to_vec());
        }
        let invoices = self.api.list_invoices(key.statuses()).await?;
        self.cache.put_list(key, invoices.clone());
        Ok(invoices)
    }

    /// Fetches one invoice, serving a fresh cache entry when one exists.
    pub async fn invoice(&mut self, id: &str) -> Result<Invoice, ClientError> {
        if let Some(cached) = self.cache.fresh_detail(id) {
            debug!("Serving invoice {} from cache", id);
            return Ok(cached.clone());
        }
        let invoice = self.api.get_invoice(id).await?;
        self.cache.put_detail(invoice.clone());
        Ok(invoice)
    }

    /// Creates an invoice, staging a derived preview under a placeholder
    /// id while the request is in flight.
    pub async fn create_invoice(
        &mut self,
        payload: &InvoicePayload,
    ) -> Result<Invoice, ClientError> {
        let provisional = payload.preview(placeholder_id());
        let snapshot = self.cache.apply_create(&provisional);
        let result = self.api.create_invoice(payload).await;
        self.settle(snapshot, result)
    }

    /// Updates an invoice in place.
    ///
    /// Updates are not staged optimistically; the cache is invalidated on
    /// settlement and the next read refetches.
    pub async fn update_invoice(
        &mut self,
        id: &str,
        payload: &InvoicePayload,
    ) -> Result<Invoice, ClientError> {
        let result = self.api.update_invoice(id, payload).await;
        self.cache.invalidate_all();
        result
    }

    /// Deletes an invoice, removing it from the cache up front.
    pub async fn delete_invoice(&mut self, id: &str) -> Result<(), ClientError> {
        let snapshot = self.cache.apply_delete(id);
        let result = self.api.delete_invoice(id).await;
        self.settle(snapshot, result)
    }

    /// Marks an invoice paid, flipping it in the cache up front.
    pub async fn mark_paid(&mut self, id: &str) -> Result<Invoice, ClientError> {
        let snapshot = self.cache.apply_paid(id);
        let result = self.api.mark_paid(id).await;
        self.settle(snapshot, result)
    }

    pub async fn payment_terms(&self) -> Result<Vec<PaymentTerm>, ClientError> {
        self.api.list_payment_terms().await
    }

    /// Settles an optimistic mutation: a failure rolls the cache back to
    /// the snapshot, and either way every entry is marked stale so the
    /// next read refetches.
    fn settle<T>(
        &mut self,
        snapshot: Snapshot,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        if let Err(err) = &result {
            warn!("Rolling back optimistic update: {}", err);
            self.cache.restore(snapshot);
        }
        self.cache.invalidate_all();
        result
    }
}
