//! Storage backends for invoices and payment terms.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Invoice, InvoiceId, InvoiceStatus, PaymentTerm};

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with an existing invoice id.
    #[error("invoice '{0}' already exists")]
    Duplicate(InvoiceId),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back to the domain model.
    #[error("data integrity error: {0}")]
    Integrity(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Repository interface the handlers are written against.
///
/// The router owns an `Arc<dyn InvoiceStore>`, so the HTTP layer never
/// knows which backend it is talking to. Both backends return invoices in
/// the same order: issue date descending, then id ascending.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Backend liveness check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// All invoices, optionally filtered to a set of statuses.
    ///
    /// An empty filter returns everything.
    async fn list_invoices(&self, statuses: &[InvoiceStatus]) -> Result<Vec<Invoice>, StoreError>;

    async fn get_invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// Inserts a new invoice; fails with [`StoreError::Duplicate`] if the
    /// id is taken.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StoreError>;

    /// Replaces an invoice wholesale. Returns `false` if the id is unknown.
    async fn update_invoice(&self, invoice: &Invoice) -> Result<bool, StoreError>;

    /// Returns `false` if the id is unknown.
    async fn delete_invoice(&self, id: &InvoiceId) -> Result<bool, StoreError>;

    /// Seeded payment-term reference rows, ordered by day count.
    async fn list_payment_terms(&self) -> Result<Vec<PaymentTerm>, StoreError>;
}
