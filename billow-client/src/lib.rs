//! Billow client data layer: typed wrappers over the invoice API plus a
//! query cache with optimistic updates for the create, delete, and
//! mark-paid mutations.
//!
//! [`ApiClient`] issues the requests, [`QueryCache`] holds list and
//! detail entries with staleness tracking, and [`InvoiceService`] ties
//! the two together with the stage / request / roll back / invalidate
//! mutation flow a UI drives.

pub mod api;
pub mod cache;
pub mod service;
pub mod types;

pub use api::{ApiClient, ClientError};
pub use cache::{ListKey, QueryCache, Snapshot};
pub use service::InvoiceService;
pub use types::{
    Address, FieldErrors, Invoice, InvoiceItem, InvoicePayload, InvoiceStatus, ItemPayload,
    PaymentTerm,
};
