pub mod invoice;
pub mod payment_term;

pub use invoice::{Address, Invoice, InvoiceId, InvoiceItem, InvoiceResponse, InvoiceStatus};
pub use payment_term::PaymentTerm;
