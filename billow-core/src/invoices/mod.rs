pub mod compute;
pub mod handlers;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;

pub use handlers::{
    change_invoice_status, create_invoice, delete_invoice, get_invoice, list_invoices,
    update_invoice,
};
pub use types::{InvoiceInput, ItemInput};
pub use validation::{parse_invoice, parse_status_change, parse_status_filter};
