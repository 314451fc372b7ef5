use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::compute;
use crate::models::{Address, Invoice, InvoiceId, InvoiceItem, InvoiceStatus};

/// A validated invoice payload, ready to be stored.
///
/// Only the validation module produces this type: defaults are applied,
/// the issue date is resolved, and every numeric bound is checked, so
/// turning it into an [`Invoice`] is infallible.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceInput {
    pub status: InvoiceStatus,
    pub sender_address: Address,
    pub client_name: String,
    pub client_email: String,
    pub client_address: Address,
    pub issued_at: NaiveDate,
    pub payment_terms: i64,
    pub description: String,
    pub items: Vec<ItemInput>,
}

/// A validated line item before derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInput {
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
}

impl InvoiceInput {
    /// Builds the stored invoice under the given id, computing every
    /// derived field.
    pub fn into_invoice(self, id: InvoiceId) -> Invoice {
        let items: Vec<InvoiceItem> = self
            .items
            .into_iter()
            .map(|item| InvoiceItem {
                total: compute::line_total(item.quantity, item.price),
                name: item.name,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();
        let amount_due = compute::amount_due(&items);
        let payment_due = compute::payment_due(self.issued_at, self.payment_terms);

        Invoice {
            id,
            status: self.status,
            sender_address: self.sender_address,
            client_name: self.client_name,
            client_email: self.client_email,
            client_address: self.client_address,
            issued_at: self.issued_at,
            payment_terms: self.payment_terms,
            description: self.description,
            items,
            payment_due,
            amount_due,
        }
    }
}
