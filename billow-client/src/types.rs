//! Wire types mirroring the invoice API's JSON shapes.

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Per-field validation messages keyed by dotted path, as returned in the
/// `fields` member of a validation error response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

/// Postal address on either side of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub post_code: String,
    pub country: String,
}

/// A line item as returned by the server, including its derived total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
}

/// A full invoice as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub status: InvoiceStatus,
    pub sender_address: Address,
    pub client_name: String,
    pub client_email: String,
    pub client_address: Address,
    pub issued_at: NaiveDate,
    pub payment_terms: i64,
    pub description: String,
    pub items: Vec<InvoiceItem>,
    pub payment_due: NaiveDate,
    pub amount_due: Decimal,
}

/// Payment term reference entry for the terms selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTerm {
    pub id: i64,
    pub name: String,
    pub days: i64,
}

/// The create/update submission body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub status: InvoiceStatus,
    pub sender_address: Address,
    pub client_name: String,
    pub client_email: String,
    pub client_address: Address,
    pub issued_at: NaiveDate,
    pub payment_terms: i64,
    pub description: String,
    pub items: Vec<ItemPayload>,
}

/// A line item as submitted; the total is derived server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
}

impl InvoicePayload {
    /// Builds the provisional invoice staged into the cache while a create
    /// request is in flight.
    ///
    /// Derived fields follow the server's rounding rules so the preview
    /// matches what the refetch will return; the placeholder id is
    /// superseded once real data lands.
    pub fn preview(&self, id: String) -> Invoice {
        let items: Vec<InvoiceItem> = self
            .items
            .iter()
            .map(|item| InvoiceItem {
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.price,
                total: round_money(Decimal::from(item.quantity) * item.price),
            })
            .collect();
        let amount_due = round_money(items.iter().map(|item| item.total).sum());

        Invoice {
            id,
            status: self.status,
            sender_address: self.sender_address.clone(),
            client_name: self.client_name.clone(),
            client_email: self.client_email.clone(),
            client_address: self.client_address.clone(),
            issued_at: self.issued_at,
            payment_terms: self.payment_terms,
            description: self.description.clone(),
            items,
            // Unlike the server, preview input is unvalidated, so the
            // date math stays checked end to end.
            payment_due: Duration::try_days(self.payment_terms)
                .and_then(|terms| self.issued_at.checked_add_signed(terms))
                .unwrap_or(NaiveDate::MAX),
            amount_due,
        }
    }
}

/// Generates a placeholder id in the server's two-letter four-digit
/// format, used for optimistic entries until the refetch brings the
/// real one.
pub fn placeholder_id() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let mut code = String::with_capacity(6);
    code.push((b'A' + bytes[0] % 26) as char);
    code.push((b'A' + bytes[1] % 26) as char);
    for b in &bytes[2..6] {
        code.push((b'0' + b % 10) as char);
    }
    code
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
