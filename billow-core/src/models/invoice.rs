use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ApiError;

/// Invoice identifier: two letters followed by four digits (e.g. `RT3080`).
///
/// Input is accepted case-insensitively; the canonical form is uppercase.
/// Parsing is the single place where normalization happens, so every id
/// held by the rest of the system is already canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Parses and normalizes a raw id, returning `None` if it does not
    /// match the two-letter four-digit format.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() != 6 || !raw.is_ascii() {
            return None;
        }
        let (letters, digits) = raw.split_at(2);
        if !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(InvoiceId(raw.to_ascii_uppercase()))
    }

    /// Generates a fresh random id from UUID entropy.
    ///
    /// Collisions are possible (the space is 26² × 10⁴) and handled by the
    /// caller retrying against the store's duplicate check.
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let mut code = String::with_capacity(6);
        code.push((b'A' + bytes[0] % 26) as char);
        code.push((b'A' + bytes[1] % 26) as char);
        for b in &bytes[2..6] {
            code.push((b'0' + b % 10) as char);
        }
        InvoiceId(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for InvoiceId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        InvoiceId::parse(&raw).ok_or_else(|| format!("'{raw}' is not a valid invoice id"))
    }
}

/// Invoice status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar")]
pub enum InvoiceStatus {
    #[sqlx(rename = "draft")]
    Draft,
    #[sqlx(rename = "pending")]
    Pending,
    #[sqlx(rename = "paid")]
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

    /// Parses a lowercase status name as it appears on the wire and in the
    /// `status` query parameter.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(InvoiceStatus::Draft),
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Postal address attached to either side of an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub post_code: String,
    pub country: String,
}

/// A single line item with its derived total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub total: Decimal,
}

/// Invoice model representing an invoice in the system.
///
/// Derived fields (`payment_due`, per-item `total`, `amount_due`) are
/// computed when the invoice is created or updated and stored alongside
/// the submitted data.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    /// Unique identifier (two letters, four digits)
    pub id: InvoiceId,

    /// Lifecycle status
    pub status: InvoiceStatus,

    /// Address the invoice is sent from
    pub sender_address: Address,

    /// Client name
    pub client_name: String,

    /// Client email address
    pub client_email: String,

    /// Address the invoice is billed to
    pub client_address: Address,

    /// Date the invoice was issued
    pub issued_at: NaiveDate,

    /// Days until payment is due, counted from the issue date
    pub payment_terms: i64,

    /// Description of the work being billed
    pub description: String,

    /// Line items in submission order
    pub items: Vec<InvoiceItem>,

    /// Derived: `issued_at` plus `payment_terms` days
    pub payment_due: NaiveDate,

    /// Derived: rounded sum of the rounded line-item totals
    pub amount_due: Decimal,
}

impl Invoice {
    /// Returns an error if the invoice can no longer be edited.
    ///
    /// Paid invoices are immutable.
    pub fn ensure_editable(&self) -> Result<(), ApiError> {
        if self.status == InvoiceStatus::Paid {
            return Err(ApiError::not_permitted(format!(
                "cannot edit paid invoice '{}'",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns an error if the invoice cannot be deleted.
    pub fn ensure_deletable(&self) -> Result<(), ApiError> {
        if self.status == InvoiceStatus::Paid {
            return Err(ApiError::not_permitted(format!(
                "cannot delete paid invoice '{}'",
                self.id
            )));
        }
        Ok(())
    }

    /// Checks that an update may carry the invoice to `next`.
    ///
    /// The lifecycle is forward-only: paid invoices reject every edit, and
    /// a pending invoice cannot be demoted back to draft.
    pub fn ensure_can_become(&self, next: InvoiceStatus) -> Result<(), ApiError> {
        self.ensure_editable()?;
        if self.status == InvoiceStatus::Pending && next == InvoiceStatus::Draft {
            return Err(ApiError::not_permitted(format!(
                "cannot change pending invoice '{}' back to draft",
                self.id
            )));
        }
        Ok(())
    }

    /// Transitions the invoice to paid.
    ///
    /// # Errors
    ///
    /// Fails unless the current status is `pending`: drafts must be
    /// submitted first, and paid is terminal.
    pub fn mark_paid(&mut self) -> Result<(), ApiError> {
        match self.status {
            InvoiceStatus::Pending => {
                self.status = InvoiceStatus::Paid;
                Ok(())
            }
            other => Err(ApiError::not_permitted(format!(
                "cannot mark {} invoice '{}' as paid",
                other, self.id
            ))),
        }
    }
}

/// Invoice response (public representation)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: InvoiceId,
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

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        InvoiceResponse {
            id: invoice.id,
            status: invoice.status,
            sender_address: invoice.sender_address,
            client_name: invoice.client_name,
            client_email: invoice.client_email,
            client_address: invoice.client_address,
            issued_at: invoice.issued_at,
            payment_terms: invoice.payment_terms,
            description: invoice.description,
            items: invoice.items,
            payment_due: invoice.payment_due,
            amount_due: invoice.amount_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_with_status(status: InvoiceStatus) -> Invoice {
        Invoice {
            id: InvoiceId::parse("RT3080").unwrap(),
            status,
            sender_address: Address::default(),
            client_name: String::new(),
            client_email: String::new(),
            client_address: Address::default(),
            issued_at: NaiveDate::from_ymd_opt(2021, 8, 27).unwrap(),
            payment_terms: 2,
            description: String::new(),
            items: Vec::new(),
            payment_due: NaiveDate::from_ymd_opt(2021, 8, 29).unwrap(),
            amount_due: Decimal::ZERO,
        }
    }

    #[test]
    fn test_id_parse_normalizes_case() {
        let id = InvoiceId::parse("rt3080").unwrap();
        assert_eq!(id.as_str(), "RT3080");
    }

    #[test]
    fn test_id_parse_rejects_bad_shapes() {
        assert!(InvoiceId::parse("R3080").is_none());
        assert!(InvoiceId::parse("RT308").is_none());
        assert!(InvoiceId::parse("RT30800").is_none());
        assert!(InvoiceId::parse("R23080").is_none());
        assert!(InvoiceId::parse("RTX080").is_none());
        assert!(InvoiceId::parse("aé2345").is_none());
    }

    #[test]
    fn test_generated_ids_match_format() {
        for _ in 0..100 {
            let id = InvoiceId::generate();
            assert!(InvoiceId::parse(id.as_str()).is_some());
            assert_eq!(id.as_str(), id.as_str().to_ascii_uppercase());
        }
    }

    #[test]
    fn test_pending_to_paid_transition() {
        let mut invoice = invoice_with_status(InvoiceStatus::Pending);
        invoice.mark_paid().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_draft_cannot_be_marked_paid() {
        let mut invoice = invoice_with_status(InvoiceStatus::Draft);
        let err = invoice.mark_paid().unwrap_err();
        assert!(err.to_string().contains("cannot mark draft invoice"));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_paid_is_terminal() {
        let mut invoice = invoice_with_status(InvoiceStatus::Paid);
        assert!(invoice.mark_paid().is_err());
        assert!(invoice.ensure_editable().is_err());
        assert!(invoice.ensure_deletable().is_err());
    }

    #[test]
    fn test_pending_cannot_be_demoted() {
        let invoice = invoice_with_status(InvoiceStatus::Pending);
        assert!(invoice.ensure_can_become(InvoiceStatus::Draft).is_err());
        assert!(invoice.ensure_can_become(InvoiceStatus::Pending).is_ok());
    }

    #[test]
    fn test_draft_can_move_forward() {
        let invoice = invoice_with_status(InvoiceStatus::Draft);
        assert!(invoice.ensure_can_become(InvoiceStatus::Draft).is_ok());
        assert!(invoice.ensure_can_become(InvoiceStatus::Pending).is_ok());
    }
}
