//! Schema validation for invoice payloads.
//!
//! Runs over the raw JSON body rather than a deserialized struct, so a
//! wrong type in one field becomes a field error instead of rejecting the
//! whole request. Two variants apply: `draft` tolerates missing and empty
//! values, `pending` requires everything. Failures land in a
//! [`FieldErrors`] map keyed by dotted paths (`clientAddress.street`,
//! `items.0.quantity`).

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use validator::ValidateEmail;

use super::types::{InvoiceInput, ItemInput};
use crate::error::FieldErrors;
use crate::models::{Address, InvoiceStatus};

/// Upper bound on payment terms, in days.
const MAX_PAYMENT_TERMS: i64 = 3650;

/// Magnitude bound on item quantities.
const MAX_QUANTITY: i64 = 1_000_000_000;

/// Upper bound on item prices.
fn max_price() -> Decimal {
    Decimal::from(1_000_000_000_000_000_i64)
}

/// Validates a create/update payload and resolves it into an
/// [`InvoiceInput`].
///
/// The submitted `status` selects the schema variant; `paid` is not a
/// valid submission status, so creation cannot skip the lifecycle.
pub fn parse_invoice(body: &Value) -> Result<InvoiceInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let status = match body.get("status").and_then(Value::as_str) {
        Some(raw) => match InvoiceStatus::parse(raw) {
            Some(InvoiceStatus::Paid) | None => None,
            Some(status) => Some(status),
        },
        None => None,
    };
    let Some(status) = status else {
        errors.push("status", "must be either 'draft' or 'pending'");
        return Err(errors);
    };
    let strict = status == InvoiceStatus::Pending;

    let sender_address = parse_address(body, "senderAddress", strict, &mut errors);
    let client_name = text_value(body.get("clientName"), "clientName", strict, &mut errors);
    let client_email = parse_email(body, strict, &mut errors);
    let client_address = parse_address(body, "clientAddress", strict, &mut errors);
    let issued_at = parse_issue_date(body, strict, &mut errors);
    let payment_terms = parse_payment_terms(body, strict, &mut errors);
    let description = text_value(body.get("description"), "description", strict, &mut errors);
    let items = parse_items(body, strict, &mut errors);

    if errors.is_empty() {
        Ok(InvoiceInput {
            status,
            sender_address,
            client_name,
            client_email,
            client_address,
            issued_at,
            payment_terms,
            description,
            items,
        })
    } else {
        Err(errors)
    }
}

/// Validates the body of the status-change endpoint.
///
/// The only transition the API exposes is to `paid`.
pub fn parse_status_change(body: &Value) -> Result<InvoiceStatus, FieldErrors> {
    match body.get("status").and_then(Value::as_str) {
        Some("paid") => Ok(InvoiceStatus::Paid),
        _ => {
            let mut errors = FieldErrors::new();
            errors.push("status", "must be 'paid'");
            Err(errors)
        }
    }
}

/// Parses the repeatable `status` query parameter into a status set.
///
/// Unknown parameter names are ignored; unknown status values are a
/// validation failure rather than a silently empty filter.
pub fn parse_status_filter(params: &[(String, String)]) -> Result<Vec<InvoiceStatus>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let mut statuses = Vec::new();

    for (key, value) in params {
        if key != "status" {
            continue;
        }
        match InvoiceStatus::parse(value) {
            Some(status) => {
                if !statuses.contains(&status) {
                    statuses.push(status);
                }
            }
            None => errors.push("status", format!("'{value}' is not a valid status")),
        }
    }

    if errors.is_empty() {
        Ok(statuses)
    } else {
        Err(errors)
    }
}

fn text_value(value: Option<&Value>, path: &str, strict: bool, errors: &mut FieldErrors) -> String {
    match value {
        None | Some(Value::Null) => {
            if strict {
                errors.push(path, "can't be empty");
            }
            String::new()
        }
        Some(Value::String(s)) => {
            if strict && s.is_empty() {
                errors.push(path, "can't be empty");
            }
            s.clone()
        }
        Some(_) => {
            errors.push(path, "must be a string");
            String::new()
        }
    }
}

fn parse_email(body: &Value, strict: bool, errors: &mut FieldErrors) -> String {
    let email = text_value(body.get("clientEmail"), "clientEmail", strict, errors);
    // Drafts may leave the email blank, but a non-empty value must be
    // well-formed in both variants.
    if !email.is_empty() && !email.validate_email() {
        errors.push("clientEmail", "must be a valid email");
    }
    email
}

fn parse_address(body: &Value, field: &str, strict: bool, errors: &mut FieldErrors) -> Address {
    let value = match body.get(field) {
        None | Some(Value::Null) => {
            if strict {
                errors.push(field, "can't be empty");
            }
            return Address::default();
        }
        Some(value) => value,
    };
    if !value.is_object() {
        errors.push(field, "must be an object");
        return Address::default();
    }

    Address {
        street: nested_text(value, field, "street", strict, errors),
        city: nested_text(value, field, "city", strict, errors),
        post_code: nested_text(value, field, "postCode", strict, errors),
        country: nested_text(value, field, "country", strict, errors),
    }
}

fn nested_text(
    object: &Value,
    parent: &str,
    field: &str,
    strict: bool,
    errors: &mut FieldErrors,
) -> String {
    text_value(object.get(field), &format!("{parent}.{field}"), strict, errors)
}

fn parse_issue_date(body: &Value, strict: bool, errors: &mut FieldErrors) -> NaiveDate {
    let today = Utc::now().date_naive();
    match body.get("issuedAt") {
        None | Some(Value::Null) => {
            if strict {
                errors.push("issuedAt", "can't be empty");
            }
            today
        }
        Some(Value::String(s)) if s.is_empty() => {
            if strict {
                errors.push("issuedAt", "can't be empty");
            }
            today
        }
        Some(Value::String(s)) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            // Four-digit years keep date arithmetic far from the NaiveDate
            // limits.
            Ok(date) if (1..=9999).contains(&date.year()) => date,
            _ => {
                errors.push("issuedAt", "must be an ISO date (yyyy-mm-dd)");
                today
            }
        },
        Some(_) => {
            errors.push("issuedAt", "must be a string");
            today
        }
    }
}

fn parse_payment_terms(body: &Value, strict: bool, errors: &mut FieldErrors) -> i64 {
    match body.get("paymentTerms") {
        None | Some(Value::Null) => {
            if strict {
                errors.push("paymentTerms", "can't be empty");
            }
            0
        }
        Some(value) => match value.as_i64() {
            Some(n) if n < 0 => {
                errors.push("paymentTerms", "can't be negative");
                0
            }
            Some(n) if n > MAX_PAYMENT_TERMS => {
                errors.push("paymentTerms", "is out of range");
                0
            }
            Some(n) => n,
            None => {
                errors.push("paymentTerms", "must be an integer");
                0
            }
        },
    }
}

fn parse_items(body: &Value, strict: bool, errors: &mut FieldErrors) -> Vec<ItemInput> {
    match body.get("items") {
        None | Some(Value::Null) => {
            if strict {
                errors.push("items", "must include at least one item");
            }
            Vec::new()
        }
        Some(Value::Array(raw_items)) => {
            if strict && raw_items.is_empty() {
                errors.push("items", "must include at least one item");
            }
            raw_items
                .iter()
                .enumerate()
                .map(|(index, raw)| parse_item(raw, index, strict, errors))
                .collect()
        }
        Some(_) => {
            errors.push("items", "must be an array");
            Vec::new()
        }
    }
}

fn parse_item(raw: &Value, index: usize, strict: bool, errors: &mut FieldErrors) -> ItemInput {
    if !raw.is_object() {
        errors.push(format!("items.{index}"), "must be an object");
        return ItemInput {
            name: String::new(),
            quantity: 0,
            price: Decimal::ZERO,
        };
    }

    let name = text_value(
        raw.get("name"),
        &format!("items.{index}.name"),
        strict,
        errors,
    );
    let quantity = item_quantity(raw.get("quantity"), &format!("items.{index}.quantity"), strict, errors);
    let price = item_price(raw.get("price"), &format!("items.{index}.price"), strict, errors);

    ItemInput {
        name,
        quantity,
        price,
    }
}

fn item_quantity(value: Option<&Value>, path: &str, strict: bool, errors: &mut FieldErrors) -> i64 {
    match value {
        None | Some(Value::Null) => {
            if strict {
                errors.push(path, "can't be empty");
            }
            0
        }
        Some(v) => match v.as_i64() {
            Some(n) if !(-MAX_QUANTITY..=MAX_QUANTITY).contains(&n) => {
                errors.push(path, "is out of range");
                0
            }
            Some(n) => {
                // Drafts may hold any quantity; only pending requires a
                // positive count.
                if strict && n < 1 {
                    errors.push(path, "must be at least 1");
                }
                n
            }
            None => {
                errors.push(path, "must be an integer");
                0
            }
        },
    }
}

fn item_price(value: Option<&Value>, path: &str, strict: bool, errors: &mut FieldErrors) -> Decimal {
    let Some(v) = value else {
        if strict {
            errors.push(path, "can't be empty");
        }
        return Decimal::ZERO;
    };
    if v.is_null() {
        if strict {
            errors.push(path, "can't be empty");
        }
        return Decimal::ZERO;
    }

    let parsed = if let Some(n) = v.as_i64() {
        Some(Decimal::from(n))
    } else if let Some(f) = v.as_f64() {
        Decimal::try_from(f).ok()
    } else {
        None
    };

    match parsed {
        Some(price) if price < Decimal::ZERO => {
            errors.push(path, "can't be negative");
            Decimal::ZERO
        }
        Some(price) if price > max_price() => {
            errors.push(path, "is out of range");
            Decimal::ZERO
        }
        Some(price) => price,
        None if v.is_number() => {
            errors.push(path, "is out of range");
            Decimal::ZERO
        }
        None => {
            errors.push(path, "must be a number");
            Decimal::ZERO
        }
    }
}
