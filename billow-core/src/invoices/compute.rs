//! Derived invoice fields.
//!
//! Every stored monetary value passes through these functions, so the
//! 2 dp midpoint-away-from-zero rounding lives in exactly one place.
//! Validation bounds the inputs (`payment_terms` ≤ 3650, `|quantity|` ≤
//! 10⁹, `price` ≤ 10¹⁵, four-digit years), which keeps the date addition
//! and decimal arithmetic below from overflowing.

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::InvoiceItem;

/// Date payment falls due: the issue date plus the payment terms in days.
pub fn payment_due(issued_at: NaiveDate, payment_terms: i64) -> NaiveDate {
    issued_at
        .checked_add_signed(Duration::days(payment_terms))
        .unwrap_or(NaiveDate::MAX)
}

/// Line total: `quantity × price`, rounded to two decimal places.
pub fn line_total(quantity: i64, price: Decimal) -> Decimal {
    (Decimal::from(quantity) * price).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Invoice total: the rounded sum of the already-rounded line totals.
pub fn amount_due(items: &[InvoiceItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.total)
        .sum::<Decimal>()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
