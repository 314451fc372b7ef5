use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Payment term reference entity, used to populate the terms selector.
///
/// The Postgres backend seeds these rows by migration; the in-memory
/// backend uses [`PaymentTerm::defaults`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PaymentTerm {
    pub id: i64,
    pub name: String,
    pub days: i64,
}

impl PaymentTerm {
    /// The standard Net 1 / 7 / 14 / 30 set.
    pub fn defaults() -> Vec<PaymentTerm> {
        vec![
            PaymentTerm {
                id: 1,
                name: "Net 1 Day".to_string(),
                days: 1,
            },
            PaymentTerm {
                id: 2,
                name: "Net 7 Days".to_string(),
                days: 7,
            },
            PaymentTerm {
                id: 3,
                name: "Net 14 Days".to_string(),
                days: 14,
            },
            PaymentTerm {
                id: 4,
                name: "Net 30 Days".to_string(),
                days: 30,
            },
        ]
    }
}
