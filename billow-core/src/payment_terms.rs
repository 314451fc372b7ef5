use axum::{extract::State, response::Json};

use crate::error::ApiError;
use crate::models::PaymentTerm;
use crate::AppState;

/// Payment terms endpoint handler.
///
/// Handles GET requests to `/api/payment-terms`, returning the
/// selectable terms ordered by length.
pub async fn list_payment_terms(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentTerm>>, ApiError> {
    let terms = state.store.list_payment_terms().await?;
    Ok(Json(terms))
}
