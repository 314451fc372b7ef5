use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, FieldErrors};
use crate::models::{InvoiceId, InvoiceResponse};
use crate::store::StoreError;
use crate::AppState;

use super::validation;

/// Attempts allowed when a generated id collides with an existing invoice.
const ID_RETRY_ATTEMPTS: u32 = 5;

/// Invoice list endpoint handler.
///
/// Handles GET requests to `/api/invoices`. The `status` query parameter
/// may repeat; matching invoices from any of the given statuses are
/// returned, newest issue date first.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let statuses = validation::parse_status_filter(&params)?;
    let invoices = state.store.list_invoices(&statuses).await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

/// Invoice creation endpoint handler.
///
/// Handles POST requests to `/api/invoices`. Validates the payload under
/// the submitted status variant, computes the derived fields, and stores
/// the invoice under a freshly generated id.
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    let input = validation::parse_invoice(&body)?;

    for _ in 0..ID_RETRY_ATTEMPTS {
        let invoice = input.clone().into_invoice(InvoiceId::generate());
        match state.store.insert_invoice(&invoice).await {
            Ok(()) => {
                info!("Created {} invoice {}", invoice.status, invoice.id);
                return Ok((StatusCode::CREATED, Json(invoice.into())));
            }
            Err(StoreError::Duplicate(id)) => {
                warn!("Generated invoice id {} already exists, retrying", id);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ApiError::internal("could not generate a unique invoice id"))
}

/// Single invoice endpoint handler.
///
/// Handles GET requests to `/api/invoices/:id`.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let invoice = state
        .store
        .get_invoice(&id)
        .await?
        .ok_or_else(|| ApiError::invoice_not_found(&id))?;
    Ok(Json(invoice.into()))
}

/// Invoice update endpoint handler.
///
/// Handles PUT requests to `/api/invoices/:id`. The payload replaces the
/// invoice wholesale and derived fields are recomputed; the status may
/// only move forward.
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    let input = validation::parse_invoice(&body)?;

    let existing = state
        .store
        .get_invoice(&id)
        .await?
        .ok_or_else(|| ApiError::invoice_not_found(&id))?;
    existing.ensure_can_become(input.status)?;

    let invoice = input.into_invoice(id);
    if !state.store.update_invoice(&invoice).await? {
        return Err(ApiError::invoice_not_found(&invoice.id));
    }
    info!("Updated invoice {}", invoice.id);
    Ok(Json(invoice.into()))
}

/// Invoice deletion endpoint handler.
///
/// Handles DELETE requests to `/api/invoices/:id`. Paid invoices are kept
/// as a permanent record and cannot be deleted.
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    let invoice = state
        .store
        .get_invoice(&id)
        .await?
        .ok_or_else(|| ApiError::invoice_not_found(&id))?;
    invoice.ensure_deletable()?;

    if !state.store.delete_invoice(&id).await? {
        return Err(ApiError::invoice_not_found(&id));
    }
    info!("Deleted invoice {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Status change endpoint handler.
///
/// Handles PUT requests to `/api/invoices/:id/status`. The only exposed
/// transition is pending to paid.
pub async fn change_invoice_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let id = parse_id(&raw_id)?;
    validation::parse_status_change(&body)?;

    let mut invoice = state
        .store
        .get_invoice(&id)
        .await?
        .ok_or_else(|| ApiError::invoice_not_found(&id))?;
    invoice.mark_paid()?;

    if !state.store.update_invoice(&invoice).await? {
        return Err(ApiError::invoice_not_found(&id));
    }
    info!("Marked invoice {} as paid", invoice.id);
    Ok(Json(invoice.into()))
}

/// Parses a path id, reporting a malformed one as a field error rather
/// than a missing invoice.
fn parse_id(raw: &str) -> Result<InvoiceId, ApiError> {
    InvoiceId::parse(raw).ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.push("id", "is not a valid invoice id");
        errors.into()
    })
}
