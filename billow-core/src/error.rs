use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::InvoiceId;
use crate::store::StoreError;

/// Per-field validation failures, keyed by dotted path.
///
/// Paths use up to three levels: a top-level field (`clientName`), a field
/// of a nested object (`clientAddress.street`), or an array index plus
/// field (`items.0.quantity`). A `BTreeMap` keeps serialization order
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure message against a field path.
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.entry(path.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a path, if any.
    pub fn messages(&self, path: &str) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Domain error for the invoice API.
///
/// Every handler returns this type; the `IntoResponse` impl below is the
/// sole place where domain errors become HTTP responses, so every error
/// body has the same shape.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested invoice does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The invoice exists but its lifecycle forbids the operation.
    #[error("{0}")]
    NotPermitted(String),

    /// The submitted payload failed schema validation.
    #[error("invoice validation failed")]
    Validation(FieldErrors),

    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Anything else that should never happen in normal operation.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn invoice_not_found(id: &InvoiceId) -> Self {
        ApiError::NotFound(format!("cannot find invoice with id '{id}'"))
    }

    pub fn not_permitted(message: impl Into<String>) -> Self {
        ApiError::NotPermitted(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// The HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotPermitted(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::NotPermitted(_) => "ACTION_NOT_PERMITTED",
            ApiError::Validation(_) => "VALIDATION_FAILED",
            ApiError::Store(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(fields: FieldErrors) -> Self {
        ApiError::Validation(fields)
    }
}

/// Error response body with a stable shape across all failure modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        // Internal details are logged, never serialized to the client.
        let message = match &self {
            ApiError::Store(err) => {
                tracing::error!("storage failure: {err}");
                "internal server error".to_string()
            }
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let fields = match self {
            ApiError::Validation(fields) => Some(fields),
            _ => None,
        };

        let body = ErrorResponse {
            code,
            message,
            fields,
        };
        (status, Json(body)).into_response()
    }
}
