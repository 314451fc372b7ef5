//! Typed request wrappers over the invoice API.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{FieldErrors, Invoice, InvoicePayload, InvoiceStatus, PaymentTerm};

/// Error surfaced by [`ApiClient`] calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status and a decoded error body.
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        fields: Option<FieldErrors>,
    },
}

/// Stable error body shape shared by every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
    fields: Option<FieldErrors>,
}

/// Thin typed client over the invoice API routes.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the API at `base_url` (scheme and authority,
    /// e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Lists invoices, optionally filtered to a set of statuses.
    pub async fn list_invoices(
        &self,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, ClientError> {
        let mut request = self.http.get(self.url("/api/invoices"));
        for status in statuses {
            request = request.query(&[("status", status.as_str())]);
        }
        Self::decode(request.send().await?).await
    }

    pub async fn get_invoice(&self, id: &str) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/invoices/{id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn create_invoice(&self, payload: &InvoicePayload) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .post(self.url("/api/invoices"))
            .json(payload)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn update_invoice(
        &self,
        id: &str,
        payload: &InvoicePayload,
    ) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/invoices/{id}")))
            .json(payload)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_invoice(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/api/invoices/{id}")))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    /// Marks a pending invoice paid.
    pub async fn mark_paid(&self, id: &str) -> Result<Invoice, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/api/invoices/{id}/status")))
            .json(&serde_json::json!({ "status": "paid" }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_payment_terms(&self) -> Result<Vec<PaymentTerm>, ClientError> {
        let response = self.http.get(self.url("/api/payment-terms")).send().await?;
        Self::decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        match response.json::<ErrorBody>().await {
            Ok(body) => ClientError::Api {
                status,
                code: body.code,
                message: body.message,
                fields: body.fields,
            },
            Err(err) => ClientError::Transport(err),
        }
    }
}
