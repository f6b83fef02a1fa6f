//! Stripe Checkout client.
//!
//! Talks to the REST API directly with `reqwest`: requests are
//! form-encoded, responses are JSON.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::StripeConfig;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway};

/// Client for the Stripe Checkout Sessions API.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.inner.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: SessionMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct SessionMetadata {
    item_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl From<SessionResponse> for CheckoutSession {
    fn from(response: SessionResponse) -> Self {
        Self {
            id: response.id,
            url: response.url,
            payment_status: response.payment_status,
            item_id: response.metadata.item_id,
            client_reference_id: response.client_reference_id,
        }
    }
}

/// Form fields for a one-line-item payment session.
fn checkout_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "payment".to_owned()),
        ("payment_method_types[0]", "card".to_owned()),
        (
            "line_items[0][price_data][currency]",
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            request.product_name.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]",
            request.unit_amount.to_string(),
        ),
        ("line_items[0][quantity]", request.quantity.to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("metadata[item_id]", request.item_id.to_string()),
    ];
    if let Some(reference) = &request.client_reference_id {
        form.push(("client_reference_id", reference.clone()));
    }
    form
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Http` if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                secret_key: config.secret_key.clone(),
            }),
        })
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<CheckoutSession, PaymentError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(PaymentError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            tracing::error!(status = %status, message = %message, "Stripe API returned non-success status");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse =
            serde_json::from_str(&body).map_err(|e| PaymentError::Parse(e.to_string()))?;
        Ok(session.into())
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(item_id = %request.item_id, amount = request.unit_amount))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.inner.api_base);

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .form(&checkout_form(request))
            .send()
            .await?;

        let session = self.handle_response(response).await?;
        debug!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError> {
        let url = format!(
            "{}/v1/checkout/sessions/{}",
            self.inner.api_base,
            urlencoding::encode(id)
        );

        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        self.handle_response(response).await
    }
}
