//! Payment provider integration.
//!
//! The storefront only uses hosted checkout: it creates a checkout session,
//! redirects the buyer to the provider, and optionally reads the session
//! back when the buyer returns.

mod stripe;

pub use stripe::StripeClient;

use async_trait::async_trait;
use thiserror::Error;

use ishop_core::ItemId;

/// A single-item checkout to create at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub item_id: ItemId,
    /// Line item label.
    pub product_name: String,
    /// Unit price in minor currency units.
    pub unit_amount: i64,
    pub quantity: u32,
    /// ISO currency code, lowercase.
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Account id of the buyer, when known.
    pub client_reference_id: Option<String>,
}

/// The parts of a provider checkout session the storefront reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted checkout page. Absent once the session is complete.
    pub url: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: Option<String>,
    /// Item id carried in the session metadata.
    pub item_id: Option<String>,
    /// Buyer reference set when the session was created.
    pub client_reference_id: Option<String>,
}

impl CheckoutSession {
    /// Whether the provider reports the session as paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Provider is rate limiting us.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body was not what we expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// Created session has no checkout URL to redirect to.
    #[error("checkout session {0} has no redirect URL")]
    MissingRedirect(String),
}

/// Hosted checkout provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout session for one item.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Read back an existing checkout session.
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, PaymentError>;
}
