//! Payment provider seam.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;
use uuid::Uuid;

use tourbook_bookings::CheckoutSessionRequest;

/// A checkout session the client is redirected to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub amount_total: u64,
    pub currency: String,
    #[serde(flatten)]
    pub request: CheckoutSessionRequest,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider rejected the session: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

/// Issues sessions locally without talking to a provider.
#[derive(Debug, Clone)]
pub struct OfflinePaymentGateway {
    checkout_base: Url,
}

impl OfflinePaymentGateway {
    pub fn new(checkout_base: Url) -> Self {
        Self { checkout_base }
    }
}

#[async_trait]
impl PaymentGateway for OfflinePaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let amount_total = request.amount_total();
        if request.line_items.is_empty() || amount_total == 0 {
            return Err(PaymentError::Rejected("session has nothing to charge".into()));
        }
        let currency = request
            .line_items
            .first()
            .map(|item| item.currency.clone())
            .unwrap_or_default();

        let id = format!("cs_test_{}", Uuid::now_v7().simple());
        let url = self
            .checkout_base
            .join(&format!("pay/{id}"))
            .map_err(|e| PaymentError::Rejected(e.to_string()))?;
        info!(session_id = %id, amount_total, customer = %request.customer_email, "checkout session created");

        Ok(CheckoutSession {
            id,
            url: url.to_string(),
            amount_total,
            currency,
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tourbook_core::UserId;
    use tourbook_tours::{NewTour, Tour};

    fn tour() -> Tour {
        let input: NewTour = serde_json::from_value(json!({
            "name": "The Forest Hiker",
            "duration": 5,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike",
            "imageCover": "tour-1-cover.jpg"
        }))
        .unwrap();
        Tour::create(input, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn offline_gateway_issues_test_sessions() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let request = CheckoutSessionRequest::for_tour(&base, &tour(), UserId::new(), "a@b.io");
        let gateway = OfflinePaymentGateway::new(Url::parse("https://checkout.test/").unwrap());

        let session = gateway.create_checkout_session(request).await.unwrap();
        assert!(session.id.starts_with("cs_test_"));
        assert_eq!(session.amount_total, 39_700);
        assert_eq!(session.currency, "usd");
        assert!(session.url.starts_with("https://checkout.test/pay/cs_test_"));
    }
}
