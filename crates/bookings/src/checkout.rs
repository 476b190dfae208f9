//! Checkout session descriptor handed to the payment gateway.

use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use tourbook_core::UserId;
use tourbook_tours::Tour;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub currency: String,
    /// Smallest currency unit (cents).
    pub unit_amount: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionRequest {
    pub payment_method_types: Vec<String>,
    pub mode: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub client_reference_id: String,
    pub metadata: BTreeMap<String, String>,
    pub line_items: Vec<CheckoutLineItem>,
}

impl CheckoutSessionRequest {
    /// One seat on `tour` for the customer. `base` is the public site root the
    /// request came in on.
    pub fn for_tour(base: &Url, tour: &Tour, customer: UserId, customer_email: &str) -> Self {
        let mut success = base.clone();
        success.set_path("/");
        success
            .query_pairs_mut()
            .append_pair("price", &tour.price.to_string())
            .append_pair("tourId", &tour.id.to_string())
            .append_pair("userId", &customer.to_string());

        let mut cancel = base.clone();
        cancel.set_path(&format!("/tours/{}", tour.slug));
        cancel.set_query(None);

        let mut image = base.clone();
        image.set_path(&format!("/img/tours/{}", tour.image_cover));
        image.set_query(None);

        let mut metadata = BTreeMap::new();
        metadata.insert("tourId".to_string(), tour.id.to_string());
        metadata.insert("userId".to_string(), customer.to_string());

        Self {
            payment_method_types: vec!["card".to_string()],
            mode: "payment".to_string(),
            success_url: success.into(),
            cancel_url: cancel.into(),
            customer_email: customer_email.to_string(),
            client_reference_id: tour.id.to_string(),
            metadata,
            line_items: vec![CheckoutLineItem {
                name: format!("{} Tour", tour.name),
                description: tour.summary.clone(),
                images: vec![image.into()],
                currency: "usd".to_string(),
                unit_amount: (tour.price * 100.0).round() as u64,
                quantity: 1,
            }],
        }
    }

    /// Total charged, in cents.
    pub fn amount_total(&self) -> u64 {
        self.line_items
            .iter()
            .map(|item| item.unit_amount * u64::from(item.quantity))
            .sum()
    }
}
