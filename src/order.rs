//! # Order Read Models
//!
//! Immutable projections of persisted rows. [`OrderSnapshot`] is assembled
//! by the repository adapter at the storage boundary and is never written
//! back; every field except `order_id` is faithfully passed through as an
//! optional value.

use serde::{Deserialize, Serialize};

use crate::status::{OrderType, PaymentMethod, PaymentStatus};

/// Immutable read model of one order row.
///
/// `order_id` always carries a value (0 when the row had none); everything
/// else is nullable and kept as stored, pre-normalization. Use the
/// normalization helpers to interpret the raw status fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: i64,
    pub user_id: Option<i64>,
    pub store_id: Option<i64>,
    pub offer_id: Option<i64>,
    /// Raw fulfillment status as stored, pre-normalization
    pub order_status: Option<String>,
    /// Raw payment status as stored, pre-normalization
    pub payment_status: Option<String>,
    pub payment_method: Option<String>,
    pub payment_proof_photo_id: Option<String>,
    pub order_type: Option<String>,
    pub total_price: Option<f64>,
    pub delivery_address: Option<String>,
    pub quantity: Option<i64>,
    /// Optional bundle of cart lines for multi-item orders
    pub cart_items: Option<serde_json::Value>,
}

impl OrderSnapshot {
    /// Normalized payment method of this order
    pub fn method(&self) -> PaymentMethod {
        PaymentMethod::normalize(self.payment_method.as_deref())
    }

    /// Effective payment status, derived from the raw stored value, the
    /// payment method and the proof photo
    pub fn effective_payment_status(&self) -> PaymentStatus {
        PaymentStatus::normalize(
            self.payment_status.as_deref(),
            &self.method(),
            self.payment_proof_photo_id.as_deref(),
        )
    }

    /// Normalized fulfillment channel
    pub fn effective_order_type(&self) -> OrderType {
        OrderType::normalize(self.order_type.as_deref())
    }
}

/// Minimal store lookup for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub store_id: i64,
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Minimal offer lookup for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSummary {
    pub offer_id: i64,
    pub title: Option<String>,
    pub price: Option<f64>,
}

/// Minimal user lookup for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PaymentStatus;

    fn snapshot() -> OrderSnapshot {
        OrderSnapshot {
            order_id: 42,
            user_id: Some(100),
            store_id: Some(7),
            offer_id: Some(9),
            order_status: Some("pending".to_string()),
            payment_status: None,
            payment_method: Some("card".to_string()),
            payment_proof_photo_id: None,
            order_type: Some("delivery".to_string()),
            total_price: Some(45_000.0),
            delivery_address: Some("Amir Temur 1".to_string()),
            quantity: Some(2),
            cart_items: None,
        }
    }

    #[test]
    fn test_effective_payment_status_uses_method_and_proof() {
        let mut order = snapshot();
        assert_eq!(order.effective_payment_status(), PaymentStatus::AwaitingProof);

        order.payment_proof_photo_id = Some("file_abc".to_string());
        assert_eq!(
            order.effective_payment_status(),
            PaymentStatus::ProofSubmitted
        );
    }

    #[test]
    fn test_effective_order_type() {
        let mut order = snapshot();
        assert_eq!(order.effective_order_type(), OrderType::Delivery);

        order.order_type = None;
        assert_eq!(order.effective_order_type(), OrderType::Pickup);
    }
}
