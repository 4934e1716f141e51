//! # Order and Payment Status Vocabulary
//!
//! Canonical status values for the order fulfillment lifecycle and the
//! payment lifecycle, plus the normalization rules that fold legacy raw
//! database values into the canonical vocabulary.
//!
//! ## Core Concepts
//!
//! - **OrderStatus**: fulfillment lifecycle (`pending` → `preparing` →
//!   `ready` → `delivering` → `completed`, terminal `rejected`/`cancelled`)
//! - **PaymentStatus**: derived payment lifecycle, always computed from the
//!   raw stored value together with the payment method and proof photo
//! - **PaymentMethod**: normalized payment method (`cash` is the default)
//! - **OrderType**: `pickup` or `delivery`
//!
//! Unrecognized raw values deliberately pass through unchanged as
//! `Other(...)` instead of being rejected; downstream validation decides
//! what to do with them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fulfillment lifecycle status of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivering,
    Completed,
    Rejected,
    Cancelled,
    /// Unrecognized raw value, passed through unchanged
    Other(String),
}

impl OrderStatus {
    /// Normalize a raw stored status value into the canonical vocabulary.
    ///
    /// Legacy values are folded in: `confirmed` becomes `preparing`, while
    /// `new`, `awaiting_payment`, `awaiting_admin_confirmation` and `paid`
    /// become `pending`. Anything else that is not one of the seven known
    /// statuses passes through unchanged as [`OrderStatus::Other`].
    pub fn normalize(raw: &str) -> OrderStatus {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "pending" => OrderStatus::Pending,
            "preparing" => OrderStatus::Preparing,
            "ready" => OrderStatus::Ready,
            "delivering" => OrderStatus::Delivering,
            "completed" => OrderStatus::Completed,
            "rejected" => OrderStatus::Rejected,
            "cancelled" => OrderStatus::Cancelled,
            // Legacy statuses from the pre-unified order flow
            "confirmed" => OrderStatus::Preparing,
            "new" | "awaiting_payment" | "awaiting_admin_confirmation" | "paid" => {
                OrderStatus::Pending
            }
            _ => OrderStatus::Other(value),
        }
    }

    /// Whether this is one of the seven known canonical statuses
    pub fn is_known(&self) -> bool {
        !matches!(self, OrderStatus::Other(_))
    }

    /// Terminal statuses permit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment lifecycle status, always derived via [`PaymentStatus::normalize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    NotRequired,
    AwaitingPayment,
    AwaitingProof,
    ProofSubmitted,
    Confirmed,
    Rejected,
    /// Unrecognized raw value, passed through unchanged
    Other(String),
}

impl PaymentStatus {
    /// Compute the effective payment status of an order.
    ///
    /// The raw stored value alone is never the whole truth: legacy values
    /// map directly (`paid` → confirmed, `payment_rejected` → rejected,
    /// `awaiting_admin_confirmation` → proof submitted), and an empty or
    /// `pending` value is resolved from context: cash orders never require
    /// payment, a present proof photo means proof was submitted, online
    /// methods (click/payme) without proof are awaiting payment, and
    /// everything else is awaiting proof.
    pub fn normalize(
        raw: Option<&str>,
        method: &PaymentMethod,
        proof_photo_id: Option<&str>,
    ) -> PaymentStatus {
        let value = raw.unwrap_or("").trim().to_lowercase();
        let has_proof = proof_photo_id.map(|p| !p.trim().is_empty()).unwrap_or(false);

        match value.as_str() {
            "paid" => PaymentStatus::Confirmed,
            "payment_rejected" => PaymentStatus::Rejected,
            "awaiting_admin_confirmation" => PaymentStatus::ProofSubmitted,
            "" | "pending" => {
                if matches!(method, PaymentMethod::Cash) {
                    PaymentStatus::NotRequired
                } else if has_proof {
                    PaymentStatus::ProofSubmitted
                } else if matches!(method, PaymentMethod::Click | PaymentMethod::Payme) {
                    PaymentStatus::AwaitingPayment
                } else {
                    PaymentStatus::AwaitingProof
                }
            }
            "not_required" => PaymentStatus::NotRequired,
            "awaiting_payment" => PaymentStatus::AwaitingPayment,
            "awaiting_proof" => PaymentStatus::AwaitingProof,
            "proof_submitted" => PaymentStatus::ProofSubmitted,
            "confirmed" => PaymentStatus::Confirmed,
            "rejected" => PaymentStatus::Rejected,
            _ => PaymentStatus::Other(value),
        }
    }

    /// True iff payment no longer blocks fulfillment: either the order
    /// never required one, or an admin confirmed it.
    pub fn is_cleared(
        raw: Option<&str>,
        method: &PaymentMethod,
        proof_photo_id: Option<&str>,
    ) -> bool {
        matches!(
            Self::normalize(raw, method, proof_photo_id),
            PaymentStatus::NotRequired | PaymentStatus::Confirmed
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::NotRequired => "not_required",
            PaymentStatus::AwaitingPayment => "awaiting_payment",
            PaymentStatus::AwaitingProof => "awaiting_proof",
            PaymentStatus::ProofSubmitted => "proof_submitted",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Rejected => "rejected",
            PaymentStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized payment method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    Click,
    Payme,
    /// Unrecognized raw value, passed through unchanged
    Other(String),
}

impl PaymentMethod {
    /// Normalize a raw method string: missing/empty means cash, the legacy
    /// literal `pending` means card, anything else passes through.
    pub fn normalize(raw: Option<&str>) -> PaymentMethod {
        let value = raw.unwrap_or("").trim().to_lowercase();
        match value.as_str() {
            "" | "cash" => PaymentMethod::Cash,
            "pending" | "card" => PaymentMethod::Card,
            "click" => PaymentMethod::Click,
            "payme" => PaymentMethod::Payme,
            _ => PaymentMethod::Other(value),
        }
    }

    /// Initial payment status for a freshly placed order with this method
    pub fn initial_payment_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Cash => PaymentStatus::NotRequired,
            PaymentMethod::Click | PaymentMethod::Payme => PaymentStatus::AwaitingPayment,
            _ => PaymentStatus::AwaitingProof,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Click => "click",
            PaymentMethod::Payme => "payme",
            PaymentMethod::Other(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order fulfillment channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Pickup,
    Delivery,
}

impl OrderType {
    /// Anything that is not `delivery` (or the legacy `taxi`) is a pickup.
    pub fn normalize(raw: Option<&str>) -> OrderType {
        match raw.unwrap_or("").trim().to_lowercase().as_str() {
            "delivery" | "taxi" => OrderType::Delivery,
            _ => OrderType::Pickup,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Pickup => "pickup",
            OrderType::Delivery => "delivery",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
