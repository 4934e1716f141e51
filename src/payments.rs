//! # Payment Use Cases
//!
//! Application services for the admin payment-review workflow: confirming a
//! submitted payment, rejecting it, and accepting a customer's proof photo.
//!
//! All three follow the same shape: load the order, validate preconditions
//! against its effective payment status, then delegate the state change to
//! the injected collaborator. Failures are reported as symbolic
//! [`PaymentError`] values whose `key()` the presentation layer maps to
//! localized text; this layer never renders user-facing messages and never
//! sends notifications itself.

use log::warn;
use std::fmt;
use std::sync::Arc;

use crate::order::OrderSnapshot;
use crate::repository::{OrderStatusService, OrdersRepository};
use crate::status::{OrderStatus, PaymentStatus};

/// Symbolic failure modes of the payment use cases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Repository unavailable or unreachable
    DbError,
    /// Referenced order does not exist
    NotFound,
    /// Actor does not own the order
    Forbidden,
    /// Payment already confirmed/rejected, or nothing was ever submitted
    AlreadyProcessed,
    /// A proof is already awaiting review
    AlreadySubmitted,
    /// Payment was already confirmed
    AlreadyConfirmed,
    /// Cash orders never need a proof
    NotRequired,
    /// Proof submission is not applicable in the current payment state
    NotAllowed,
    /// Fulfillment-status collaborator is not wired up
    ServiceUnavailable,
    /// The delegated collaborator call failed
    ProcessingError,
}

impl PaymentError {
    /// Stable key the presentation layer maps to a localized message
    pub fn key(&self) -> &'static str {
        match self {
            PaymentError::DbError => "db_error",
            PaymentError::NotFound => "not_found",
            PaymentError::Forbidden => "forbidden",
            PaymentError::AlreadyProcessed => "already_processed",
            PaymentError::AlreadySubmitted => "already_submitted",
            PaymentError::AlreadyConfirmed => "already_confirmed",
            PaymentError::NotRequired => "not_required",
            PaymentError::NotAllowed => "not_allowed",
            PaymentError::ServiceUnavailable => "service_unavailable",
            PaymentError::ProcessingError => "processing_error",
        }
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::error::Error for PaymentError {}

/// Successful use-case result: the order as it was loaded plus the payment
/// status it now holds
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub order: OrderSnapshot,
    pub payment_status: PaymentStatus,
}

/// Payment use cases, constructed once with their collaborators.
///
/// Both collaborators are optional on purpose: a missing repository yields
/// `db_error` and a missing order service yields `service_unavailable`, so
/// partial wiring fails fast with a symbolic key instead of panicking.
pub struct Payments {
    repo: Option<Arc<dyn OrdersRepository>>,
    order_service: Option<Arc<dyn OrderStatusService>>,
}

impl Payments {
    pub fn new(
        repo: Option<Arc<dyn OrdersRepository>>,
        order_service: Option<Arc<dyn OrderStatusService>>,
    ) -> Self {
        Self {
            repo,
            order_service,
        }
    }

    fn repo(&self) -> Result<&dyn OrdersRepository, PaymentError> {
        self.repo.as_deref().ok_or(PaymentError::DbError)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<OrderSnapshot, PaymentError> {
        self.repo()?
            .get_order(order_id)
            .await
            .map_err(|_| PaymentError::DbError)?
            .ok_or(PaymentError::NotFound)
    }

    /// Admin confirms a submitted payment.
    ///
    /// Only orders whose effective payment status is `proof_submitted` or
    /// `awaiting_proof` can be confirmed; anything else is reported as
    /// `already_processed` so a double-tap on the confirm button is a clean
    /// no-op rather than a silent success.
    pub async fn confirm_payment(&self, order_id: i64) -> Result<PaymentOutcome, PaymentError> {
        let order = self.fetch_order(order_id).await?;

        let status = order.effective_payment_status();
        if !matches!(
            status,
            PaymentStatus::ProofSubmitted | PaymentStatus::AwaitingProof
        ) {
            return Err(PaymentError::AlreadyProcessed);
        }

        let service = self
            .order_service
            .as_deref()
            .ok_or(PaymentError::ServiceUnavailable)?;
        let confirmed = service
            .confirm_payment(order_id)
            .await
            .map_err(|_| PaymentError::ProcessingError)?;
        if !confirmed {
            return Err(PaymentError::ProcessingError);
        }

        Ok(PaymentOutcome {
            order,
            payment_status: PaymentStatus::Confirmed,
        })
    }

    /// Admin rejects a submitted payment.
    ///
    /// The order service owns the authoritative fulfillment-status change;
    /// the direct payment-status write afterwards is best-effort cleanup
    /// and its failure is logged, never surfaced.
    pub async fn reject_payment(&self, order_id: i64) -> Result<PaymentOutcome, PaymentError> {
        let order = self.fetch_order(order_id).await?;

        let status = order.effective_payment_status();
        if !matches!(
            status,
            PaymentStatus::ProofSubmitted | PaymentStatus::AwaitingProof
        ) {
            return Err(PaymentError::AlreadyProcessed);
        }

        let service = self
            .order_service
            .as_deref()
            .ok_or(PaymentError::ServiceUnavailable)?;
        service
            .update_status(
                order_id,
                "order",
                &OrderStatus::Rejected,
                false,
                Some("payment_rejected_by_admin"),
            )
            .await
            .map_err(|_| PaymentError::ProcessingError)?;

        if let Ok(repo) = self.repo() {
            if let Err(e) = repo
                .update_payment_status(order_id, &PaymentStatus::Rejected, None)
                .await
            {
                warn!("Secondary payment-status write failed for order {order_id}: {e:?}");
            }
        }

        Ok(PaymentOutcome {
            order,
            payment_status: PaymentStatus::Rejected,
        })
    }

    /// Customer submits a proof-of-payment photo.
    ///
    /// A proof is accepted while the order awaits its first proof or after
    /// a prior rejection (resubmission). `actor_user_id` of `None` bypasses
    /// the ownership check for system-initiated calls.
    pub async fn submit_payment_proof(
        &self,
        order_id: i64,
        actor_user_id: Option<i64>,
        proof_file_id: &str,
    ) -> Result<PaymentOutcome, PaymentError> {
        let order = self.fetch_order(order_id).await?;

        if let Some(actor) = actor_user_id {
            if order.user_id != Some(actor) {
                return Err(PaymentError::Forbidden);
            }
        }

        match order.effective_payment_status() {
            PaymentStatus::ProofSubmitted => return Err(PaymentError::AlreadySubmitted),
            PaymentStatus::Confirmed => return Err(PaymentError::AlreadyConfirmed),
            PaymentStatus::NotRequired => return Err(PaymentError::NotRequired),
            PaymentStatus::AwaitingProof | PaymentStatus::Rejected => {}
            _ => return Err(PaymentError::NotAllowed),
        }

        self.repo()?
            .update_payment_status(order_id, &PaymentStatus::ProofSubmitted, Some(proof_file_id))
            .await
            .map_err(|_| PaymentError::ProcessingError)?;

        Ok(PaymentOutcome {
            order,
            payment_status: PaymentStatus::ProofSubmitted,
        })
    }
}
