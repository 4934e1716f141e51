//! # Order Transition Validator
//!
//! Pure validation of fulfillment-status transitions. Given the raw current
//! and target statuses, the order type and the payment state of an order,
//! [`validate_order_transition`] decides whether the transition is legal and,
//! if not, why.
//!
//! The checks run as a short-circuit sequence: later checks assume earlier
//! ones passed. The static transition table is:
//!
//! ```text
//! pending    -> preparing, rejected, cancelled
//! preparing  -> ready, cancelled
//! ready      -> delivering, completed
//! delivering -> completed
//! completed  -> (terminal)
//! cancelled  -> (terminal)
//! rejected   -> (terminal)
//! ```
//!
//! On top of the table: moving into `ready`/`delivering`/`completed` is
//! gated on cleared payment, `delivering` only exists for delivery orders,
//! and delivery orders must pass through `delivering` before `completed`.

use crate::status::{OrderStatus, OrderType, PaymentMethod, PaymentStatus};

/// Result of a transition validation: never an error, always a verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCheck {
    pub allowed: bool,
    pub reason: Option<&'static str>,
}

impl TransitionCheck {
    fn allow() -> Self {
        TransitionCheck {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: &'static str) -> Self {
        TransitionCheck {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Statuses that must not be reached while payment is uncleared
fn requires_payment(target: &OrderStatus) -> bool {
    matches!(
        target,
        OrderStatus::Ready | OrderStatus::Delivering | OrderStatus::Completed
    )
}

/// Allowed targets for each known status, per the static transition table
fn allowed_targets(current: &OrderStatus) -> &'static [OrderStatus] {
    const FROM_PENDING: &[OrderStatus] = &[
        OrderStatus::Preparing,
        OrderStatus::Rejected,
        OrderStatus::Cancelled,
    ];
    const FROM_PREPARING: &[OrderStatus] = &[OrderStatus::Ready, OrderStatus::Cancelled];
    const FROM_READY: &[OrderStatus] = &[OrderStatus::Delivering, OrderStatus::Completed];
    const FROM_DELIVERING: &[OrderStatus] = &[OrderStatus::Completed];

    match current {
        OrderStatus::Pending => FROM_PENDING,
        OrderStatus::Preparing => FROM_PREPARING,
        OrderStatus::Ready => FROM_READY,
        OrderStatus::Delivering => FROM_DELIVERING,
        // Terminal statuses and pass-through values have no successors
        _ => &[],
    }
}

/// Validate a requested fulfillment-status transition.
///
/// All inputs are the raw stored values; normalization happens here. The
/// function is pure and never fails; callers decide whether to surface the
/// denial reason to an end user or just log it.
pub fn validate_order_transition(
    current_status: Option<&str>,
    target_status: Option<&str>,
    order_type: Option<&str>,
    payment_method: Option<&str>,
    payment_status: Option<&str>,
    payment_proof_photo_id: Option<&str>,
) -> TransitionCheck {
    let target_raw = target_status.unwrap_or("").trim();
    if target_raw.is_empty() {
        return TransitionCheck::deny("no target status");
    }

    let target = OrderStatus::normalize(target_raw);
    let current = current_status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(OrderStatus::normalize);
    let order_type = OrderType::normalize(order_type);

    if !target.is_known() {
        return TransitionCheck::deny("unsupported status");
    }
    if let Some(ref current) = current {
        if !current.is_known() {
            return TransitionCheck::deny("unsupported current status");
        }
    }

    if let Some(ref current) = current {
        // Re-applying the current status is always a legal no-op
        if *current == target {
            return TransitionCheck::allow();
        }
        if current.is_terminal() {
            return TransitionCheck::deny("order is in a final status");
        }
        if !allowed_targets(current).contains(&target) {
            return TransitionCheck::deny("transition not permitted");
        }
    }

    let method = PaymentMethod::normalize(payment_method);
    let payment_cleared = matches!(method, PaymentMethod::Cash)
        || PaymentStatus::is_cleared(payment_status, &method, payment_proof_photo_id);
    if requires_payment(&target) && !payment_cleared {
        return TransitionCheck::deny("cannot move to this status before payment confirmation");
    }

    if target == OrderStatus::Delivering && order_type != OrderType::Delivery {
        return TransitionCheck::deny("delivering only valid for delivery orders");
    }

    // Delivery orders must pass through delivering before completion;
    // pickup orders may go ready -> completed directly.
    if order_type == OrderType::Delivery
        && current == Some(OrderStatus::Ready)
        && target == OrderStatus::Completed
    {
        return TransitionCheck::deny("delivery orders must be delivered before completion");
    }

    TransitionCheck::allow()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(
        current: Option<&str>,
        target: Option<&str>,
        order_type: &str,
        method: &str,
        payment_status: Option<&str>,
    ) -> TransitionCheck {
        validate_order_transition(
            current,
            target,
            Some(order_type),
            Some(method),
            payment_status,
            None,
        )
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let result = check(Some("pending"), None, "pickup", "cash", None);
        assert!(!result.allowed);
        assert_eq!(result.reason, Some("no target status"));

        let result = check(Some("pending"), Some("   "), "pickup", "cash", None);
        assert!(!result.allowed);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let result = check(Some("pending"), Some("teleported"), "pickup", "cash", None);
        assert!(!result.allowed);
        assert_eq!(result.reason, Some("unsupported status"));
    }

    #[test]
    fn test_unknown_current_is_rejected() {
        let result = check(Some("limbo"), Some("preparing"), "pickup", "cash", None);
        assert!(!result.allowed);
        assert_eq!(result.reason, Some("unsupported current status"));
    }

    #[test]
    fn test_self_transition_always_allowed() {
        for status in [
            "pending",
            "preparing",
            "ready",
            "delivering",
            "completed",
            "rejected",
            "cancelled",
        ] {
            let result = check(Some(status), Some(status), "delivery", "click", None);
            assert!(result.allowed, "self-transition denied for {status}");
        }
    }

    #[test]
    fn test_terminal_statuses_are_immutable() {
        for terminal in ["completed", "cancelled", "rejected"] {
            for target in ["pending", "preparing", "ready", "delivering"] {
                let result = check(Some(terminal), Some(target), "pickup", "cash", None);
                assert!(!result.allowed, "{terminal} -> {target} should be denied");
            }
        }
    }

    #[test]
    fn test_transition_table_edges() {
        // Allowed edges (cash order so payment never interferes)
        assert!(check(Some("pending"), Some("preparing"), "pickup", "cash", None).allowed);
        assert!(check(Some("pending"), Some("rejected"), "pickup", "cash", None).allowed);
        assert!(check(Some("pending"), Some("cancelled"), "pickup", "cash", None).allowed);
        assert!(check(Some("preparing"), Some("ready"), "pickup", "cash", None).allowed);
        assert!(check(Some("preparing"), Some("cancelled"), "pickup", "cash", None).allowed);
        assert!(check(Some("ready"), Some("completed"), "pickup", "cash", None).allowed);
        assert!(check(Some("ready"), Some("delivering"), "delivery", "cash", None).allowed);
        assert!(check(Some("delivering"), Some("completed"), "delivery", "cash", None).allowed);

        // A few edges the table does not contain
        assert!(!check(Some("pending"), Some("ready"), "pickup", "cash", None).allowed);
        assert!(!check(Some("preparing"), Some("completed"), "pickup", "cash", None).allowed);
        assert!(!check(Some("ready"), Some("preparing"), "pickup", "cash", None).allowed);
        assert!(!check(Some("delivering"), Some("ready"), "delivery", "cash", None).allowed);
    }

    #[test]
    fn test_payment_gating() {
        let blocked = check(
            Some("preparing"),
            Some("ready"),
            "delivery",
            "click",
            Some("awaiting_payment"),
        );
        assert!(!blocked.allowed);
        assert_eq!(
            blocked.reason,
            Some("cannot move to this status before payment confirmation")
        );

        let cleared = check(
            Some("preparing"),
            Some("ready"),
            "delivery",
            "click",
            Some("confirmed"),
        );
        assert!(cleared.allowed);
    }

    #[test]
    fn test_cash_always_clears_payment() {
        for payment_status in [None, Some("awaiting_proof"), Some("rejected"), Some("pending")] {
            let result = check(
                Some("preparing"),
                Some("ready"),
                "pickup",
                "cash",
                payment_status,
            );
            assert!(result.allowed, "cash blocked with {payment_status:?}");
        }
    }

    #[test]
    fn test_proof_submitted_does_not_clear_payment() {
        let result = validate_order_transition(
            Some("preparing"),
            Some("ready"),
            Some("delivery"),
            Some("card"),
            Some("proof_submitted"),
            Some("file_abc"),
        );
        assert!(!result.allowed);
    }

    #[test]
    fn test_delivering_only_for_delivery_orders() {
        let result = check(Some("ready"), Some("delivering"), "pickup", "cash", None);
        assert!(!result.allowed);
        assert_eq!(result.reason, Some("delivering only valid for delivery orders"));
    }

    #[test]
    fn test_delivery_must_pass_through_delivering() {
        let delivery = check(Some("ready"), Some("completed"), "delivery", "cash", None);
        assert!(!delivery.allowed);
        assert_eq!(
            delivery.reason,
            Some("delivery orders must be delivered before completion")
        );

        let pickup = check(Some("ready"), Some("completed"), "pickup", "cash", None);
        assert!(pickup.allowed);
    }

    #[test]
    fn test_legacy_statuses_are_normalized_before_validation() {
        // "confirmed" is legacy for preparing, so preparing -> ready applies
        let result = check(Some("confirmed"), Some("ready"), "pickup", "cash", None);
        assert!(result.allowed);

        // "new" is legacy for pending
        let result = check(Some("new"), Some("preparing"), "pickup", "cash", None);
        assert!(result.allowed);
    }

    #[test]
    fn test_missing_current_status_skips_table_lookup() {
        // With no current status only the target-level rules apply
        let result = check(None, Some("preparing"), "pickup", "cash", None);
        assert!(result.allowed);

        let result = check(None, Some("ready"), "delivery", "click", None);
        assert!(!result.allowed, "payment gate still applies without current");
    }
}
