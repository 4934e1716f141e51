//! Presentation-layer formatting for order and payment status cards.
//!
//! Pure string building only; nothing here talks to Telegram or storage.

use crate::order::OrderSnapshot;
use crate::status::{OrderStatus, OrderType, PaymentMethod, PaymentStatus};

/// Human-readable label for a fulfillment status
pub fn order_status_label(status: &OrderStatus) -> &str {
    match status {
        OrderStatus::Pending => "⏳ Pending",
        OrderStatus::Preparing => "👨‍🍳 Preparing",
        OrderStatus::Ready => "✅ Ready",
        OrderStatus::Delivering => "🚚 Delivering",
        OrderStatus::Completed => "🎉 Completed",
        OrderStatus::Rejected => "❌ Rejected",
        OrderStatus::Cancelled => "🚫 Cancelled",
        OrderStatus::Other(raw) => raw,
    }
}

/// Human-readable label for a payment status
pub fn payment_status_label(status: &PaymentStatus) -> &str {
    match status {
        PaymentStatus::NotRequired => "💵 Pay on pickup/delivery",
        PaymentStatus::AwaitingPayment => "⌛ Awaiting payment",
        PaymentStatus::AwaitingProof => "📸 Awaiting payment proof",
        PaymentStatus::ProofSubmitted => "🔎 Proof under review",
        PaymentStatus::Confirmed => "✅ Payment confirmed",
        PaymentStatus::Rejected => "❌ Payment rejected",
        PaymentStatus::Other(raw) => raw,
    }
}

/// Render the status card for one order, optionally with the store name
pub fn format_order_card(order: &OrderSnapshot, store_name: Option<&str>) -> String {
    let status = OrderStatus::normalize(order.order_status.as_deref().unwrap_or("pending"));
    let payment_status = order.effective_payment_status();
    let method = order.method();

    let mut lines = vec![format!("🧾 Order #{}", order.order_id)];
    if let Some(store_name) = store_name {
        lines.push(format!("🏪 {store_name}"));
    }
    lines.push(format!("Status: {}", order_status_label(&status)));
    lines.push(format!(
        "Payment: {} ({})",
        payment_status_label(&payment_status),
        method_label(&method)
    ));

    if let Some(total) = order.total_price {
        lines.push(format!("Total: {total:.0} sum"));
    }
    if let Some(quantity) = order.quantity {
        lines.push(format!("Quantity: {quantity}"));
    }
    match order.effective_order_type() {
        OrderType::Delivery => {
            let address = order.delivery_address.as_deref().unwrap_or("not provided");
            lines.push(format!("🚚 Delivery to: {address}"));
        }
        OrderType::Pickup => lines.push("🏃 Pickup order".to_string()),
    }

    lines.join("\n")
}

fn method_label(method: &PaymentMethod) -> &str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::Card => "card transfer",
        PaymentMethod::Click => "Click",
        PaymentMethod::Payme => "Payme",
        PaymentMethod::Other(raw) => raw,
    }
}
