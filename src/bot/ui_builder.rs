//! UI Builder module for creating keyboards and user-facing texts

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::cart::CartItem;

/// Inline keyboard shown to admins under a submitted payment proof
pub fn create_payment_review_keyboard(order_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Confirm payment", format!("payconfirm:{order_id}")),
        InlineKeyboardButton::callback("❌ Reject payment", format!("payreject:{order_id}")),
    ]])
}

/// Render the cart contents for the /cart command
pub fn format_cart_summary(items: &[CartItem], total: f64) -> String {
    if items.is_empty() {
        return "🛒 Your cart is empty".to_string();
    }

    let mut lines = vec!["🛒 Your cart:".to_string()];
    for item in items {
        lines.push(format!(
            "• {}: {} x {:.0} sum",
            item.title, item.quantity, item.price
        ));
    }
    lines.push(format!("\nTotal: {total:.0} sum"));
    lines.join("\n")
}

/// Map a payment use-case error key to a non-technical user-facing message
pub fn payment_error_text(key: &str) -> &'static str {
    match key {
        "not_found" => "Order not found.",
        "forbidden" => "This order belongs to another customer.",
        "already_processed" => "This payment has already been reviewed.",
        "already_submitted" => "Your proof is already under review.",
        "already_confirmed" => "This payment is already confirmed.",
        "not_required" => "No payment proof is needed for this order.",
        "not_allowed" => "A payment proof cannot be submitted for this order right now.",
        "service_unavailable" | "db_error" | "processing_error" => {
            "Something went wrong, please try again later."
        }
        _ => "Something went wrong, please try again later.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_summary_empty() {
        assert!(format_cart_summary(&[], 0.0).contains("empty"));
    }

    #[test]
    fn test_every_error_key_has_text() {
        for key in [
            "db_error",
            "not_found",
            "forbidden",
            "already_processed",
            "already_submitted",
            "already_confirmed",
            "not_required",
            "not_allowed",
            "service_unavailable",
            "processing_error",
        ] {
            assert!(!payment_error_text(key).is_empty());
        }
    }
}
