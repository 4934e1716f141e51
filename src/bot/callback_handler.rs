//! Callback Handler module for processing admin inline keyboard queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use super::ui_builder::payment_error_text;
use crate::notifications::{format_order_card, payment_status_label};

/// Handle the admin payment-review callbacks (`payconfirm:<id>` /
/// `payreject:<id>`)
pub async fn callback_handler(
    bot: Bot,
    q: teloxide::types::CallbackQuery,
    deps: Arc<super::AppDeps>,
) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");

    let data = q.data.as_deref().unwrap_or("");
    if let Some(msg) = &q.message {
        if let Some(order_id) = data.strip_prefix("payconfirm:") {
            let order_id: i64 = order_id.parse().unwrap_or(0);
            respond(&bot, msg.chat().id, deps.payments.confirm_payment(order_id).await).await;
        } else if let Some(order_id) = data.strip_prefix("payreject:") {
            let order_id: i64 = order_id.parse().unwrap_or(0);
            respond(&bot, msg.chat().id, deps.payments.reject_payment(order_id).await).await;
        }
    }

    // Answer the callback query to remove the loading state
    bot.answer_callback_query(q.id).await?;

    Ok(())
}

async fn respond(
    bot: &Bot,
    chat_id: ChatId,
    result: Result<crate::payments::PaymentOutcome, crate::payments::PaymentError>,
) {
    let text = match result {
        Ok(outcome) => format!(
            "{}\n\n{}",
            payment_status_label(&outcome.payment_status),
            format_order_card(&outcome.order, None)
        ),
        Err(e) => {
            error!(error_key = e.key(), "Payment review failed");
            payment_error_text(e.key()).to_string()
        }
    };

    if let Err(e) = bot.send_message(chat_id, text).await {
        error!(error = %e, "Failed to send payment review response");
    }
}
