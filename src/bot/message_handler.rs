//! Message Handler module for processing incoming Telegram messages
//!
//! Customers interact here: `/start`, `/cart`, and payment-proof photos.
//! A proof photo must carry the order id in its caption; the handler passes
//! the sender's id through as the acting user, so the ownership check in
//! the use case applies.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use super::ui_builder::{create_payment_review_keyboard, format_cart_summary, payment_error_text};
use crate::notifications::format_order_card;

/// Handle incoming text and photo messages
pub async fn message_handler(bot: Bot, msg: Message, deps: Arc<super::AppDeps>) -> Result<()> {
    if let Some(text) = msg.text() {
        debug!(user_id = %msg.chat.id, "Received text message from user");

        if text == "/start" {
            bot.send_message(
                msg.chat.id,
                "👋 Welcome to Fudly!\n\n\
                 Browse discounted near-expiry offers from stores nearby, \
                 order for pickup or delivery, and save food from going to waste.\n\n\
                 Commands:\n/cart - view your cart\n\n\
                 To submit a payment proof, send the receipt photo with your \
                 order number as the caption.",
            )
            .await?;
        } else if text == "/cart" {
            let user_id = msg.chat.id.0;
            let items = deps.carts.get_cart(user_id).await;
            let total = deps.carts.get_cart_total(user_id).await;
            bot.send_message(msg.chat.id, format_cart_summary(&items, total))
                .await?;
        } else {
            bot.send_message(
                msg.chat.id,
                "Send /cart to view your cart, or a receipt photo with your \
                 order number as the caption to submit a payment proof.",
            )
            .await?;
        }
    } else if msg.photo().is_some() {
        handle_proof_photo(&bot, &msg, &deps).await?;
    }

    Ok(())
}

async fn handle_proof_photo(bot: &Bot, msg: &Message, deps: &super::AppDeps) -> Result<()> {
    debug!(user_id = %msg.chat.id, "Received photo message from user");

    let Some(order_id) = msg.caption().and_then(|c| c.trim().parse::<i64>().ok()) else {
        bot.send_message(
            msg.chat.id,
            "Please add your order number as the photo caption.",
        )
        .await?;
        return Ok(());
    };

    let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) else {
        return Ok(());
    };
    let proof_file = largest_photo.file.id.clone();
    let proof_file_id = proof_file.0.clone();
    let actor_user_id = msg.from.as_ref().map(|user| user.id.0 as i64);

    match deps
        .payments
        .submit_payment_proof(order_id, actor_user_id, &proof_file_id)
        .await
    {
        Ok(outcome) => {
            debug!(order_id, "Payment proof accepted");
            let store_name = match outcome.order.store_id {
                Some(store_id) => deps
                    .repo
                    .get_store(store_id)
                    .await
                    .ok()
                    .flatten()
                    .and_then(|store| store.name),
                None => None,
            };
            let card = format_order_card(&outcome.order, store_name.as_deref());
            bot.send_message(
                msg.chat.id,
                format!("📸 Proof received, an admin will review it shortly.\n\n{card}"),
            )
            .await?;

            // Forward the proof to the review chat; the customer flow is
            // already done, so a failed forward is only logged
            if let Some(admin_chat) = deps.admin_chat {
                let forward = bot
                    .send_photo(admin_chat, teloxide::types::InputFile::file_id(proof_file))
                    .caption(format!("Payment proof for order #{order_id}\n\n{card}"))
                    .reply_markup(create_payment_review_keyboard(order_id))
                    .await;
                if let Err(e) = forward {
                    error!(order_id, error = %e, "Failed to forward payment proof to admin chat");
                }
            }
        }
        Err(e) => {
            error!(order_id, error_key = e.key(), "Payment proof rejected");
            bot.send_message(msg.chat.id, payment_error_text(e.key()))
                .await?;
        }
    }

    Ok(())
}
