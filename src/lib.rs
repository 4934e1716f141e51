//! # Fudly Telegram Bot
//!
//! A Telegram bot for a food-rescue marketplace: customers browse
//! discounted near-expiry offers from partner stores, order them for pickup
//! or delivery, and pay by cash, card transfer or online methods with a
//! photographic proof-of-payment workflow reviewed by admins.

pub mod bot;
pub mod cart;
pub mod notifications;
pub mod order;
pub mod order_fsm;
pub mod payments;
pub mod repository;
pub mod status;
