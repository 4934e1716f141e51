//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles incoming text and photo messages
//! - `callback_handler`: Handles admin inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and maps error keys to user-facing text
//!
//! All business rules live below this layer; the handlers only parse
//! Telegram input, call the use cases, and render their results.

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use crate::cart::CartStorage;
use crate::payments::Payments;
use crate::repository::OrdersRepository;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Shared handler dependencies, constructed once at startup
pub struct AppDeps {
    pub payments: Payments,
    pub carts: CartStorage,
    pub repo: Arc<dyn OrdersRepository>,
    /// Chat that receives payment proofs for review; proofs are accepted
    /// but not forwarded when unset
    pub admin_chat: Option<teloxide::types::ChatId>,
}
