use anyhow::Result;
use log::info;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use teloxide::prelude::*;

use fudly::bot::{self, AppDeps};
use fudly::cart::CartStorage;
use fudly::payments::Payments;
use fudly::repository::{
    OrderStatusService, OrdersRepository, PgOrdersRepository, UnifiedOrderService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; the subscriber's log bridge also picks up the
    // `log` macros used in the core modules
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Fudly Telegram Bot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let bot_token = env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
    let admin_chat = env::var("ADMIN_CHAT_ID")
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .map(ChatId);

    info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    // Wire the core once; handlers receive it by Arc
    let order_service: Arc<dyn OrderStatusService> =
        Arc::new(UnifiedOrderService::new(pool.clone()));
    let repo: Arc<dyn OrdersRepository> = Arc::new(
        PgOrdersRepository::new(pool.clone()).with_order_service(Arc::clone(&order_service)),
    );
    let payments = Payments::new(Some(Arc::clone(&repo)), Some(Arc::clone(&order_service)));
    let carts = CartStorage::connect(&redis_url).await;

    if admin_chat.is_none() {
        info!("ADMIN_CHAT_ID not set, payment proofs will not be forwarded for review");
    }

    let deps = Arc::new(AppDeps {
        payments,
        carts,
        repo,
        admin_chat,
    });

    let bot = Bot::new(bot_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let deps = Arc::clone(&deps);
            move |bot: Bot, msg: Message| {
                let deps = Arc::clone(&deps);
                async move { bot::message_handler(bot, msg, deps).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let deps = Arc::clone(&deps);
            move |bot: Bot, q: teloxide::types::CallbackQuery| {
                let deps = Arc::clone(&deps);
                async move { bot::callback_handler(bot, q, deps).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
