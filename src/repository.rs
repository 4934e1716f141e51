//! # Orders Repository Port and Adapters
//!
//! The use-case layer depends on the [`OrdersRepository`] and
//! [`OrderStatusService`] traits only; this module also provides the
//! Postgres-backed implementations. Row decoding is deliberately tolerant:
//! `order_id` defaults to 0 and every other column is nullable, so a
//! partially populated legacy row still produces a usable snapshot.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::sync::Arc;

use crate::order::{OfferSummary, OrderSnapshot, StoreSummary, UserSummary};
use crate::order_fsm::validate_order_transition;
use crate::status::{OrderStatus, PaymentStatus};

/// Storage port the payment use cases depend on
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Fetch one order by id, `None` if it does not exist
    async fn get_order(&self, order_id: i64) -> Result<Option<OrderSnapshot>>;

    /// Persist a new payment status, optionally recording a proof photo
    async fn update_payment_status(
        &self,
        order_id: i64,
        status: &PaymentStatus,
        proof_photo_id: Option<&str>,
    ) -> Result<()>;

    /// Change the fulfillment status; returns false if the order was not
    /// found or the transition was refused
    async fn set_order_status(&self, order_id: i64, status: &OrderStatus) -> Result<bool>;

    async fn get_store(&self, store_id: i64) -> Result<Option<StoreSummary>>;
    async fn get_offer(&self, offer_id: i64) -> Result<Option<OfferSummary>>;
    async fn get_user(&self, user_id: i64) -> Result<Option<UserSummary>>;
}

/// Collaborator that owns fulfillment-status changes (and the customer
/// notifications that go with them)
#[async_trait]
pub trait OrderStatusService: Send + Sync {
    /// Mark the order's payment as confirmed; returns false if the order
    /// was not found
    async fn confirm_payment(&self, order_id: i64) -> Result<bool>;

    /// Apply a fulfillment-status change to the given entity
    async fn update_status(
        &self,
        entity_id: i64,
        entity_type: &str,
        new_status: &OrderStatus,
        notify_customer: bool,
        reject_reason: Option<&str>,
    ) -> Result<()>;
}

/// Postgres implementation of the orders repository
pub struct PgOrdersRepository {
    pool: PgPool,
    order_service: Option<Arc<dyn OrderStatusService>>,
}

impl PgOrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            order_service: None,
        }
    }

    /// Wire in the service that fulfillment-status changes are delegated to
    pub fn with_order_service(mut self, service: Arc<dyn OrderStatusService>) -> Self {
        self.order_service = Some(service);
        self
    }

    fn snapshot_from_row(row: &sqlx::postgres::PgRow) -> OrderSnapshot {
        // Tolerant decoding: a missing or badly typed column becomes None
        // instead of failing the whole read
        let cart_items = row
            .try_get::<Option<String>, _>("cart_items")
            .unwrap_or(None)
            .and_then(|raw| serde_json::from_str(&raw).ok());

        OrderSnapshot {
            order_id: row.try_get::<Option<i64>, _>("order_id").unwrap_or(None).unwrap_or(0),
            user_id: row.try_get("user_id").unwrap_or(None),
            store_id: row.try_get("store_id").unwrap_or(None),
            offer_id: row.try_get("offer_id").unwrap_or(None),
            order_status: row.try_get("order_status").unwrap_or(None),
            payment_status: row.try_get("payment_status").unwrap_or(None),
            payment_method: row.try_get("payment_method").unwrap_or(None),
            payment_proof_photo_id: row.try_get("payment_proof_photo_id").unwrap_or(None),
            order_type: row.try_get("order_type").unwrap_or(None),
            total_price: row.try_get("total_price").unwrap_or(None),
            delivery_address: row.try_get("delivery_address").unwrap_or(None),
            quantity: row.try_get("quantity").unwrap_or(None),
            cart_items,
        }
    }
}

#[async_trait]
impl OrdersRepository for PgOrdersRepository {
    async fn get_order(&self, order_id: i64) -> Result<Option<OrderSnapshot>> {
        let row = sqlx::query(
            "SELECT order_id, user_id, store_id, offer_id, order_status, payment_status,
                    payment_method, payment_proof_photo_id, order_type, total_price,
                    delivery_address, quantity, cart_items
             FROM orders WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")?;

        Ok(row.as_ref().map(Self::snapshot_from_row))
    }

    async fn update_payment_status(
        &self,
        order_id: i64,
        status: &PaymentStatus,
        proof_photo_id: Option<&str>,
    ) -> Result<()> {
        info!(
            "Updating payment status of order {} to {}",
            order_id, status
        );

        let rows_affected = match proof_photo_id {
            Some(photo_id) => sqlx::query(
                "UPDATE orders SET payment_status = $1, payment_proof_photo_id = $2
                 WHERE order_id = $3",
            )
            .bind(status.as_str())
            .bind(photo_id)
            .bind(order_id)
            .execute(&self.pool)
            .await
            .context("Failed to update payment status")?
            .rows_affected(),
            None => sqlx::query("UPDATE orders SET payment_status = $1 WHERE order_id = $2")
                .bind(status.as_str())
                .bind(order_id)
                .execute(&self.pool)
                .await
                .context("Failed to update payment status")?
                .rows_affected(),
        };

        if rows_affected == 0 {
            bail!("Order {} not found", order_id);
        }
        Ok(())
    }

    async fn set_order_status(&self, order_id: i64, status: &OrderStatus) -> Result<bool> {
        match &self.order_service {
            Some(service) => {
                service
                    .update_status(order_id, "order", status, true, None)
                    .await?;
                Ok(true)
            }
            None => {
                warn!("No order service wired, refusing status change for order {order_id}");
                Ok(false)
            }
        }
    }

    async fn get_store(&self, store_id: i64) -> Result<Option<StoreSummary>> {
        let row = sqlx::query("SELECT store_id, name, address FROM stores WHERE store_id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch store")?;

        Ok(row.map(|row| StoreSummary {
            store_id: row.try_get::<Option<i64>, _>("store_id").unwrap_or(None).unwrap_or(0),
            name: row.try_get("name").unwrap_or(None),
            address: row.try_get("address").unwrap_or(None),
        }))
    }

    async fn get_offer(&self, offer_id: i64) -> Result<Option<OfferSummary>> {
        let row = sqlx::query("SELECT offer_id, title, price FROM offers WHERE offer_id = $1")
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch offer")?;

        Ok(row.map(|row| OfferSummary {
            offer_id: row.try_get::<Option<i64>, _>("offer_id").unwrap_or(None).unwrap_or(0),
            title: row.try_get("title").unwrap_or(None),
            price: row.try_get("price").unwrap_or(None),
        }))
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserSummary>> {
        let row = sqlx::query("SELECT user_id, full_name, phone FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        Ok(row.map(|row| UserSummary {
            user_id: row.try_get::<Option<i64>, _>("user_id").unwrap_or(None).unwrap_or(0),
            full_name: row.try_get("full_name").unwrap_or(None),
            phone: row.try_get("phone").unwrap_or(None),
        }))
    }
}

/// Fulfillment-status service backed by the orders table.
///
/// Every status change is validated through the transition rules before it
/// is written, so illegal transitions never reach storage.
pub struct UnifiedOrderService {
    pool: PgPool,
}

impl UnifiedOrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStatusService for UnifiedOrderService {
    async fn confirm_payment(&self, order_id: i64) -> Result<bool> {
        info!("Confirming payment for order {order_id}");

        let rows_affected =
            sqlx::query("UPDATE orders SET payment_status = $1 WHERE order_id = $2")
                .bind(PaymentStatus::Confirmed.as_str())
                .bind(order_id)
                .execute(&self.pool)
                .await
                .context("Failed to confirm payment")?
                .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn update_status(
        &self,
        entity_id: i64,
        entity_type: &str,
        new_status: &OrderStatus,
        notify_customer: bool,
        reject_reason: Option<&str>,
    ) -> Result<()> {
        if entity_type != "order" {
            bail!("Unsupported entity type: {entity_type}");
        }

        let row = sqlx::query(
            "SELECT order_status, order_type, payment_method, payment_status,
                    payment_proof_photo_id
             FROM orders WHERE order_id = $1",
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load order for status change")?;

        let Some(row) = row else {
            bail!("Order {} not found", entity_id);
        };

        let current: Option<String> = row.try_get("order_status").unwrap_or(None);
        let order_type: Option<String> = row.try_get("order_type").unwrap_or(None);
        let payment_method: Option<String> = row.try_get("payment_method").unwrap_or(None);
        let payment_status: Option<String> = row.try_get("payment_status").unwrap_or(None);
        let proof: Option<String> = row.try_get("payment_proof_photo_id").unwrap_or(None);

        let check = validate_order_transition(
            current.as_deref(),
            Some(new_status.as_str()),
            order_type.as_deref(),
            payment_method.as_deref(),
            payment_status.as_deref(),
            proof.as_deref(),
        );
        if !check.allowed {
            bail!(
                "Transition {} -> {} refused for order {}: {}",
                current.as_deref().unwrap_or("<none>"),
                new_status,
                entity_id,
                check.reason.unwrap_or("not permitted")
            );
        }

        sqlx::query("UPDATE orders SET order_status = $1 WHERE order_id = $2")
            .bind(new_status.as_str())
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .context("Failed to update order status")?;

        if let Some(reason) = reject_reason {
            info!("Order {entity_id} moved to {new_status} ({reason})");
        } else {
            info!("Order {entity_id} moved to {new_status}");
        }
        if !notify_customer {
            info!("Customer notification suppressed for order {entity_id}");
        }

        Ok(())
    }
}
