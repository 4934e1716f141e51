//! # Cart Storage Module
//!
//! Per-user shopping cart keyed by Telegram user id. The whole cart lives
//! in a single serialized blob per user, which is what makes whole-cart
//! locking sufficient: every mutating operation takes a per-user lock,
//! reads the blob, applies the change, and writes it back atomically.
//!
//! # Invariants
//!
//! - All items in one cart share the same `store_id`; adding an item from
//!   another store is rejected, not merged
//! - Quantity merges are capped at the item's `max_quantity`
//! - Every write refreshes a 24-hour expiry; an untouched cart disappears
//!
//! # Storage discipline
//!
//! Redis is the primary store. When it is unreachable the operation fails
//! over to an in-process map (log and continue, never surface a storage
//! error to the user). The distributed lock is a `SET NX PX` record with a
//! random token and a bounded hold time, so a crashed holder cannot
//! deadlock others; if the lock cannot be acquired within the acquisition
//! timeout the mutation proceeds without it. Availability is preferred
//! over strict serialization, and that branch is logged so operators can
//! see contention.

use log::{info, warn};
use rand::Rng;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Whole-cart expiry refreshed on every write
const CART_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// How long a mutation waits for the per-user lock before proceeding unlocked
const LOCK_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);
/// Lock auto-expiry, bounds the damage of a crashed holder
const LOCK_HOLD_MS: u64 = 5_000;
/// Base delay between lock acquisition attempts
const LOCK_RETRY_MS: u64 = 40;

/// One line of a user's cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub offer_id: i64,
    pub store_id: i64,
    pub title: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub quantity: u32,
    pub max_quantity: u32,
    pub store_name: Option<String>,
    pub store_address: Option<String>,
    pub photo: Option<String>,
    pub unit: Option<String>,
    pub expiry_date: Option<String>,
    pub delivery_enabled: bool,
    pub delivery_price: Option<f64>,
    /// Epoch seconds at which the line was added
    pub added_at: i64,
}

impl CartItem {
    fn cap(&self) -> u32 {
        if self.max_quantity > 0 {
            self.max_quantity
        } else {
            u32::MAX
        }
    }
}

/// Field patch applied by `update_item`; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct CartItemPatch {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
    pub max_quantity: Option<u32>,
    pub photo: Option<String>,
    pub expiry_date: Option<String>,
}

/// Persisted cart representation: one blob per user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CartPayload {
    store_id: Option<i64>,
    items: Vec<CartItem>,
    updated_at: i64,
}

struct MemoryCart {
    payload: CartPayload,
    touched_at: Instant,
}

/// Per-user cart storage with Redis primary and in-process fallback
pub struct CartStorage {
    redis: Option<ConnectionManager>,
    memory: Mutex<HashMap<i64, MemoryCart>>,
    ttl: Duration,
}

struct CartLock {
    key: String,
    token: String,
}

impl CartStorage {
    /// Connect to Redis; falls back to memory-only mode if the connection
    /// cannot be established
    pub async fn connect(redis_url: &str) -> Self {
        let redis = match redis::Client::open(redis_url) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(manager) => {
                    info!("Cart storage connected to Redis");
                    Some(manager)
                }
                Err(e) => {
                    warn!("Redis unreachable, cart storage running in-process only: {e:?}");
                    None
                }
            },
            Err(e) => {
                warn!("Invalid Redis URL, cart storage running in-process only: {e:?}");
                None
            }
        };

        Self {
            redis,
            memory: Mutex::new(HashMap::new()),
            ttl: CART_TTL,
        }
    }

    /// Memory-only storage, used in tests and when no Redis is configured
    pub fn in_memory() -> Self {
        Self::in_memory_with_ttl(CART_TTL)
    }

    /// Memory-only storage with a custom inactivity TTL
    pub fn in_memory_with_ttl(ttl: Duration) -> Self {
        Self {
            redis: None,
            memory: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn cart_key(user_id: i64) -> String {
        format!("cart:{user_id}")
    }

    fn lock_key(user_id: i64) -> String {
        format!("cart:lock:{user_id}")
    }

    // ---- locking ----------------------------------------------------------

    /// Acquire the per-user mutation lock. Returns `None` when there is no
    /// Redis (the in-process mutex serializes instead) or when the
    /// acquisition timeout elapsed, in which case the mutation proceeds
    /// without the lock and the contention is logged.
    async fn acquire_lock(&self, user_id: i64) -> Option<CartLock> {
        let manager = self.redis.as_ref()?;
        let mut conn = manager.clone();
        let key = Self::lock_key(user_id);
        let token = format!("{:016x}", rand::thread_rng().gen::<u64>());
        let deadline = Instant::now() + LOCK_ACQUIRE_TIMEOUT;

        loop {
            let acquired: Result<Option<String>, _> = redis::cmd("SET")
                .arg(&key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(LOCK_HOLD_MS)
                .query_async(&mut conn)
                .await;

            match acquired {
                Ok(Some(_)) => return Some(CartLock { key, token }),
                Ok(None) => {}
                Err(e) => {
                    warn!("Cart lock acquisition errored for user {user_id}: {e:?}");
                    return None;
                }
            }

            if Instant::now() >= deadline {
                warn!("Cart lock timeout for user {user_id}, proceeding without lock");
                return None;
            }

            let jitter = rand::thread_rng().gen_range(0..LOCK_RETRY_MS);
            tokio::time::sleep(Duration::from_millis(LOCK_RETRY_MS + jitter)).await;
        }
    }

    /// Release the lock only if we still hold it. The token comparison and
    /// the delete must be one atomic step: a separate GET then DEL could
    /// observe our token, lose the key to expiry, and delete the lock a new
    /// holder just acquired.
    async fn release_lock(&self, lock: Option<CartLock>) {
        let Some(lock) = lock else { return };
        let Some(manager) = self.redis.as_ref() else {
            return;
        };
        let mut conn = manager.clone();

        let script = redis::Script::new(
            "if redis.call('get', KEYS[1]) == ARGV[1] then \
                 return redis.call('del', KEYS[1]) \
             else \
                 return 0 \
             end",
        );
        let released: redis::RedisResult<i64> = script
            .key(&lock.key)
            .arg(&lock.token)
            .invoke_async(&mut conn)
            .await;
        if let Err(e) = released {
            warn!("Cart lock release errored: {e:?}");
        }
    }

    // ---- payload access ---------------------------------------------------

    async fn load(&self, user_id: i64) -> CartPayload {
        if self.redis.is_some() {
            match self.load_redis(user_id).await {
                Ok(payload) => return payload,
                Err(e) => warn!("Cart read failed for user {user_id}, using fallback: {e:?}"),
            }
        }
        self.load_memory(user_id).await
    }

    async fn load_redis(&self, user_id: i64) -> redis::RedisResult<CartPayload> {
        let mut conn = self.redis.as_ref().unwrap().clone();
        let raw: Option<String> = conn.get(Self::cart_key(user_id)).await?;
        // Any deserialization issue yields an empty cart, never an error
        Ok(raw
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default())
    }

    async fn load_memory(&self, user_id: i64) -> CartPayload {
        let mut memory = self.memory.lock().await;
        match memory.get(&user_id) {
            Some(entry) if entry.touched_at.elapsed() <= self.ttl => entry.payload.clone(),
            Some(_) => {
                // Lazily expired
                memory.remove(&user_id);
                CartPayload::default()
            }
            None => CartPayload::default(),
        }
    }

    /// Run a read-modify-write against the user's cart blob, serialized by
    /// the per-user lock (Redis) or the process-wide map mutex (fallback)
    async fn mutate<R, F>(&self, user_id: i64, apply: F) -> R
    where
        F: Fn(&mut CartPayload) -> R + Sync,
    {
        if self.redis.is_some() {
            match self.mutate_redis(user_id, &apply).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!("Cart write failed for user {user_id}, using fallback: {e:?}")
                }
            }
        }
        self.mutate_memory(user_id, &apply).await
    }

    async fn mutate_redis<R>(
        &self,
        user_id: i64,
        apply: &(dyn Fn(&mut CartPayload) -> R + Sync),
    ) -> redis::RedisResult<R> {
        let lock = self.acquire_lock(user_id).await;
        let result = self.mutate_redis_locked(user_id, apply).await;
        self.release_lock(lock).await;
        result
    }

    async fn mutate_redis_locked<R>(
        &self,
        user_id: i64,
        apply: &(dyn Fn(&mut CartPayload) -> R + Sync),
    ) -> redis::RedisResult<R> {
        let mut conn = self.redis.as_ref().unwrap().clone();
        let key = Self::cart_key(user_id);

        let raw: Option<String> = conn.get(&key).await?;
        let mut payload: CartPayload = raw
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        let result = apply(&mut payload);
        payload.updated_at = chrono::Utc::now().timestamp();

        if payload.items.is_empty() {
            // An empty cart is deleted outright, not stored
            let _: i64 = conn.del(&key).await?;
        } else {
            let json = serde_json::to_string(&payload).unwrap_or_default();
            let _: () = conn.set_ex(&key, json, self.ttl.as_secs()).await?;
        }

        Ok(result)
    }

    async fn mutate_memory<R>(
        &self,
        user_id: i64,
        apply: &(dyn Fn(&mut CartPayload) -> R + Sync),
    ) -> R {
        let mut memory = self.memory.lock().await;

        let mut payload = match memory.remove(&user_id) {
            Some(entry) if entry.touched_at.elapsed() <= self.ttl => entry.payload,
            _ => CartPayload::default(),
        };

        let result = apply(&mut payload);
        payload.updated_at = chrono::Utc::now().timestamp();

        if !payload.items.is_empty() {
            memory.insert(
                user_id,
                MemoryCart {
                    payload,
                    touched_at: Instant::now(),
                },
            );
        }

        result
    }

    // ---- operations -------------------------------------------------------

    /// Items currently in the user's cart, in insertion order. Never fails.
    pub async fn get_cart(&self, user_id: i64) -> Vec<CartItem> {
        self.load(user_id).await.items
    }

    /// Atomically replace the whole cart; an empty list clears it. Items
    /// spanning more than one store are rejected wholesale, same as
    /// `add_item` rejects a second store.
    pub async fn replace_cart(&self, user_id: i64, items: Vec<CartItem>) -> bool {
        let store_id = items.first().map(|item| item.store_id);
        if items.iter().any(|item| Some(item.store_id) != store_id) {
            return false;
        }

        self.mutate(user_id, move |payload| {
            payload.store_id = store_id;
            payload.items = items.clone();
        })
        .await;
        true
    }

    /// Add an item to the cart, merging quantity when the offer is already
    /// present. Returns the resulting line, or `None` when the cart already
    /// holds items from a different store.
    pub async fn add_item(&self, user_id: i64, item: CartItem) -> Option<CartItem> {
        self.mutate(user_id, move |payload| {
            if let Some(store_id) = payload.store_id {
                if !payload.items.is_empty() && store_id != item.store_id {
                    return None;
                }
            }

            if let Some(existing) = payload
                .items
                .iter_mut()
                .find(|line| line.offer_id == item.offer_id)
            {
                existing.quantity = existing
                    .quantity
                    .saturating_add(item.quantity)
                    .min(existing.cap());
                return Some(existing.clone());
            }

            let mut line = item.clone();
            line.quantity = line.quantity.min(line.cap());
            payload.store_id = Some(line.store_id);
            payload.items.push(line.clone());
            Some(line)
        })
        .await
    }

    /// Set the quantity of a cart line; zero or negative removes the line.
    /// Returns false when the offer is not in the cart.
    pub async fn update_quantity(&self, user_id: i64, offer_id: i64, quantity: i64) -> bool {
        self.mutate(user_id, move |payload| {
            let Some(index) = payload
                .items
                .iter()
                .position(|line| line.offer_id == offer_id)
            else {
                return false;
            };

            if quantity <= 0 {
                payload.items.remove(index);
                if payload.items.is_empty() {
                    payload.store_id = None;
                }
            } else {
                let line = &mut payload.items[index];
                line.quantity = (quantity as u32).min(line.cap());
            }
            true
        })
        .await
    }

    /// Apply a field patch to one cart line
    pub async fn update_item(&self, user_id: i64, offer_id: i64, patch: CartItemPatch) -> bool {
        self.mutate(user_id, move |payload| {
            let Some(line) = payload
                .items
                .iter_mut()
                .find(|line| line.offer_id == offer_id)
            else {
                return false;
            };

            if let Some(title) = &patch.title {
                line.title = title.clone();
            }
            if let Some(price) = patch.price {
                line.price = price;
            }
            if let Some(max_quantity) = patch.max_quantity {
                line.max_quantity = max_quantity;
            }
            if let Some(quantity) = patch.quantity {
                line.quantity = quantity.min(line.cap());
            }
            if let Some(photo) = &patch.photo {
                line.photo = Some(photo.clone());
            }
            if let Some(expiry_date) = &patch.expiry_date {
                line.expiry_date = Some(expiry_date.clone());
            }
            true
        })
        .await
    }

    /// Remove one line; returns false when the offer is not in the cart
    pub async fn remove_item(&self, user_id: i64, offer_id: i64) -> bool {
        self.mutate(user_id, move |payload| {
            let before = payload.items.len();
            payload.items.retain(|line| line.offer_id != offer_id);
            if payload.items.is_empty() {
                payload.store_id = None;
            }
            payload.items.len() != before
        })
        .await
    }

    /// Drop the whole cart
    pub async fn clear_cart(&self, user_id: i64) {
        self.mutate(user_id, |payload| {
            payload.store_id = None;
            payload.items.clear();
        })
        .await;
    }

    /// Sum of `price * quantity` over all lines
    pub async fn get_cart_total(&self, user_id: i64) -> f64 {
        self.load(user_id)
            .await
            .items
            .iter()
            .map(|line| line.price * f64::from(line.quantity))
            .sum()
    }

    /// Total quantity across all lines
    pub async fn get_cart_count(&self, user_id: i64) -> u32 {
        self.load(user_id)
            .await
            .items
            .iter()
            .map(|line| line.quantity)
            .sum()
    }

    /// Store ids referenced by the cart: a singleton set or empty, by the
    /// single-store invariant
    pub async fn get_cart_stores(&self, user_id: i64) -> HashSet<i64> {
        self.load(user_id)
            .await
            .items
            .iter()
            .map(|line| line.store_id)
            .collect()
    }

    pub async fn is_empty(&self, user_id: i64) -> bool {
        self.load(user_id).await.items.is_empty()
    }
}
