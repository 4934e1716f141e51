//! # Payment Use-Case Tests
//!
//! End-to-end tests of the confirm/reject/submit-proof workflow against
//! in-memory mock implementations of the repository and order-service
//! ports.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use fudly::order::{OfferSummary, OrderSnapshot, StoreSummary, UserSummary};
use fudly::payments::{PaymentError, Payments};
use fudly::repository::{OrderStatusService, OrdersRepository};
use fudly::status::{OrderStatus, PaymentStatus};

type SharedOrders = Arc<Mutex<HashMap<i64, OrderSnapshot>>>;

struct MockRepo {
    orders: SharedOrders,
    payment_updates: Mutex<Vec<(i64, String, Option<String>)>>,
    fail_payment_updates: bool,
}

impl MockRepo {
    fn new(orders: SharedOrders) -> Self {
        Self {
            orders,
            payment_updates: Mutex::new(Vec::new()),
            fail_payment_updates: false,
        }
    }

    fn failing(orders: SharedOrders) -> Self {
        Self {
            fail_payment_updates: true,
            ..Self::new(orders)
        }
    }
}

#[async_trait]
impl OrdersRepository for MockRepo {
    async fn get_order(&self, order_id: i64) -> Result<Option<OrderSnapshot>> {
        Ok(self.orders.lock().await.get(&order_id).cloned())
    }

    async fn update_payment_status(
        &self,
        order_id: i64,
        status: &PaymentStatus,
        proof_photo_id: Option<&str>,
    ) -> Result<()> {
        if self.fail_payment_updates {
            bail!("storage down");
        }
        self.payment_updates.lock().await.push((
            order_id,
            status.as_str().to_string(),
            proof_photo_id.map(str::to_string),
        ));
        let mut orders = self.orders.lock().await;
        if let Some(order) = orders.get_mut(&order_id) {
            order.payment_status = Some(status.as_str().to_string());
            if let Some(photo_id) = proof_photo_id {
                order.payment_proof_photo_id = Some(photo_id.to_string());
            }
        }
        Ok(())
    }

    async fn set_order_status(&self, _order_id: i64, _status: &OrderStatus) -> Result<bool> {
        Ok(false)
    }

    async fn get_store(&self, _store_id: i64) -> Result<Option<StoreSummary>> {
        Ok(None)
    }

    async fn get_offer(&self, _offer_id: i64) -> Result<Option<OfferSummary>> {
        Ok(None)
    }

    async fn get_user(&self, _user_id: i64) -> Result<Option<UserSummary>> {
        Ok(None)
    }
}

#[derive(Clone)]
struct StatusUpdateCall {
    entity_id: i64,
    entity_type: String,
    new_status: String,
    notify_customer: bool,
    reject_reason: Option<String>,
}

struct MockOrderService {
    orders: SharedOrders,
    confirm_result: bool,
    confirmed: Mutex<Vec<i64>>,
    status_updates: Mutex<Vec<StatusUpdateCall>>,
}

impl MockOrderService {
    fn new(orders: SharedOrders) -> Self {
        Self {
            orders,
            confirm_result: true,
            confirmed: Mutex::new(Vec::new()),
            status_updates: Mutex::new(Vec::new()),
        }
    }

    fn refusing(orders: SharedOrders) -> Self {
        Self {
            confirm_result: false,
            ..Self::new(orders)
        }
    }
}

#[async_trait]
impl OrderStatusService for MockOrderService {
    async fn confirm_payment(&self, order_id: i64) -> Result<bool> {
        self.confirmed.lock().await.push(order_id);
        if self.confirm_result {
            if let Some(order) = self.orders.lock().await.get_mut(&order_id) {
                order.payment_status = Some("confirmed".to_string());
            }
        }
        Ok(self.confirm_result)
    }

    async fn update_status(
        &self,
        entity_id: i64,
        entity_type: &str,
        new_status: &OrderStatus,
        notify_customer: bool,
        reject_reason: Option<&str>,
    ) -> Result<()> {
        self.status_updates.lock().await.push(StatusUpdateCall {
            entity_id,
            entity_type: entity_type.to_string(),
            new_status: new_status.as_str().to_string(),
            notify_customer,
            reject_reason: reject_reason.map(str::to_string),
        });
        Ok(())
    }
}

fn order(order_id: i64, payment_status: Option<&str>, method: &str) -> OrderSnapshot {
    OrderSnapshot {
        order_id,
        user_id: Some(100),
        store_id: Some(7),
        offer_id: Some(9),
        order_status: Some("pending".to_string()),
        payment_status: payment_status.map(str::to_string),
        payment_method: Some(method.to_string()),
        payment_proof_photo_id: None,
        order_type: Some("pickup".to_string()),
        total_price: Some(45_000.0),
        delivery_address: None,
        quantity: Some(1),
        cart_items: None,
    }
}

fn setup(
    orders: Vec<OrderSnapshot>,
) -> (Payments, Arc<MockRepo>, Arc<MockOrderService>, SharedOrders) {
    let shared: SharedOrders = Arc::new(Mutex::new(
        orders.into_iter().map(|o| (o.order_id, o)).collect(),
    ));
    let repo = Arc::new(MockRepo::new(Arc::clone(&shared)));
    let service = Arc::new(MockOrderService::new(Arc::clone(&shared)));
    let payments = Payments::new(
        Some(Arc::clone(&repo) as Arc<dyn OrdersRepository>),
        Some(Arc::clone(&service) as Arc<dyn OrderStatusService>),
    );
    (payments, repo, service, shared)
}

// ---- confirm_payment -------------------------------------------------------

#[tokio::test]
async fn test_confirm_payment_happy_path() {
    let (payments, _repo, service, _) =
        setup(vec![order(1, Some("proof_submitted"), "card")]);

    let outcome = payments.confirm_payment(1).await.unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Confirmed);
    assert_eq!(outcome.order.order_id, 1);
    assert_eq!(*service.confirmed.lock().await, vec![1]);
}

#[tokio::test]
async fn test_confirm_payment_is_idempotent() {
    let (payments, _repo, _service, _) =
        setup(vec![order(1, Some("proof_submitted"), "card")]);

    assert!(payments.confirm_payment(1).await.is_ok());

    // The first call moved the order to confirmed, so the second is refused
    let second = payments.confirm_payment(1).await.unwrap_err();
    assert_eq!(second, PaymentError::AlreadyProcessed);
    assert_eq!(second.key(), "already_processed");
}

#[tokio::test]
async fn test_confirm_payment_requires_submitted_or_awaiting_proof() {
    let (payments, _repo, _service, _) = setup(vec![
        order(1, Some("awaiting_payment"), "click"),
        order(2, None, "cash"),
        order(3, Some("awaiting_proof"), "card"),
    ]);

    assert_eq!(
        payments.confirm_payment(1).await.unwrap_err(),
        PaymentError::AlreadyProcessed
    );
    assert_eq!(
        payments.confirm_payment(2).await.unwrap_err(),
        PaymentError::AlreadyProcessed
    );
    // Confirming before the proof arrives is allowed for admins
    assert!(payments.confirm_payment(3).await.is_ok());
}

#[tokio::test]
async fn test_confirm_payment_not_found() {
    let (payments, _repo, _service, _) = setup(Vec::new());
    assert_eq!(
        payments.confirm_payment(99).await.unwrap_err(),
        PaymentError::NotFound
    );
}

#[tokio::test]
async fn test_confirm_payment_without_repo_is_db_error() {
    let payments = Payments::new(None, None);
    assert_eq!(
        payments.confirm_payment(1).await.unwrap_err(),
        PaymentError::DbError
    );
}

#[tokio::test]
async fn test_confirm_payment_without_service_is_unavailable() {
    let shared: SharedOrders = Arc::new(Mutex::new(HashMap::from([(
        1,
        order(1, Some("proof_submitted"), "card"),
    )])));
    let repo = Arc::new(MockRepo::new(shared));
    let payments = Payments::new(Some(repo as Arc<dyn OrdersRepository>), None);

    assert_eq!(
        payments.confirm_payment(1).await.unwrap_err(),
        PaymentError::ServiceUnavailable
    );
}

#[tokio::test]
async fn test_confirm_payment_collaborator_refusal_is_processing_error() {
    let shared: SharedOrders = Arc::new(Mutex::new(HashMap::from([(
        1,
        order(1, Some("proof_submitted"), "card"),
    )])));
    let repo = Arc::new(MockRepo::new(Arc::clone(&shared)));
    let service = Arc::new(MockOrderService::refusing(shared));
    let payments = Payments::new(
        Some(repo as Arc<dyn OrdersRepository>),
        Some(service as Arc<dyn OrderStatusService>),
    );

    assert_eq!(
        payments.confirm_payment(1).await.unwrap_err(),
        PaymentError::ProcessingError
    );
}

// ---- reject_payment --------------------------------------------------------

#[tokio::test]
async fn test_reject_payment_delegates_and_records() {
    let (payments, repo, service, _) =
        setup(vec![order(1, Some("awaiting_proof"), "card")]);

    let outcome = payments.reject_payment(1).await.unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Rejected);

    let updates = service.status_updates.lock().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].entity_id, 1);
    assert_eq!(updates[0].entity_type, "order");
    assert_eq!(updates[0].new_status, "rejected");
    assert!(!updates[0].notify_customer);
    assert_eq!(
        updates[0].reject_reason.as_deref(),
        Some("payment_rejected_by_admin")
    );

    // Best-effort secondary write keeps the payment field consistent
    let writes = repo.payment_updates.lock().await;
    assert_eq!(writes.as_slice(), &[(1, "rejected".to_string(), None)]);
}

#[tokio::test]
async fn test_reject_payment_survives_secondary_write_failure() {
    let shared: SharedOrders = Arc::new(Mutex::new(HashMap::from([(
        1,
        order(1, Some("proof_submitted"), "card"),
    )])));
    let repo = Arc::new(MockRepo::failing(Arc::clone(&shared)));
    let service = Arc::new(MockOrderService::new(shared));
    let payments = Payments::new(
        Some(repo as Arc<dyn OrdersRepository>),
        Some(service as Arc<dyn OrderStatusService>),
    );

    // The order-service call is authoritative; the repo write failing is
    // logged, not surfaced
    let outcome = payments.reject_payment(1).await.unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::Rejected);
}

#[tokio::test]
async fn test_reject_payment_guards_processed_orders() {
    let (payments, _repo, _service, _) = setup(vec![order(1, Some("paid"), "card")]);

    assert_eq!(
        payments.reject_payment(1).await.unwrap_err(),
        PaymentError::AlreadyProcessed
    );
}

// ---- submit_payment_proof --------------------------------------------------

#[tokio::test]
async fn test_submit_proof_happy_path() {
    let (payments, repo, _service, _) =
        setup(vec![order(1, Some("awaiting_proof"), "click")]);

    let outcome = payments
        .submit_payment_proof(1, Some(100), "abc")
        .await
        .unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::ProofSubmitted);

    let writes = repo.payment_updates.lock().await;
    assert_eq!(
        writes.as_slice(),
        &[(1, "proof_submitted".to_string(), Some("abc".to_string()))]
    );
}

#[tokio::test]
async fn test_submit_proof_ownership_check() {
    let (payments, _repo, _service, _) =
        setup(vec![order(1, Some("awaiting_proof"), "card")]);

    assert_eq!(
        payments
            .submit_payment_proof(1, Some(999), "abc")
            .await
            .unwrap_err(),
        PaymentError::Forbidden
    );

    // A missing actor id bypasses the check (system-initiated calls)
    assert!(payments.submit_payment_proof(1, None, "abc").await.is_ok());
}

#[tokio::test]
async fn test_submit_proof_state_guards() {
    let (payments, _repo, _service, _) = setup(vec![
        order(1, Some("awaiting_admin_confirmation"), "card"),
        order(2, Some("paid"), "card"),
        order(3, None, "cash"),
        order(4, Some("awaiting_payment"), "click"),
    ]);

    assert_eq!(
        payments.submit_payment_proof(1, Some(100), "x").await.unwrap_err(),
        PaymentError::AlreadySubmitted
    );
    assert_eq!(
        payments.submit_payment_proof(2, Some(100), "x").await.unwrap_err(),
        PaymentError::AlreadyConfirmed
    );
    assert_eq!(
        payments.submit_payment_proof(3, Some(100), "x").await.unwrap_err(),
        PaymentError::NotRequired
    );
    assert_eq!(
        payments.submit_payment_proof(4, Some(100), "x").await.unwrap_err(),
        PaymentError::NotAllowed
    );
}

#[tokio::test]
async fn test_submit_proof_resubmission_after_rejection() {
    let (payments, _repo, _service, shared) =
        setup(vec![order(1, Some("payment_rejected"), "card")]);

    let outcome = payments
        .submit_payment_proof(1, Some(100), "second_try")
        .await
        .unwrap();
    assert_eq!(outcome.payment_status, PaymentStatus::ProofSubmitted);

    let orders = shared.lock().await;
    assert_eq!(
        orders[&1].payment_proof_photo_id.as_deref(),
        Some("second_try")
    );
}

#[tokio::test]
async fn test_submit_proof_storage_failure_is_processing_error() {
    let shared: SharedOrders = Arc::new(Mutex::new(HashMap::from([(
        1,
        order(1, Some("awaiting_proof"), "card"),
    )])));
    let repo = Arc::new(MockRepo::failing(shared));
    let payments = Payments::new(Some(repo as Arc<dyn OrdersRepository>), None);

    assert_eq!(
        payments
            .submit_payment_proof(1, Some(100), "abc")
            .await
            .unwrap_err(),
        PaymentError::ProcessingError
    );
}
