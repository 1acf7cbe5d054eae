mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use axum_checkout_api::{
    audit::{AuditEntry, AuditLog},
    error::AppResult,
    models::Order,
    pricing::DEFAULT_SHIPPING_TOTAL,
    repository::{InMemoryStore, OrderRepository},
    services::order_service,
    session::CurrentUser,
    state::AppState,
};
use common::{TestApp, money};

/// Misses existing orders on lookup, like a checkout whose read ran just
/// before another request inserted the cart's order.
struct StaleLookupOrders {
    store: Arc<InMemoryStore>,
}

#[async_trait]
impl OrderRepository for StaleLookupOrders {
    async fn find(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        OrderRepository::find(self.store.as_ref(), order_id).await
    }

    async fn find_by_cart(&self, _cart_id: Uuid) -> AppResult<Option<Order>> {
        Ok(None)
    }

    async fn create_for_cart(&self, order: Order) -> AppResult<Order> {
        self.store.create_for_cart(order).await
    }
}

#[derive(Default)]
struct RecordedActions(Mutex<Vec<&'static str>>);

impl RecordedActions {
    fn actions(&self) -> Vec<&'static str> {
        self.0.lock().expect("audit lock").clone()
    }
}

#[async_trait]
impl AuditLog for RecordedActions {
    async fn record(&self, entry: AuditEntry) -> AppResult<()> {
        self.0.lock().expect("audit lock").push(entry.action);
        Ok(())
    }
}

fn racing_state(app: &TestApp, audit: Arc<RecordedActions>) -> AppState {
    let mut state = app.state.clone();
    state.orders = Arc::new(StaleLookupOrders {
        store: app.store.clone(),
    });
    state.audit = audit;
    state
}

#[tokio::test]
async fn losing_a_checkout_race_returns_the_winner_without_auditing() {
    let app = TestApp::new();
    let user = app.user("testuser").await;
    let mesa = app.product("Mesa", money(1500)).await;
    let cart = app.cart_for(&user).await;
    app.store
        .add_or_increment(cart.cart_id, mesa.id, 1)
        .await
        .expect("add line");
    let winner = app
        .store
        .create_for_cart(Order::new(user.id, &cart, DEFAULT_SHIPPING_TOTAL))
        .await
        .expect("winner order");

    let audit = Arc::new(RecordedActions::default());
    let state = racing_state(&app, audit.clone());
    let current = CurrentUser {
        id: user.id,
        username: user.username.clone(),
    };

    let order = order_service::get_or_create_order(&state, &current, &cart, true)
        .await
        .expect("checkout")
        .expect("order returned");

    assert_eq!(order.order_id, winner.order_id);
    assert_eq!(app.store.orders_for_cart(cart.cart_id).await.len(), 1);
    assert!(audit.actions().is_empty(), "got {:?}", audit.actions());
}

#[tokio::test]
async fn new_order_is_audited_once() {
    let app = TestApp::new();
    let user = app.user("testuser").await;
    let mesa = app.product("Mesa", money(1500)).await;
    let cart = app.cart_for(&user).await;
    app.store
        .add_or_increment(cart.cart_id, mesa.id, 1)
        .await
        .expect("add line");

    let audit = Arc::new(RecordedActions::default());
    let state = racing_state(&app, audit.clone());
    let current = CurrentUser {
        id: user.id,
        username: user.username.clone(),
    };

    let order = order_service::get_or_create_order(&state, &current, &cart, true)
        .await
        .expect("checkout")
        .expect("order created");

    assert_eq!(order.cart_id, cart.cart_id);
    assert_eq!(audit.actions(), vec!["order_created"]);
}
