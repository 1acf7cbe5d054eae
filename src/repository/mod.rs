//! Persistence capabilities used by the services.
//!
//! Each trait has a Postgres implementation (`postgres`) and an in-memory
//! one (`memory`) used when no database is configured and in tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Cart, CartLine, CartProduct, NewProduct, NewUser, Order, Product, User},
    pricing,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Fails with `BadRequest` when the username is taken.
    async fn create(&self, user: NewUser) -> AppResult<User>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Products ordered by title, plus the total count.
    async fn list(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn create(&self, product: NewProduct) -> AppResult<Product>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(&self, cart_id: Uuid) -> AppResult<Option<Cart>>;

    /// The most recently created cart owned by `user_id`.
    async fn find_latest_for_user(&self, user_id: Uuid) -> AppResult<Option<Cart>>;

    async fn create(&self, user_id: Option<Uuid>) -> AppResult<Cart>;

    async fn assign_user(&self, cart_id: Uuid, user_id: Uuid) -> AppResult<Cart>;

    /// Line items joined with their products, oldest first.
    async fn lines(&self, cart_id: Uuid) -> AppResult<Vec<CartLine>>;

    /// Applies `change`, recomputes the cart totals with `fee_rate` and
    /// carries the new cart total into the cart's order, as one unit. When
    /// any step fails nothing is written.
    ///
    /// `Remove` of a product that is not in the cart fails with `NotFound`.
    /// A quantity or total that would not fit its column fails with
    /// `BadRequest`.
    async fn apply_change(
        &self,
        cart_id: Uuid,
        change: CartChange,
        fee_rate: Decimal,
    ) -> AppResult<CartUpdate>;
}

/// A change to the line items of one cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// Adds `quantity` to the product's line, creating it when missing.
    /// Afterwards exactly one line exists for the pair.
    Add { product_id: Uuid, quantity: i32 },
    Remove { product_id: Uuid },
    Clear,
    /// Leaves the lines alone and only refreshes the totals.
    Recalculate,
}

/// A cart as committed by `CartRepository::apply_change`.
#[derive(Debug, Clone)]
pub struct CartUpdate {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
    /// The line written by `CartChange::Add`.
    pub line: Option<CartProduct>,
    /// Lines deleted by `Remove` or `Clear`.
    pub removed: u64,
    /// The cart's order, with its total already carried over.
    pub order: Option<Order>,
}

/// `current + quantity`, refusing values an `INTEGER` column cannot hold.
pub(crate) fn increment_quantity(current: i32, quantity: i32) -> AppResult<i32> {
    current
        .checked_add(quantity)
        .ok_or_else(|| AppError::BadRequest("quantity out of range".into()))
}

/// Recompute `cart` from `lines` and carry its total into `order`.
pub(crate) fn recalculate(
    cart: &mut Cart,
    lines: &[CartLine],
    fee_rate: Decimal,
    order: Option<&mut Order>,
) -> AppResult<()> {
    cart.update_totals(lines, fee_rate);
    let mut amounts = vec![cart.subtotal, cart.total];
    if let Some(order) = order {
        order.update_total(cart);
        amounts.push(order.total);
    }

    if amounts.into_iter().all(pricing::is_storable) {
        Ok(())
    } else {
        Err(AppError::BadRequest("cart total out of range".into()))
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find(&self, order_id: Uuid) -> AppResult<Option<Order>>;

    async fn find_by_cart(&self, cart_id: Uuid) -> AppResult<Option<Order>>;

    /// Inserts `order` unless its cart already has one, and returns the
    /// order stored for the cart either way.
    async fn create_for_cart(&self, order: Order) -> AppResult<Order>;
}
