use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Cart, CartLine, CartProduct, NewProduct, NewUser, Order, Product, User},
    repository::{
        CartChange, CartRepository, CartUpdate, OrderRepository, ProductRepository,
        UserRepository, increment_quantity, recalculate,
    },
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    carts: HashMap<Uuid, Cart>,
    cart_products: Vec<CartProduct>,
    orders: HashMap<Uuid, Order>,
}

impl Tables {
    fn lines(&self, cart_id: Uuid) -> Vec<CartLine> {
        let mut rows: Vec<&CartProduct> = self
            .cart_products
            .iter()
            .filter(|row| row.cart_id == cart_id)
            .collect();
        rows.sort_by_key(|row| row.created_at);
        rows.into_iter()
            .filter_map(|row| {
                self.products.get(&row.product_id).map(|product| CartLine {
                    product: product.clone(),
                    quantity: row.quantity,
                })
            })
            .collect()
    }

    fn add_line(&mut self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<CartProduct> {
        if !self.carts.contains_key(&cart_id) {
            return Err(AppError::NotFound);
        }
        if !self.products.contains_key(&product_id) {
            return Err(AppError::BadRequest("product not found".into()));
        }
        if let Some(row) = self
            .cart_products
            .iter_mut()
            .find(|row| row.cart_id == cart_id && row.product_id == product_id)
        {
            row.quantity = increment_quantity(row.quantity, quantity)?;
            return Ok(row.clone());
        }
        let row = CartProduct {
            id: Uuid::new_v4(),
            cart_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        };
        self.cart_products.push(row.clone());
        Ok(row)
    }

    fn remove_lines(&mut self, keep: impl Fn(&CartProduct) -> bool) -> u64 {
        let before = self.cart_products.len();
        self.cart_products.retain(keep);
        (before - self.cart_products.len()) as u64
    }

    /// Everything `apply_change` does, except that a failure may leave
    /// `cart_products` half-written. The caller restores it.
    fn stage_change(
        &mut self,
        cart_id: Uuid,
        change: CartChange,
        fee_rate: Decimal,
    ) -> AppResult<CartUpdate> {
        let mut cart = self.carts.get(&cart_id).cloned().ok_or(AppError::NotFound)?;

        let mut line = None;
        let mut removed = 0;
        match change {
            CartChange::Add {
                product_id,
                quantity,
            } => line = Some(self.add_line(cart_id, product_id, quantity)?),
            CartChange::Remove { product_id } => {
                removed = self.remove_lines(|row| {
                    !(row.cart_id == cart_id && row.product_id == product_id)
                });
                if removed == 0 {
                    return Err(AppError::NotFound);
                }
            }
            CartChange::Clear => removed = self.remove_lines(|row| row.cart_id != cart_id),
            CartChange::Recalculate => {}
        }

        let lines = self.lines(cart_id);
        let mut order = self
            .orders
            .values()
            .find(|order| order.cart_id == cart_id)
            .cloned();
        recalculate(&mut cart, &lines, fee_rate, order.as_mut())?;

        self.carts.insert(cart_id, cart.clone());
        if let Some(order) = &order {
            self.orders.insert(order.order_id, order.clone());
        }

        Ok(CartUpdate {
            cart,
            lines,
            line,
            removed,
            order,
        })
    }
}

/// Process-local store implementing every repository trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every order stored for `cart_id`. At most one unless the uniqueness
    /// guarantee is broken.
    pub async fn orders_for_cart(&self, cart_id: Uuid) -> Vec<Order> {
        let tables = self.tables.read().await;
        tables
            .orders
            .values()
            .filter(|order| order.cart_id == cart_id)
            .cloned()
            .collect()
    }

    /// Insert a user with a ready-made password hash.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn insert_product(&self, product: Product) {
        self.tables.write().await.products.insert(product.id, product);
    }

    /// Add a line without touching the stored totals, for seeding fixtures.
    pub async fn add_or_increment(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartProduct> {
        self.tables
            .write()
            .await
            .add_line(cart_id, product_id, quantity)
    }

    /// Drop every line of `cart_id` without touching the stored totals.
    pub async fn clear(&self, cart_id: Uuid) -> u64 {
        self.tables
            .write()
            .await
            .remove_lines(|row| row.cart_id != cart_id)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::BadRequest("Username is already taken".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn list(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.title.cmp(&b.title));
        let total = products.len() as u64;
        let page = products
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn create(&self, product: NewProduct) -> AppResult<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            title: product.title,
            description: product.description,
            image: product.image,
            price: product.price,
            created_at: Utc::now(),
        };
        self.insert_product(product.clone()).await;
        Ok(product)
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn find(&self, cart_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(self.tables.read().await.carts.get(&cart_id).cloned())
    }

    async fn find_latest_for_user(&self, user_id: Uuid) -> AppResult<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables
            .carts
            .values()
            .filter(|cart| cart.user_id == Some(user_id))
            .max_by_key(|cart| cart.created_at)
            .cloned())
    }

    async fn create(&self, user_id: Option<Uuid>) -> AppResult<Cart> {
        let cart = Cart::new(user_id);
        self.tables
            .write()
            .await
            .carts
            .insert(cart.cart_id, cart.clone());
        Ok(cart)
    }

    async fn assign_user(&self, cart_id: Uuid, user_id: Uuid) -> AppResult<Cart> {
        let mut tables = self.tables.write().await;
        let cart = tables.carts.get_mut(&cart_id).ok_or(AppError::NotFound)?;
        cart.user_id = Some(user_id);
        Ok(cart.clone())
    }

    async fn lines(&self, cart_id: Uuid) -> AppResult<Vec<CartLine>> {
        Ok(self.tables.read().await.lines(cart_id))
    }

    async fn apply_change(
        &self,
        cart_id: Uuid,
        change: CartChange,
        fee_rate: Decimal,
    ) -> AppResult<CartUpdate> {
        let mut tables = self.tables.write().await;
        let snapshot = tables.cart_products.clone();
        let result = tables.stage_change(cart_id, change, fee_rate);
        if result.is_err() {
            tables.cart_products = snapshot;
        }
        result
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn find(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).cloned())
    }

    async fn find_by_cart(&self, cart_id: Uuid) -> AppResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .find(|order| order.cart_id == cart_id)
            .cloned())
    }

    async fn create_for_cart(&self, order: Order) -> AppResult<Order> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .orders
            .values()
            .find(|existing| existing.cart_id == order.cart_id)
        {
            return Ok(existing.clone());
        }
        tables.orders.insert(order.order_id, order.clone());
        Ok(order)
    }
}
