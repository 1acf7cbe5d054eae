use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::pricing;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub cart_id: Uuid,
    pub user_id: Option<Uuid>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: Option<Uuid>) -> Self {
        Self {
            cart_id: Uuid::new_v4(),
            user_id,
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
            created_at: Utc::now(),
        }
    }

    /// Sums the line items into `subtotal`. Lines that would be negative
    /// count as zero.
    pub fn update_subtotal(&mut self, lines: &[CartLine]) {
        self.subtotal = pricing::round_money(pricing::subtotal(
            lines.iter().map(|line| (line.quantity, line.product.price)),
        ));
    }

    pub fn update_total(&mut self, fee_rate: Decimal) {
        self.total = pricing::apply_fee(self.subtotal, fee_rate);
    }

    pub fn update_totals(&mut self, lines: &[CartLine], fee_rate: Decimal) {
        self.update_subtotal(lines);
        self.update_total(fee_rate);
    }

    /// Whether the cart may be used by `user_id`: guest carts are open to
    /// anyone holding the session.
    pub fn is_accessible_by(&self, user_id: Uuid) -> bool {
        self.user_id.is_none_or(|owner| owner == user_id)
    }
}

/// Row of the cart/product join table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartProduct {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A line item joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        pricing::line_total(self.quantity, self.product.price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Payed,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Payed => "PAYED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status {0:?}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "PAYED" => Ok(OrderStatus::Payed),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(UnknownOrderStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub cart_id: Uuid,
    pub status: OrderStatus,
    #[schema(value_type = String)]
    pub shipping_total: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: Uuid, cart: &Cart, shipping_total: Decimal) -> Self {
        let now = Utc::now();
        let mut order = Self {
            order_id: Uuid::new_v4(),
            user_id,
            cart_id: cart.cart_id,
            status: OrderStatus::Created,
            shipping_total,
            total: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        order.update_total(cart);
        order
    }

    pub fn get_total(&self, cart: &Cart) -> Decimal {
        pricing::round_money(cart.total + self.shipping_total)
    }

    pub fn update_total(&mut self, cart: &Cart) {
        self.total = self.get_total(cart);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Decimal,
}
