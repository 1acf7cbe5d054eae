use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Cart, CartLine, Product};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartForm {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveFromCartForm {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub product: Product,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub line_total: Decimal,
}

impl From<CartLine> for CartLineDto {
    fn from(line: CartLine) -> Self {
        let line_total = line.line_total();
        Self {
            product: line.product,
            quantity: line.quantity,
            line_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartSummary {
    pub cart: Cart,
    pub items: Vec<CartLineDto>,
}

impl CartSummary {
    pub fn new(cart: Cart, lines: Vec<CartLine>) -> Self {
        Self {
            cart,
            items: lines.into_iter().map(CartLineDto::from).collect(),
        }
    }
}
