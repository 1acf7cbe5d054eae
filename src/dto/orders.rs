use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::cart::CartSummary, models::Order};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderView {
    pub cart: CartSummary,
    /// `None` while the cart is empty.
    pub order: Option<Order>,
}
