use tower_sessions::Session;

use crate::{
    audit::log_audit,
    dto::{cart::CartSummary, orders::OrderView},
    error::{AppError, AppResult},
    models::{Cart, Order},
    response::{ApiResponse, Meta},
    services::cart_service,
    session::{CurrentUser, keys},
    state::AppState,
};

/// Return the order already placed for `cart`, or create one. No order is
/// created for a cart without line items.
pub async fn get_or_create_order(
    state: &AppState,
    user: &CurrentUser,
    cart: &Cart,
    has_items: bool,
) -> AppResult<Option<Order>> {
    if let Some(order) = state.orders.find_by_cart(cart.cart_id).await? {
        if order.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        return Ok(Some(order));
    }

    if !has_items {
        tracing::debug!(cart_id = %cart.cart_id, "cart is empty, no order created");
        return Ok(None);
    }

    let candidate = Order::new(user.id, cart, state.pricing.shipping_total);
    let candidate_id = candidate.order_id;
    let order = state.orders.create_for_cart(candidate).await?;

    // A concurrent checkout of the same cart got there first.
    if order.order_id != candidate_id {
        if order.user_id != user.id {
            return Err(AppError::Forbidden);
        }
        return Ok(Some(order));
    }

    tracing::info!(order_id = %order.order_id, cart_id = %cart.cart_id, "order created");

    log_audit(
        state.audit.as_ref(),
        Some(user.id),
        "order_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order_id, "cart_id": cart.cart_id })),
    )
    .await;

    Ok(Some(order))
}

pub async fn order_view(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> AppResult<ApiResponse<OrderView>> {
    let cart = cart_service::get_or_create_cart(state, session, Some(user)).await?;
    let (cart, lines) = cart_service::refresh_totals(state, cart).await?;
    let order = get_or_create_order(state, user, &cart, !lines.is_empty()).await?;

    if let Some(order) = &order {
        session.insert(keys::ORDER_ID, order.order_id).await?;
    }

    Ok(ApiResponse::success(
        "OK",
        OrderView {
            cart: CartSummary::new(cart, lines),
            order,
        },
        Some(Meta::empty()),
    ))
}
