use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartForm, CartSummary, RemoveFromCartForm},
    error::AppResult,
    models::{Cart, CartLine},
    repository::{CartChange, CartUpdate},
    response::{ApiResponse, Meta},
    session::{CurrentUser, keys},
    state::AppState,
};

/// Resolve the cart for this session, creating one when needed.
///
/// The session's cart wins when the user may use it; a guest cart picked up
/// by a logged-in user is attached to them. Otherwise a logged-in user gets
/// their latest cart, and anyone else a fresh one.
pub async fn get_or_create_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> AppResult<Cart> {
    if let Some(cart) = session_cart(state, session, user).await? {
        return Ok(cart);
    }

    let cart = match user {
        Some(user) => match state.carts.find_latest_for_user(user.id).await? {
            Some(cart) => cart,
            None => state.carts.create(Some(user.id)).await?,
        },
        None => state.carts.create(None).await?,
    };
    tracing::debug!(cart_id = %cart.cart_id, "cart resolved for session");

    session.insert(keys::CART_ID, cart.cart_id).await?;
    Ok(cart)
}

async fn session_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> AppResult<Option<Cart>> {
    let Some(cart_id) = session.get::<Uuid>(keys::CART_ID).await? else {
        return Ok(None);
    };
    let Some(cart) = state.carts.find(cart_id).await? else {
        return Ok(None);
    };

    match user {
        None if cart.user_id.is_none() => Ok(Some(cart)),
        Some(user) if cart.user_id.is_none() => {
            Ok(Some(state.carts.assign_user(cart.cart_id, user.id).await?))
        }
        Some(user) if cart.is_accessible_by(user.id) => Ok(Some(cart)),
        _ => Ok(None),
    }
}

/// Attach the session's guest cart, if any, to a user who just logged in.
pub async fn adopt_session_cart(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> AppResult<()> {
    if session_cart(state, session, Some(user)).await?.is_none() {
        session.remove::<Uuid>(keys::CART_ID).await?;
    }
    Ok(())
}

/// Apply `change` to `cart` and persist the new cart and order totals in
/// the same unit of work.
pub async fn change_cart(state: &AppState, cart: &Cart, change: CartChange) -> AppResult<CartUpdate> {
    state
        .carts
        .apply_change(cart.cart_id, change, state.pricing.fee_rate)
        .await
}

/// Recompute the cart totals from its lines, persist them and carry the
/// new cart total into the cart's order when there is one.
pub async fn refresh_totals(state: &AppState, cart: Cart) -> AppResult<(Cart, Vec<CartLine>)> {
    let update = change_cart(state, &cart, CartChange::Recalculate).await?;
    Ok((update.cart, update.lines))
}

pub async fn view_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> AppResult<ApiResponse<CartSummary>> {
    let cart = get_or_create_cart(state, session, user).await?;
    let lines = state.carts.lines(cart.cart_id).await?;
    Ok(ApiResponse::success(
        "OK",
        CartSummary::new(cart, lines),
        Some(Meta::empty()),
    ))
}

pub async fn add_product(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    form: AddToCartForm,
) -> AppResult<ApiResponse<CartSummary>> {
    let cart = get_or_create_cart(state, session, user).await?;
    let CartUpdate {
        cart, lines, line, ..
    } = change_cart(
        state,
        &cart,
        CartChange::Add {
            product_id: form.product_id,
            quantity: form.quantity,
        },
    )
    .await?;

    log_audit(
        state.audit.as_ref(),
        user.map(|u| u.id),
        "cart_add",
        Some("cart_products"),
        Some(serde_json::json!({
            "cart_id": cart.cart_id,
            "product_id": form.product_id,
            "quantity": line.map(|line| line.quantity),
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to cart",
        CartSummary::new(cart, lines),
        Some(Meta::empty()),
    ))
}

pub async fn remove_product(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    form: RemoveFromCartForm,
) -> AppResult<ApiResponse<CartSummary>> {
    let cart = get_or_create_cart(state, session, user).await?;
    let CartUpdate { cart, lines, .. } = change_cart(
        state,
        &cart,
        CartChange::Remove {
            product_id: form.product_id,
        },
    )
    .await?;

    log_audit(
        state.audit.as_ref(),
        user.map(|u| u.id),
        "cart_remove",
        Some("cart_products"),
        Some(serde_json::json!({ "cart_id": cart.cart_id, "product_id": form.product_id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        CartSummary::new(cart, lines),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> AppResult<ApiResponse<CartSummary>> {
    let cart = get_or_create_cart(state, session, user).await?;
    let CartUpdate {
        cart,
        lines,
        removed,
        ..
    } = change_cart(state, &cart, CartChange::Clear).await?;

    log_audit(
        state.audit.as_ref(),
        user.map(|u| u.id),
        "cart_clear",
        Some("cart_products"),
        Some(serde_json::json!({ "cart_id": cart.cart_id, "removed": removed })),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart cleared",
        CartSummary::new(cart, lines),
        Some(Meta::empty()),
    ))
}
