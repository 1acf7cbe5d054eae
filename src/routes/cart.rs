use axum::{
    Form, Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::{
    dto::cart::{AddToCartForm, CartSummary, RemoveFromCartForm},
    error::AppResult,
    middleware::auth::MaybeUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/carrito/", get(view_cart))
        .route("/carrito/agregar", post(add_to_cart))
        .route("/carrito/eliminar", post(remove_from_cart))
        .route("/carrito/vaciar", post(clear_cart))
}

#[utoipa::path(
    get,
    path = "/carrito/",
    responses(
        (status = 200, description = "Current cart with line items", body = ApiResponse<CartSummary>)
    ),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::view_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/carrito/agregar",
    request_body(content = AddToCartForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Add a product or increase its quantity", body = ApiResponse<CartSummary>),
        (status = 400, description = "Product not found"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
    Form(form): Form<AddToCartForm>,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::add_product(&state, &session, user.as_ref(), form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/carrito/eliminar",
    request_body(content = RemoveFromCartForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Product removed", body = ApiResponse<CartSummary>),
        (status = 404, description = "Product is not in the cart"),
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
    Form(form): Form<RemoveFromCartForm>,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::remove_product(&state, &session, user.as_ref(), form).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/carrito/vaciar",
    responses(
        (status = 200, description = "All line items removed", body = ApiResponse<CartSummary>)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    session: Session,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<ApiResponse<CartSummary>>> {
    let resp = cart_service::clear_cart(&state, &session, user.as_ref()).await?;
    Ok(Json(resp))
}
