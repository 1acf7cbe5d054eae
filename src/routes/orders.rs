use axum::{Json, Router, extract::State, routing::get};
use tower_sessions::Session;

use crate::{
    dto::orders::OrderView,
    error::AppResult,
    middleware::auth::RequireLogin,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orden/", get(order))
        .route("/orden", get(order))
}

#[utoipa::path(
    get,
    path = "/orden/",
    responses(
        (status = 200, description = "Order for the session's cart; `order` is null while the cart is empty", body = ApiResponse<OrderView>),
        (status = 302, description = "Not logged in, redirect to /usuarios/login?next=/orden/"),
    ),
    security(("session_cookie" = [])),
    tag = "Orders"
)]
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    RequireLogin(user): RequireLogin,
) -> AppResult<Json<ApiResponse<OrderView>>> {
    let resp = order_service::order_view(&state, &session, &user).await?;
    Ok(Json(resp))
}
