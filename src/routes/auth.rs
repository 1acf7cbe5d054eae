use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::Response,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::{
    dto::auth::{LoginForm, LoginPage, LoginQuery, RegisterForm},
    error::AppResult,
    middleware::auth::{LOGIN_PATH, found, safe_next},
    response::{ApiResponse, Meta},
    services::{auth_service, cart_service},
    session::{CurrentUser, keys},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/usuarios/logout", get(logout).post(logout))
        .route("/usuarios/registro", post(register))
}

#[utoipa::path(
    get,
    path = "/usuarios/login",
    params(("next" = Option<String>, Query, description = "Path to return to after login")),
    responses(
        (status = 200, description = "Login page", body = ApiResponse<LoginPage>)
    ),
    tag = "Users"
)]
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<ApiResponse<LoginPage>> {
    let next = safe_next(query.next.as_deref()).to_string();
    Json(ApiResponse::success(
        "Login required",
        LoginPage { next },
        Some(Meta::empty()),
    ))
}

#[utoipa::path(
    post,
    path = "/usuarios/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Logged in, redirect to `next`"),
        (status = 400, description = "Invalid credentials")
    ),
    tag = "Users"
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let user = auth_service::authenticate(&state, &form).await?;
    start_session(&state, &session, &user).await?;

    let next = form.next.as_deref().or(query.next.as_deref());
    Ok(found(safe_next(next)))
}

#[utoipa::path(
    post,
    path = "/usuarios/registro",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Registered and logged in"),
        (status = 400, description = "Username taken or fields missing")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let user = auth_service::register_user(&state, form).await?;
    start_session(&state, &session, &user).await?;
    Ok(found("/"))
}

#[utoipa::path(
    get,
    path = "/usuarios/logout",
    responses((status = 302, description = "Logged out, redirect to login")),
    tag = "Users"
)]
pub async fn logout(session: Session) -> AppResult<Response> {
    session.flush().await?;
    Ok(found(LOGIN_PATH))
}

async fn start_session(state: &AppState, session: &Session, user: &CurrentUser) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await?;
    cart_service::adopt_session_cart(state, session, user).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(())
}
