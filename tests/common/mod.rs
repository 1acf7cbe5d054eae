#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use chrono::Utc;
use rust_decimal::Decimal;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use uuid::Uuid;

use axum_checkout_api::{
    app::build_app,
    config::PricingConfig,
    models::{Cart, Product, User},
    repository::{CartRepository, InMemoryStore},
    services::auth_service::hash_password,
    state::AppState,
};

pub const PASSWORD: &str = "testpass";

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::in_memory(store.clone(), PricingConfig::default());
        let router = build_app(state.clone(), MemoryStore::default(), false);
        Self {
            store,
            state,
            router,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: password_hash().to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_user(user.clone()).await;
        user
    }

    pub async fn product(&self, title: &str, price: Decimal) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            image: None,
            price,
            created_at: Utc::now(),
        };
        self.store.insert_product(product.clone()).await;
        product
    }

    pub async fn cart_for(&self, user: &User) -> Cart {
        self.store
            .create(Some(user.id))
            .await
            .expect("create cart")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, path: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    /// Log in through the login form and return the session cookie.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post_form(
                "/usuarios/login",
                &format!("username={username}&password={PASSWORD}"),
                None,
            )
            .await;
        assert_eq!(response.status(), 302, "login should redirect");
        session_cookie(&response).expect("login sets a session cookie")
    }
}

/// Argon2 is slow in debug builds; hash the shared test password once.
pub fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash password"))
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
