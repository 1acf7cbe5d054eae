mod common;

use axum_checkout_api::{
    models::Order,
    pricing::DEFAULT_SHIPPING_TOTAL,
    repository::{CartRepository, OrderRepository},
};
use common::{TestApp, body_json, location, money};

#[tokio::test]
async fn order_view_requires_login() {
    let app = TestApp::new();

    let response = app.get("/orden/", None).await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), Some("/usuarios/login?next=/orden/"));
}

#[tokio::test]
async fn login_redirects_back_to_next() {
    let app = TestApp::new();
    app.user("testuser").await;

    let response = app
        .post_form(
            "/usuarios/login?next=/orden/",
            "username=testuser&password=testpass",
            None,
        )
        .await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), Some("/orden/"));
}

#[tokio::test]
async fn login_ignores_offsite_next() {
    let app = TestApp::new();
    app.user("testuser").await;

    let response = app
        .post_form(
            "/usuarios/login",
            "username=testuser&password=testpass&next=//evil.example/",
            None,
        )
        .await;

    assert_eq!(location(&response), Some("/"));
}

#[tokio::test]
async fn login_ignores_backslash_next() {
    let app = TestApp::new();
    app.user("testuser").await;

    // `/\evil.example`, form-encoded.
    let response = app
        .post_form(
            "/usuarios/login",
            "username=testuser&password=testpass&next=%2F%5Cevil.example",
            None,
        )
        .await;

    assert_eq!(response.status(), 302);
    assert_eq!(location(&response), Some("/"));
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::new();
    app.user("testuser").await;

    let response = app
        .post_form("/usuarios/login", "username=testuser&password=nope", None)
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn order_view_creates_order_if_not_exists() {
    let app = TestApp::new();
    let user = app.user("testuser").await;
    let lampara = app.product("Lampara", money(1000)).await;
    let cart = app.cart_for(&user).await;
    app.store
        .add_or_increment(cart.cart_id, lampara.id, 2)
        .await
        .expect("add line");
    let cookie = app.login("testuser").await;

    let response = app.get("/orden/", Some(&cookie)).await;

    assert_eq!(response.status(), 200);
    let orders = app.store.orders_for_cart(cart.cart_id).await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].user_id, user.id);

    let body = body_json(response).await;
    assert_eq!(body["data"]["order"]["status"], "CREATED");
    // 20.00 + 5 % fee + 5.00 shipping
    assert_eq!(body["data"]["order"]["total"], "26.00");
}

#[tokio::test]
async fn order_view_does_not_create_duplicate_order() {
    let app = TestApp::new();
    let user = app.user("testuser").await;
    let cart = app.cart_for(&user).await;
    app.store
        .create_for_cart(Order::new(user.id, &cart, DEFAULT_SHIPPING_TOTAL))
        .await
        .expect("create order");
    let cookie = app.login("testuser").await;

    for _ in 0..2 {
        let response = app.get("/orden/", Some(&cookie)).await;
        assert_eq!(response.status(), 200);
    }

    assert_eq!(app.store.orders_for_cart(cart.cart_id).await.len(), 1);
}

#[tokio::test]
async fn repeated_checkout_reuses_the_order() {
    let app = TestApp::new();
    app.user("testuser").await;
    let mesa = app.product("Mesa", money(1500)).await;
    let cookie = app.login("testuser").await;

    let response = app
        .post_form("/carrito/agregar", &format!("product_id={}", mesa.id), Some(&cookie))
        .await;
    assert_eq!(response.status(), 200);

    let first = body_json(app.get("/orden/", Some(&cookie)).await).await;
    let second = body_json(app.get("/orden/", Some(&cookie)).await).await;

    let order_id = first["data"]["order"]["order_id"].clone();
    assert!(order_id.is_string());
    assert_eq!(second["data"]["order"]["order_id"], order_id);
}

#[tokio::test]
async fn order_view_returns_200_without_any_cart() {
    let app = TestApp::new();
    app.user("testuser").await;
    let cookie = app.login("testuser").await;

    let response = app.get("/orden/", Some(&cookie)).await;

    assert_eq!(
        response.status(),
        200,
        "order view should answer 200 for a logged-in user"
    );
}

#[tokio::test]
async fn order_view_does_not_create_order_if_cart_is_empty() {
    let app = TestApp::new();
    let user = app.user("testuser").await;
    let lampara = app.product("Lampara", money(1000)).await;
    let cart = app.cart_for(&user).await;
    app.store
        .add_or_increment(cart.cart_id, lampara.id, 1)
        .await
        .expect("add line");
    app.store.clear(cart.cart_id).await;
    let cookie = app.login("testuser").await;

    let response = app.get("/orden/", Some(&cookie)).await;

    assert_eq!(response.status(), 200);
    assert!(app.store.find_by_cart(cart.cart_id).await.expect("lookup").is_none());
    let body = body_json(response).await;
    assert!(body["data"]["order"].is_null());
}

#[tokio::test]
async fn guest_cart_follows_user_into_checkout() {
    let app = TestApp::new();
    app.user("testuser").await;
    let mesa = app.product("Mesa", money(1500)).await;

    let response = app
        .post_form("/carrito/agregar", &format!("product_id={}", mesa.id), None)
        .await;
    let guest_cookie = common::session_cookie(&response).expect("guest session");

    let response = app
        .post_form(
            "/usuarios/login",
            "username=testuser&password=testpass",
            Some(&guest_cookie),
        )
        .await;
    let cookie = common::session_cookie(&response).expect("cycled session");

    let body = body_json(app.get("/orden/", Some(&cookie)).await).await;
    assert_eq!(body["data"]["cart"]["items"][0]["product"]["title"], "Mesa");
    assert!(body["data"]["order"].is_object());
}

#[tokio::test]
async fn register_rejects_taken_username() {
    let app = TestApp::new();
    app.user("testuser").await;

    let response = app
        .post_form(
            "/usuarios/registro",
            "username=testuser&email=other%40example.com&password=secret",
            None,
        )
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new();
    app.user("testuser").await;
    let cookie = app.login("testuser").await;

    let response = app.get("/usuarios/logout", Some(&cookie)).await;
    assert_eq!(response.status(), 302);

    let response = app.get("/orden/", Some(&cookie)).await;
    assert_eq!(response.status(), 302);
}
