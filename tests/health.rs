mod common;

use axum_checkout_api::routes::health::health_check;
use common::{TestApp, body_json};

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn unknown_path_is_json_not_found() {
    let app = TestApp::new();
    let response = app.get("/no-such-page", None).await;
    assert_eq!(response.status(), 404);

    let body = body_json(response).await;
    assert_eq!(body["data"]["path"], "/no-such-page");
}
