mod common;

use common::{TestApp, body_json, money};

#[tokio::test]
async fn product_list_is_paginated_by_title() {
    let app = TestApp::new();
    app.product("Mesa", money(1500)).await;
    app.product("Lampara", money(1000)).await;

    let response = app.get("/productos/?page=1&per_page=1", None).await;
    assert_eq!(response.status(), 200);

    let body = body_json(response).await;
    assert_eq!(body["data"][0]["title"], "Lampara");
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["meta"]["per_page"], 1);
}

#[tokio::test]
async fn page_past_the_end_is_empty_not_a_panic() {
    let app = TestApp::new();
    app.product("Mesa", money(1500)).await;

    let response = app
        .get(&format!("/productos/?page={}&per_page=100", i64::MAX), None)
        .await;
    assert_eq!(response.status(), 200);

    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["meta"]["total"], 1);
}
