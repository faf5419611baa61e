//! Checkout and receipt delivery over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use bookshop_integration_tests::TestApp;
use serde_json::json;

/// Anna holds 2 x 10.00 and 1 x 15.00.
async fn filled_cart() -> (TestApp, i64, String) {
    let app = TestApp::new();
    let (_, admin) = app.sign_up("boss", Some("admin")).await;
    let (anna_id, anna) = app.sign_up("anna", None).await;
    let dziady = app.add_product(&admin, "Dziady", "10.00").await;
    let lalka = app.add_product(&admin, "Lalka", "15.00").await;

    for (product, quantity) in [(dziady, 2), (lalka, 1)] {
        let added = app
            .cart_change(Method::POST, "/cart/add", &anna, anna_id, product, quantity)
            .await;
        assert_eq!(added.status, StatusCode::OK);
    }

    (app, anna_id, anna)
}

#[tokio::test]
async fn test_checkout_emails_receipt_and_clears_cart() {
    let (app, anna_id, anna) = filled_cart().await;

    let response = app.post("/orders/checkout", Some(&anna), json!({})).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body, "Order confirmed and receipt sent.");

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "anna@example.com");
    assert_eq!(sent[0].subject, "Your Receipt from BookShop");
    assert!(sent[0].body.contains("Dziady"));
    assert!(sent[0].body.contains("Total: 35.00 PLN"));

    let cart = app.get(&format!("/cart/customer/{anna_id}"), Some(&anna)).await;
    assert_eq!(cart.status, StatusCode::OK);
    assert!(cart.json()["items"].as_array().unwrap().is_empty());
    assert_eq!(cart.json()["total"], "0.00");
}

#[tokio::test]
async fn test_second_checkout_is_rejected() {
    let (app, _, anna) = filled_cart().await;

    app.post("/orders/checkout", Some(&anna), json!({})).await;
    let again = app.post("/orders/checkout", Some(&anna), json!({})).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_checkout_without_cart_is_rejected() {
    let app = TestApp::new();
    let (_, anna) = app.sign_up("anna", None).await;

    let response = app.post("/orders/checkout", Some(&anna), json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_failed_delivery_keeps_cart() {
    let (app, anna_id, anna) = filled_cart().await;
    app.notifier.set_failing(true);

    let response = app.post("/orders/checkout", Some(&anna), json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let cart = app
        .get(&format!("/cart/customer/{anna_id}"), Some(&anna))
        .await
        .json();
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["total"], "35.00");

    app.notifier.set_failing(false);
    let retry = app.post("/orders/checkout", Some(&anna), json!({})).await;
    assert_eq!(retry.status, StatusCode::OK);
}
