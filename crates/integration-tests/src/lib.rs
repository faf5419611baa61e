//! Integration tests for the BookShop API.
//!
//! The full router is driven in-process with `tower::ServiceExt::oneshot`
//! against the in-memory store, so no database or SMTP server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookshop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `identity` - Registration, login, roles, customer lookup
//! - `catalog` - Products and categories
//! - `cart` - Cart ownership and quantity rules
//! - `checkout` - Receipts and cart clearing

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use bookshop_api::config::{ApiConfig, CartLinePolicy, JwtConfig, StoreConfig};
use bookshop_api::db::MemoryStore;
use bookshop_api::routes;
use bookshop_api::services::email::{Notifier, NotifyError};
use bookshop_api::state::AppState;
use bookshop_core::Email;

pub const PASSWORD: &str = "password123";

/// An email captured by [`RecordingNotifier`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that keeps messages in memory and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected("mail relay unavailable".to_owned()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.as_str().to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}

/// A response with its body already collected.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// The application wired to an in-memory store.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(CartLinePolicy::Append)
    }

    pub fn with_policy(cart_line_policy: CartLinePolicy) -> Self {
        let config = ApiConfig {
            store: StoreConfig::Memory,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            jwt: JwtConfig {
                secret: SecretString::from("t7#Hq2@Lx9!vR4$mW8&zK1*pN6^bY3%c"),
                issuer: "bookshop".to_owned(),
                audience: "bookshop-clients".to_owned(),
                ttl: Duration::from_secs(3600),
            },
            cart_line_policy,
            currency: "PLN".to_owned(),
            email: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            json_logs: false,
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(config, Arc::new(MemoryStore::new()), notifier.clone());

        Self {
            router: routes::app(state),
            notifier,
        }
    }

    /// Send a request. `token` is the full `Bearer ...` value from login.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, token);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.request(Method::DELETE, uri, token, body).await
    }

    /// Register `username` (email `<username>@example.com`) and return the
    /// created customer's JSON.
    pub async fn register(&self, username: &str, role: Option<&str>) -> TestResponse {
        self.post(
            "/auth/register",
            None,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
                "role": role,
            }),
        )
        .await
    }

    /// Log in and return the `Bearer ...` token.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post(
                "/auth/login",
                None,
                json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body
    }

    /// Register and log in, returning `(customer_id, token)`.
    pub async fn sign_up(&self, username: &str, role: Option<&str>) -> (i64, String) {
        let registered = self.register(username, role).await;
        assert_eq!(registered.status, StatusCode::OK, "{}", registered.body);
        let id = registered.json()["id"].as_i64().unwrap();
        (id, self.login(username).await)
    }

    /// Create a category and a product as `admin`, returning the product id.
    pub async fn add_product(&self, admin: &str, title: &str, price: &str) -> i64 {
        let categories = self.get("/categories", None).await.json();
        let category_id = match categories.as_array().unwrap().first() {
            Some(existing) => existing["id"].as_i64().unwrap(),
            None => {
                let created = self
                    .post("/categories", Some(admin), json!({ "name": "Fantasy" }))
                    .await;
                assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
                created.json()["id"].as_i64().unwrap()
            }
        };

        let created = self
            .post(
                "/products",
                Some(admin),
                json!({
                    "title": title,
                    "author": "Anon",
                    "description": "",
                    "price": price,
                    "stock": 10,
                    "categoryId": category_id,
                }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
        created.json()["id"].as_i64().unwrap()
    }

    /// Call a cart mutation endpoint.
    pub async fn cart_change(
        &self,
        method: Method,
        path: &str,
        token: &str,
        customer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> TestResponse {
        self.request(
            method,
            path,
            Some(token),
            Some(json!({
                "customerId": customer_id,
                "productId": product_id,
                "quantity": quantity,
            })),
        )
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
