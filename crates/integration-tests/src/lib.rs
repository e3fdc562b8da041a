//! Integration tests for Atelier.
//!
//! The tests talk HTTP to a running server and are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! atelier migrate
//! atelier user create -e employer@atelier.test -n Employer -p 'employer-pass-1' -r employer
//! atelier user create -e admin@atelier.test -n Admin -p 'admin-pass-1' -r admin
//! cargo run -p atelier-server &
//! cargo test -p atelier-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `ATELIER_BASE_URL` - Server URL (default: `http://127.0.0.1:3000`)
//! - `ATELIER_TEST_EMPLOYER_EMAIL` / `ATELIER_TEST_EMPLOYER_PASSWORD`
//! - `ATELIER_TEST_ADMIN_EMAIL` / `ATELIER_TEST_ADMIN_PASSWORD`

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("ATELIER_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
}

/// Full URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// A client that keeps cookies between requests.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Credentials of a seeded account.
#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    pub password: String,
}

impl Account {
    fn from_env(prefix: &str, email: &str, password: &str) -> Self {
        Self {
            email: std::env::var(format!("{prefix}_EMAIL")).unwrap_or_else(|_| email.to_string()),
            password: std::env::var(format!("{prefix}_PASSWORD"))
                .unwrap_or_else(|_| password.to_string()),
        }
    }

    /// The employer account.
    #[must_use]
    pub fn employer() -> Self {
        Self::from_env(
            "ATELIER_TEST_EMPLOYER",
            "employer@atelier.test",
            "employer-pass-1",
        )
    }

    /// The admin account.
    #[must_use]
    pub fn admin() -> Self {
        Self::from_env("ATELIER_TEST_ADMIN", "admin@atelier.test", "admin-pass-1")
    }
}

/// A private address for the `x-forwarded-for` header.
///
/// Login is rate limited per client IP; giving each test its own address
/// keeps parallel tests out of each other's bucket.
#[must_use]
pub fn forwarded_ip() -> String {
    let [a, b, c, ..] = *uuid::Uuid::new_v4().as_bytes();
    format!("10.{a}.{b}.{c}")
}

/// POST `/api/auth/login` from `client_ip` and return the response.
///
/// # Panics
///
/// Panics if the request cannot be sent.
pub async fn login_from(client: &Client, client_ip: &str, email: &str, password: &str) -> Response {
    client
        .post(url("/api/auth/login"))
        .header("x-forwarded-for", client_ip)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
}

/// POST `/api/auth/login` from a fresh address and return the response.
pub async fn login(client: &Client, email: &str, password: &str) -> Response {
    login_from(client, &forwarded_ip(), email, password).await
}

/// A cookie-carrying client logged in as `account`.
///
/// # Panics
///
/// Panics if login does not succeed.
pub async fn logged_in(account: &Account) -> Client {
    let client = client();
    let resp = login(&client, &account.email, &account.password).await;
    assert_eq!(resp.status(), StatusCode::OK, "login as {}", account.email);
    client
}

/// Read a JSON body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("Response body is not JSON")
}

/// A value unique to this test run, for barcodes and emails.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}
