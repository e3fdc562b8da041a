//! Integration tests for login, session status and logout.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database with the seeded accounts (see crate docs)
//! - The server running (cargo run -p atelier-server)

use atelier_integration_tests::{
    Account, client, forwarded_ip, json_body, login, login_from, unique, url,
};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running server and seeded accounts"]
async fn test_login_status_logout_cycle() {
    let account = Account::employer();
    let client = client();

    let resp = login(&client, &account.email, &account.password).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["role"], "employer");
    assert_eq!(body["redirect"], "/employer");

    let resp = client.get(url("/api/auth/status")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["email"], account.email.to_lowercase());

    let resp = client.post(url("/api/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(url("/api/auth/status")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await, json!({ "authenticated": false }));
}

#[tokio::test]
#[ignore = "Requires running server and seeded accounts"]
async fn test_wrong_password_is_unauthorized() {
    let account = Account::employer();
    let resp = login(&client(), &account.email, "definitely-not-it").await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_forged_cookie_is_cleared() {
    let resp = client()
        .get(url("/api/auth/status"))
        .header("cookie", "session=0011:2233")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let cleared = resp
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("session=;"));
    assert!(cleared);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_signup_then_duplicate() {
    let client = client();
    let email = format!("{}@atelier.test", unique("signup"));
    let form = json!({ "username": "Test Client", "email": email, "password": "client-pass-1" });

    let resp = client
        .post(url("/api/auth/signup"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(json_body(resp).await["user"]["role"], "client");

    let resp = client
        .post(url("/api/auth/signup"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = login(&client, &email, "client-pass-1").await;
    assert_eq!(json_body(resp).await["redirect"], "/client");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_login_is_rate_limited() {
    let client = client();
    let ip = forwarded_ip();

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let resp = login_from(&client, &ip, "nobody@atelier.test", "wrong-password").await;
        statuses.push(resp.status());
    }

    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS), "{statuses:?}");
}
