mod common;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["database"], "memory");
    Ok(())
}

#[tokio::test]
async fn register_returns_token_and_cookie() -> Result<()> {
    let app = TestApp::new();
    let body = json!({ "name": "John Doe", "email": "john@gmail.com", "password": PASSWORD, "role": "publisher" });
    let response = app.send(Method::POST, "/api/v1/auth/register", None, Some(body)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().unwrap();

    let (status, me) = app.get_as("/api/v1/auth/me", token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], "john@gmail.com");
    assert_eq!(me["data"]["role"], "publisher");
    assert!(me["data"].get("password").is_none());
    Ok(())
}

#[tokio::test]
async fn register_cannot_claim_admin() -> Result<()> {
    let app = TestApp::new();
    let body = json!({ "name": "Eve", "email": "eve@gmail.com", "password": PASSWORD, "role": "admin" });
    let (status, body) = app.call(Method::POST, "/api/v1/auth/register", None, Some(body)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn null_role_registers_as_user() -> Result<()> {
    let app = TestApp::new();
    let body = json!({ "name": "Nell", "email": "nell@gmail.com", "password": PASSWORD, "role": null });
    let (status, body) = app.call(Method::POST, "/api/v1/auth/register", None, Some(body)).await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (_, me) = app.get_as("/api/v1/auth/me", token).await?;
    assert_eq!(me["data"]["role"], "user");
    Ok(())
}

#[tokio::test]
async fn register_rejects_malformed_email() -> Result<()> {
    let app = TestApp::new();
    for email in ["a+b@gmail.com", "john@mail.travel", "john@gmail"] {
        let body = json!({ "name": "Jo", "email": email, "password": PASSWORD });
        let (status, body) = app.call(Method::POST, "/api/v1/auth/register", None, Some(body)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", email);
        assert_eq!(body["fields"]["email"], "Please add a valid email", "{}", email);
    }
    Ok(())
}

#[tokio::test]
async fn register_reports_missing_fields() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::POST, "/api/v1/auth/register", None, Some(json!({ "name": "Nobody" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"]["email"], "Please add an email");
    assert_eq!(body["fields"]["password"], "Please add a password");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let app = TestApp::new();
    let body = json!({ "name": "A", "email": "same@gmail.com", "password": PASSWORD });
    let (first, _) = app.call(Method::POST, "/api/v1/auth/register", None, Some(body.clone())).await?;
    let (second, err) = app.call(Method::POST, "/api/v1/auth/register", None, Some(body)).await?;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn login_checks_credentials() -> Result<()> {
    let app = TestApp::new();
    app.user("Mary", devcamper_api::models::Role::User).await?;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "mary@devcamper.io", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "mary@devcamper.io", "password": "wrong-password" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "Invalid credentials" }));

    let (status, _) = app
        .call(Method::POST, "/api/v1/auth/login", None, Some(json!({ "email": "nobody@devcamper.io", "password": PASSWORD })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_requires_email_and_password() -> Result<()> {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::POST, "/api/v1/auth/login", None, Some(json!({ "email": "a@b.io" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide an email and password");
    Ok(())
}

#[tokio::test]
async fn malformed_json_body_uses_error_envelope() -> Result<()> {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))?;
    let response = tower::ServiceExt::oneshot(devcamper_api::router(app.state.clone()), request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["success"], false);
    Ok(())
}
