mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{listing_body, TestApp};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = TestApp::new()?;
    let (status, body) = app.call(Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn health_reports_store_outage() -> Result<()> {
    let app = TestApp::new()?;
    app.store.set_available(false);

    let (status, body) = app.call(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn mutations_without_credentials_are_401() -> Result<()> {
    let app = TestApp::new()?;

    let cases = [
        (Method::POST, "/api/listings", Some(listing_body())),
        (Method::PATCH, "/api/listings/1", Some(json!({ "price": 10 }))),
        (Method::DELETE, "/api/listings/1", None),
        (Method::PUT, "/api/listings/1/sold", Some(json!({ "sold": true }))),
        (Method::POST, "/api/admin/verify", None),
        (Method::GET, "/api/admin/dashboard", None),
    ];

    for (method, uri, body) in cases {
        let (status, response) = app.call(method.clone(), uri, None, body).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(response["error"]["code"], "UNAUTHENTICATED");
    }
    assert!(app.store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() -> Result<()> {
    let app = TestApp::new()?;
    let foreign = marketplace_api::identity::issue_token(
        "someone-elses-secret",
        &app.owner,
        None,
        chrono::Duration::hours(1),
    )?;
    let expired = marketplace_api::identity::issue_token(
        common::SECRET,
        &app.owner,
        None,
        chrono::Duration::hours(-2),
    )?;

    let mut bodies = Vec::new();
    for value in [
        format!("Bearer {foreign}"),
        format!("Bearer {expired}"),
        "Bearer not-a-jwt".to_string(),
        "Basic dXNlcjpwYXNz".to_string(),
    ] {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/listings")
            .header(header::AUTHORIZATION, value)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(listing_body().to_string()))?;
        let (status, body) = app.send(request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(body);
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    Ok(())
}

#[tokio::test]
async fn malformed_body_from_anonymous_caller_is_still_401() -> Result<()> {
    let app = TestApp::new()?;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/listings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;

    let (status, _) = app.send(request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_check_reports_weakness() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/password/check",
            None,
            Some(json!({ "email": "new@used.com", "password": "Str0ng!Pass" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);

    let (status, body) = app
        .call(Method::POST, "/api/auth/password/check", None, Some(json!({ "password": "short" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "WEAK_PASSWORD");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/password/check",
            None,
            Some(json!({ "email": "not-an-email", "password": "Str0ng!Pass" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_EMAIL");
    Ok(())
}
