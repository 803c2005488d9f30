mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{image_url, listing_body, TestApp};

fn with(field: &str, value: Value) -> Value {
    let mut body = listing_body();
    body[field] = value;
    body
}

#[tokio::test]
async fn create_persists_sanitized_listing_owned_by_caller() -> Result<()> {
    let app = TestApp::new()?;
    let mut body = with("name", json!("  <b>Bicicleta</b> Aro 26 "));
    body["ownerId"] = json!(Uuid::new_v4());
    body["sold"] = json!(true);

    let (status, response) = app.call(Method::POST, "/api/listings", Some(&app.owner), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["success"], true);

    let data = &response["data"];
    assert_eq!(data["name"], "bbicicleta/b aro 26");
    assert_eq!(data["ownerId"], app.owner.id.to_string());
    assert_eq!(data["contactPhone"], "11987654321");
    assert_eq!(data["price"].as_f64(), Some(350.0));
    assert_eq!(data["sold"], false);
    assert_eq!(data["soldAt"], Value::Null);
    assert_eq!(app.store.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn rejected_creates_write_nothing() -> Result<()> {
    let app = TestApp::new()?;

    let cases = [
        (with("images", json!([image_url(1), image_url(2)])), "TOO_FEW_IMAGES"),
        (
            with("images", json!((1..=7).map(image_url).collect::<Vec<_>>())),
            "TOO_MANY_IMAGES",
        ),
        (
            with("images", json!([image_url(1), image_url(2), "https://evil.example.com/x.jpg"])),
            "UNTRUSTED_IMAGE_SOURCE",
        ),
        (with("paymentMethods", json!([])), "EMPTY_SELECTION"),
        (with("category", json!("armas")), "INVALID_ENUM"),
        (with("name", json!("<a>")), "NAME_TOO_SHORT"),
        (with("description", json!("curta")), "DESCRIPTION_TOO_SHORT"),
        (with("price", json!(1_000_001)), "INVALID_PRICE"),
        (with("price", json!("abc")), "INVALID_PRICE"),
        (with("contactPhone", json!("1234")), "INVALID_PHONE"),
        (with("name", json!("")), "MISSING_FIELDS"),
    ];

    for (body, code) in cases {
        let (status, response) = app.call(Method::POST, "/api/listings", Some(&app.owner), Some(body)).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(response["success"], false);
        assert_eq!(response["error"]["code"], code);
    }

    assert!(app.store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn invalid_phone_message_is_stable() -> Result<()> {
    let app = TestApp::new()?;
    let (_, response) = app
        .call(Method::POST, "/api/listings", Some(&app.owner), Some(with("contactPhone", json!("99"))))
        .await?;

    assert_eq!(response["error"]["message"], "must have 11 digits");
    assert_eq!(response["error"]["field"], "contactPhone");
    Ok(())
}

#[tokio::test]
async fn store_failure_hides_detail_outside_development() -> Result<()> {
    let mut config = common::test_config();
    config.environment = marketplace_api::config::Environment::Production;
    let app = TestApp::with_config(config)?;
    app.store.set_available(false);

    let (status, response) = app.call(Method::POST, "/api/listings", Some(&app.owner), Some(listing_body())).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["error"]["code"], "PERSISTENCE_FAILURE");
    assert!(response["error"].get("detail").is_none());
    Ok(())
}

#[tokio::test]
async fn store_failure_shows_detail_in_development() -> Result<()> {
    let app = TestApp::new()?;
    app.store.set_available(false);

    let (status, response) = app.call(Method::POST, "/api/listings", Some(&app.owner), Some(listing_body())).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response["error"]["detail"].is_string());
    Ok(())
}

#[tokio::test]
async fn listings_are_publicly_readable_and_filterable() -> Result<()> {
    let app = TestApp::new()?;
    let first = app.create_listing(&app.owner).await?;

    let mut body = with("category", json!("moveis"));
    body["name"] = json!("Mesa de Jantar");
    let (status, _) = app.call(Method::POST, "/api/listings", Some(&app.other), Some(body)).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = app.call(Method::GET, "/api/listings", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"].as_array().map(Vec::len), Some(2));

    let (_, response) = app.call(Method::GET, "/api/listings?category=moveis", None, None).await?;
    assert_eq!(response["data"][0]["name"], "mesa de jantar");
    assert_eq!(response["data"].as_array().map(Vec::len), Some(1));

    let (_, response) = app.call(Method::GET, "/api/listings?q=BICICLETA", None, None).await?;
    assert_eq!(response["data"][0]["id"], first);

    let (status, response) = app.call(Method::GET, &format!("/api/listings/{first}"), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["data"]["id"], first);

    let (status, response) = app.call(Method::GET, "/api/listings/999", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"]["code"], "NOT_FOUND");

    let (status, _) = app.call(Method::GET, "/api/listings/abc", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
