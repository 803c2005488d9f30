#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_api::config::AppConfig;
use marketplace_api::database::MemoryListingStore;
use marketplace_api::identity::{issue_token, AdminList, IdentityResolver, JwtIdentityProvider};
use marketplace_api::listing::{Actor, ListingRules, ListingService};
use marketplace_api::middleware::RateLimiter;
use marketplace_api::storage::MemoryImageStore;
use marketplace_api::{router, AppState};

pub const SECRET: &str = "integration-secret";
pub const STORAGE: &str = "https://abc.supabase.co";
pub const ADMIN_EMAIL: &str = "admin@used.com";
pub const OWNER_ID: Uuid = Uuid::from_u128(0x0a);

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryListingStore>,
    pub images: Arc<MemoryImageStore>,
    pub owner: Actor,
    pub other: Actor,
    pub admin: Actor,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.storage.url = STORAGE.to_string();
    config.storage.service_key = None;
    config.security.jwt_secret = SECRET.to_string();
    config.security.jwt_audience = None;
    config.security.admin_emails = [ADMIN_EMAIL.to_string()].into_iter().collect();
    config.rate_limit.enabled = false;
    config
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Result<Self> {
        let store = Arc::new(MemoryListingStore::new());
        let images = Arc::new(MemoryImageStore::new(&config.storage.url, &config.storage.bucket));

        let identity = IdentityResolver::new(
            Arc::new(JwtIdentityProvider::from_config(&config.security)),
            AdminList::new(&config.security.admin_emails),
        );
        let rules = ListingRules::from_config(&config).context("storage url")?;
        let service = ListingService::new(identity, store.clone(), images.clone(), rules);

        let limiter = RateLimiter::in_memory(config.rate_limit.clone()).context("rate limits")?;
        let state = AppState::new(Arc::new(config), Arc::new(service));

        Ok(Self {
            router: router(state, limiter),
            store,
            images,
            owner: Actor { id: OWNER_ID, email: "owner@used.com".to_string() },
            other: actor("other@used.com"),
            admin: actor(ADMIN_EMAIL),
        })
    }

    pub fn token(&self, actor: &Actor) -> Result<String> {
        Ok(issue_token(SECRET, actor, None, chrono::Duration::hours(1))?)
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not json")?
        };
        Ok((status, body))
    }

    /// JSON request, optionally authenticated as `actor`.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        actor: Option<&Actor>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(actor) = actor {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(actor)?));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    /// Create a listing as `actor` and return its id.
    pub async fn create_listing(&self, actor: &Actor) -> Result<i64> {
        let (status, body) = self
            .call(Method::POST, "/api/listings", Some(actor), Some(listing_body()))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create failed: {status} {body}");
        body["data"]["id"].as_i64().context("created listing has no id")
    }
}

pub fn actor(email: &str) -> Actor {
    Actor { id: Uuid::new_v4(), email: email.to_string() }
}

/// Image previously uploaded by the owner.
pub fn image_url(n: usize) -> String {
    format!("{STORAGE}/storage/v1/object/public/imagens/produtos/{OWNER_ID}/{n}.jpg")
}

pub fn listing_body() -> Value {
    json!({
        "name": "Bicicleta Aro 26",
        "description": "Bicicleta em ótimo estado, revisada",
        "price": "350.00",
        "contactPhone": "(11) 98765-4321",
        "category": "esportes",
        "condition": "usado",
        "paymentMethods": ["pix", "dinheiro"],
        "images": [image_url(1), image_url(2), image_url(3)],
        "deliveryOffered": true
    })
}
