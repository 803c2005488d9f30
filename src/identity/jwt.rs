use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::listing::model::Actor;
use crate::listing::ports::{IdentityError, IdentityProvider};

/// Claims issued by the identity provider (Supabase-style access token).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(actor: &Actor, audience: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: actor.id.to_string(),
            email: Some(actor.email.clone()),
            aud: audience,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Verifies HS256 access tokens signed with the provider's shared secret.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
    configured: bool,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            configured: !secret.is_empty(),
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(&security.jwt_secret, security.jwt_audience.as_deref())
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_credential(&self, token: &str) -> Result<Actor, IdentityError> {
        if !self.configured {
            return Err(IdentityError::Misconfigured("JWT secret not configured"));
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::Rejected(e.to_string()))?;

        let claims = token_data.claims;
        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| IdentityError::MalformedClaims(format!("subject '{}' is not a uuid", claims.sub)))?;

        Ok(Actor {
            id,
            email: claims.email.unwrap_or_default(),
        })
    }
}

/// Sign a token for `actor`. Used by tests and local development tooling;
/// production tokens come from the identity provider.
pub fn issue_token(secret: &str, actor: &Actor, audience: Option<String>, ttl: Duration) -> Result<String, IdentityError> {
    if secret.is_empty() {
        return Err(IdentityError::Misconfigured("JWT secret not configured"));
    }

    let claims = Claims::new(actor, audience, ttl);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| IdentityError::Rejected(e.to_string()))
}
