pub mod jwt;

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::{header, HeaderMap};

use crate::listing::error::ListingError;
use crate::listing::model::Actor;
use crate::listing::ports::IdentityProvider;

pub use jwt::{issue_token, Claims, JwtIdentityProvider};

/// Administrator allow-list. Built once from configuration, read-only after.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    emails: HashSet<String>,
}

impl AdminList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Case-insensitive membership check.
    pub fn is_admin(&self, email: &str) -> bool {
        let email = email.trim();
        !email.is_empty() && self.emails.contains(&email.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Resolves bearer credentials into actors and answers admin lookups.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    admins: AdminList,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, admins: AdminList) -> Self {
        Self { provider, admins }
    }

    /// `authorization` is the raw `Authorization` header value. Every failure
    /// (missing, malformed, expired, revoked) collapses into `Unauthenticated`.
    pub async fn resolve_actor(&self, authorization: Option<&str>) -> Result<Actor, ListingError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(ListingError::Unauthenticated)?;

        match self.provider.verify_credential(token).await {
            Ok(actor) => Ok(actor),
            Err(e) => {
                tracing::debug!("Credential verification failed: {}", e);
                Err(ListingError::Unauthenticated)
            }
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.is_admin(email)
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Raw `Authorization` header, if present and valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ports::IdentityError;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct FixedProvider(Actor);

    #[async_trait]
    impl IdentityProvider for FixedProvider {
        async fn verify_credential(&self, token: &str) -> Result<Actor, IdentityError> {
            if token == "good" {
                Ok(self.0.clone())
            } else {
                Err(IdentityError::Rejected("bad token".to_string()))
            }
        }
    }

    fn resolver() -> (IdentityResolver, Actor) {
        let actor = Actor { id: Uuid::new_v4(), email: "Admin@Used.com".to_string() };
        let resolver = IdentityResolver::new(
            Arc::new(FixedProvider(actor.clone())),
            AdminList::new(["admin@used.com"]),
        );
        (resolver, actor)
    }

    #[test]
    fn admin_lookup_is_case_insensitive() {
        let admins = AdminList::new([" ADMIN@used.com ", ""]);
        assert_eq!(admins.len(), 1);
        assert!(admins.is_admin("admin@USED.com"));
        assert!(!admins.is_admin("other@used.com"));
        assert!(!admins.is_admin(""));
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[tokio::test]
    async fn all_credential_failures_are_uniform() {
        let (resolver, actor) = resolver();
        assert_eq!(resolver.resolve_actor(Some("Bearer good")).await.unwrap(), actor);

        for header in [None, Some(""), Some("Bearer "), Some("Token good"), Some("Bearer bad")] {
            assert_eq!(resolver.resolve_actor(header).await, Err(ListingError::Unauthenticated));
        }
    }

    #[tokio::test]
    async fn resolved_email_checks_against_admin_list() {
        let (resolver, _) = resolver();
        let actor = resolver.resolve_actor(Some("Bearer good")).await.unwrap();
        assert!(resolver.is_admin(&actor.email));
    }
}
