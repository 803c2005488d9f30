use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
    pub catalog: Catalog,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Only development responses may carry internal error detail.
    pub fn exposes_diagnostics(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When absent the server falls back to the in-memory listing store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Public origin of the object storage, e.g. https://project.supabase.co
    pub url: String,
    pub bucket: String,
    /// Service key for uploads and deletes. Absent means in-memory storage.
    #[serde(skip_serializing)]
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_audience: Option<String>,
    /// Lower-cased at load time, never mutated afterwards.
    #[serde(skip_serializing)]
    pub admin_emails: HashSet<String>,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Enumerated value sets accepted for listing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub categories: Vec<String>,
    pub conditions: Vec<String>,
    pub payment_methods: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            categories: owned(&[
                "eletronicos",
                "eletrodomesticos",
                "moveis",
                "veiculos",
                "esportes",
                "moda",
                "livros",
                "games",
                "infantil",
                "instrumentos",
                "ferramentas",
                "decoracao",
                "outros",
            ]),
            conditions: owned(&["novo", "seminovo", "usado"]),
            payment_methods: owned(&[
                "pix",
                "dinheiro",
                "cartao_credito",
                "cartao_debito",
                "transferencia",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_secs: u64,
    pub public_requests: u32,
    pub authenticated_requests: u32,
    pub upload_requests: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("MARKETPLACE_API_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("MARKETPLACE_API_HOST") {
            self.server.host = v;
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = lookup("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Storage overrides
        if let Some(v) = lookup("STORAGE_URL") {
            self.storage.url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("STORAGE_BUCKET") {
            self.storage.bucket = v;
        }
        if let Some(v) = lookup("STORAGE_SERVICE_KEY") {
            self.storage.service_key = non_empty(v);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_AUDIENCE") {
            self.security.jwt_audience = non_empty(v);
        }
        if let Some(v) = lookup("ADMIN_EMAILS") {
            self.security.admin_emails = parse_list(&v).into_iter().map(|e| e.to_lowercase()).collect();
        }
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = parse_list(&v);
        }

        // Catalog overrides
        if let Some(v) = lookup("CATALOG_CATEGORIES") {
            self.catalog.categories = parse_list(&v);
        }
        if let Some(v) = lookup("CATALOG_CONDITIONS") {
            self.catalog.conditions = parse_list(&v);
        }
        if let Some(v) = lookup("CATALOG_PAYMENT_METHODS") {
            self.catalog.payment_methods = parse_list(&v);
        }

        // Rate limit overrides
        if let Some(v) = lookup("RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = v.parse().unwrap_or(self.rate_limit.enabled);
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = v.parse().unwrap_or(self.rate_limit.window_secs);
        }
        if let Some(v) = lookup("RATE_LIMIT_PUBLIC_REQUESTS") {
            self.rate_limit.public_requests = v.parse().unwrap_or(self.rate_limit.public_requests);
        }
        if let Some(v) = lookup("RATE_LIMIT_AUTHENTICATED_REQUESTS") {
            self.rate_limit.authenticated_requests =
                v.parse().unwrap_or(self.rate_limit.authenticated_requests);
        }
        if let Some(v) = lookup("RATE_LIMIT_UPLOAD_REQUESTS") {
            self.rate_limit.upload_requests = v.parse().unwrap_or(self.rate_limit.upload_requests);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            storage: StorageConfig {
                url: "http://localhost:54321".to_string(),
                bucket: "imagens".to_string(),
                service_key: None,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_audience: None,
                admin_emails: HashSet::new(),
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            catalog: Catalog::default(),
            rate_limit: RateLimitConfig {
                enabled: false,
                window_secs: 60,
                public_requests: 100,
                authenticated_requests: 30,
                upload_requests: 10,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
                admin_emails: HashSet::new(),
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                ..Self::development().rate_limit
            },
            ..Self::development()
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: Some("authenticated".to_string()),
                admin_emails: HashSet::new(),
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                ..Self::development().rate_limit
            },
            ..Self::development()
        }
    }
}

/// Split a comma separated value, dropping blanks.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.environment.exposes_diagnostics());
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.catalog.conditions, vec!["novo", "seminovo", "usado"]);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.environment.exposes_diagnostics());
        assert!(config.rate_limit.enabled);
        assert!(config.security.jwt_secret.is_empty());
    }

    #[test]
    fn admin_emails_are_lowercased_at_load() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "ADMIN_EMAILS",
            " Admin@Used.com, ,moderator@used.com",
        )]));
        assert!(config.security.admin_emails.contains("admin@used.com"));
        assert!(config.security.admin_emails.contains("moderator@used.com"));
        assert_eq!(config.security.admin_emails.len(), 2);
    }

    #[test]
    fn environment_and_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "prod"),
            ("PORT", "8080"),
            ("STORAGE_URL", "https://abc.supabase.co/"),
            ("DATABASE_URL", "  "),
            ("CATALOG_CONDITIONS", "new,like-new,used"),
        ]));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.url, "https://abc.supabase.co");
        assert!(config.database.url.is_none());
        assert_eq!(config.catalog.conditions, vec!["new", "like-new", "used"]);
    }

    #[test]
    fn marketplace_port_wins_over_port() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MARKETPLACE_API_PORT", "4000"),
            ("PORT", "8080"),
        ]));
        assert_eq!(config.server.port, 4000);
    }
}
