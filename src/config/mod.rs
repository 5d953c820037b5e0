use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub query: QueryConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Listing contract shared by every resource endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub page_size: u64,
    pub max_order_depth: usize,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_name: String,
}

/// Settings consumed by the table/form client and the `inventory` CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub debounce_ms: u64,
    pub selection_store: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Query overrides
        if let Ok(v) = env::var("QUERY_PAGE_SIZE") {
            // A zero page size would make every page count undefined
            self.query.page_size = v.parse().ok().filter(|n| *n > 0).unwrap_or(self.query.page_size);
        }
        if let Ok(v) = env::var("QUERY_MAX_ORDER_DEPTH") {
            self.query.max_order_depth = v.parse().ok().filter(|n| *n > 0).unwrap_or(self.query.max_order_depth);
        }
        if let Ok(v) = env::var("QUERY_DEBUG_LOGGING") {
            self.query.debug_logging = v.parse().unwrap_or(self.query.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_NAME") {
            self.security.cookie_name = v;
        }

        // Client overrides
        if let Ok(v) = env::var("INVENTORY_API_URL") {
            self.client.api_url = v;
        }
        if let Ok(v) = env::var("INVENTORY_API_TOKEN") {
            self.client.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Ok(v) = env::var("CLIENT_DEBOUNCE_MS") {
            self.client.debounce_ms = v.parse().unwrap_or(self.client.debounce_ms);
        }
        if let Ok(v) = env::var("CLIENT_SELECTION_STORE") {
            self.client.selection_store = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            query: QueryConfig {
                page_size: 10,
                max_order_depth: 4,
                debug_logging: true,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: "inventory-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cookie_name: "inventorymanager-auth".to_string(),
            },
            client: ClientConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            query: QueryConfig {
                page_size: 10,
                max_order_depth: 4,
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cookie_name: "inventorymanager-auth".to_string(),
            },
            client: ClientConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            query: QueryConfig {
                page_size: 10,
                max_order_depth: 4,
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            security: SecurityConfig {
                enable_cors: false,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cookie_name: "inventorymanager-auth".to_string(),
            },
            client: ClientConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000".to_string(),
            api_token: None,
            debounce_ms: 1000,
            selection_store: ".inventory-selections.json".to_string(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.query.page_size, 10);
        assert_eq!(config.query.max_order_depth, 4);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.client.debounce_ms, 1000);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.query.page_size, 10);
        assert!(!config.query.debug_logging);
        // Production refuses to sign tokens until a secret is provided
        assert!(config.security.jwt_secret.is_empty());
    }
}
