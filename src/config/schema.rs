//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatch server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application name, also used as the session cookie name.
    pub name: String,

    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Keyed JSON store settings.
    pub store: StoreConfig,

    /// Template directory settings.
    pub templates: TemplateConfig,

    /// Static file serving.
    pub static_files: StaticConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Declared routes, matched in declaration order.
    pub routes: Vec<RouteDecl>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "wsroute".to_string(),
            listener: ListenerConfig::default(),
            session: SessionConfig::default(),
            store: StoreConfig::default(),
            templates: TemplateConfig::default(),
            static_files: StaticConfig::default(),
            observability: ObservabilityConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,

    /// Timeout for plain HTTP requests (login, static files) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
            request_timeout_secs: 30,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Secret used to sign session cookies.
    pub secret: String,

    /// Optional `Domain` attribute for the cookie.
    pub cookie_domain: Option<String>,

    /// Cookie lifetime in seconds.
    pub max_age_secs: u64,

    /// Set the `Secure` attribute.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            // WARNING: This is a placeholder! Change this in production.
            secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            cookie_domain: None,
            max_age_secs: 60 * 60 * 24,
            secure: false,
        }
    }
}

/// Which store implementation backs the data loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map, lost on restart.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database path for the sqlite backend.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: "wsroute.db".to_string(),
        }
    }
}

/// Template configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory holding the view templates. The file stem is the template name.
    pub dir: String,

    /// Template rendered for plain page loads.
    pub base_template: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: "./static/views".to_string(),
            base_template: "base".to_string(),
        }
    }
}

/// Static file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    pub enabled: bool,
    pub dir: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "./static".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A declared route: a regular expression plus three privilege tiers.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RouteDecl {
    /// Regular expression matched against the request path.
    #[serde(alias = "route")]
    pub pattern: String,

    /// Used when no more specific tier applies.
    pub general: RouteConfig,

    /// Used for callers holding the "admin" privilege.
    pub admin: RouteConfig,

    /// Used for callers whose privilege is listed in `authorized.privilege`.
    pub authorized: RouteConfig,
}

/// One tier of a route.
///
/// `table` and `key` may be literals or `$n` placeholders referring to
/// capture group `n` of the route pattern.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RouteConfig {
    pub table: String,
    pub key: String,
    pub template: String,

    /// Comma-separated controller names sent back with the reply.
    pub controllers: String,

    /// Comma-separated privilege whitelist, only read on the authorized tier.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub privilege: String,
}

impl RouteConfig {
    /// True when the tier declares nothing to render.
    pub fn is_empty(&self) -> bool {
        self.template.is_empty() && self.controllers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.name, "wsroute");
        assert_eq!(config.session.max_age_secs, 86_400);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_route_tables() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            backend = "sqlite"
            path = "/tmp/x.db"

            [[routes]]
            pattern = "^/widget/(.+)$"
            general = { table = "widgets", key = "$1", template = "widget" }

            [[routes]]
            route = "^/admin/users$"
            [routes.admin]
            table = "auth"
            template = "users"
            controllers = "users,table"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].general.key, "$1");
        assert!(config.routes[0].admin.is_empty());
        assert_eq!(config.routes[1].pattern, "^/admin/users$");
        assert_eq!(config.routes[1].admin.controllers, "users,table");
        assert!(config.routes[1].general.is_empty());
    }
}
