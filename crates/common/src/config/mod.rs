//! Configuration management for Synthese
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/<env>.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Outgoing mail configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Account created at startup when missing
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum concurrent requests
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (postgres:// or sqlite://)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Create missing tables from the entity definitions on startup
    #[serde(default = "default_enabled")]
    pub create_schema: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Secret used to sign session and password reset tokens
    pub secret_key: Option<String>,

    /// Lifetime of a password reset token
    #[serde(default = "default_reset_token_ttl")]
    pub reset_token_ttl_secs: u64,

    /// Lifetime of a login that did not ask to be remembered
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Lifetime of a "remember me" login
    #[serde(default = "default_remember_ttl")]
    pub remember_ttl_secs: u64,

    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Mark cookies `Secure` (HTTPS deployments)
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Transport: "smtp" or "log"
    #[serde(default = "default_mail_transport")]
    pub transport: String,

    /// SMTP relay host
    pub smtp_host: Option<String>,

    /// SMTP port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Use TLS with the relay
    #[serde(default = "default_enabled")]
    pub smtp_tls: bool,

    pub smtp_username: Option<String>,

    pub smtp_password: Option<String>,

    /// Sender address
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Public base URL used to build links in emails
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name attached to every request span
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_concurrent() -> usize { 100 }
fn default_database_url() -> String { "sqlite://synthese.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_reset_token_ttl() -> u64 { 600 }
fn default_session_ttl() -> u64 { 12 * 3600 }
fn default_remember_ttl() -> u64 { 365 * 24 * 3600 }
fn default_cookie_name() -> String { "session".to_string() }
fn default_mail_transport() -> String { "log".to_string() }
fn default_smtp_port() -> u16 { 587 }
fn default_sender() -> String { "no-reply@localhost".to_string() }
fn default_base_url() -> String { "http://localhost:8080".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_metrics_port() -> u16 { 0 }
fn default_service_name() -> String { "synthese".to_string() }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            create_schema: default_enabled(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            reset_token_ttl_secs: default_reset_token_ttl(),
            session_ttl_secs: default_session_ttl(),
            remember_ttl_secs: default_remember_ttl(),
            cookie_name: default_cookie_name(),
            secure_cookies: false,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: default_mail_transport(),
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_tls: default_enabled(),
            smtp_username: None,
            smtp_password: None,
            sender: default_sender(),
            base_url: default_base_url(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// The signing secret; startup refuses to continue without one
    pub fn secret_key(&self) -> Result<&str, ConfigError> {
        match self.auth.secret_key.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(ConfigError::Message(
                "auth.secret_key must be set (APP__AUTH__SECRET_KEY)".to_string(),
            )),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            mail: MailConfig::default(),
            observability: ObservabilityConfig::default(),
            bootstrap: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.reset_token_ttl_secs, 600);
        assert_eq!(config.auth.cookie_name, "session");
        assert!(config.bootstrap.is_none());
    }

    #[test]
    fn test_secret_key_required() {
        let mut config = AppConfig::default();
        assert!(config.secret_key().is_err());

        config.auth.secret_key = Some(String::new());
        assert!(config.secret_key().is_err());

        config.auth.secret_key = Some("s3cret".to_string());
        assert_eq!(config.secret_key().unwrap(), "s3cret");
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("auth.secret_key", "abc")
            .unwrap()
            .set_override("server.port", 9000)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.secret_key.as_deref(), Some("abc"));
        assert_eq!(config.auth.remember_ttl_secs, 365 * 24 * 3600);
        assert_eq!(config.mail.transport, "log");
    }
}
