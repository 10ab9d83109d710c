//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RH_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `RH_BASE_URL` - Public URL of the API (decides secure cookies)
//! - `RH_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `RH_OBJECT_STORAGE_URL` - Base URL of the object storage bucket
//! - `RH_OBJECT_STORAGE_SIGNING_KEY` - HMAC key used to sign upload URLs
//!
//! ## Optional
//! - `RH_HOST` - Bind address (default: 127.0.0.1)
//! - `RH_PORT` - Listen port (default: 5000)
//! - `RH_ENVIRONMENT` - Deployment environment (default: development)
//! - `RH_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `RH_UPLOAD_URL_TTL_SECS` - Lifetime of signed upload URLs (default: 900)
//! - `RH_PERMISSION_CACHE_TTL_SECS` - Permission dataset cache TTL (default: 30)
//! - `RH_SEED_PERMISSIONS_ON_START` - Write missing system permissions at startup (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `RH_TLS_CERT` - PEM-encoded certificate chain
//! - `RH_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_UPLOAD_URL_TTL_SECS: u64 = 900;
const DEFAULT_PERMISSION_CACHE_TTL_SECS: u64 = 30;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Name reported by the health endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Whether this is the production environment.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the API
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Deployment environment
    pub environment: Environment,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Object storage configuration for uploads
    pub object_storage: ObjectStorageConfig,
    /// TTL of the cached permission dataset
    pub permission_cache_ttl: Duration,
    /// Write missing system permission rows at startup
    pub seed_permissions_on_start: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Object storage configuration for direct-to-bucket uploads.
///
/// Implements `Debug` manually to redact the signing key.
#[derive(Clone)]
pub struct ObjectStorageConfig {
    /// Bucket base URL (e.g. `https://storage.example.net/rich-habits`)
    pub base_url: Url,
    /// HMAC key for signing upload and download URLs
    pub signing_key: SecretString,
    /// Lifetime of a signed URL
    pub url_ttl: Duration,
}

impl std::fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStorageConfig")
            .field("base_url", &self.base_url.as_str())
            .field("signing_key", &"[REDACTED]")
            .field("url_ttl", &self.url_ttl)
            .finish()
    }
}

impl ObjectStorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("RH_OBJECT_STORAGE_URL")?;
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("RH_OBJECT_STORAGE_URL".to_string(), e.to_string())
        })?;
        let ttl_secs = get_env_or_default(
            "RH_UPLOAD_URL_TTL_SECS",
            &DEFAULT_UPLOAD_URL_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("RH_UPLOAD_URL_TTL_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            signing_key: get_validated_secret("RH_OBJECT_STORAGE_SIGNING_KEY")?,
            url_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("RH_TLS_CERT");
        let key_pem = get_optional_env("RH_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "RH_TLS_*".to_string(),
                "Both RH_TLS_CERT and RH_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RH_DATABASE_URL")?;
        let host = get_env_or_default("RH_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RH_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RH_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RH_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("RH_BASE_URL")?;
        let session_secret = get_validated_secret("RH_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "RH_SESSION_SECRET")?;
        let environment = get_env_or_default("RH_ENVIRONMENT", "development")
            .parse::<Environment>()
            .map_err(|e| ConfigError::InvalidEnvVar("RH_ENVIRONMENT".to_string(), e))?;
        let json_logs = get_optional_env("RH_LOG_FORMAT").is_some_and(|v| v == "json");

        let object_storage = ObjectStorageConfig::from_env()?;
        let cache_ttl_secs = get_env_or_default(
            "RH_PERMISSION_CACHE_TTL_SECS",
            &DEFAULT_PERMISSION_CACHE_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("RH_PERMISSION_CACHE_TTL_SECS".to_string(), e.to_string())
        })?;
        let seed_permissions_on_start = parse_bool(
            "RH_SEED_PERMISSIONS_ON_START",
            &get_env_or_default("RH_SEED_PERMISSIONS_ON_START", "true"),
        )?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            environment,
            json_logs,
            object_storage,
            permission_cache_ttl: Duration::from_secs(cache_ttl_secs),
            seed_permissions_on_start,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn uses_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`).
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A complete configuration for unit tests that never touches the environment.
    pub(crate) fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/rich_habits_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            base_url: "http://localhost:5000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            environment: Environment::Development,
            json_logs: false,
            object_storage: ObjectStorageConfig {
                base_url: Url::parse("https://storage.test/rich-habits").unwrap(),
                signing_key: SecretString::from("k9$Lq2!vR7@pW4#zX8&mN3*bT6^cY1%"),
                url_ttl: Duration::from_secs(900),
            },
            permission_cache_ttl: Duration::from_secs(30),
            seed_permissions_on_start: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-signing-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "TRUE").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(
            "prod".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!(Environment::Production.is_production());
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let mut config = test_config();
        assert_eq!(config.socket_addr().port(), 5000);
        assert!(!config.uses_https());
        config.base_url = "https://ops.richhabits.com".to_string();
        assert!(config.uses_https());
    }

    #[test]
    fn test_object_storage_debug_redacts_key() {
        let config = test_config();
        let debug_output = format!("{:?}", config.object_storage);
        assert!(debug_output.contains("storage.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("k9$Lq2"));
    }
}
