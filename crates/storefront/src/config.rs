//! Storefront configuration loaded from environment variables.
//!
//! Every variable is optional. Without a database URL the storefront runs
//! on the seeded in-memory backend; without a payment key, payment intents
//! are refused.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `STOREFRONT_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` connection string
//! - `STRIPE_SECRET_KEY` - Payment provider secret key
//! - `STRIPE_API_BASE` - Payment provider endpoint (default: <https://api.stripe.com>)
//! - `PAYMENT_CURRENCY` - ISO currency code (default: usd)
//! - `PAYMENT_TIMEOUT_SECS` - Payment provider timeout (default: 10)
//! - `STOREFRONT_RATE_LIMIT_AUTH` - Rate limit login/register (default: true)
//! - `STOREFRONT_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `STOREFRONT_ADMIN_USERNAME`, `STOREFRONT_ADMIN_EMAIL`,
//!   `STOREFRONT_ADMIN_PASSWORD` - Bootstrap administrator (in-memory backend)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// `PostgreSQL` database connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// Payment provider configuration
    pub payments: PaymentConfig,
    /// Whether login and registration are rate limited per client IP
    pub rate_limit_auth: bool,
    /// Whether a reverse proxy sets `X-Forwarded-For`, so the rate limiter
    /// may key on it instead of the peer address
    pub trust_proxy_headers: bool,
    /// Log output format
    pub log_format: LogFormat,
    /// Administrator created at startup on the in-memory backend
    pub bootstrap_admin: Option<BootstrapAdmin>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Payment provider configuration.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Provider secret key; `None` disables payments
    pub secret_key: Option<SecretString>,
    /// Provider API base URL
    pub api_base: String,
    /// Lowercase ISO 4217 currency code
    pub currency: String,
    /// Upper bound on a single provider call
    pub timeout: Duration,
}

/// Credentials for the bootstrap administrator.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: DEFAULT_BASE_URL.to_owned(),
            database_url: None,
            payments: PaymentConfig::default(),
            rate_limit_auth: true,
            trust_proxy_headers: false,
            log_format: LogFormat::Pretty,
            bootstrap_admin: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: DEFAULT_PAYMENT_API_BASE.to_owned(),
            currency: "usd".to_owned(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is invalid or a secret fails
    /// validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_url_env("STOREFRONT_BASE_URL", DEFAULT_BASE_URL)?;
        let database_url = get_database_url("STOREFRONT_DATABASE_URL");
        let payments = PaymentConfig::from_env()?;
        let rate_limit_auth = parse_bool_env("STOREFRONT_RATE_LIMIT_AUTH", true)?;
        let trust_proxy_headers = parse_bool_env("STOREFRONT_TRUST_PROXY", false)?;
        let log_format = match get_env_or_default("STOREFRONT_LOG_FORMAT", "pretty").as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOREFRONT_LOG_FORMAT".to_owned(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };
        let bootstrap_admin = BootstrapAdmin::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            database_url,
            payments,
            rate_limit_auth,
            trust_proxy_headers,
            log_format,
            bootstrap_admin,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = get_optional_env("STRIPE_SECRET_KEY")
            .map(|key| {
                validate_secret_strength(&key, "STRIPE_SECRET_KEY")?;
                Ok::<_, ConfigError>(SecretString::from(key))
            })
            .transpose()?;

        let currency = get_env_or_default("PAYMENT_CURRENCY", "usd").to_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar(
                "PAYMENT_CURRENCY".to_owned(),
                format!("'{currency}' is not a three-letter currency code"),
            ));
        }

        let timeout_secs: u64 = parse_env("PAYMENT_TIMEOUT_SECS", "10")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PAYMENT_TIMEOUT_SECS".to_owned(),
                "must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            secret_key,
            api_base: get_url_env("STRIPE_API_BASE", DEFAULT_PAYMENT_API_BASE)?,
            currency,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl BootstrapAdmin {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(username) = get_optional_env("STOREFRONT_ADMIN_USERNAME") else {
            return Ok(None);
        };
        Ok(Some(Self {
            username,
            email: get_required_env("STOREFRONT_ADMIN_EMAIL")?,
            password: SecretString::from(get_required_env("STOREFRONT_ADMIN_PASSWORD")?),
        }))
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
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => parse_bool(&value)
            .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), value.clone())),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get an absolute http(s) URL, without a trailing slash.
fn get_url_env(key: &str, default: &str) -> Result<String, ConfigError> {
    let url: Url = parse_env(key, default)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_owned())
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("sk_test_your-key-here", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("sk_test_4eC39HqLyjWDarjtT1zdp7dc", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.secure_cookies());
        assert!(config.database_url.is_none());
        assert_eq!(config.payments.currency, "usd");
        assert_eq!(config.payments.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        let config = StorefrontConfig {
            base_url: "https://cosmicblueprints.com".to_owned(),
            ..StorefrontConfig::default()
        };
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = StorefrontConfig {
            database_url: Some(SecretString::from("postgres://user:hunter2@db/cb")),
            payments: PaymentConfig {
                secret_key: Some(SecretString::from("sk_live_super_secret_value")),
                ..PaymentConfig::default()
            },
            ..StorefrontConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.stripe.com"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("sk_live_super_secret_value"));
    }
}
