//! Application configuration loaded from environment variables.
//!
//! All variables are namespaced `TAKAGI_`; nested groups use `__` as the
//! separator (e.g. `TAKAGI_PRIVATE__SHOW_SCALAR_DEVTOOLS_ON_LOCALHOST`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::keys::KeySet;
use crate::services::webfinger::DnsName;

/// Development default values.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const KEYS_DIR: &str = "./data/keys";
}

/// Hostnames always treated as loopback.
pub const LOOPBACK_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Minimum configurable token lifetime.
const MIN_TOKEN_LIFETIME: Duration = Duration::from_secs(60);

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Where `GET /` sends visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootRedirect {
    Repo,
    Settings,
    Docs,
    Off,
}

impl RootRedirect {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "repo" => Some(Self::Repo),
            "settings" => Some(Self::Settings),
            "docs" => Some(Self::Docs),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Settings only relevant to development of Takagi itself.
#[derive(Debug, Clone, Default)]
pub struct PrivateSettings {
    /// Enable the docs UI's request console when browsing from localhost.
    pub show_scalar_devtools_on_localhost: bool,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Runtime environment
    pub environment: Environment,
    /// Server bind host
    pub host: String,
    /// Server bind port
    pub port: u16,
    /// Host header allow-list (always extended with loopback names)
    pub allowed_hosts: Vec<String>,
    /// Client ID allow-list; `*` matches any client
    pub allowed_clients: Vec<String>,
    /// Path prefix all routes are mounted under
    pub base_path: String,
    /// Silently rewrite redirect URIs instead of rejecting them
    pub fix_redirect_uris: bool,
    /// Outward token lifetime; None means tokens never expire
    pub token_lifetime: Option<Duration>,
    /// Where `GET /` redirects
    pub root_redirect: RootRedirect,
    /// Treat localhost/127.0.0.1/::1 as secure transport
    pub treat_loopback_as_secure: bool,
    /// Send access-denied users back to the page that sent them
    pub return_to_referrer: bool,
    /// DNS names WebFinger will answer for
    pub allowed_webfinger_hosts: Vec<DnsName>,
    /// Operator-supplied keyset, if any
    pub keyset: Option<KeySet>,
    /// Directory generated keys are persisted to
    pub keys_dir: PathBuf,
    /// Serve the interactive API reference
    pub enable_docs: bool,
    /// Private settings group
    pub private: PrivateSettings,
}

impl Settings {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production, default: development)
    /// - `TAKAGI_HOST` / `TAKAGI_PORT`: bind address (default: 127.0.0.1:8080)
    /// - `TAKAGI_ALLOWED_HOSTS`: comma list of permitted Host headers
    /// - `TAKAGI_ALLOWED_CLIENTS`: comma list of client IDs; `*` = any (default: `*`)
    /// - `TAKAGI_BASE_PATH`: route prefix (default: `/`)
    /// - `TAKAGI_FIX_REDIRECT_URIS`: rewrite instead of rejecting redirect URIs
    /// - `TAKAGI_TOKEN_LIFETIME`: duration such as `12h` or `90d`, minimum 60s;
    ///   unset means tokens never expire
    /// - `TAKAGI_ROOT_REDIRECT`: repo | settings | docs | off (default: repo)
    /// - `TAKAGI_TREAT_LOOPBACK_AS_SECURE`: default true
    /// - `TAKAGI_RETURN_TO_REFERRER`: default false
    /// - `TAKAGI_ALLOWED_WEBFINGER_HOSTS`: comma list of DNS names; wildcards
    ///   such as `*.example.com` are permitted, a bare `*` is not
    /// - `TAKAGI_KEYSET`: private keyset JSON (as printed by `takagi-keygen`)
    /// - `TAKAGI_KEYSET_FILE`: absolute path to a keyset file; mutually
    ///   exclusive with `TAKAGI_KEYSET`
    /// - `TAKAGI_KEYS_DIR`: where generated keys persist (default: ./data/keys)
    /// - `TAKAGI_ENABLE_DOCS`: default true; forced true when root_redirect=docs
    /// - `TAKAGI_PRIVATE__SHOW_SCALAR_DEVTOOLS_ON_LOCALHOST`: default false
    pub fn from_env() -> Result<Self, SettingsError> {
        let environment = match env::var("RUST_ENV") {
            Ok(value) => Environment::from_str(&value).ok_or(SettingsError::InvalidValue(
                "RUST_ENV must be 'development' or 'production'".to_string(),
            ))?,
            Err(_) => Environment::Development,
        };

        let host = env::var("TAKAGI_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("TAKAGI_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| {
                SettingsError::InvalidValue("TAKAGI_PORT must be a valid port number".to_string())
            })?;

        let mut allowed_hosts = comma_list(&env::var("TAKAGI_ALLOWED_HOSTS").unwrap_or_default());
        if allowed_hosts.iter().any(|h| h == "*") {
            tracing::warn!("Setting TAKAGI_ALLOWED_HOSTS to '*' is insecure and not recommended.");
        }
        // Loopback names are always trusted.
        for name in LOOPBACK_HOSTS {
            allowed_hosts.push(name.to_string());
        }

        let allowed_clients = match env::var("TAKAGI_ALLOWED_CLIENTS") {
            Ok(value) => comma_list(&value),
            Err(_) => vec!["*".to_string()],
        };

        let base_path = normalize_base_path(
            &env::var("TAKAGI_BASE_PATH").unwrap_or_else(|_| "/".to_string()),
        );

        let fix_redirect_uris = bool_var("TAKAGI_FIX_REDIRECT_URIS", false)?;

        let token_lifetime = match env::var("TAKAGI_TOKEN_LIFETIME") {
            Ok(value) => {
                let lifetime = humantime::parse_duration(&value).map_err(|e| {
                    SettingsError::InvalidValue(format!(
                        "TAKAGI_TOKEN_LIFETIME is not a valid duration: {}",
                        e
                    ))
                })?;
                if lifetime < MIN_TOKEN_LIFETIME {
                    return Err(SettingsError::InvalidValue(
                        "TAKAGI_TOKEN_LIFETIME must be at least 60 seconds".to_string(),
                    ));
                }
                Some(lifetime)
            }
            Err(_) => None,
        };

        let root_redirect = match env::var("TAKAGI_ROOT_REDIRECT") {
            Ok(value) => RootRedirect::from_str(&value).ok_or(SettingsError::InvalidValue(
                "TAKAGI_ROOT_REDIRECT must be one of: repo, settings, docs, off".to_string(),
            ))?,
            Err(_) => RootRedirect::Repo,
        };

        let treat_loopback_as_secure = bool_var("TAKAGI_TREAT_LOOPBACK_AS_SECURE", true)?;
        let return_to_referrer = bool_var("TAKAGI_RETURN_TO_REFERRER", false)?;

        let allowed_webfinger_hosts =
            match env::var("TAKAGI_ALLOWED_WEBFINGER_HOSTS") {
                Ok(value) => comma_list(&value)
                    .iter()
                    .map(|name| parse_webfinger_host(name))
                    .collect::<Result<Vec<_>, _>>()?,
                Err(_) => Vec::new(),
            };

        let keyset = load_keyset()?;

        let keys_dir = PathBuf::from(
            env::var("TAKAGI_KEYS_DIR").unwrap_or_else(|_| defaults::KEYS_DIR.to_string()),
        );

        let root_redirect_is_docs = root_redirect == RootRedirect::Docs;
        // The docs redirect target must exist.
        let enable_docs = bool_var("TAKAGI_ENABLE_DOCS", true)? || root_redirect_is_docs;

        let private = PrivateSettings {
            show_scalar_devtools_on_localhost: bool_var(
                "TAKAGI_PRIVATE__SHOW_SCALAR_DEVTOOLS_ON_LOCALHOST",
                false,
            )?,
        };

        Ok(Settings {
            environment,
            host,
            port,
            allowed_hosts,
            allowed_clients,
            base_path,
            fix_redirect_uris,
            token_lifetime,
            root_redirect,
            treat_loopback_as_secure,
            return_to_referrer,
            allowed_webfinger_hosts,
            keyset,
            keys_dir,
            enable_docs,
            private,
        })
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }

    /// Path prefix without a trailing slash; empty when mounted at the root.
    pub fn path_prefix(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}

/// Split a comma-separated value, trimming whitespace and dropping empties.
fn comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn bool_var(name: &str, default: bool) -> Result<bool, SettingsError> {
    match env::var(name) {
        Ok(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(SettingsError::InvalidValue(format!(
                "{} must be a boolean",
                name
            ))),
        },
        Err(_) => Ok(default),
    }
}

/// Normalize the base path to `/`-prefixed, no trailing slash (except root).
fn normalize_base_path(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_webfinger_host(name: &str) -> Result<DnsName, SettingsError> {
    let parsed = DnsName::parse(name).map_err(|e| {
        SettingsError::InvalidValue(format!(
            "TAKAGI_ALLOWED_WEBFINGER_HOSTS entry '{}' is not a valid DNS name: {}",
            name, e
        ))
    })?;

    if parsed.is_wildcard() {
        if parsed.label_count() == 0 {
            return Err(SettingsError::InvalidValue(
                "The unqualified wildcard ('*') is not permitted in TAKAGI_ALLOWED_WEBFINGER_HOSTS"
                    .to_string(),
            ));
        }
        if parsed.label_count() < 2 {
            return Err(SettingsError::InvalidValue(format!(
                "Wildcard entries in TAKAGI_ALLOWED_WEBFINGER_HOSTS must have at least three \
                 labels; '{}' does not",
                name
            )));
        }
    }

    Ok(parsed)
}

/// Resolve `TAKAGI_KEYSET` / `TAKAGI_KEYSET_FILE` into a validated keyset.
fn load_keyset() -> Result<Option<KeySet>, SettingsError> {
    let inline = env::var("TAKAGI_KEYSET").ok();
    let file = env::var("TAKAGI_KEYSET_FILE").ok();

    let text = match (inline, file) {
        (Some(_), Some(_)) => {
            return Err(SettingsError::InvalidValue(
                "You cannot provide both TAKAGI_KEYSET and TAKAGI_KEYSET_FILE".to_string(),
            ));
        }
        (Some(text), None) => text,
        (None, Some(path)) => {
            let path = PathBuf::from(&path);
            if !path.is_absolute() {
                return Err(SettingsError::InvalidValue(
                    "TAKAGI_KEYSET_FILE must be an absolute path".to_string(),
                ));
            }
            let resolved = path.canonicalize().map_err(|e| {
                SettingsError::InvalidValue(format!("TAKAGI_KEYSET_FILE is unreadable: {}", e))
            })?;
            if let Ok(app_dir) = env::current_dir()
                && resolved.starts_with(&app_dir)
            {
                return Err(SettingsError::InvalidValue(
                    "TAKAGI_KEYSET_FILE cannot be located within the application directory"
                        .to_string(),
                ));
            }
            std::fs::read_to_string(&resolved).map_err(|e| {
                SettingsError::InvalidValue(format!("TAKAGI_KEYSET_FILE is unreadable: {}", e))
            })?
        }
        (None, None) => return Ok(None),
    };

    let keyset = KeySet::from_json(&text)
        .map_err(|e| SettingsError::InvalidValue(format!("invalid keyset: {}", e)))?;

    tracing::info!("Takagi is using a custom private keyset.");
    Ok(Some(keyset))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
