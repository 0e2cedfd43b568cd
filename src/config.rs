//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Graph API host.
pub const DEFAULT_API_BASE_URL: &str = "https://graph.facebook.com";

/// Default Graph API version.
pub const DEFAULT_API_VERSION: &str = "v19.0";

/// Placeholder values that must never reach the vendor API.
const PLACEHOLDERS: &[&str] = &["YOUR_PHONE_NUMBER_ID", "YOUR_PERMANENT_TOKEN", "NUMBER_HERE"];

/// Settings for the outbound messaging client.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Phone-number id that scopes the sending endpoint.
    pub phone_number_id: String,
    /// Permanent bearer token.
    pub access_token: SecretString,
    /// Fixed destination every order is forwarded to.
    pub recipient: String,
    /// API host, overridable for tests and proxies.
    pub api_base_url: String,
    pub api_version: String,
}

impl MessagingConfig {
    /// Load from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let phone_number_id = required(&lookup, "WHATSAPP_PHONE_NUMBER_ID")?;
        let access_token = required(&lookup, "WHATSAPP_ACCESS_TOKEN")?;
        let recipient = required(&lookup, "WHATSAPP_RECIPIENT")?;

        let api_base_url = lookup("WHATSAPP_API_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "WHATSAPP_API_BASE_URL".into(),
                message: format!("expected an http(s) URL, got {api_base_url:?}"),
            });
        }

        let api_version = lookup("WHATSAPP_API_VERSION")
            .map(|s| s.trim().trim_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            phone_number_id,
            access_token: SecretString::from(access_token),
            recipient,
            api_base_url,
            api_version,
        })
    }
}

/// Order portal configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Port the intake API listens on.
    pub port: u16,
    /// Directory where generated and uploaded documents are staged.
    pub upload_dir: PathBuf,
    pub messaging: MessagingConfig,
}

impl PortalConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("ORDER_PORTAL_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "ORDER_PORTAL_PORT".into(),
                message: format!("expected a port number, got {raw:?}"),
            })?,
            None => 8080,
        };

        let upload_dir = lookup("ORDER_PORTAL_UPLOAD_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        Ok(Self {
            port,
            upload_dir,
            messaging: MessagingConfig::from_lookup(lookup)?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;

    if PLACEHOLDERS.contains(&value.as_str()) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{value} is a placeholder, set the real value"),
        });
    }
    Ok(value)
}
