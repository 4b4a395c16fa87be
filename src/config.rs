//! Account configuration
//!
//! An [`AccountConfig`] is resolved from, in order of precedence,
//! caller-supplied overrides (command line, environment) and the saved
//! JSON file, with the provider table as the last resort for the
//! server. The password is never written to disk.

use crate::error::{Error, Result};
use crate::provider::{IMAPS_PORT, server_for_address};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How the connection to the IMAP server is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Security {
    /// TLS from the first byte (IMAPS).
    #[default]
    Tls,
    /// Plaintext greeting, then upgraded with STARTTLS.
    StartTls,
    /// No encryption at all.
    Plain,
}

impl Security {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tls => IMAPS_PORT,
            Self::StartTls | Self::Plain => 143,
        }
    }
}

/// Everything needed to open an authenticated IMAP session.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Login name, which is also the mailbox owner's address.
    pub email_address: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub security: Security,
    /// Skip certificate verification (self-signed local servers).
    pub accept_invalid_certs: bool,
}

impl AccountConfig {
    /// Resolve a configuration from overrides and the saved file.
    ///
    /// The server host comes from the overrides, then the saved file,
    /// then the provider table for the address's domain. The port
    /// follows the same order and otherwise defaults to the provider
    /// port for implicit TLS or the security mode's standard port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no email address or password is
    /// available, or if the server has to be derived from an address
    /// without a domain.
    pub fn resolve(
        overrides: &AccountOverrides,
        saved: &SavedConfig,
        security: Security,
    ) -> Result<Self> {
        let email_address = overrides
            .email_address
            .clone()
            .or_else(|| saved.email_address.clone())
            .ok_or_else(|| Error::Config("No email address configured".into()))?;
        let password = overrides
            .password
            .clone()
            .ok_or_else(|| Error::Config("No password provided".into()))?;

        let explicit_host = overrides.host.clone().or_else(|| saved.server.clone());
        let explicit_port = overrides.port.or(saved.port);

        let (host, port) = if let Some(host) = explicit_host {
            (host, explicit_port.unwrap_or(security.default_port()))
        } else {
            let profile = server_for_address(&email_address)?;
            let default_port = match security {
                Security::Tls => profile.port,
                Security::StartTls | Security::Plain => security.default_port(),
            };
            (profile.host, explicit_port.unwrap_or(default_port))
        };

        debug!("Resolved IMAP server {}:{} ({:?})", host, port, security);

        Ok(Self {
            email_address,
            password,
            host,
            port,
            security,
            accept_invalid_certs: false,
        })
    }
}

/// Account settings supplied by the caller rather than the saved file.
#[derive(Debug, Clone, Default)]
pub struct AccountOverrides {
    pub email_address: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl AccountOverrides {
    /// Read overrides from environment variables
    ///
    /// Reads from `.env` file if present. All variables are optional:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    /// - `IMAP_HOST`
    /// - `IMAP_PORT`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `IMAP_PORT` is not a valid port.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            email_address: get("IMAP_USERNAME"),
            password: get("IMAP_PASSWORD"),
            host: get("IMAP_HOST"),
            port: get("IMAP_PORT")
                .map(|port| port.parse::<u16>())
                .transpose()
                .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?,
        })
    }

    /// Fill every field that is unset here from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            email_address: self.email_address.or(fallback.email_address),
            password: self.password.or(fallback.password),
            host: self.host.or(fallback.host),
            port: self.port.or(fallback.port),
        }
    }
}

/// The persisted part of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl SavedConfig {
    /// `<config dir>/sender-check/config.json`, if the platform has a
    /// config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sender-check").join("config.json"))
    }

    /// Load the saved configuration. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is
    /// not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {e}", path.display())))
    }

    /// Like [`SavedConfig::load`], but a broken file only produces a
    /// warning and an empty configuration.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Error loading config: {}", e);
            Self::default()
        })
    }

    /// Write the configuration as pretty-printed JSON, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Cannot serialize config: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl From<&AccountConfig> for SavedConfig {
    fn from(config: &AccountConfig) -> Self {
        Self {
            email_address: Some(config.email_address.clone()),
            server: Some(config.host.clone()),
            port: Some(config.port),
        }
    }
}
