//! Service configuration
//!
//! Loaded from TOML. Every field has a default so partial files parse;
//! `validate` catches values that would only fail later at runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VouchConfig {
    /// Public URL of the server, used to build invitation links.
    /// Without it invitation e-mails cannot be sent.
    pub server_url: Option<String>,
    /// Outbound e-mail settings
    pub email: EmailConfig,
    /// Invitation store settings
    pub invitations: InvitationsConfig,
}

impl VouchConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "server_url must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.email.sender.trim().is_empty() {
            return Err(ConfigError::Invalid("email.sender must not be empty".into()));
        }
        if self.invitations.token_collision_retries == 0 {
            return Err(ConfigError::Invalid(
                "invitations.token_collision_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Outbound e-mail settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// `From` address of invitation e-mails
    pub sender: String,
    /// Product name shown in subjects
    pub product_name: String,
    /// Directory the mocked sender writes messages into
    pub outbox_dir: PathBuf,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: "no-reply@vouch.invalid".to_string(),
            product_name: "Vouch".to_string(),
            outbox_dir: std::env::temp_dir().join("vouch-outbox"),
        }
    }
}

/// Invitation store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvitationsConfig {
    /// How many fresh tokens to try when a generated token collides
    pub token_collision_retries: u32,
}

impl Default for InvitationsConfig {
    fn default() -> Self {
        Self {
            token_collision_retries: 8,
        }
    }
}
