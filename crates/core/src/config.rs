//! TOML-based configuration system for codesync.
//!
//! The one sensitive value (the SMTP password) is stored as a `_env` field
//! that references an environment variable name. The actual secret is
//! resolved at runtime via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session lifetime settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// SMTP settings for OTP delivery. When absent, codes are logged instead
    /// of mailed.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Code execution settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8080`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding the JSON store documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Session lifetime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Hours a bearer token stays valid after login (default 24).
    #[serde(default = "default_session_ttl")]
    pub ttl_hours: u64,
}

fn default_session_ttl() -> u64 {
    24
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl(),
        }
    }
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// SMTP relay configuration for OTP delivery.
///
/// All fields are optional; with no relay configured the mailer falls back
/// to logging codes, which keeps local development working without SMTP.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmtpConfig {
    /// Relay host, optionally `host:port` (e.g. `smtp.example.com:587`).
    #[serde(default)]
    pub relay: Option<String>,

    /// Sender address for OTP mail.
    #[serde(default)]
    pub from: Option<String>,

    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable holding the SMTP password.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Code execution
// ---------------------------------------------------------------------------

/// Code execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Interpreter binary for submitted code (default `python3`).
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Wall-clock limit in seconds before the child is killed (default 10).
    #[serde(default = "default_exec_timeout")]
    pub timeout_secs: u64,
}

fn default_interpreter() -> String {
    "python3".into()
}
fn default_exec_timeout() -> u64 {
    10
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_exec_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the `*_env` fields from environment variables.
    ///
    /// A missing variable logs a warning but does **not** fail -- without an
    /// SMTP password the mailer simply runs in log-only mode.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.smtp.password_env {
            self.smtp.password = resolve_optional_env(env_name, "smtp.password_env");
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.listen".into(),
                detail: "listen address must not be empty".into(),
            });
        }
        if self.session.ttl_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.ttl_hours".into(),
                detail: "session lifetime must be > 0".into(),
            });
        }
        if self.execution.interpreter.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "execution.interpreter".into(),
                detail: "interpreter must not be empty".into(),
            });
        }
        if self.execution.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "execution.timeout_secs".into(),
                detail: "execution timeout must be > 0".into(),
            });
        }
        if self.smtp.relay.is_some() && self.smtp.from.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "smtp.from".into(),
                detail: "a sender address is required when a relay is configured".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
