//! Configuration, loaded once at startup.
//!
//! Values come from an optional TOML file, then command-line overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use vidgate_core::ExpiryPolicy;

use crate::error::{GatewayError, Result};

/// Database path selecting an in-memory store.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Settings for the [`Gateway`](crate::Gateway).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// How permanent rules interact with expiry.
    pub expiry_policy: ExpiryPolicy,
    /// Root for locally stored video files.
    pub uploads_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            expiry_policy: ExpiryPolicy::HonorPermanent,
            uploads_dir: PathBuf::from("uploads"),
        }
    }
}

/// Request headers set by the upstream session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub user_header: String,
    pub role_header: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_header: "x-user-id".into(),
            role_header: "x-user-role".into(),
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// SQLite file path, or `:memory:`.
    pub database: String,
    /// Take the caller address from `X-Forwarded-For` when present.
    pub trust_proxy: bool,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Admin account created at startup if no account has this email.
    pub admin_email: Option<String>,
    pub identity: IdentityConfig,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            database: "vidgate.db".into(),
            trust_proxy: true,
            log_level: "info".into(),
            admin_email: None,
            identity: IdentityConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }
}

/// Expiry policy as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Strict,
    HonorPermanent,
}

impl From<PolicyArg> for ExpiryPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => ExpiryPolicy::Strict,
            PolicyArg::HonorPermanent => ExpiryPolicy::HonorPermanent,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "vidgate", about = "Access-controlled video streaming server")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// SQLite database path, or :memory:
    #[arg(long)]
    pub database: Option<String>,

    /// Directory holding locally stored videos
    #[arg(long)]
    pub uploads_dir: Option<PathBuf>,

    /// How permanent rules interact with expiry
    #[arg(long, value_enum)]
    pub expiry_policy: Option<PolicyArg>,

    /// Trust X-Forwarded-For for the caller address
    #[arg(long)]
    pub trust_proxy: Option<bool>,

    /// Email of the admin account to create at startup
    #[arg(long)]
    pub admin_email: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Resolve the effective configuration: file first, flags on top.
    pub fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(dir) = self.uploads_dir {
            config.gateway.uploads_dir = dir;
        }
        if let Some(policy) = self.expiry_policy {
            config.gateway.expiry_policy = policy.into();
        }
        if let Some(trust) = self.trust_proxy {
            config.trust_proxy = trust;
        }
        if let Some(email) = self.admin_email {
            config.admin_email = Some(email);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}
