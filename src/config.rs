use crate::constants::{
    DEFAULT_DATA_TIMEOUT_SECS, DEFAULT_DOWNLOAD_BUFFER_SIZE, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_LISTEN_PORT, DEFAULT_MAX_LOGIN_ATTEMPTS, DEFAULT_PASSWORD,
    DEFAULT_UPLOAD_BUFFER_SIZE, DEFAULT_USERNAME, USERNAME_REGEX,
};
use anyhow::{Context, Result};
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Root path is not a directory: {0:?}")]
    RootNotDirectory(PathBuf),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Username and password are required when anonymous login is disabled")]
    MissingCredentials,

    #[error("Invalid {0}: must be greater than zero")]
    ZeroValue(&'static str),
}

/// Settings for one server instance. Immutable once the server is started;
/// changing anything means stopping the server and creating a new one.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub root_path: PathBuf,
    pub listen_address: IpAddr,
    pub listen_port: u16,
    pub username: Option<String>,
    /// Plaintext, or a bcrypt hash (`$2b$...`).
    pub password: Option<String>,
    pub anonymous: bool,
    pub read_only: bool,
    pub one_ip_only: bool,
    pub allow_active_mode: bool,
    /// Address advertised in PASV replies, for servers behind NAT.
    pub pasv_address: Option<IpAddr>,
    pub data_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_login_attempts: u32,
    pub upload_buffer_size: usize,
    pub download_buffer_size: usize,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            listen_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: DEFAULT_LISTEN_PORT,
            username: Some(String::from(DEFAULT_USERNAME)),
            password: Some(String::from(DEFAULT_PASSWORD)),
            anonymous: false,
            read_only: false,
            one_ip_only: true,
            allow_active_mode: true,
            pasv_address: None,
            data_timeout_secs: DEFAULT_DATA_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            upload_buffer_size: DEFAULT_UPLOAD_BUFFER_SIZE,
            download_buffer_size: DEFAULT_DOWNLOAD_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.listen_port)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Checks the settings a running server depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root_path.is_dir() {
            return Err(ConfigError::RootNotDirectory(self.root_path.clone()));
        }

        if !self.anonymous {
            let (Some(username), Some(_)) = (&self.username, &self.password) else {
                return Err(ConfigError::MissingCredentials);
            };
            let re = Regex::new(USERNAME_REGEX)
                .map_err(|e| ConfigError::InvalidUsername(e.to_string()))?;
            if !re.is_match(username) {
                return Err(ConfigError::InvalidUsername(username.clone()));
            }
        }

        if self.data_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("data_timeout_secs"));
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("idle_timeout_secs"));
        }
        if self.max_login_attempts == 0 {
            return Err(ConfigError::ZeroValue("max_login_attempts"));
        }
        if self.upload_buffer_size == 0 {
            return Err(ConfigError::ZeroValue("upload_buffer_size"));
        }
        if self.download_buffer_size == 0 {
            return Err(ConfigError::ZeroValue("download_buffer_size"));
        }

        Ok(())
    }

    pub fn log(&self) {
        info!("  Root Path: {:?}", self.root_path);
        info!("  Listen Address: {}", self.bind_address());
        info!("  Anonymous: {}", self.anonymous);
        info!("  Read Only: {}", self.read_only);
        info!("  One IP Only: {}", self.one_ip_only);
        info!("  Active Mode: {}", self.allow_active_mode);
        info!("  Data Timeout: {}s", self.data_timeout_secs);
        info!("  Upload Buffer Size: {} KB", self.upload_buffer_size / 1024);
        info!("  Download Buffer Size: {} KB", self.download_buffer_size / 1024);
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }
}
