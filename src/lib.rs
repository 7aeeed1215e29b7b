//! Embeddable FTP server for sharing a directory on a local network.

pub mod config;
pub mod constants;
pub mod core_auth;
pub mod core_error;
pub mod core_fs;
pub mod core_ftpcommand;
pub mod core_network;
pub mod server;
pub mod session;

pub use config::{Config, ServerConfig};
pub use core_error::FtpError;
pub use server::{FtpServer, ServerEvent};
