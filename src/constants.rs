// src/constants.rs

use std::time::Duration;

pub const USERNAME_REGEX: &str = r"^[a-zA-Z0-9._-]{1,32}$";

/// Port used when nothing else is configured. Unix-like systems refuse port 21
/// to unprivileged processes, so the server defaults to 2121.
pub const DEFAULT_LISTEN_PORT: u16 = 2121;
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "qt";

pub const DEFAULT_DATA_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 3;
pub const DEFAULT_UPLOAD_BUFFER_SIZE: usize = 256 * 1024;
pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 128 * 1024;

/// Longest control line accepted, CRLF included.
pub const MAX_COMMAND_LENGTH: usize = 4096;

/// How long `stop()` lets running sessions wind down before aborting them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub const BANNER: &str = "lanftpd ready.";
